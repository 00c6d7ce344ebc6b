mod dig;
mod home;
mod portfolio;
mod quote;
mod search;

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use tickertape_core::{
    Envelope, EnvelopeError, FakeStockSource, InteractorError, StockClient, StockSource,
    StockSymbol, YahooAdapter, YahooConfig, SCHEMA_VERSION,
};
use tickertape_store::{Store, StoreConfig};

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::Metadata;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_error(mut self, error: EnvelopeError) -> Self {
        self.errors.push(error);
        self
    }
}

/// Shared handles for one command invocation.
pub struct Context<'a> {
    pub cli: &'a Cli,
    pub client: StockClient,
}

impl Context<'_> {
    pub fn force(&self) -> bool {
        self.cli.refresh
    }

    /// Open the portfolio database, honouring `--db`.
    pub fn open_store(&self) -> Result<Store, CliError> {
        let config = match &self.cli.db {
            Some(path) => store_config_for(path),
            None => StoreConfig::default(),
        };
        debug!(db = %config.db_path.display(), "opening store");
        Store::open(config).map_err(CliError::from)
    }
}

fn store_config_for(path: &Path) -> StoreConfig {
    let home = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    StoreConfig {
        db_path: path.to_path_buf(),
        ..StoreConfig::with_home(home)
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let mut metadata = Metadata::start();
    debug!(request_id = %metadata.request_id(), command = ?cli.command, "running command");
    let source: Arc<dyn StockSource> = if cli.offline {
        metadata.push_warning("offline mode: market data is synthetic");
        Arc::new(FakeStockSource::new())
    } else {
        let config = YahooConfig::from_env().with_timeout_ms(cli.timeout_ms);
        let adapter =
            YahooAdapter::connect(config).map_err(|error| CliError::Command(error.to_string()))?;
        Arc::new(adapter)
    };
    let context = Context {
        cli,
        client: StockClient::new(source),
    };

    let command_result = match &cli.command {
        Command::Quote(args) => quote::run(args, &context).await?,
        Command::Indexes => quote::indexes(&context).await?,
        Command::Search(args) => search::run(args, &context).await?,
        Command::Options(args) => search::options(args, &context).await?,
        Command::Chart(args) => dig::chart(args, &context).await?,
        Command::Stats(args) => dig::statistics(args, &context).await?,
        Command::News(args) => dig::news(args, &context).await?,
        Command::Recommend(args) => dig::recommendations(args, &context).await?,
        Command::Dig(args) => dig::run(args, &context).await?,
        Command::Tops(args) => home::tops(args, &context).await?,
        Command::Trending(args) => home::trending(args, &context).await?,
        Command::Holding(args) => portfolio::holding(args, &context).await?,
        Command::Position(args) => portfolio::position(args, &context).await?,
        Command::Split(args) => portfolio::split(args, &context).await?,
        Command::Portfolio => portfolio::portfolio(&context).await?,
    };

    let CommandResult {
        data,
        warnings,
        errors,
    } = command_result;

    for warning in warnings {
        metadata.push_warning(warning);
    }

    let meta = metadata.into_envelope_meta(SCHEMA_VERSION)?;
    Envelope::with_errors(meta, data, errors).map_err(CliError::from)
}

/// Turn an interactor result into a command result.
///
/// Upstream failures land in the envelope with `Value::Null` data; every
/// other failure aborts the command.
pub fn settle<T: Serialize>(result: Result<T, InteractorError>) -> Result<CommandResult, CliError> {
    match result {
        Ok(data) => Ok(CommandResult::ok(serde_json::to_value(data)?)),
        Err(InteractorError::Source(error)) => {
            Ok(CommandResult::ok(Value::Null).with_error(EnvelopeError::from(&error)))
        }
        Err(other) => Err(CliError::from(other)),
    }
}

pub fn parse_symbol(raw: &str) -> Result<StockSymbol, CliError> {
    StockSymbol::parse(raw).map_err(CliError::from)
}
