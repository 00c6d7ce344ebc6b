use serde::Serialize;
use tracing::warn;

use tickertape_core::{HomeInteractor, InteractorError, StockQuote, StockSymbol};

use crate::cli::QuoteArgs;
use crate::error::CliError;

use super::{parse_symbol, settle, CommandResult, Context};

#[derive(Debug, Serialize)]
struct QuoteResponseData {
    quotes: Vec<StockQuote>,
}

pub async fn run(args: &QuoteArgs, context: &Context<'_>) -> Result<CommandResult, CliError> {
    let symbols = args
        .symbols
        .iter()
        .map(|raw| parse_symbol(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let result = context
        .client
        .quotes(context.force(), &symbols)
        .await
        .map_err(InteractorError::from);
    let missing = match &result {
        Ok(quotes) => missing_symbols(&symbols, quotes),
        Err(_) => Vec::new(),
    };

    let mut command_result = settle(result.map(|quotes| QuoteResponseData { quotes }))?;
    for symbol in missing {
        warn!(%symbol, "no quote returned");
        command_result = command_result.with_warning(format!("no quote returned for {symbol}"));
    }
    Ok(command_result)
}

pub async fn indexes(context: &Context<'_>) -> Result<CommandResult, CliError> {
    let home = HomeInteractor::new(context.client.clone());
    settle(
        home.indexes(context.force())
            .await
            .map(|quotes| QuoteResponseData { quotes }),
    )
}

fn missing_symbols(requested: &[StockSymbol], quotes: &[StockQuote]) -> Vec<StockSymbol> {
    requested
        .iter()
        .filter(|symbol| !quotes.iter().any(|quote| &quote.symbol == *symbol))
        .cloned()
        .collect()
}
