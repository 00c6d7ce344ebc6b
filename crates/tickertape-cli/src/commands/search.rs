use tickertape_core::{DigInteractor, InteractorError};
use tickertape_store::parse_date;

use crate::cli::{OptionsArgs, SearchArgs};
use crate::error::CliError;

use super::{parse_symbol, settle, CommandResult, Context};

pub async fn run(args: &SearchArgs, context: &Context<'_>) -> Result<CommandResult, CliError> {
    if args.limit == 0 {
        return Err(CliError::Command(String::from(
            "--limit must be greater than zero",
        )));
    }

    let query = args.query.trim();
    if query.is_empty() {
        return Err(CliError::Command(String::from("query must not be empty")));
    }

    settle(
        context
            .client
            .search(query, args.limit)
            .await
            .map_err(InteractorError::from),
    )
}

pub async fn options(args: &OptionsArgs, context: &Context<'_>) -> Result<CommandResult, CliError> {
    let symbol = parse_symbol(&args.symbol)?;
    let expiration = args
        .expiration
        .as_deref()
        .map(parse_date)
        .transpose()
        .map_err(|error| CliError::Command(error.to_string()))?;

    let dig = DigInteractor::new(context.client.clone());
    settle(dig.options_chain(context.force(), &symbol, expiration).await)
}
