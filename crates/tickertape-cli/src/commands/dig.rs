use std::sync::Arc;

use serde::Serialize;

use tickertape_core::{ChartRange, DigController, DigInteractor, EnvelopeError, StockNews};

use crate::cli::{ChartArgs, NewsArgs, SymbolArgs};
use crate::error::CliError;

use super::{parse_symbol, settle, CommandResult, Context};

#[derive(Debug, Serialize)]
struct NewsResponseData {
    news: Vec<StockNews>,
}

fn interactor(context: &Context<'_>) -> DigInteractor {
    DigInteractor::new(context.client.clone())
}

pub async fn chart(args: &ChartArgs, context: &Context<'_>) -> Result<CommandResult, CliError> {
    let symbol = parse_symbol(&args.symbol)?;
    let range: ChartRange = args.range.parse()?;
    settle(interactor(context).chart(context.force(), &symbol, range).await)
}

pub async fn statistics(args: &SymbolArgs, context: &Context<'_>) -> Result<CommandResult, CliError> {
    let symbol = parse_symbol(&args.symbol)?;
    settle(interactor(context).statistics(context.force(), &symbol).await)
}

pub async fn news(args: &NewsArgs, context: &Context<'_>) -> Result<CommandResult, CliError> {
    if args.limit == 0 {
        return Err(CliError::Command(String::from(
            "--limit must be greater than zero",
        )));
    }
    let symbol = parse_symbol(&args.symbol)?;
    let result = context
        .client
        .news(context.force(), &symbol, args.limit)
        .await
        .map(|news| NewsResponseData { news })
        .map_err(Into::into);
    settle(result)
}

pub async fn recommendations(
    args: &SymbolArgs,
    context: &Context<'_>,
) -> Result<CommandResult, CliError> {
    let symbol = parse_symbol(&args.symbol)?;
    settle(interactor(context).recommendations(context.force(), &symbol).await)
}

/// Load the whole detail view; a failed section is reported as an envelope
/// error while the other sections are still returned.
pub async fn run(args: &ChartArgs, context: &Context<'_>) -> Result<CommandResult, CliError> {
    let symbol = parse_symbol(&args.symbol)?;
    let range: ChartRange = args.range.parse()?;

    let controller = DigController::new(Arc::new(interactor(context)), symbol, range);
    let state = controller.load(context.force()).await;

    let mut result = CommandResult::ok(serde_json::to_value(&state)?);
    if let Some(message) = &state.error {
        result = result.with_error(EnvelopeError::new("dig.partial", message.as_str())?);
    }
    Ok(result)
}
