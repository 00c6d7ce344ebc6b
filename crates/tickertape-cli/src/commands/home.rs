use tickertape_core::{HomeInteractor, TopsKind};

use crate::cli::{TopsArgs, TrendingArgs};
use crate::error::CliError;

use super::{settle, CommandResult, Context};

pub async fn tops(args: &TopsArgs, context: &Context<'_>) -> Result<CommandResult, CliError> {
    let kind: TopsKind = args.kind.parse()?;
    let home = HomeInteractor::new(context.client.clone());
    settle(home.tops(context.force(), kind, args.count).await)
}

pub async fn trending(args: &TrendingArgs, context: &Context<'_>) -> Result<CommandResult, CliError> {
    let home = HomeInteractor::new(context.client.clone());
    settle(home.trending(context.force(), args.count).await)
}
