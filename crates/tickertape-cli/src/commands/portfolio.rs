use serde::Serialize;
use serde_json::json;
use tracing::info;

use tickertape_core::{
    NewTicker, NewTickerInteractor, PortfolioDigInteractor, PortfolioInteractor, UtcDateTime,
};
use tickertape_store::{
    parse_date, DbPosition, DbSplit, HoldingId, InsertOutcome, PositionId, SplitId,
};

use crate::cli::{
    HoldingArgs, HoldingCommand, PositionArgs, PositionCommand, SplitArgs, SplitCommand,
};
use crate::error::CliError;

use super::{parse_symbol, settle, CommandResult, Context};

#[derive(Debug, Serialize)]
struct Inserted<T> {
    outcome: InsertOutcome,
    record: T,
}

fn invalid(error: impl ToString) -> CliError {
    CliError::Command(error.to_string())
}

pub async fn holding(args: &HoldingArgs, context: &Context<'_>) -> Result<CommandResult, CliError> {
    let store = context.open_store()?;
    match &args.command {
        HoldingCommand::Add(add) => {
            let symbol = parse_symbol(&add.symbol)?;
            let interactor = NewTickerInteractor::new(context.client.clone(), store);
            let result = interactor
                .insert_new_ticker(NewTicker::new(symbol, add.side.into()))
                .await;
            if let Ok(holding) = &result {
                info!(id = %holding.id, symbol = %holding.symbol, "holding added");
            }
            settle(result)
        }
        HoldingCommand::List => {
            let interactor = PortfolioInteractor::new(context.client.clone(), store);
            settle(interactor.holdings().await.map(|holdings| json!({ "holdings": holdings })))
        }
        HoldingCommand::Remove(target) => {
            let id = HoldingId::parse(&target.id).map_err(invalid)?;
            let interactor = PortfolioInteractor::new(context.client.clone(), store);
            settle(interactor.remove_holding(id).await)
        }
    }
}

pub async fn position(
    args: &PositionArgs,
    context: &Context<'_>,
) -> Result<CommandResult, CliError> {
    let interactor = PortfolioDigInteractor::new(context.open_store()?);
    match &args.command {
        PositionCommand::Add(add) => {
            let holding_id = HoldingId::parse(&add.holding).map_err(invalid)?;
            let purchase_date = match add.date.as_deref() {
                Some(raw) => parse_date(raw).map_err(invalid)?,
                None => UtcDateTime::now().date(),
            };
            let position = DbPosition::new(holding_id, add.shares, add.price, purchase_date);
            let outcome = interactor.add_position(position.clone()).await?;
            settle(Ok(Inserted {
                outcome,
                record: position,
            }))
        }
        PositionCommand::List(target) => {
            let holding_id = HoldingId::parse(&target.id).map_err(invalid)?;
            let positions = interactor.positions(context.force(), holding_id).await?;
            settle(Ok(json!({ "positions": positions })))
        }
        PositionCommand::Remove(target) => {
            let id = PositionId::parse(&target.id).map_err(invalid)?;
            let removed = interactor.delete_position(id).await?;
            // A one-shot command has no undo prompt.
            interactor.finalize_position_delete();
            settle(Ok(removed))
        }
    }
}

pub async fn split(args: &SplitArgs, context: &Context<'_>) -> Result<CommandResult, CliError> {
    let interactor = PortfolioDigInteractor::new(context.open_store()?);
    match &args.command {
        SplitCommand::Add(add) => {
            let holding_id = HoldingId::parse(&add.holding).map_err(invalid)?;
            let split_date = parse_date(&add.date).map_err(invalid)?;
            let split = DbSplit::new(holding_id, add.from, add.to, split_date);
            let outcome = interactor.add_split(split.clone()).await?;
            settle(Ok(Inserted {
                outcome,
                record: split,
            }))
        }
        SplitCommand::List(target) => {
            let holding_id = HoldingId::parse(&target.id).map_err(invalid)?;
            let splits = interactor.splits(context.force(), holding_id).await?;
            settle(Ok(json!({ "splits": splits })))
        }
        SplitCommand::Remove(target) => {
            let id = SplitId::parse(&target.id).map_err(invalid)?;
            let removed = interactor.delete_split(id).await?;
            interactor.finalize_split_delete();
            settle(Ok(removed))
        }
    }
}

pub async fn portfolio(context: &Context<'_>) -> Result<CommandResult, CliError> {
    let interactor = PortfolioInteractor::new(context.client.clone(), context.open_store()?);
    let portfolio = interactor.portfolio(context.force()).await?;
    let warning = portfolio
        .quote_error
        .as_ref()
        .map(|error| format!("quotes unavailable, holdings are unpriced: {error}"));

    let mut result = settle(Ok(portfolio))?;
    if let Some(warning) = warning {
        result = result.with_warning(warning);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use serde_json::Value;

    use crate::cli::Cli;
    use crate::commands::run;

    fn offline(db: &std::path::Path, args: &[&str]) -> Cli {
        let db = db.to_str().expect("utf-8 path");
        let mut argv = vec!["tickertape", "--offline", "--db", db];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("parses")
    }

    #[tokio::test]
    async fn holding_position_and_portfolio_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = dir.path().join("folio.duckdb");

        let added = run(&offline(&db, &["holding", "add", "aapl"]))
            .await
            .expect("holding added");
        let holding_id = added.data["id"].as_str().expect("id").to_owned();

        run(&offline(
            &db,
            &[
                "position",
                "add",
                &holding_id,
                "--shares",
                "10",
                "--price",
                "100",
                "--date",
                "2023-01-10",
            ],
        ))
        .await
        .expect("position added");

        let portfolio = run(&offline(&db, &["portfolio"])).await.expect("portfolio");
        assert!(portfolio.errors.is_empty());
        assert_eq!(portfolio.data["summary"]["holding_count"], Value::from(1));
        assert_eq!(portfolio.data["stocks"][0]["share_count"], Value::from(10.0));
    }

    #[tokio::test]
    async fn adding_the_same_holding_twice_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = dir.path().join("folio.duckdb");

        run(&offline(&db, &["holding", "add", "MSFT"]))
            .await
            .expect("first add");
        let error = run(&offline(&db, &["holding", "add", "msft"]))
            .await
            .expect_err("duplicate");
        assert_eq!(error.exit_code(), 2);
    }

    #[tokio::test]
    async fn malformed_ids_are_command_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = dir.path().join("folio.duckdb");

        let error = run(&offline(&db, &["position", "list", "not-a-uuid"]))
            .await
            .expect_err("bad id");
        assert_eq!(error.exit_code(), 2);
    }
}
