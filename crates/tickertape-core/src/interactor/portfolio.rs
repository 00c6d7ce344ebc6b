use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use tickertape_store::{DbHolding, HoldingId, Store};

use super::{blocking, logged, InteractorError};
use crate::client::StockClient;
use crate::portfolio::{PortfolioStock, PortfolioSummary};
use crate::StockSymbol;

/// The valued portfolio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Portfolio {
    pub stocks: Vec<PortfolioStock>,
    pub summary: PortfolioSummary,
    /// Why quotes are missing, when the quote fetch failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_error: Option<String>,
}

pub struct PortfolioInteractor {
    client: StockClient,
    store: Store,
}

impl PortfolioInteractor {
    pub fn new(client: StockClient, store: Store) -> Self {
        Self { client, store }
    }

    pub async fn holdings(&self) -> Result<Vec<DbHolding>, InteractorError> {
        logged("holdings", blocking(&self.store, Store::query_holdings).await)
    }

    /// Load holdings with their positions, splits and quotes.
    ///
    /// A failed quote fetch leaves the stocks unpriced instead of failing the
    /// whole portfolio.
    pub async fn portfolio(&self, force: bool) -> Result<Portfolio, InteractorError> {
        logged("portfolio", self.load(force).await)
    }

    pub async fn remove_holding(&self, id: HoldingId) -> Result<DbHolding, InteractorError> {
        logged(
            "remove_holding",
            blocking(&self.store, move |store| store.delete_holding(id)).await,
        )
    }

    async fn load(&self, force: bool) -> Result<Portfolio, InteractorError> {
        let (holdings, positions, splits) = blocking(&self.store, |store| {
            Ok((
                store.query_holdings()?,
                store.query_all_positions()?,
                store.query_all_splits()?,
            ))
        })
        .await?;

        // A symbol held on both sides is quoted once and priced for both.
        let mut seen = HashSet::new();
        let symbols = holdings
            .iter()
            .filter_map(|holding| match StockSymbol::parse(&holding.symbol) {
                Ok(symbol) => Some(symbol),
                Err(error) => {
                    warn!(symbol = %holding.symbol, %error, "stored holding has an invalid symbol");
                    None
                }
            })
            .filter(|symbol| seen.insert(symbol.clone()))
            .collect::<Vec<_>>();

        let (quotes, quote_error) = if symbols.is_empty() {
            (Vec::new(), None)
        } else {
            match self.client.quotes(force, &symbols).await {
                Ok(quotes) => (quotes, None),
                Err(error) => {
                    warn!(%error, "portfolio quotes unavailable");
                    (Vec::new(), Some(error.to_string()))
                }
            }
        };
        let quotes = quotes
            .into_iter()
            .map(|quote| (quote.symbol.to_string(), quote))
            .collect::<HashMap<_, _>>();

        let mut positions_by_holding = group_by(positions, |position| position.holding_id);
        let mut splits_by_holding = group_by(splits, |split| split.holding_id);
        let stocks = holdings
            .into_iter()
            .map(|holding| {
                let positions = positions_by_holding.remove(&holding.id).unwrap_or_default();
                let splits = splits_by_holding.remove(&holding.id).unwrap_or_default();
                let quote = quotes.get(&holding.symbol).cloned();
                PortfolioStock::new(holding, positions, splits, quote)
            })
            .collect::<Vec<_>>();
        let summary = PortfolioSummary::from_stocks(&stocks);
        debug!(holdings = stocks.len(), "loaded portfolio");

        Ok(Portfolio {
            stocks,
            summary,
            quote_error,
        })
    }
}

fn group_by<T>(records: Vec<T>, key: impl Fn(&T) -> HoldingId) -> HashMap<HoldingId, Vec<T>> {
    let mut grouped: HashMap<HoldingId, Vec<T>> = HashMap::new();
    for record in records {
        grouped.entry(key(&record)).or_default().push(record);
    }
    grouped
}
