use time::Date;
use tracing::{info, warn};

use tickertape_store::{DbHolding, Store, TradeSide};

use super::{blocking, logged, InteractorError};
use crate::client::StockClient;
use crate::{SearchResult, StockOptions, StockQuote, StockSymbol};

/// Results returned by [`NewTickerInteractor::search`].
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// A symbol the user wants to start tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicker {
    pub symbol: StockSymbol,
    pub side: TradeSide,
}

impl NewTicker {
    pub fn new(symbol: StockSymbol, side: TradeSide) -> Self {
        Self { symbol, side }
    }
}

pub struct NewTickerInteractor {
    client: StockClient,
    store: Store,
}

impl NewTickerInteractor {
    pub fn new(client: StockClient, store: Store) -> Self {
        Self { client, store }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, InteractorError> {
        let result = self
            .client
            .search(query, DEFAULT_SEARCH_LIMIT)
            .await
            .map(|batch| batch.results)
            .map_err(InteractorError::from);
        logged("search", result)
    }

    /// Fresh quote for a symbol about to be added.
    pub async fn resolve_ticker(&self, symbol: &StockSymbol) -> Result<StockQuote, InteractorError> {
        logged(
            "resolve_ticker",
            self.client.quote(true, symbol).await.map_err(InteractorError::from),
        )
    }

    pub async fn lookup_options(
        &self,
        underlying: &StockSymbol,
        expiration: Option<Date>,
    ) -> Result<StockOptions, InteractorError> {
        logged(
            "lookup_options",
            self.client
                .options_chain(false, underlying, expiration)
                .await
                .map_err(InteractorError::from),
        )
    }

    /// Resolve and store a new holding.
    ///
    /// Fails with [`InteractorError::Duplicate`] when the symbol is already
    /// tracked on the same side; nothing is inserted in that case.
    pub async fn insert_new_ticker(&self, ticker: NewTicker) -> Result<DbHolding, InteractorError> {
        logged("insert_new_ticker", self.insert(ticker).await)
    }

    async fn insert(&self, ticker: NewTicker) -> Result<DbHolding, InteractorError> {
        let quote = self.client.quote(true, &ticker.symbol).await?;

        let symbol = ticker.symbol.to_string();
        let side = ticker.side;
        let existing = blocking(&self.store, move |store| {
            store.query_holding_by_symbol(&symbol, side)
        })
        .await?;
        if existing.is_some() {
            warn!(symbol = %ticker.symbol, side = side.as_str(), "holding already tracked");
            return Err(InteractorError::Duplicate {
                symbol: ticker.symbol.to_string(),
                side: side.as_str().to_owned(),
            });
        }

        let mut holding = DbHolding::new(ticker.symbol.as_str(), quote.equity_type, side);
        if let Some(details) = &quote.options {
            holding = holding.with_option(
                details.underlying_symbol.as_str(),
                details.strike,
                details.expiration,
                details.option_type,
            );
        }

        let record = holding.clone();
        blocking(&self.store, move |store| store.insert_holding(&record)).await?;
        info!(symbol = %holding.symbol, side = side.as_str(), "added holding");
        Ok(holding)
    }
}
