use time::Date;

use super::{logged, InteractorError};
use crate::client::StockClient;
use crate::{
    ChartRange, KeyStatistics, StockChart, StockNews, StockOptions, StockQuote,
    StockRecommendations, StockSymbol,
};

/// Articles requested for the dig view.
pub const DEFAULT_NEWS_LIMIT: usize = 10;

/// Detail data for a single symbol.
#[derive(Clone)]
pub struct DigInteractor {
    client: StockClient,
}

impl DigInteractor {
    pub fn new(client: StockClient) -> Self {
        Self { client }
    }

    pub async fn quote(&self, force: bool, symbol: &StockSymbol) -> Result<StockQuote, InteractorError> {
        logged("quote", self.client.quote(force, symbol).await.map_err(Into::into))
    }

    pub async fn chart(
        &self,
        force: bool,
        symbol: &StockSymbol,
        range: ChartRange,
    ) -> Result<StockChart, InteractorError> {
        logged("chart", self.client.chart(force, symbol, range).await.map_err(Into::into))
    }

    pub async fn news(&self, force: bool, symbol: &StockSymbol) -> Result<Vec<StockNews>, InteractorError> {
        logged(
            "news",
            self.client
                .news(force, symbol, DEFAULT_NEWS_LIMIT)
                .await
                .map_err(Into::into),
        )
    }

    pub async fn statistics(
        &self,
        force: bool,
        symbol: &StockSymbol,
    ) -> Result<KeyStatistics, InteractorError> {
        logged("statistics", self.client.statistics(force, symbol).await.map_err(Into::into))
    }

    pub async fn recommendations(
        &self,
        force: bool,
        symbol: &StockSymbol,
    ) -> Result<StockRecommendations, InteractorError> {
        logged(
            "recommendations",
            self.client.recommendations(force, symbol).await.map_err(Into::into),
        )
    }

    pub async fn options_chain(
        &self,
        force: bool,
        symbol: &StockSymbol,
        expiration: Option<Date>,
    ) -> Result<StockOptions, InteractorError> {
        logged(
            "options_chain",
            self.client
                .options_chain(force, symbol, expiration)
                .await
                .map_err(Into::into),
        )
    }
}
