use super::{logged, InteractorError};
use crate::client::StockClient;
use crate::{StockQuote, StockSymbol, StockTops, StockTrending, TopsKind};

/// S&P 500, Dow Jones, Nasdaq Composite and Russell 2000.
pub const INDEX_SYMBOLS: [&str; 4] = ["^GSPC", "^DJI", "^IXIC", "^RUT"];

/// Market overview lists.
#[derive(Clone)]
pub struct HomeInteractor {
    client: StockClient,
}

impl HomeInteractor {
    pub fn new(client: StockClient) -> Self {
        Self { client }
    }

    pub async fn tops(
        &self,
        force: bool,
        kind: TopsKind,
        count: usize,
    ) -> Result<StockTops, InteractorError> {
        logged("tops", self.client.tops(force, kind, count).await.map_err(Into::into))
    }

    pub async fn trending(&self, force: bool, count: usize) -> Result<StockTrending, InteractorError> {
        logged("trending", self.client.trending(force, count).await.map_err(Into::into))
    }

    /// Quotes of the major US indexes, in [`INDEX_SYMBOLS`] order.
    pub async fn indexes(&self, force: bool) -> Result<Vec<StockQuote>, InteractorError> {
        let result = async {
            let symbols = INDEX_SYMBOLS
                .iter()
                .map(|symbol| StockSymbol::parse(symbol))
                .collect::<Result<Vec<_>, _>>()?;
            Ok::<_, InteractorError>(self.client.quotes(force, &symbols).await?)
        }
        .await;
        logged("indexes", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeEndpoint, FakeStockSource};
    use std::sync::Arc;

    #[tokio::test]
    async fn indexes_come_back_in_order_and_cached() {
        let source = Arc::new(FakeStockSource::new());
        let home = HomeInteractor::new(StockClient::new(Arc::clone(&source) as _));

        let quotes = home.indexes(false).await.expect("indexes");
        let symbols = quotes.iter().map(|quote| quote.symbol.as_str()).collect::<Vec<_>>();
        assert_eq!(symbols, INDEX_SYMBOLS);

        home.indexes(false).await.expect("indexes");
        assert_eq!(source.calls(FakeEndpoint::Quotes), 1);
        home.indexes(true).await.expect("indexes");
        assert_eq!(source.calls(FakeEndpoint::Quotes), 2);
    }

    #[tokio::test]
    async fn zero_count_is_rejected() {
        let home = HomeInteractor::new(StockClient::new(Arc::new(FakeStockSource::new())));
        let error = home
            .tops(false, TopsKind::DayGainers, 0)
            .await
            .expect_err("invalid count");
        assert!(matches!(error, InteractorError::Source(_)));
    }
}
