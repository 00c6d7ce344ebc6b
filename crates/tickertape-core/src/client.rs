//! Cached access to a [`StockSource`].
//!
//! Every read takes a `force` flag. A forced read drops the cached entry and
//! refetches; otherwise a live cache entry is returned without touching the
//! source.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use time::Date;
use tracing::debug;

use crate::cache::CacheStore;
use crate::data_source::{
    ChartRequest, NewsRequest, OptionsRequest, QuoteRequest, SearchBatch, SearchRequest,
    StockSource, TopsRequest,
};
use crate::{
    ChartRange, KeyStatistics, SourceError, StockChart, StockNews, StockOptions, StockQuote,
    StockRecommendations, StockSymbol, StockTops, StockTrending, TopsKind,
};

/// Cache lifetimes per endpoint. A zero duration disables that cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockClientConfig {
    pub quote_ttl: Duration,
    pub chart_ttl: Duration,
    pub statistics_ttl: Duration,
    pub news_ttl: Duration,
    pub list_ttl: Duration,
}

impl Default for StockClientConfig {
    fn default() -> Self {
        Self {
            quote_ttl: Duration::from_secs(30),
            chart_ttl: Duration::from_secs(60),
            statistics_ttl: Duration::from_secs(300),
            news_ttl: Duration::from_secs(300),
            list_ttl: Duration::from_secs(60),
        }
    }
}

#[derive(Clone)]
pub struct StockClient {
    source: Arc<dyn StockSource>,
    quotes: CacheStore<StockQuote>,
    charts: CacheStore<StockChart>,
    statistics: CacheStore<KeyStatistics>,
    news: CacheStore<Vec<StockNews>>,
    recommendations: CacheStore<StockRecommendations>,
    options: CacheStore<StockOptions>,
    tops: CacheStore<StockTops>,
    trending: CacheStore<StockTrending>,
}

impl StockClient {
    pub fn new(source: Arc<dyn StockSource>) -> Self {
        Self::with_config(source, StockClientConfig::default())
    }

    pub fn with_config(source: Arc<dyn StockSource>, config: StockClientConfig) -> Self {
        Self {
            source,
            quotes: CacheStore::new(config.quote_ttl),
            charts: CacheStore::new(config.chart_ttl),
            statistics: CacheStore::new(config.statistics_ttl),
            news: CacheStore::new(config.news_ttl),
            recommendations: CacheStore::new(config.statistics_ttl),
            options: CacheStore::new(config.quote_ttl),
            tops: CacheStore::new(config.list_ttl),
            trending: CacheStore::new(config.list_ttl),
        }
    }

    pub fn source(&self) -> &Arc<dyn StockSource> {
        &self.source
    }

    /// Quotes for `symbols` in request order.
    ///
    /// Only symbols without a live cache entry are fetched. Symbols the
    /// source could not quote are absent from the result.
    pub async fn quotes(
        &self,
        force: bool,
        symbols: &[StockSymbol],
    ) -> Result<Vec<StockQuote>, SourceError> {
        let mut missing = Vec::new();
        for symbol in symbols {
            if force {
                self.quotes.invalidate(symbol.as_str()).await;
                missing.push(symbol.clone());
            } else if self.quotes.get(symbol.as_str()).await.is_none() {
                missing.push(symbol.clone());
            }
        }

        if !missing.is_empty() {
            debug!(count = missing.len(), "fetching quotes");
            let batch = self.source.quotes(QuoteRequest::new(missing)?).await?;
            for quote in batch.quotes {
                self.quotes
                    .put(quote.symbol.as_str().to_owned(), quote, None)
                    .await;
            }
        }

        let mut quotes = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            if let Some(quote) = self.quotes.get(symbol.as_str()).await {
                quotes.push(quote);
            }
        }
        Ok(quotes)
    }

    /// Quote for one symbol; a not-found error when the source has none.
    ///
    /// Reads the source directly when the quote cache is disabled.
    pub async fn quote(&self, force: bool, symbol: &StockSymbol) -> Result<StockQuote, SourceError> {
        let quotes = if self.quotes.is_disabled().await {
            self.source
                .quotes(QuoteRequest::single(symbol.clone()))
                .await?
                .quotes
        } else {
            self.quotes(force, std::slice::from_ref(symbol)).await?
        };
        quotes
            .into_iter()
            .find(|quote| &quote.symbol == symbol)
            .ok_or_else(|| SourceError::not_found(format!("no quote for {symbol}")))
    }

    pub async fn chart(
        &self,
        force: bool,
        symbol: &StockSymbol,
        range: ChartRange,
    ) -> Result<StockChart, SourceError> {
        let key = format!("{symbol}:{range}");
        cached(
            &self.charts,
            key,
            force,
            self.source.chart(ChartRequest::new(symbol.clone(), range)),
        )
        .await
    }

    pub async fn statistics(
        &self,
        force: bool,
        symbol: &StockSymbol,
    ) -> Result<KeyStatistics, SourceError> {
        cached(
            &self.statistics,
            symbol.to_string(),
            force,
            self.source.key_statistics(symbol.clone()),
        )
        .await
    }

    pub async fn news(
        &self,
        force: bool,
        symbol: &StockSymbol,
        limit: usize,
    ) -> Result<Vec<StockNews>, SourceError> {
        let request = NewsRequest::new(symbol.clone(), limit)?;
        cached(
            &self.news,
            format!("{symbol}:{limit}"),
            force,
            self.source.news(request),
        )
        .await
    }

    pub async fn recommendations(
        &self,
        force: bool,
        symbol: &StockSymbol,
    ) -> Result<StockRecommendations, SourceError> {
        cached(
            &self.recommendations,
            symbol.to_string(),
            force,
            self.source.recommendations(symbol.clone()),
        )
        .await
    }

    pub async fn options_chain(
        &self,
        force: bool,
        symbol: &StockSymbol,
        expiration: Option<Date>,
    ) -> Result<StockOptions, SourceError> {
        let key = match expiration {
            Some(date) => format!("{symbol}:{date}"),
            None => format!("{symbol}:nearest"),
        };
        cached(
            &self.options,
            key,
            force,
            self.source
                .options_chain(OptionsRequest::new(symbol.clone(), expiration)),
        )
        .await
    }

    /// Symbol search; never cached.
    pub async fn search(&self, query: &str, limit: usize) -> Result<SearchBatch, SourceError> {
        self.source.search(SearchRequest::new(query, limit)?).await
    }

    pub async fn tops(
        &self,
        force: bool,
        kind: TopsKind,
        count: usize,
    ) -> Result<StockTops, SourceError> {
        let request = TopsRequest::new(kind, count)?;
        cached(
            &self.tops,
            format!("{kind}:{count}"),
            force,
            self.source.tops(request),
        )
        .await
    }

    pub async fn trending(&self, force: bool, count: usize) -> Result<StockTrending, SourceError> {
        cached(
            &self.trending,
            count.to_string(),
            force,
            self.source.trending(count),
        )
        .await
    }

    /// Drop every cached entry.
    pub async fn clear(&self) {
        self.quotes.clear().await;
        self.charts.clear().await;
        self.statistics.clear().await;
        self.news.clear().await;
        self.recommendations.clear().await;
        self.options.clear().await;
        self.tops.clear().await;
        self.trending.clear().await;
    }
}

async fn cached<V, F>(cache: &CacheStore<V>, key: String, force: bool, fetch: F) -> Result<V, SourceError>
where
    V: Clone,
    F: Future<Output = Result<V, SourceError>>,
{
    if force {
        cache.invalidate(&key).await;
    } else if let Some(value) = cache.get(&key).await {
        debug!(%key, "cache hit");
        return Ok(value);
    }

    let value = fetch.await?;
    cache.put(key, value.clone(), None).await;
    Ok(value)
}
