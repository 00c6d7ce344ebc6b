//! Stock data source contract and request/response types.
//!
//! # Endpoints
//!
//! | Method | Request | Response |
//! |--------|---------|----------|
//! | [`quotes`](StockSource::quotes) | [`QuoteRequest`] | [`QuoteBatch`] |
//! | [`chart`](StockSource::chart) | [`ChartRequest`] | [`StockChart`] |
//! | [`search`](StockSource::search) | [`SearchRequest`] | [`SearchBatch`] |
//! | [`options_chain`](StockSource::options_chain) | [`OptionsRequest`] | [`StockOptions`] |
//! | [`key_statistics`](StockSource::key_statistics) | [`StockSymbol`] | [`KeyStatistics`] |
//! | [`news`](StockSource::news) | [`NewsRequest`] | `Vec<StockNews>` |
//! | [`recommendations`](StockSource::recommendations) | [`StockSymbol`] | [`StockRecommendations`] |
//! | [`tops`](StockSource::tops) | [`TopsRequest`] | [`StockTops`] |
//! | [`trending`](StockSource::trending) | count | [`StockTrending`] |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    ChartRange, KeyStatistics, SearchResult, StockChart, StockNews, StockOptions, StockQuote,
    StockRecommendations, StockSymbol, StockTops, StockTrending, TopsKind, ValidationError,
};

/// Boxed future returned by source methods.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    InvalidRequest,
    NotFound,
    Parse,
    Internal,
}

/// Structured source error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::NotFound,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Parse,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::Parse => "source.parse",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

impl From<ValidationError> for SourceError {
    fn from(error: ValidationError) -> Self {
        Self::invalid_request(error.to_string())
    }
}

/// Request payload for quote endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub symbols: Vec<StockSymbol>,
}

impl QuoteRequest {
    pub fn new(symbols: Vec<StockSymbol>) -> Result<Self, SourceError> {
        if symbols.is_empty() {
            return Err(SourceError::invalid_request(
                "quote request must include at least one symbol",
            ));
        }
        Ok(Self { symbols })
    }

    pub fn single(symbol: StockSymbol) -> Self {
        Self {
            symbols: vec![symbol],
        }
    }

    /// Comma-joined symbol list used for cache keys and query strings.
    pub fn joined(&self) -> String {
        self.symbols
            .iter()
            .map(StockSymbol::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Request payload for the chart endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRequest {
    pub symbol: StockSymbol,
    pub range: ChartRange,
}

impl ChartRequest {
    pub fn new(symbol: StockSymbol, range: ChartRange) -> Self {
        Self { symbol, range }
    }
}

/// Request payload for symbol search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub limit: usize,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, limit: usize) -> Result<Self, SourceError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(SourceError::invalid_request(
                "search query must not be empty",
            ));
        }
        if limit == 0 {
            return Err(SourceError::invalid_request(
                "search request limit must be greater than zero",
            ));
        }
        Ok(Self {
            query: query.trim().to_owned(),
            limit,
        })
    }
}

/// Request payload for an options chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsRequest {
    pub symbol: StockSymbol,
    /// Expiration to load; the nearest one when absent.
    pub expiration: Option<Date>,
}

impl OptionsRequest {
    pub fn new(symbol: StockSymbol, expiration: Option<Date>) -> Self {
        Self { symbol, expiration }
    }
}

/// Request payload for news.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsRequest {
    pub symbol: StockSymbol,
    pub limit: usize,
}

impl NewsRequest {
    pub fn new(symbol: StockSymbol, limit: usize) -> Result<Self, SourceError> {
        if limit == 0 {
            return Err(SourceError::invalid_request(
                "news request limit must be greater than zero",
            ));
        }
        Ok(Self { symbol, limit })
    }
}

/// Request payload for a screener list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopsRequest {
    pub kind: TopsKind,
    pub count: usize,
}

impl TopsRequest {
    pub fn new(kind: TopsKind, count: usize) -> Result<Self, SourceError> {
        if count == 0 {
            return Err(SourceError::invalid_request(
                "tops request count must be greater than zero",
            ));
        }
        Ok(Self { kind, count })
    }
}

/// Normalized quote batch. Entries that failed to parse are absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteBatch {
    pub quotes: Vec<StockQuote>,
}

impl QuoteBatch {
    pub fn find(&self, symbol: &StockSymbol) -> Option<&StockQuote> {
        self.quotes.iter().find(|quote| &quote.symbol == symbol)
    }
}

/// Normalized search batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchBatch {
    pub query: String,
    pub results: Vec<SearchResult>,
}

/// Stock data provider contract.
///
/// Implementations must be `Send + Sync`; interactors share one source
/// behind an `Arc` across tasks.
pub trait StockSource: Send + Sync {
    /// Fetches quotes for the requested symbols.
    ///
    /// Unknown or malformed symbols are left out of the batch rather than
    /// failing it.
    fn quotes<'a>(&'a self, req: QuoteRequest) -> SourceFuture<'a, QuoteBatch>;

    /// Fetches close prices for a symbol over a range.
    fn chart<'a>(&'a self, req: ChartRequest) -> SourceFuture<'a, StockChart>;

    /// Searches symbols and company names.
    fn search<'a>(&'a self, req: SearchRequest) -> SourceFuture<'a, SearchBatch>;

    /// Fetches the options chain of an underlying.
    fn options_chain<'a>(&'a self, req: OptionsRequest) -> SourceFuture<'a, StockOptions>;

    /// Fetches key statistics.
    ///
    /// # Errors
    ///
    /// Returns [`SourceErrorKind::NotFound`] when the provider has no summary
    /// for the symbol.
    fn key_statistics<'a>(&'a self, symbol: StockSymbol) -> SourceFuture<'a, KeyStatistics>;

    fn news<'a>(&'a self, req: NewsRequest) -> SourceFuture<'a, Vec<StockNews>>;

    fn recommendations<'a>(
        &'a self,
        symbol: StockSymbol,
    ) -> SourceFuture<'a, StockRecommendations>;

    fn tops<'a>(&'a self, req: TopsRequest) -> SourceFuture<'a, StockTops>;

    fn trending<'a>(&'a self, count: usize) -> SourceFuture<'a, StockTrending>;
}
