//! # Tickertape Core
//!
//! Market data, portfolio valuation and view state for the tickertape
//! stock, option and crypto tracker.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Yahoo Finance adapter |
//! | [`cache`] | TTL response cache |
//! | [`circuit_breaker`] | Circuit breaker for upstream calls |
//! | [`client`] | Cached access to a [`StockSource`] |
//! | [`data_source`] | Source trait and request/response types |
//! | [`dig_controller`] | State holder for the symbol detail view |
//! | [`domain`] | Quotes, charts, statistics, news, options |
//! | [`envelope`] | Response envelope with metadata |
//! | [`error`] | Core error types |
//! | [`fake`] | Deterministic offline source |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`interactor`] | Use cases over the source and the store |
//! | [`portfolio`] | Split-adjusted valuation |
//! | [`undo`] | Restorable deletes |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tickertape_core::{DigInteractor, StockClient, StockSymbol, YahooAdapter, YahooConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = YahooAdapter::connect(YahooConfig::from_env())?;
//!     let dig = DigInteractor::new(StockClient::new(Arc::new(adapter)));
//!
//!     let quote = dig.quote(false, &StockSymbol::parse("aapl")?).await?;
//!     println!("{} {:.2}", quote.symbol, quote.current_price());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / User     │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  Interactors    │────▶│ tickertape-store │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  StockClient    │────▶│ CacheStore       │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  YahooAdapter   │────▶│ Circuit Breaker  │
//! │  (StockSource)  │     │ HTTP Client      │
//! └─────────────────┘     └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use tickertape_core::{SourceError, SourceErrorKind};
//!
//! fn describe(error: &SourceError) -> &'static str {
//!     match error.kind() {
//!         SourceErrorKind::RateLimited => "slow down",
//!         SourceErrorKind::NotFound => "unknown symbol",
//!         _ => "upstream problem",
//!     }
//! }
//! ```

pub mod adapters;
pub mod cache;
pub mod circuit_breaker;
pub mod client;
pub mod data_source;
pub mod dig_controller;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod fake;
pub mod http_client;
pub mod interactor;
pub mod portfolio;
pub mod undo;

pub use adapters::{YahooAdapter, YahooConfig};

pub use cache::CacheStore;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

pub use client::{StockClient, StockClientConfig};

pub use data_source::{
    ChartRequest, NewsRequest, OptionsRequest, QuoteBatch, QuoteRequest, SearchBatch,
    SearchRequest, SourceError, SourceErrorKind, SourceFuture, StockSource, TopsRequest,
};

pub use dig_controller::{DigController, DigState};

pub use domain::{
    equity_type_from_quote_type, ChartPoint, ChartRange, KeyEarnings, KeyFinancials, KeyInfo,
    KeyStatistics, MarketState, OptionContract, SearchResult, StatValue, StockChart,
    StockDirection, StockMarketSession, StockNews, StockOptions, StockOptionsQuote, StockQuote,
    StockRecommendations, StockSymbol, StockTops, StockTrending, TopsKind, UtcDateTime,
};

pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta, SCHEMA_VERSION};

pub use error::ValidationError;

pub use fake::{FakeEndpoint, FakeStockSource};

pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
};

pub use interactor::{
    ChangeStream, DigInteractor, HomeInteractor, InteractorError, NewTicker, NewTickerInteractor,
    Portfolio, PortfolioDigInteractor, PortfolioInteractor,
};

pub use portfolio::{Gain, PortfolioStock, PortfolioSummary, OPTION_CONTRACT_MULTIPLIER};

pub use undo::{RecentlyDeleted, UndoError};

// Shared with the store so holdings and quotes agree on these.
pub use tickertape_store::{EquityType, OptionType, TradeSide};
