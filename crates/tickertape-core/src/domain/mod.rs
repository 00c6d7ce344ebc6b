//! # Domain Models
//!
//! Value types the Yahoo adapter maps responses into and the interactors
//! hand to front ends.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`StockSymbol`] | Normalized ticker |
//! | [`StockQuote`] | Quote with regular, pre-market and after-hours sessions |
//! | [`StockChart`] | Close prices over a [`ChartRange`] |
//! | [`KeyStatistics`] | Quote summary statistics |
//! | [`StockNews`] | News article |
//! | [`StockRecommendations`] | Related symbols |
//! | [`StockOptions`] | Options chain for one expiration |
//! | [`StockTops`] / [`StockTrending`] | Screener and trending lists |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Constructors validate prices (finite, non-negative) and symbols; anything
//! that fails validation never leaves the adapter.

mod chart;
mod fundamentals;
mod market;
mod options;
mod quote;
mod symbol;
mod timestamp;

pub use chart::{ChartPoint, ChartRange, StockChart};
pub use fundamentals::{
    KeyEarnings, KeyFinancials, KeyInfo, KeyStatistics, StatValue, StockNews,
    StockRecommendations,
};
pub use market::{SearchResult, StockTops, StockTrending, TopsKind};
pub use options::{OptionContract, StockOptions};
pub use quote::{
    equity_type_from_quote_type, MarketState, StockDirection, StockMarketSession,
    StockOptionsQuote, StockQuote,
};
pub use symbol::StockSymbol;
pub use timestamp::UtcDateTime;
