//! Upstream market data adapters.

pub mod yahoo;

pub use yahoo::{YahooAdapter, YahooAuthManager, YahooConfig};
