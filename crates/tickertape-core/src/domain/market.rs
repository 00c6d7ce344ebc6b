use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{EquityType, StockQuote, StockSymbol, ValidationError};

/// Predefined screener lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopsKind {
    DayGainers,
    DayLosers,
    MostActives,
    UndervaluedGrowthStocks,
    GrowthTechnologyStocks,
    UndervaluedLargeCaps,
    AggressiveSmallCaps,
    SmallCapGainers,
    MostShortedStocks,
}

impl TopsKind {
    pub const ALL: [Self; 9] = [
        Self::DayGainers,
        Self::DayLosers,
        Self::MostActives,
        Self::UndervaluedGrowthStocks,
        Self::GrowthTechnologyStocks,
        Self::UndervaluedLargeCaps,
        Self::AggressiveSmallCaps,
        Self::SmallCapGainers,
        Self::MostShortedStocks,
    ];

    /// Yahoo screener id.
    pub const fn screener_id(self) -> &'static str {
        match self {
            Self::DayGainers => "day_gainers",
            Self::DayLosers => "day_losers",
            Self::MostActives => "most_actives",
            Self::UndervaluedGrowthStocks => "undervalued_growth_stocks",
            Self::GrowthTechnologyStocks => "growth_technology_stocks",
            Self::UndervaluedLargeCaps => "undervalued_large_caps",
            Self::AggressiveSmallCaps => "aggressive_small_caps",
            Self::SmallCapGainers => "small_cap_gainers",
            Self::MostShortedStocks => "most_shorted_stocks",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::DayGainers => "Day Gainers",
            Self::DayLosers => "Day Losers",
            Self::MostActives => "Most Actives",
            Self::UndervaluedGrowthStocks => "Undervalued Growth Stocks",
            Self::GrowthTechnologyStocks => "Growth Technology Stocks",
            Self::UndervaluedLargeCaps => "Undervalued Large Caps",
            Self::AggressiveSmallCaps => "Aggressive Small Caps",
            Self::SmallCapGainers => "Small Cap Gainers",
            Self::MostShortedStocks => "Most Shorted Stocks",
        }
    }
}

impl Display for TopsKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.screener_id())
    }
}

impl FromStr for TopsKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.screener_id() == normalized)
            .ok_or_else(|| ValidationError::InvalidTopsKind {
                value: value.to_owned(),
            })
    }
}

/// Quotes from one screener list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockTops {
    pub kind: TopsKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub quotes: Vec<StockQuote>,
}

/// Currently trending symbols, with quotes when they could be resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockTrending {
    pub symbols: Vec<StockSymbol>,
    pub quotes: Vec<StockQuote>,
}

/// One symbol search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub symbol: StockSymbol,
    pub name: String,
    pub equity_type: EquityType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
}
