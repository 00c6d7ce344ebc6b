use serde::{Deserialize, Serialize};

use crate::{StockSymbol, UtcDateTime};

/// A numeric statistic with the display string Yahoo formats for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatValue {
    pub raw: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fmt: Option<String>,
}

impl StatValue {
    pub fn new(raw: f64, fmt: Option<String>) -> Option<Self> {
        raw.is_finite().then_some(Self { raw, fmt })
    }

    /// Formatted text, falling back to the raw number.
    pub fn display(&self) -> String {
        self.fmt.clone().unwrap_or_else(|| format!("{:.2}", self.raw))
    }
}

/// Earnings-related metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyEarnings {
    pub eps_trailing: Option<StatValue>,
    pub eps_forward: Option<StatValue>,
    pub pe_trailing: Option<StatValue>,
    pub pe_forward: Option<StatValue>,
    pub peg_ratio: Option<StatValue>,
    pub earnings_quarterly_growth: Option<StatValue>,
}

/// Balance sheet and income metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyFinancials {
    pub market_cap: Option<StatValue>,
    pub enterprise_value: Option<StatValue>,
    pub total_revenue: Option<StatValue>,
    pub revenue_per_share: Option<StatValue>,
    pub profit_margins: Option<StatValue>,
    pub operating_margins: Option<StatValue>,
    pub return_on_assets: Option<StatValue>,
    pub return_on_equity: Option<StatValue>,
    pub total_cash: Option<StatValue>,
    pub total_debt: Option<StatValue>,
    pub current_ratio: Option<StatValue>,
    pub free_cashflow: Option<StatValue>,
}

/// Share structure and dividend metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub beta: Option<StatValue>,
    pub shares_outstanding: Option<StatValue>,
    pub float_shares: Option<StatValue>,
    pub short_ratio: Option<StatValue>,
    pub held_percent_insiders: Option<StatValue>,
    pub held_percent_institutions: Option<StatValue>,
    pub fifty_two_week_change: Option<StatValue>,
    pub dividend_yield: Option<StatValue>,
    pub payout_ratio: Option<StatValue>,
    pub ex_dividend_date: Option<StatValue>,
}

/// Key statistics for a symbol, from the quote summary modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyStatistics {
    pub symbol: StockSymbol,
    pub earnings: KeyEarnings,
    pub financials: KeyFinancials,
    pub info: KeyInfo,
}

impl KeyStatistics {
    pub fn new(symbol: StockSymbol) -> Self {
        Self {
            symbol,
            earnings: KeyEarnings::default(),
            financials: KeyFinancials::default(),
            info: KeyInfo::default(),
        }
    }
}

/// A news article mentioning a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockNews {
    pub id: String,
    pub symbol: StockSymbol,
    pub title: String,
    pub publisher: String,
    pub link: String,
    pub published_at: UtcDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Symbols Yahoo suggests alongside another symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecommendations {
    pub symbol: StockSymbol,
    pub recommendations: Vec<StockSymbol>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_value_rejects_non_finite_numbers() {
        assert!(StatValue::new(f64::INFINITY, None).is_none());
        let value = StatValue::new(1.5, None).expect("finite");
        assert_eq!(value.display(), "1.50");
        let formatted = StatValue::new(2.9e12, Some(String::from("2.9T"))).expect("finite");
        assert_eq!(formatted.display(), "2.9T");
    }
}
