//! Portfolio valuation.
//!
//! A split multiplies the share count of every position purchased on or
//! before its split date by `post / pre`; cost basis is unchanged. Option
//! holdings are valued per contract of 100 shares. A sell-side holding
//! gains when the price falls, so its amounts are negated.

use serde::Serialize;

use crate::{EquityType, StockDirection, StockQuote, TradeSide};
use tickertape_store::{DbHolding, DbPosition, DbSplit};

/// Shares represented by one option contract.
pub const OPTION_CONTRACT_MULTIPLIER: f64 = 100.0;

/// A signed change with its percentage and direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Gain {
    pub amount: f64,
    pub percent: f64,
    pub direction: StockDirection,
}

impl Gain {
    fn new(amount: f64, basis: f64) -> Self {
        let percent = if basis > 0.0 {
            amount / basis * 100.0
        } else {
            0.0
        };
        Self {
            amount,
            percent,
            direction: StockDirection::from_amount(amount),
        }
    }
}

/// One holding valued against its latest quote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioStock {
    pub holding: DbHolding,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<StockQuote>,
    pub positions: Vec<DbPosition>,
    pub splits: Vec<DbSplit>,
    /// Split-adjusted share (or contract) count.
    pub share_count: f64,
    pub cost_basis: f64,
    pub average_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_gain: Option<Gain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub today_gain: Option<Gain>,
}

impl PortfolioStock {
    pub fn new(
        holding: DbHolding,
        positions: Vec<DbPosition>,
        splits: Vec<DbSplit>,
        quote: Option<StockQuote>,
    ) -> Self {
        let multiplier = multiplier(holding.equity_type);
        let share_count = positions
            .iter()
            .map(|position| adjusted_share_count(position, &splits))
            .sum::<f64>();
        let cost_basis = positions
            .iter()
            .map(|position| position.share_count * position.price * multiplier)
            .sum::<f64>();
        let average_price = if share_count > 0.0 {
            cost_basis / (share_count * multiplier)
        } else {
            0.0
        };
        let sign = match holding.side {
            TradeSide::Buy => 1.0,
            TradeSide::Sell => -1.0,
        };

        let current_value = quote
            .as_ref()
            .map(|quote| quote.current_price() * share_count * multiplier);
        let total_gain = current_value
            .filter(|_| !positions.is_empty())
            .map(|value| Gain::new(sign * (value - cost_basis), cost_basis));
        let today_gain = quote.as_ref().filter(|_| !positions.is_empty()).map(|quote| {
            let session = quote.current_session();
            let amount = sign * session.amount * share_count * multiplier;
            Gain {
                amount,
                percent: sign * session.percent,
                direction: StockDirection::from_amount(amount),
            }
        });

        Self {
            holding,
            quote,
            positions,
            splits,
            share_count,
            cost_basis,
            average_price,
            current_value,
            total_gain,
            today_gain,
        }
    }

    pub fn is_priced(&self) -> bool {
        self.current_value.is_some()
    }
}

/// Totals across every holding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub holding_count: usize,
    /// Holdings without a quote; excluded from value and gain totals.
    pub unpriced_count: usize,
    pub total_cost: f64,
    pub total_value: f64,
    pub total_gain: Gain,
    pub today_gain: Gain,
}

impl PortfolioSummary {
    pub fn from_stocks(stocks: &[PortfolioStock]) -> Self {
        let priced = stocks.iter().filter(|stock| stock.is_priced());
        let priced_cost = priced.clone().map(|stock| stock.cost_basis).sum::<f64>();
        let total_value = priced
            .clone()
            .filter_map(|stock| stock.current_value)
            .sum::<f64>();
        let gain_amount = priced
            .clone()
            .filter_map(|stock| stock.total_gain.map(|gain| gain.amount))
            .sum::<f64>();
        let today_amount = priced
            .filter_map(|stock| stock.today_gain.map(|gain| gain.amount))
            .sum::<f64>();
        let yesterday_value = total_value - today_amount;

        Self {
            holding_count: stocks.len(),
            unpriced_count: stocks.iter().filter(|stock| !stock.is_priced()).count(),
            total_cost: stocks.iter().map(|stock| stock.cost_basis).sum(),
            total_value,
            total_gain: Gain::new(gain_amount, priced_cost),
            today_gain: Gain::new(today_amount, yesterday_value),
        }
    }
}

fn multiplier(equity_type: EquityType) -> f64 {
    match equity_type {
        EquityType::Option => OPTION_CONTRACT_MULTIPLIER,
        EquityType::Stock | EquityType::Crypto => 1.0,
    }
}

fn adjusted_share_count(position: &DbPosition, splits: &[DbSplit]) -> f64 {
    splits
        .iter()
        .filter(|split| split.holding_id == position.holding_id)
        .filter(|split| position.purchase_date <= split.split_date)
        .fold(position.share_count, |shares, split| shares * split.ratio())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StockMarketSession, StockSymbol};
    use time::macros::date;

    fn quote(symbol: &str, price: f64, previous_close: f64, equity_type: EquityType) -> StockQuote {
        StockQuote::new(
            StockSymbol::parse(symbol).expect("symbol"),
            symbol,
            equity_type,
            "USD",
            StockMarketSession::from_prices(price, previous_close).expect("session"),
        )
    }

    #[test]
    fn splits_adjust_only_earlier_positions() {
        let holding = DbHolding::new("NVDA", EquityType::Stock, TradeSide::Buy);
        let early = DbPosition::new(holding.id, 10.0, 500.0, date!(2024 - 05 - 01));
        let on_split_day = DbPosition::new(holding.id, 2.0, 1_000.0, date!(2024 - 06 - 10));
        let late = DbPosition::new(holding.id, 5.0, 120.0, date!(2024 - 07 - 01));
        let split = DbSplit::new(holding.id, 1.0, 10.0, date!(2024 - 06 - 10));

        let stock = PortfolioStock::new(
            holding,
            vec![early, on_split_day, late],
            vec![split],
            Some(quote("NVDA", 130.0, 125.0, EquityType::Stock)),
        );

        assert_eq!(stock.share_count, 100.0 + 20.0 + 5.0);
        assert_eq!(stock.cost_basis, 5_000.0 + 2_000.0 + 600.0);
        assert_eq!(stock.current_value, Some(125.0 * 130.0));
        let gain = stock.total_gain.expect("priced");
        assert_eq!(gain.amount, 16_250.0 - 7_600.0);
        assert_eq!(gain.direction, StockDirection::Up);
    }

    #[test]
    fn options_use_contract_multiplier() {
        let holding = DbHolding::new("AAPL250117C00150000", EquityType::Option, TradeSide::Buy);
        let position = DbPosition::new(holding.id, 2.0, 3.5, date!(2024 - 12 - 01));

        let stock = PortfolioStock::new(
            holding,
            vec![position],
            Vec::new(),
            Some(quote("AAPL250117C00150000", 5.0, 4.0, EquityType::Option)),
        );

        assert_eq!(stock.cost_basis, 700.0);
        assert_eq!(stock.current_value, Some(1_000.0));
        assert_eq!(stock.average_price, 3.5);
        assert_eq!(stock.today_gain.map(|gain| gain.amount), Some(200.0));
    }

    #[test]
    fn sell_side_gains_when_price_falls() {
        let holding = DbHolding::new("TSLA", EquityType::Stock, TradeSide::Sell);
        let position = DbPosition::new(holding.id, 10.0, 200.0, date!(2024 - 01 - 02));

        let stock = PortfolioStock::new(
            holding,
            vec![position],
            Vec::new(),
            Some(quote("TSLA", 180.0, 190.0, EquityType::Stock)),
        );

        let total = stock.total_gain.expect("priced");
        assert_eq!(total.amount, 200.0);
        assert_eq!(total.direction, StockDirection::Up);
        let today = stock.today_gain.expect("priced");
        assert_eq!(today.amount, 100.0);
        assert!(today.percent > 0.0);
    }

    #[test]
    fn summary_excludes_unpriced_holdings_from_gain() {
        let priced_holding = DbHolding::new("MSFT", EquityType::Stock, TradeSide::Buy);
        let unpriced_holding = DbHolding::new("ZZZZ", EquityType::Stock, TradeSide::Buy);
        let stocks = vec![
            PortfolioStock::new(
                priced_holding.clone(),
                vec![DbPosition::new(priced_holding.id, 1.0, 100.0, date!(2024 - 01 - 02))],
                Vec::new(),
                Some(quote("MSFT", 110.0, 100.0, EquityType::Stock)),
            ),
            PortfolioStock::new(
                unpriced_holding.clone(),
                vec![DbPosition::new(unpriced_holding.id, 3.0, 10.0, date!(2024 - 01 - 02))],
                Vec::new(),
                None,
            ),
        ];

        let summary = PortfolioSummary::from_stocks(&stocks);
        assert_eq!(summary.holding_count, 2);
        assert_eq!(summary.unpriced_count, 1);
        assert_eq!(summary.total_cost, 130.0);
        assert_eq!(summary.total_value, 110.0);
        assert_eq!(summary.total_gain.amount, 10.0);
        assert!((summary.total_gain.percent - 10.0).abs() < 1e-9);
        assert!((summary.today_gain.percent - 10.0).abs() < 1e-9);
    }
}
