use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ensure_price;
use crate::{StockDirection, StockSymbol, UtcDateTime, ValidationError};

/// Time span a chart covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ChartRange {
    OneDay,
    FiveDays,
    OneMonth,
    ThreeMonths,
    SixMonths,
    YearToDate,
    OneYear,
    TwoYears,
    FiveYears,
    TenYears,
    Max,
}

impl ChartRange {
    pub const ALL: [Self; 11] = [
        Self::OneDay,
        Self::FiveDays,
        Self::OneMonth,
        Self::ThreeMonths,
        Self::SixMonths,
        Self::YearToDate,
        Self::OneYear,
        Self::TwoYears,
        Self::FiveYears,
        Self::TenYears,
        Self::Max,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::FiveDays => "5d",
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::YearToDate => "ytd",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::FiveYears => "5y",
            Self::TenYears => "10y",
            Self::Max => "max",
        }
    }

    /// Bar interval requested for this range.
    pub const fn interval(self) -> &'static str {
        match self {
            Self::OneDay => "5m",
            Self::FiveDays => "15m",
            Self::OneMonth => "1h",
            Self::ThreeMonths | Self::SixMonths | Self::YearToDate | Self::OneYear => "1d",
            Self::TwoYears | Self::FiveYears => "1wk",
            Self::TenYears => "1mo",
            Self::Max => "3mo",
        }
    }

    /// Intraday ranges compare against the previous close rather than the first bar.
    pub const fn is_intraday(self) -> bool {
        matches!(self, Self::OneDay)
    }
}

impl Default for ChartRange {
    fn default() -> Self {
        Self::OneDay
    }
}

impl Display for ChartRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartRange {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|range| range.as_str() == normalized)
            .ok_or(ValidationError::InvalidChartRange {
                value: value.to_owned(),
            })
    }
}

impl TryFrom<String> for ChartRange {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChartRange> for String {
    fn from(value: ChartRange) -> Self {
        value.as_str().to_owned()
    }
}

/// One close price on a chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub date: UtcDateTime,
    pub close: f64,
}

/// Close prices of a symbol over a range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockChart {
    pub symbol: StockSymbol,
    pub range: ChartRange,
    pub start_price: f64,
    pub current_price: f64,
    pub points: Vec<ChartPoint>,
}

impl StockChart {
    /// Build a chart, dropping points without a usable close and sorting by date.
    ///
    /// `reference_price` (the previous close for intraday charts) becomes the
    /// start price when present; otherwise the first point is used.
    pub fn new(
        symbol: StockSymbol,
        range: ChartRange,
        points: Vec<ChartPoint>,
        reference_price: Option<f64>,
        current_price: Option<f64>,
    ) -> Result<Self, ValidationError> {
        let mut points = points
            .into_iter()
            .filter(|point| point.close.is_finite() && point.close >= 0.0)
            .collect::<Vec<_>>();
        points.sort_by_key(|point| point.date);

        let first_close = points.first().map(|point| point.close);
        let last_close = points.last().map(|point| point.close);
        let start_price = reference_price.or(first_close).unwrap_or(0.0);
        let current_price = current_price.or(last_close).unwrap_or(start_price);
        ensure_price("start_price", start_price)?;
        ensure_price("current_price", current_price)?;

        Ok(Self {
            symbol,
            range,
            start_price,
            current_price,
            points,
        })
    }

    /// Amount, percent and direction of the move across the chart.
    pub fn change(&self) -> (f64, f64, StockDirection) {
        let amount = self.current_price - self.start_price;
        let percent = if self.start_price > 0.0 {
            amount / self.start_price * 100.0
        } else {
            0.0
        };
        (amount, percent, StockDirection::from_amount(amount))
    }
}
