use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::error::ensure_price;
use crate::{EquityType, OptionType, StockSymbol, ValidationError};

/// Trading session a quote is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketState {
    Pre,
    Regular,
    Post,
    Closed,
}

impl MarketState {
    /// Map Yahoo's `marketState` field.
    pub fn from_yahoo(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "PRE" => Self::Pre,
            "REGULAR" => Self::Regular,
            "POST" => Self::Post,
            _ => Self::Closed,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pre => "pre",
            Self::Regular => "regular",
            Self::Post => "post",
            Self::Closed => "closed",
        }
    }
}

impl Display for MarketState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sign of a price move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockDirection {
    Up,
    Down,
    None,
}

impl StockDirection {
    pub fn from_amount(amount: f64) -> Self {
        if amount > 0.0 {
            Self::Up
        } else if amount < 0.0 {
            Self::Down
        } else {
            Self::None
        }
    }

    /// Flip for short positions, where a falling price is a gain.
    pub const fn inverted(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::None => Self::None,
        }
    }
}

/// Map Yahoo's `quoteType` field.
pub fn equity_type_from_quote_type(quote_type: &str) -> EquityType {
    match quote_type.trim().to_ascii_uppercase().as_str() {
        "OPTION" => EquityType::Option,
        "CRYPTOCURRENCY" => EquityType::Crypto,
        _ => EquityType::Stock,
    }
}

/// Price data for one trading session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMarketSession {
    pub price: f64,
    pub previous_close: f64,
    pub amount: f64,
    pub percent: f64,
    pub direction: StockDirection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_open: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_high: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_low: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
}

impl StockMarketSession {
    /// Derive the change figures from the session price and the reference close.
    pub fn from_prices(price: f64, previous_close: f64) -> Result<Self, ValidationError> {
        ensure_price("price", price)?;
        ensure_price("previous_close", previous_close)?;

        let amount = price - previous_close;
        let percent = if previous_close > 0.0 {
            amount / previous_close * 100.0
        } else {
            0.0
        };

        Ok(Self {
            price,
            previous_close,
            amount,
            percent,
            direction: StockDirection::from_amount(amount),
            day_open: None,
            day_high: None,
            day_low: None,
            volume: None,
        })
    }

    pub fn with_day_range(
        mut self,
        open: Option<f64>,
        high: Option<f64>,
        low: Option<f64>,
    ) -> Self {
        let sane = |value: Option<f64>| value.filter(|v| v.is_finite() && *v >= 0.0);
        self.day_open = sane(open);
        self.day_high = sane(high);
        self.day_low = sane(low);
        self
    }

    pub fn with_volume(mut self, volume: Option<u64>) -> Self {
        self.volume = volume;
        self
    }
}

/// Option contract details attached to a quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockOptionsQuote {
    pub underlying_symbol: StockSymbol,
    pub strike: f64,
    #[serde(with = "tickertape_store::models::date_format")]
    pub expiration: Date,
    pub option_type: OptionType,
}

impl StockOptionsQuote {
    pub fn new(
        underlying_symbol: StockSymbol,
        strike: f64,
        expiration: Date,
        option_type: OptionType,
    ) -> Result<Self, ValidationError> {
        ensure_price("strike", strike)?;
        Ok(Self {
            underlying_symbol,
            strike,
            expiration,
            option_type,
        })
    }
}

/// Point-in-time quote for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    pub symbol: StockSymbol,
    pub company_name: String,
    pub equity_type: EquityType,
    pub currency: String,
    pub market_state: MarketState,
    pub regular: StockMarketSession,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_market: Option<StockMarketSession>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_hours: Option<StockMarketSession>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fifty_two_week_low: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fifty_two_week_high: Option<f64>,
    pub data_delay_minutes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<StockOptionsQuote>,
}

impl StockQuote {
    pub fn new(
        symbol: StockSymbol,
        company_name: impl Into<String>,
        equity_type: EquityType,
        currency: impl Into<String>,
        regular: StockMarketSession,
    ) -> Self {
        let company_name = company_name.into();
        let company_name = if company_name.trim().is_empty() {
            symbol.to_string()
        } else {
            company_name
        };

        Self {
            symbol,
            company_name,
            equity_type,
            currency: currency.into(),
            market_state: MarketState::Regular,
            regular,
            pre_market: None,
            after_hours: None,
            fifty_two_week_low: None,
            fifty_two_week_high: None,
            data_delay_minutes: 0,
            options: None,
        }
    }

    /// The session matching the current market state.
    pub fn current_session(&self) -> &StockMarketSession {
        match self.market_state {
            MarketState::Pre => self.pre_market.as_ref().unwrap_or(&self.regular),
            MarketState::Post => self.after_hours.as_ref().unwrap_or(&self.regular),
            MarketState::Regular | MarketState::Closed => &self.regular,
        }
    }

    pub fn current_price(&self) -> f64 {
        self.current_session().price
    }
}

impl FromStr for MarketState {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pre" => Ok(Self::Pre),
            "regular" => Ok(Self::Regular),
            "post" => Ok(Self::Post),
            "closed" => Ok(Self::Closed),
            other => Err(ValidationError::InvalidEnumValue {
                field: "market state",
                value: other.to_owned(),
            }),
        }
    }
}
