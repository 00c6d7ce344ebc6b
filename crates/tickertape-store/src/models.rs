//! Portfolio records persisted by the store.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{Date, Month};
use uuid::Uuid;

use crate::StoreError;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn parse(input: &str) -> Result<Self, StoreError> {
                Uuid::parse_str(input.trim())
                    .map(Self)
                    .map_err(|_| StoreError::InvalidData(format!(
                        "'{input}' is not a valid {}",
                        stringify!($name)
                    )))
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0.hyphenated())
            }
        }
    };
}

record_id!(
    /// Generated identifier of a holding row.
    HoldingId
);
record_id!(
    /// Generated identifier of a position row.
    PositionId
);
record_id!(
    /// Generated identifier of a split row.
    SplitId
);

/// Kind of instrument a holding tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquityType {
    Stock,
    Option,
    Crypto,
}

impl EquityType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stock => "stock",
            Self::Option => "option",
            Self::Crypto => "crypto",
        }
    }
}

impl FromStr for EquityType {
    type Err = StoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stock" => Ok(Self::Stock),
            "option" => Ok(Self::Option),
            "crypto" => Ok(Self::Crypto),
            other => Err(StoreError::InvalidData(format!(
                "unknown equity type '{other}'"
            ))),
        }
    }
}

/// Which side of the trade the user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl FromStr for TradeSide {
    type Err = StoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            other => Err(StoreError::InvalidData(format!("unknown trade side '{other}'"))),
        }
    }
}

/// Call or put, for option holdings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }
}

impl FromStr for OptionType {
    type Err = StoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "call" => Ok(Self::Call),
            "put" => Ok(Self::Put),
            other => Err(StoreError::InvalidData(format!("unknown option type '{other}'"))),
        }
    }
}

/// A tracked symbol and trade side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbHolding {
    pub id: HoldingId,
    pub symbol: String,
    pub equity_type: EquityType,
    pub side: TradeSide,
    /// Underlying symbol for option contracts.
    pub real_equity_symbol: Option<String>,
    pub option_strike: Option<f64>,
    #[serde(with = "date_format::option")]
    pub option_expiration: Option<Date>,
    pub option_type: Option<OptionType>,
}

impl DbHolding {
    /// A plain stock or crypto holding with a fresh id.
    pub fn new(symbol: impl Into<String>, equity_type: EquityType, side: TradeSide) -> Self {
        Self {
            id: HoldingId::generate(),
            symbol: symbol.into(),
            equity_type,
            side,
            real_equity_symbol: None,
            option_strike: None,
            option_expiration: None,
            option_type: None,
        }
    }

    pub fn with_option(
        mut self,
        underlying: impl Into<String>,
        strike: f64,
        expiration: Date,
        option_type: OptionType,
    ) -> Self {
        self.equity_type = EquityType::Option;
        self.real_equity_symbol = Some(underlying.into());
        self.option_strike = Some(strike);
        self.option_expiration = Some(expiration);
        self.option_type = Some(option_type);
        self
    }
}

/// One purchase lot under a holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbPosition {
    pub id: PositionId,
    pub holding_id: HoldingId,
    pub share_count: f64,
    pub price: f64,
    #[serde(with = "date_format")]
    pub purchase_date: Date,
}

impl DbPosition {
    pub fn new(holding_id: HoldingId, share_count: f64, price: f64, purchase_date: Date) -> Self {
        Self {
            id: PositionId::generate(),
            holding_id,
            share_count,
            price,
            purchase_date,
        }
    }

    /// Reject lots that cannot be valued.
    pub fn validate(&self) -> Result<(), StoreError> {
        if !self.share_count.is_finite() || self.share_count <= 0.0 {
            return Err(StoreError::InvalidData(String::from(
                "position share count must be greater than zero",
            )));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(StoreError::InvalidData(String::from(
                "position price must be non-negative",
            )));
        }
        Ok(())
    }
}

/// A stock split affecting share-count math for a holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbSplit {
    pub id: SplitId,
    pub holding_id: HoldingId,
    pub pre_split_share_count: f64,
    pub post_split_share_count: f64,
    #[serde(with = "date_format")]
    pub split_date: Date,
}

impl DbSplit {
    pub fn new(
        holding_id: HoldingId,
        pre_split_share_count: f64,
        post_split_share_count: f64,
        split_date: Date,
    ) -> Self {
        Self {
            id: SplitId::generate(),
            holding_id,
            pre_split_share_count,
            post_split_share_count,
            split_date,
        }
    }

    /// Multiplier applied to share counts bought before the split.
    pub fn ratio(&self) -> f64 {
        self.post_split_share_count / self.pre_split_share_count
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        let valid = |value: f64| value.is_finite() && value > 0.0;
        if !valid(self.pre_split_share_count) || !valid(self.post_split_share_count) {
            return Err(StoreError::InvalidData(String::from(
                "split share counts must be greater than zero",
            )));
        }
        Ok(())
    }
}

/// Result of an insert-or-update call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertOutcome {
    Inserted,
    Updated,
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Result<Date, StoreError> {
    let invalid = || StoreError::InvalidData(format!("date must be YYYY-MM-DD: '{input}'"));

    let mut parts = input.trim().splitn(3, '-');
    let year = parts
        .next()
        .and_then(|part| part.parse::<i32>().ok())
        .ok_or_else(invalid)?;
    let month = parts
        .next()
        .and_then(|part| part.parse::<u8>().ok())
        .and_then(|month| Month::try_from(month).ok())
        .ok_or_else(invalid)?;
    let day = parts
        .next()
        .and_then(|part| part.parse::<u8>().ok())
        .ok_or_else(invalid)?;

    Date::from_calendar_date(year, month, day).map_err(|_| invalid())
}

/// Serde adapter storing dates as `YYYY-MM-DD` strings.
pub mod date_format {
    use super::*;

    pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_date(*date))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        parse_date(&value).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S>(date: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match date {
                Some(date) => serializer.serialize_some(&format_date(*date)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|value| parse_date(&value).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
