use serde::{Deserialize, Serialize};
use time::Date;

use crate::{OptionType, StockSymbol};

/// One contract in an options chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    pub contract_symbol: StockSymbol,
    pub option_type: OptionType,
    pub strike: f64,
    pub last_price: f64,
    pub change: f64,
    pub percent_change: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_interest: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implied_volatility: Option<f64>,
    pub in_the_money: bool,
    #[serde(with = "tickertape_store::models::date_format")]
    pub expiration: Date,
}

/// Options chain of an underlying for one expiration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockOptions {
    pub symbol: StockSymbol,
    #[serde(serialize_with = "serialize_dates", deserialize_with = "deserialize_dates")]
    pub expiration_dates: Vec<Date>,
    #[serde(with = "tickertape_store::models::date_format::option")]
    pub selected_expiration: Option<Date>,
    pub strikes: Vec<f64>,
    pub calls: Vec<OptionContract>,
    pub puts: Vec<OptionContract>,
}

impl StockOptions {
    /// Contracts of the given type, ordered by strike.
    pub fn contracts(&self, option_type: OptionType) -> &[OptionContract] {
        match option_type {
            OptionType::Call => &self.calls,
            OptionType::Put => &self.puts,
        }
    }

    pub fn find_contract(&self, contract_symbol: &StockSymbol) -> Option<&OptionContract> {
        self.calls
            .iter()
            .chain(self.puts.iter())
            .find(|contract| &contract.contract_symbol == contract_symbol)
    }
}

fn serialize_dates<S>(dates: &[Date], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeSeq;

    let mut seq = serializer.serialize_seq(Some(dates.len()))?;
    for date in dates {
        seq.serialize_element(&tickertape_store::format_date(*date))?;
    }
    seq.end()
}

fn deserialize_dates<'de, D>(deserializer: D) -> Result<Vec<Date>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Vec::<String>::deserialize(deserializer)?
        .iter()
        .map(|value| tickertape_store::parse_date(value).map_err(serde::de::Error::custom))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(symbol: &str, option_type: OptionType, strike: f64) -> OptionContract {
        OptionContract {
            contract_symbol: StockSymbol::parse(symbol).expect("symbol"),
            option_type,
            strike,
            last_price: 1.0,
            change: 0.0,
            percent_change: 0.0,
            bid: None,
            ask: None,
            volume: None,
            open_interest: None,
            implied_volatility: None,
            in_the_money: false,
            expiration: tickertape_store::parse_date("2025-01-17").expect("date"),
        }
    }

    #[test]
    fn finds_contract_in_either_side() {
        let chain = StockOptions {
            symbol: StockSymbol::parse("AAPL").expect("symbol"),
            expiration_dates: vec![tickertape_store::parse_date("2025-01-17").expect("date")],
            selected_expiration: None,
            strikes: vec![150.0],
            calls: vec![contract("AAPL250117C00150000", OptionType::Call, 150.0)],
            puts: vec![contract("AAPL250117P00150000", OptionType::Put, 150.0)],
        };

        let put = StockSymbol::parse("aapl250117p00150000").expect("symbol");
        assert_eq!(
            chain.find_contract(&put).map(|c| c.option_type),
            Some(OptionType::Put)
        );
        assert_eq!(chain.contracts(OptionType::Call).len(), 1);

        let json = serde_json::to_value(&chain).expect("serialize");
        assert_eq!(json["expiration_dates"][0], "2025-01-17");
    }
}
