use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_SYMBOL_LEN: usize = 32;

/// Normalized ticker symbol.
///
/// Covers plain equities (`AAPL`), share classes (`BRK.B`), indexes
/// (`^GSPC`), crypto pairs (`BTC-USD`), futures and currencies (`GC=F`,
/// `EURUSD=X`) and OCC option contract symbols.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StockSymbol(String);

impl StockSymbol {
    /// Parse and normalize a symbol to uppercase.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        let normalized = trimmed.to_ascii_uppercase();
        let len = normalized.chars().count();
        if len > MAX_SYMBOL_LEN {
            return Err(ValidationError::SymbolTooLong {
                len,
                max: MAX_SYMBOL_LEN,
            });
        }

        for (index, ch) in normalized.chars().enumerate() {
            let valid = ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '^' | '=');
            if !valid {
                return Err(ValidationError::SymbolInvalidChar { ch, index });
            }
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Index symbols start with a caret.
    pub fn is_index(&self) -> bool {
        self.0.starts_with('^')
    }
}

impl Display for StockSymbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StockSymbol {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for StockSymbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for StockSymbol {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<StockSymbol> for String {
    fn from(value: StockSymbol) -> Self {
        value.0
    }
}

impl AsRef<str> for StockSymbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_symbol() {
        let parsed = StockSymbol::parse(" aapl ").expect("symbol should parse");
        assert_eq!(parsed.as_str(), "AAPL");
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["msft", " brk.b", "^gspc", "btc-usd ", "gc=f", "Aapl250117c00150000"] {
            let once = StockSymbol::parse(raw).expect("valid symbol");
            let twice = StockSymbol::parse(once.as_str()).expect("normalized symbol reparses");
            assert_eq!(once, twice);
            assert_eq!(once.as_str(), once.as_str().to_ascii_uppercase());
        }
    }

    #[test]
    fn accepts_index_symbols() {
        let parsed = StockSymbol::parse("^dji").expect("index symbol");
        assert!(parsed.is_index());
    }

    #[test]
    fn rejects_invalid_chars() {
        let err = StockSymbol::parse("AAPL$").expect_err("must fail");
        assert!(matches!(err, ValidationError::SymbolInvalidChar { ch: '$', index: 4 }));
    }

    #[test]
    fn rejects_empty_and_oversized() {
        assert_eq!(
            StockSymbol::parse("   ").expect_err("must fail"),
            ValidationError::EmptySymbol
        );
        let long = "A".repeat(33);
        assert!(matches!(
            StockSymbol::parse(&long),
            Err(ValidationError::SymbolTooLong { len: 33, .. })
        ));
    }
}
