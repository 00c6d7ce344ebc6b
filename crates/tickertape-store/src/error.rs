use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (creating the data directory).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The symbol and trade side combination is already tracked.
    #[error("holding for {symbol} ({side}) already exists")]
    Duplicate { symbol: String, side: String },

    /// No row matched the requested id.
    #[error("record not found: {0}")]
    NotFound(String),

    /// A stored or incoming value is not valid.
    #[error("invalid data: {0}")]
    InvalidData(String),
}
