//! # Tickertape Store
//!
//! DuckDB-backed persistence for the user's portfolio: holdings, the
//! positions bought under them, and the splits that adjust their share
//! counts.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tickertape_store::{DbHolding, EquityType, Store, StoreConfig, TradeSide};
//!
//! fn main() -> Result<(), tickertape_store::StoreError> {
//!     let store = Store::open(StoreConfig::default())?;
//!     let holding = DbHolding::new("AAPL", EquityType::Stock, TradeSide::Buy);
//!     store.insert_holding(&holding)?;
//!     println!("{} holdings", store.query_holdings()?.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `holdings` | Tracked symbol + trade side, option contract details |
//! | `positions` | Purchase lots (shares, price, date) per holding |
//! | `splits` | Split adjustments per holding |
//! | `schema_migrations` | Applied migration versions |
//!
//! Every committed mutation is published on a broadcast channel, see
//! [`Store::subscribe`].

pub mod duckdb;
mod error;
pub mod events;
pub mod migrations;
pub mod models;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{params, Connection};
use tokio::sync::broadcast;
use tracing::debug;

pub use self::duckdb::{DatabaseLocation, DuckDbConnectionManager, PooledConnection};
pub use error::StoreError;
pub use events::{Change, ChangeBus, StoreEvent};
pub use models::{
    format_date, parse_date, DbHolding, DbPosition, DbSplit, EquityType, HoldingId,
    InsertOutcome, OptionType, PositionId, SplitId, TradeSide,
};

/// Configuration for the store database.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root directory for tickertape data.
    pub tickertape_home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept in the pool.
    pub max_pool_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::with_home(resolve_tickertape_home())
    }
}

impl StoreConfig {
    /// Configuration rooted at `home`, database at `<home>/tickertape.duckdb`.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let tickertape_home = home.into();
        let db_path = tickertape_home.join("tickertape.duckdb");
        Self {
            tickertape_home,
            db_path,
            max_pool_size: 4,
        }
    }
}

/// The portfolio store.
#[derive(Clone)]
pub struct Store {
    manager: DuckDbConnectionManager,
    bus: ChangeBus,
}

impl Store {
    /// Open (creating if needed) the database described by `config`.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = DuckDbConnectionManager::open(
            DatabaseLocation::File(config.db_path),
            config.max_pool_size,
        )?;
        Self::initialize(manager)
    }

    /// Open a private in-memory store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let manager = DuckDbConnectionManager::open(DatabaseLocation::Memory, 2)?;
        Self::initialize(manager)
    }

    fn initialize(manager: DuckDbConnectionManager) -> Result<Self, StoreError> {
        {
            let connection = manager.acquire()?;
            migrations::apply_migrations(&connection)?;
        }
        Ok(Self {
            manager,
            bus: ChangeBus::default(),
        })
    }

    /// Path of the database file, `None` for in-memory stores.
    pub fn db_path(&self) -> Option<&Path> {
        self.manager.db_path()
    }

    /// Listen for committed mutations.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.bus.subscribe()
    }

    // ------------------------------------------------------------------
    // Holdings
    // ------------------------------------------------------------------

    /// Insert a new holding.
    ///
    /// Fails with [`StoreError::Duplicate`] when the symbol and trade side
    /// combination is already tracked.
    pub fn insert_holding(&self, holding: &DbHolding) -> Result<(), StoreError> {
        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), StoreError> {
            let existing: i64 = connection.query_row(
                "SELECT COUNT(*) FROM holdings WHERE symbol = ? AND side = ?",
                params![holding.symbol, holding.side.as_str()],
                |row| row.get(0),
            )?;
            if existing > 0 {
                return Err(StoreError::Duplicate {
                    symbol: holding.symbol.clone(),
                    side: holding.side.as_str().to_owned(),
                });
            }

            connection.execute(
                "INSERT INTO holdings \
                 (id, symbol, equity_type, side, real_equity_symbol, option_strike, option_expiration, option_type) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    holding.id.to_string(),
                    holding.symbol,
                    holding.equity_type.as_str(),
                    holding.side.as_str(),
                    holding.real_equity_symbol,
                    holding.option_strike,
                    holding.option_expiration.map(format_date),
                    holding.option_type.map(OptionType::as_str),
                ],
            )?;
            Ok(())
        })();

        finalize_transaction(&connection, result)
            .map_err(|error| duplicate_or(&connection, holding, error))?;
        debug!(symbol = %holding.symbol, id = %holding.id, "inserted holding");
        self.bus
            .publish(StoreEvent::Holding(Change::Insert(holding.clone())));
        Ok(())
    }

    /// All holdings ordered by symbol.
    pub fn query_holdings(&self) -> Result<Vec<DbHolding>, StoreError> {
        let connection = self.manager.acquire()?;
        select_holdings(&connection, "ORDER BY symbol, side", params![])
    }

    pub fn query_holding(&self, id: HoldingId) -> Result<Option<DbHolding>, StoreError> {
        let connection = self.manager.acquire()?;
        let mut holdings = select_holdings(&connection, "WHERE id = ?", params![id.to_string()])?;
        Ok(holdings.pop())
    }

    pub fn query_holding_by_symbol(
        &self,
        symbol: &str,
        side: TradeSide,
    ) -> Result<Option<DbHolding>, StoreError> {
        let connection = self.manager.acquire()?;
        let mut holdings = select_holdings(
            &connection,
            "WHERE symbol = ? AND side = ?",
            params![symbol, side.as_str()],
        )?;
        Ok(holdings.pop())
    }

    /// Delete a holding together with its positions and splits.
    pub fn delete_holding(&self, id: HoldingId) -> Result<DbHolding, StoreError> {
        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        // Children are read in the same snapshot as the deletes.
        let result = (|| -> Result<_, StoreError> {
            let key = id.to_string();
            let holding = select_holdings(&connection, "WHERE id = ?", params![key])?
                .pop()
                .ok_or_else(|| StoreError::NotFound(format!("holding {id}")))?;
            let positions = select_positions(&connection, "WHERE holding_id = ?", params![key])?;
            let splits = select_splits(&connection, "WHERE holding_id = ?", params![key])?;
            connection.execute("DELETE FROM positions WHERE holding_id = ?", params![key])?;
            connection.execute("DELETE FROM splits WHERE holding_id = ?", params![key])?;
            connection.execute("DELETE FROM holdings WHERE id = ?", params![key])?;
            Ok((holding, positions, splits))
        })();
        let (holding, positions, splits) = finalize_transaction(&connection, result)?;

        debug!(symbol = %holding.symbol, id = %id, "deleted holding");
        for position in positions {
            self.bus.publish(StoreEvent::Position(Change::Delete(position)));
        }
        for split in splits {
            self.bus.publish(StoreEvent::Split(Change::Delete(split)));
        }
        self.bus
            .publish(StoreEvent::Holding(Change::Delete(holding.clone())));
        Ok(holding)
    }

    // ------------------------------------------------------------------
    // Positions
    // ------------------------------------------------------------------

    /// Insert a position, or update it when a row with its id exists.
    pub fn insert_position(&self, position: &DbPosition) -> Result<InsertOutcome, StoreError> {
        position.validate()?;
        let connection = self.manager.acquire()?;

        let key = position.id.to_string();
        let purchase_date = format_date(position.purchase_date);
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<InsertOutcome, StoreError> {
            ensure_holding_exists(&connection, position.holding_id)?;
            let updated = connection.execute(
                "UPDATE positions SET share_count = ?, price = ?, purchase_date = ? WHERE id = ?",
                params![position.share_count, position.price, purchase_date, key],
            )?;
            if updated > 0 {
                return Ok(InsertOutcome::Updated);
            }

            connection.execute(
                "INSERT INTO positions (id, holding_id, share_count, price, purchase_date) \
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    key,
                    position.holding_id.to_string(),
                    position.share_count,
                    position.price,
                    purchase_date,
                ],
            )?;
            Ok(InsertOutcome::Inserted)
        })();
        let outcome = finalize_transaction(&connection, result)?;

        let change = match outcome {
            InsertOutcome::Inserted => Change::Insert(position.clone()),
            InsertOutcome::Updated => Change::Update(position.clone()),
        };
        self.bus.publish(StoreEvent::Position(change));
        Ok(outcome)
    }

    /// Positions of one holding, oldest purchase first.
    pub fn query_positions(&self, holding_id: HoldingId) -> Result<Vec<DbPosition>, StoreError> {
        let connection = self.manager.acquire()?;
        select_positions(
            &connection,
            "WHERE holding_id = ? ORDER BY purchase_date, created_at",
            params![holding_id.to_string()],
        )
    }

    pub fn query_all_positions(&self) -> Result<Vec<DbPosition>, StoreError> {
        let connection = self.manager.acquire()?;
        select_positions(&connection, "ORDER BY purchase_date, created_at", params![])
    }

    pub fn delete_position(&self, id: PositionId) -> Result<DbPosition, StoreError> {
        let connection = self.manager.acquire()?;
        let position = select_positions(&connection, "WHERE id = ?", params![id.to_string()])?
            .pop()
            .ok_or_else(|| StoreError::NotFound(format!("position {id}")))?;
        connection.execute("DELETE FROM positions WHERE id = ?", params![id.to_string()])?;

        self.bus
            .publish(StoreEvent::Position(Change::Delete(position.clone())));
        Ok(position)
    }

    // ------------------------------------------------------------------
    // Splits
    // ------------------------------------------------------------------

    /// Insert a split, or update it when a row with its id exists.
    pub fn insert_split(&self, split: &DbSplit) -> Result<InsertOutcome, StoreError> {
        split.validate()?;
        let connection = self.manager.acquire()?;

        let key = split.id.to_string();
        let split_date = format_date(split.split_date);
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<InsertOutcome, StoreError> {
            ensure_holding_exists(&connection, split.holding_id)?;
            let updated = connection.execute(
                "UPDATE splits SET pre_split_share_count = ?, post_split_share_count = ?, split_date = ? \
                 WHERE id = ?",
                params![
                    split.pre_split_share_count,
                    split.post_split_share_count,
                    split_date,
                    key
                ],
            )?;
            if updated > 0 {
                return Ok(InsertOutcome::Updated);
            }

            connection.execute(
                "INSERT INTO splits \
                 (id, holding_id, pre_split_share_count, post_split_share_count, split_date) \
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    key,
                    split.holding_id.to_string(),
                    split.pre_split_share_count,
                    split.post_split_share_count,
                    split_date,
                ],
            )?;
            Ok(InsertOutcome::Inserted)
        })();
        let outcome = finalize_transaction(&connection, result)?;

        let change = match outcome {
            InsertOutcome::Inserted => Change::Insert(split.clone()),
            InsertOutcome::Updated => Change::Update(split.clone()),
        };
        self.bus.publish(StoreEvent::Split(change));
        Ok(outcome)
    }

    /// Splits of one holding, oldest first.
    pub fn query_splits(&self, holding_id: HoldingId) -> Result<Vec<DbSplit>, StoreError> {
        let connection = self.manager.acquire()?;
        select_splits(
            &connection,
            "WHERE holding_id = ? ORDER BY split_date, created_at",
            params![holding_id.to_string()],
        )
    }

    pub fn query_all_splits(&self) -> Result<Vec<DbSplit>, StoreError> {
        let connection = self.manager.acquire()?;
        select_splits(&connection, "ORDER BY split_date, created_at", params![])
    }

    pub fn delete_split(&self, id: SplitId) -> Result<DbSplit, StoreError> {
        let connection = self.manager.acquire()?;
        let split = select_splits(&connection, "WHERE id = ?", params![id.to_string()])?
            .pop()
            .ok_or_else(|| StoreError::NotFound(format!("split {id}")))?;
        connection.execute("DELETE FROM splits WHERE id = ?", params![id.to_string()])?;

        self.bus
            .publish(StoreEvent::Split(Change::Delete(split.clone())));
        Ok(split)
    }
}

/// Finalize a transaction, committing on success or rolling back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, StoreError>,
) -> Result<T, StoreError> {
    match result {
        Ok(value) => match connection.execute_batch("COMMIT") {
            Ok(()) => Ok(value),
            Err(error) => {
                let _ = connection.execute_batch("ROLLBACK");
                Err(error.into())
            }
        },
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

/// Report a holding rejected by the unique (symbol, side) index as a
/// duplicate. This covers a concurrent insert that passed the count check on
/// another connection.
fn duplicate_or(connection: &Connection, holding: &DbHolding, error: StoreError) -> StoreError {
    let StoreError::DuckDb(source) = &error else {
        return error;
    };
    let message = source.to_string().to_ascii_lowercase();
    let rejected = message.contains("constraint") || message.contains("conflict");
    let stored = connection
        .query_row(
            "SELECT COUNT(*) FROM holdings WHERE symbol = ? AND side = ?",
            params![holding.symbol, holding.side.as_str()],
            |row| row.get::<_, i64>(0),
        )
        .is_ok_and(|count| count > 0);

    if rejected || stored {
        StoreError::Duplicate {
            symbol: holding.symbol.clone(),
            side: holding.side.as_str().to_owned(),
        }
    } else {
        error
    }
}

fn ensure_holding_exists(connection: &Connection, holding_id: HoldingId) -> Result<(), StoreError> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(*) FROM holdings WHERE id = ?",
        params![holding_id.to_string()],
        |row| row.get(0),
    )?;
    if count == 0 {
        return Err(StoreError::NotFound(format!("holding {holding_id}")));
    }
    Ok(())
}

struct HoldingRow {
    id: String,
    symbol: String,
    equity_type: String,
    side: String,
    real_equity_symbol: Option<String>,
    option_strike: Option<f64>,
    option_expiration: Option<String>,
    option_type: Option<String>,
}

impl HoldingRow {
    fn into_record(self) -> Result<DbHolding, StoreError> {
        Ok(DbHolding {
            id: HoldingId::parse(&self.id)?,
            symbol: self.symbol,
            equity_type: self.equity_type.parse()?,
            side: self.side.parse()?,
            real_equity_symbol: self.real_equity_symbol,
            option_strike: self.option_strike,
            option_expiration: self
                .option_expiration
                .as_deref()
                .map(parse_date)
                .transpose()?,
            option_type: self
                .option_type
                .as_deref()
                .map(str::parse)
                .transpose()?,
        })
    }
}

fn select_holdings(
    connection: &Connection,
    clause: &str,
    params: &[&dyn ::duckdb::ToSql],
) -> Result<Vec<DbHolding>, StoreError> {
    let sql = format!(
        "SELECT id, symbol, equity_type, side, real_equity_symbol, option_strike, option_expiration, option_type \
         FROM holdings {clause}"
    );
    let mut statement = connection.prepare(&sql)?;
    let rows = statement.query_map(params, |row| {
        Ok(HoldingRow {
            id: row.get(0)?,
            symbol: row.get(1)?,
            equity_type: row.get(2)?,
            side: row.get(3)?,
            real_equity_symbol: row.get(4)?,
            option_strike: row.get(5)?,
            option_expiration: row.get(6)?,
            option_type: row.get(7)?,
        })
    })?;

    let mut holdings = Vec::new();
    for row in rows {
        holdings.push(row?.into_record()?);
    }
    Ok(holdings)
}

fn select_positions(
    connection: &Connection,
    clause: &str,
    params: &[&dyn ::duckdb::ToSql],
) -> Result<Vec<DbPosition>, StoreError> {
    let sql = format!(
        "SELECT id, holding_id, share_count, price, purchase_date FROM positions {clause}"
    );
    let mut statement = connection.prepare(&sql)?;
    let rows = statement.query_map(params, |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, f64>(2)?,
            row.get::<_, f64>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut positions = Vec::new();
    for row in rows {
        let (id, holding_id, share_count, price, purchase_date) = row?;
        positions.push(DbPosition {
            id: PositionId::parse(&id)?,
            holding_id: HoldingId::parse(&holding_id)?,
            share_count,
            price,
            purchase_date: parse_date(&purchase_date)?,
        });
    }
    Ok(positions)
}

fn select_splits(
    connection: &Connection,
    clause: &str,
    params: &[&dyn ::duckdb::ToSql],
) -> Result<Vec<DbSplit>, StoreError> {
    let sql = format!(
        "SELECT id, holding_id, pre_split_share_count, post_split_share_count, split_date \
         FROM splits {clause}"
    );
    let mut statement = connection.prepare(&sql)?;
    let rows = statement.query_map(params, |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, f64>(2)?,
            row.get::<_, f64>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut splits = Vec::new();
    for row in rows {
        let (id, holding_id, pre_split_share_count, post_split_share_count, split_date) = row?;
        splits.push(DbSplit {
            id: SplitId::parse(&id)?,
            holding_id: HoldingId::parse(&holding_id)?,
            pre_split_share_count,
            post_split_share_count,
            split_date: parse_date(&split_date)?,
        });
    }
    Ok(splits)
}

/// Resolve the tickertape home directory from environment.
fn resolve_tickertape_home() -> PathBuf {
    if let Some(path) = env::var_os("TICKERTAPE_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".tickertape");
    }

    PathBuf::from(".tickertape")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn date(value: &str) -> time::Date {
        parse_date(value).expect("valid date")
    }

    #[test]
    fn opens_on_disk_store_under_home() {
        let temp = tempdir().expect("tempdir");
        let config = StoreConfig::with_home(temp.path().join("home"));
        let store = Store::open(config.clone()).expect("open store");

        assert_eq!(store.db_path(), Some(config.db_path.as_path()));
        assert!(config.db_path.exists());
    }

    #[test]
    fn duplicate_symbol_and_side_is_rejected() {
        let store = Store::open_in_memory().expect("store");
        store
            .insert_holding(&DbHolding::new("MSFT", EquityType::Stock, TradeSide::Buy))
            .expect("first insert");

        let err = store
            .insert_holding(&DbHolding::new("MSFT", EquityType::Stock, TradeSide::Buy))
            .expect_err("duplicate must fail");
        assert!(matches!(err, StoreError::Duplicate { .. }));

        store
            .insert_holding(&DbHolding::new("MSFT", EquityType::Stock, TradeSide::Sell))
            .expect("other side is a different holding");
        assert_eq!(store.query_holdings().expect("holdings").len(), 2);
    }

    #[test]
    fn option_holding_round_trips() {
        let store = Store::open_in_memory().expect("store");
        let holding = DbHolding::new("AAPL250117C00150000", EquityType::Stock, TradeSide::Buy)
            .with_option("AAPL", 150.0, date("2025-01-17"), OptionType::Call);
        store.insert_holding(&holding).expect("insert");

        let loaded = store
            .query_holding(holding.id)
            .expect("query")
            .expect("holding present");
        assert_eq!(loaded, holding);
        assert_eq!(loaded.equity_type, EquityType::Option);
    }

    #[test]
    fn insert_position_updates_by_id() {
        let store = Store::open_in_memory().expect("store");
        let holding = DbHolding::new("AAPL", EquityType::Stock, TradeSide::Buy);
        store.insert_holding(&holding).expect("holding");

        let mut position = DbPosition::new(holding.id, 10.0, 120.0, date("2023-05-01"));
        assert_eq!(
            store.insert_position(&position).expect("insert"),
            InsertOutcome::Inserted
        );

        position.share_count = 12.0;
        assert_eq!(
            store.insert_position(&position).expect("update"),
            InsertOutcome::Updated
        );

        let positions = store.query_positions(holding.id).expect("positions");
        assert_eq!(positions, vec![position]);
    }

    #[test]
    fn position_requires_existing_holding() {
        let store = Store::open_in_memory().expect("store");
        let orphan = DbPosition::new(HoldingId::generate(), 1.0, 1.0, date("2024-01-01"));
        let err = store.insert_position(&orphan).expect_err("must fail");
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn deleting_holding_removes_children_and_notifies() {
        let store = Store::open_in_memory().expect("store");
        let holding = DbHolding::new("TSLA", EquityType::Stock, TradeSide::Buy);
        store.insert_holding(&holding).expect("holding");
        store
            .insert_position(&DbPosition::new(holding.id, 3.0, 200.0, date("2021-01-04")))
            .expect("position");
        store
            .insert_split(&DbSplit::new(holding.id, 1.0, 3.0, date("2022-08-25")))
            .expect("split");

        let mut events = store.subscribe();
        let deleted = store.delete_holding(holding.id).expect("delete");
        assert_eq!(deleted.symbol, "TSLA");

        assert!(store.query_all_positions().expect("positions").is_empty());
        assert!(store.query_all_splits().expect("splits").is_empty());

        let mut kinds = Vec::new();
        while let Ok(event) = events.try_recv() {
            kinds.push(match event {
                StoreEvent::Holding(Change::Delete(_)) => "holding",
                StoreEvent::Position(Change::Delete(_)) => "position",
                StoreEvent::Split(Change::Delete(_)) => "split",
                _ => "other",
            });
        }
        assert_eq!(kinds, vec!["position", "split", "holding"]);
    }

    #[test]
    fn deleting_missing_rows_reports_not_found() {
        let store = Store::open_in_memory().expect("store");
        assert!(matches!(
            store.delete_position(PositionId::generate()),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_split(SplitId::generate()),
            Err(StoreError::NotFound(_))
        ));
    }
}
