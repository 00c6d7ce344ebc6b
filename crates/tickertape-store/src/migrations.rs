use ::duckdb::{params, Connection};

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_portfolio_tables",
        sql: r#"
CREATE TABLE IF NOT EXISTS holdings (
    id TEXT PRIMARY KEY,
    symbol TEXT NOT NULL,
    equity_type TEXT NOT NULL,
    side TEXT NOT NULL,
    real_equity_symbol TEXT,
    option_strike DOUBLE,
    option_expiration TEXT,
    option_type TEXT,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS positions (
    id TEXT PRIMARY KEY,
    holding_id TEXT NOT NULL,
    share_count DOUBLE NOT NULL,
    price DOUBLE NOT NULL,
    purchase_date TEXT NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS splits (
    id TEXT PRIMARY KEY,
    holding_id TEXT NOT NULL,
    pre_split_share_count DOUBLE NOT NULL,
    post_split_share_count DOUBLE NOT NULL,
    split_date TEXT NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
    Migration {
        version: "0002_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_holdings_symbol_side ON holdings(symbol, side);
CREATE INDEX IF NOT EXISTS idx_positions_holding ON positions(holding_id);
CREATE INDEX IF NOT EXISTS idx_splits_holding ON splits(holding_id);
"#,
    },
    Migration {
        version: "0003_unique_holding_side",
        sql: r#"
DROP INDEX IF EXISTS idx_holdings_symbol_side;
CREATE UNIQUE INDEX IF NOT EXISTS idx_holdings_symbol_side_unique ON holdings(symbol, side);
"#,
    },
];

/// Apply every migration that is not yet recorded in `schema_migrations`.
pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            params![migration.version],
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            tracing::debug!(version = migration.version, "applying store migration");
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                params![migration.version],
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let connection = Connection::open_in_memory().expect("in-memory connection");
        apply_migrations(&connection).expect("first run");
        apply_migrations(&connection).expect("second run");

        let applied: i64 = connection
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .expect("count");
        assert_eq!(applied, MIGRATIONS.len() as i64);
    }

    #[test]
    fn holdings_are_unique_per_symbol_and_side() {
        let connection = Connection::open_in_memory().expect("in-memory connection");
        apply_migrations(&connection).expect("migrations");

        let insert = "INSERT INTO holdings (id, symbol, equity_type, side) VALUES (?, 'AAPL', 'stock', ?)";
        connection.execute(insert, params!["a", "buy"]).expect("first");
        connection.execute(insert, params!["b", "sell"]).expect("other side");
        assert!(connection.execute(insert, params!["c", "buy"]).is_err());
    }
}
