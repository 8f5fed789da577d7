use std::path::Path;

use rusqlite::{params, Connection};
use tracing::{debug, info};

use super::{SpanStore, SpanTable, StoredDependency, StoredHintSet};
use crate::error::{Result, SpanError};
use crate::search::QuerySpan;

/// Span storage in a SQLite database.
///
/// Inserts are idempotent, so searching a query again only adds what is new.
/// A span is written in a single transaction: either all of its rows land or
/// none do.
pub struct SqliteSpanStore {
    conn: Connection,
}

impl SqliteSpanStore {
    /// Opens (creating if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::with_connection(conn)
    }

    /// In-memory database, mostly for tests.
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS queries (
                id INTEGER PRIMARY KEY,
                query_path TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS query_effective_optimizers (
                id INTEGER PRIMARY KEY,
                query_path TEXT NOT NULL REFERENCES queries (query_path),
                disabled_rules TEXT NOT NULL,
                required INTEGER NOT NULL DEFAULT 0,
                UNIQUE (query_path, disabled_rules)
            );
            CREATE TABLE IF NOT EXISTS query_effective_optimizers_dependencies (
                id INTEGER PRIMARY KEY,
                query_path TEXT NOT NULL REFERENCES queries (query_path),
                disabled_rules TEXT NOT NULL,
                required_disabled_rules TEXT NOT NULL,
                UNIQUE (query_path, disabled_rules, required_disabled_rules)
            );",
        )?;
        Ok(Self { conn })
    }

    fn expect_table(table: SpanTable, expected: SpanTable) -> Result<()> {
        if table == expected {
            Ok(())
        } else {
            Err(SpanError::InvalidArgument(format!(
                "table {} cannot hold {} rows",
                table.as_str(),
                expected.as_str()
            )))
        }
    }
}

impl SpanStore for SqliteSpanStore {
    fn register_query(&mut self, query_id: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO queries (query_path) VALUES (?1)",
            params![query_id],
        )?;
        Ok(())
    }

    fn register_optimizer(
        &mut self,
        query_id: &str,
        key: &str,
        required: bool,
        table: SpanTable,
    ) -> Result<()> {
        Self::expect_table(table, SpanTable::EffectiveOptimizers)?;
        insert_optimizer(&self.conn, query_id, key, required)
    }

    fn register_optimizer_dependency(
        &mut self,
        query_id: &str,
        child_key: &str,
        parent_key: &str,
        table: SpanTable,
    ) -> Result<()> {
        Self::expect_table(table, SpanTable::OptimizerDependencies)?;
        insert_dependency(&self.conn, query_id, child_key, parent_key)
    }

    fn write_span(&mut self, query_id: &str, span: &QuerySpan) -> Result<()> {
        let tx = self.conn.transaction()?;
        for entry in span.entries() {
            let key = entry.key();
            info!(hint_set = %key, required = entry.required, "found new hint-set");
            insert_optimizer(&tx, query_id, &key, entry.required)?;
            if let Some(parent) = entry.parent() {
                insert_dependency(&tx, query_id, &key, &parent.key())?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn hint_sets(&self, query_id: &str) -> Result<Vec<StoredHintSet>> {
        let mut stmt = self.conn.prepare(
            "SELECT disabled_rules, required FROM query_effective_optimizers
             WHERE query_path = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([query_id], |row| {
            Ok(StoredHintSet {
                key: row.get(0)?,
                required: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn dependencies(&self, query_id: &str) -> Result<Vec<StoredDependency>> {
        let mut stmt = self.conn.prepare(
            "SELECT disabled_rules, required_disabled_rules
             FROM query_effective_optimizers_dependencies
             WHERE query_path = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([query_id], |row| {
            Ok(StoredDependency {
                child: row.get(0)?,
                parent: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn insert_optimizer(conn: &Connection, query_id: &str, key: &str, required: bool) -> Result<()> {
    let inserted = conn.execute(
        &format!(
            "INSERT OR IGNORE INTO {} (query_path, disabled_rules, required) VALUES (?1, ?2, ?3)",
            SpanTable::EffectiveOptimizers.as_str()
        ),
        params![query_id, key, required],
    )?;
    debug!(query = query_id, key, inserted, "stored hint-set");
    Ok(())
}

fn insert_dependency(
    conn: &Connection,
    query_id: &str,
    child_key: &str,
    parent_key: &str,
) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT OR IGNORE INTO {} (query_path, disabled_rules, required_disabled_rules) VALUES (?1, ?2, ?3)",
            SpanTable::OptimizerDependencies.as_str()
        ),
        params![query_id, child_key, parent_key],
    )?;
    Ok(())
}
