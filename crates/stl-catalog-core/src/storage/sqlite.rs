use rusqlite::{Connection, Result};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

const SCHEMA_VERSION: i64 = 1;

/// SQLite-backed catalog. The connection sits behind a mutex so one
/// `Database` can be shared by every worker thread of a scan.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database {
            conn: Mutex::new(conn),
        };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database {
            conn: Mutex::new(conn),
        };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<()> {
        self.connection().execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA cache_size = -64000;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured (WAL mode, 64MB cache)");
        Ok(())
    }

    /// Apply the embedded schema and stamp `user_version`. Every statement is
    /// idempotent, so this is safe on an existing catalog.
    fn migrate_schema(&self) -> Result<()> {
        let conn = self.connection();
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        debug!(
            "SQLite schema initialized (version {} -> {})",
            version, SCHEMA_VERSION
        );
        Ok(())
    }

    /// Lock and borrow the underlying connection.
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn truncate_all(&self) -> Result<()> {
        self.connection().execute_batch(
            "DELETE FROM file_category;
             DELETE FROM folder_category;
             DELETE FROM file;
             DELETE FROM folder;
             DELETE FROM scan_job;",
        )?;
        debug!("All catalog tables truncated (categories kept)");
        Ok(())
    }
}
