use rusqlite::{Connection, Result};
use std::path::Path;
use tracing::debug;

/// Must match the `user_version` set at the end of `schema.sql`.
const SCHEMA_VERSION: i64 = 1;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        debug!("Opened move record database at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured (WAL mode)");
        Ok(())
    }

    /// Apply `schema.sql` to databases older than `SCHEMA_VERSION`.
    fn migrate_schema(&self) -> Result<()> {
        let version = self.schema_version()?;
        if version >= SCHEMA_VERSION {
            debug!("SQLite schema up to date (version {})", version);
            return Ok(());
        }
        self.conn.execute_batch(include_str!("schema.sql"))?;
        debug!("SQLite schema migrated (version {} -> {})", version, SCHEMA_VERSION);
        Ok(())
    }

    pub fn schema_version(&self) -> Result<i64> {
        self.conn.query_row("PRAGMA user_version", [], |row| row.get(0))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_database_is_at_current_version() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_reopen_skips_migration_and_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        {
            let db = Database::open(&path).unwrap();
            db.connection()
                .execute(
                    "INSERT INTO move_record (id, created_at, source_directory, source_file_name, file_size, status) \
                     VALUES ('r1', '2024-01-01T00:00:00Z', '/in', 'a.txt', 1, 'PENDING')",
                    [],
                )
                .unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
        let count: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM move_record", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
