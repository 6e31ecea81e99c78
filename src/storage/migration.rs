//! Versioned schema migrations for the relational backend.
//!
//! The schema version lives in SQLite's `user_version` pragma. Each step
//! moves the database from version `n` to `n + 1` inside one transaction, so
//! a database is always at a whole version. Optional columns that older
//! deployments lack are added here, which lets query code assume the latest
//! schema.

use rusqlite::{Connection, Transaction};

use super::backend::Result;

type Step = fn(&Transaction<'_>) -> rusqlite::Result<()>;

/// Migration steps in order; index `i` upgrades version `i` to `i + 1`
const STEPS: &[Step] = &[create_base_tables, add_tracking_columns];

/// Latest schema version this build knows about
pub const SCHEMA_VERSION: u32 = STEPS.len() as u32;

/// Current schema version of a database
pub fn schema_version(conn: &Connection) -> Result<u32> {
    let version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(version)
}

/// Bring a database up to [`SCHEMA_VERSION`].
///
/// - A fresh database runs every step.
/// - A database already at the latest version is left alone.
/// - A database from a newer build is left alone with a warning.
pub fn migrate(conn: &mut Connection) -> Result<u32> {
    let current = schema_version(conn)?;

    if current > SCHEMA_VERSION {
        log::warn!(
            "Database schema version {} is newer than supported version {}",
            current,
            SCHEMA_VERSION
        );
        return Ok(current);
    }

    for (index, step) in STEPS.iter().enumerate().skip(current as usize) {
        let target = index as u32 + 1;
        let tx = conn.transaction()?;
        step(&tx)?;
        tx.pragma_update(None, "user_version", target)?;
        tx.commit()?;
        log::info!("Migration: schema upgraded to version {}", target);
    }

    Ok(SCHEMA_VERSION)
}

fn create_base_tables(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS vocabulary (
            id INTEGER PRIMARY KEY,
            chinese TEXT,
            english TEXT,
            japanese TEXT,
            level INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS user_records (
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            vocab_id INTEGER NOT NULL,
            star INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (user_id, vocab_id)
        );

        CREATE TABLE IF NOT EXISTS review_list (
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            vocab_id INTEGER NOT NULL,
            weight REAL NOT NULL DEFAULT 10.0,
            PRIMARY KEY (user_id, vocab_id)
        );

        CREATE TABLE IF NOT EXISTS bookmarks (
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            vocab_id INTEGER NOT NULL,
            PRIMARY KEY (user_id, vocab_id)
        );

        CREATE TABLE IF NOT EXISTS daily_stats (
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            date TEXT NOT NULL,
            total INTEGER NOT NULL DEFAULT 0,
            correct INTEGER NOT NULL DEFAULT 0,
            wrong INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (user_id, date)
        );

        CREATE INDEX IF NOT EXISTS idx_vocabulary_level ON vocabulary(level);
        "#,
    )
}

fn add_tracking_columns(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    // Databases created by hand may already carry some of these
    for (table, column, definition) in [
        ("user_records", "last_reviewed", "TEXT"),
        ("review_list", "added_at", "TEXT"),
        ("bookmarks", "added_at", "TEXT"),
    ] {
        if !has_column(tx, table, column)? {
            tx.execute_batch(&format!(
                "ALTER TABLE {} ADD COLUMN {} {}",
                table, column, definition
            ))?;
        }
    }
    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_database_reaches_latest_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 0);

        assert_eq!(migrate(&mut conn).unwrap(), SCHEMA_VERSION);
        assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(has_column(&conn, "user_records", "last_reviewed").unwrap());
        assert!(has_column(&conn, "bookmarks", "added_at").unwrap());
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_upgrades_version_one_database() {
        let mut conn = Connection::open_in_memory().unwrap();
        {
            let tx = conn.transaction().unwrap();
            create_base_tables(&tx).unwrap();
            tx.pragma_update(None, "user_version", 1).unwrap();
            tx.commit().unwrap();
        }
        assert!(!has_column(&conn, "review_list", "added_at").unwrap());

        migrate(&mut conn).unwrap();
        assert!(has_column(&conn, "review_list", "added_at").unwrap());
    }

    #[test]
    fn test_tolerates_column_added_by_hand() {
        let mut conn = Connection::open_in_memory().unwrap();
        {
            let tx = conn.transaction().unwrap();
            create_base_tables(&tx).unwrap();
            tx.execute_batch("ALTER TABLE bookmarks ADD COLUMN added_at TEXT")
                .unwrap();
            tx.pragma_update(None, "user_version", 1).unwrap();
            tx.commit().unwrap();
        }

        migrate(&mut conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }
}
