//! Relational backend on SQLite.
//!
//! Tables: `vocabulary`, `users`, `user_records`, `review_list`,
//! `bookmarks` and `daily_stats` (see [`super::migration`]). Every per-user
//! call resolves the user name to a numeric id first. Writes for a user that
//! does not exist yet create the user, since accounts may be created outside
//! this process.

use std::path::PathBuf;

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use super::backend::{check_star, check_user, check_weight, PersistenceBackend, Result, StorageError};
use super::migration;
use super::models::{format_date, Bookmark, DailyStat, MasteryRecord, ReviewEntry};
use crate::catalog::{CatalogRow, VocabularyEntry};

/// Where the SQLite database lives
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseLocation {
    File(PathBuf),
    InMemory,
}

pub struct RelationalBackend {
    location: DatabaseLocation,
    conn: Option<Connection>,
}

impl RelationalBackend {
    pub fn new(location: DatabaseLocation) -> Self {
        Self {
            location,
            conn: None,
        }
    }

    /// Backend for a database file
    pub fn open_file(path: PathBuf) -> Self {
        Self::new(DatabaseLocation::File(path))
    }

    /// Backend for a private in-memory database (for testing)
    pub fn in_memory() -> Self {
        Self::new(DatabaseLocation::InMemory)
    }

    pub fn location(&self) -> &DatabaseLocation {
        &self.location
    }

    fn open_connection(&self) -> Result<Connection> {
        let mut conn = match &self.location {
            DatabaseLocation::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                Connection::open(path)?
            }
            DatabaseLocation::InMemory => Connection::open_in_memory()?,
        };
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migration::migrate(&mut conn)?;
        Ok(conn)
    }

    /// Run a query against the live connection, degrading to an empty result
    fn read<T>(
        &self,
        what: &str,
        query: impl FnOnce(&Connection) -> rusqlite::Result<Vec<T>>,
    ) -> Vec<T> {
        let Some(conn) = &self.conn else {
            return Vec::new();
        };
        match query(conn) {
            Ok(rows) => rows,
            Err(e) => {
                log::warn!("Failed to read {}: {}", what, e);
                Vec::new()
            }
        }
    }

    fn write<R>(
        &mut self,
        what: &str,
        change: impl FnOnce(&mut Connection) -> rusqlite::Result<R>,
    ) -> Result<R> {
        let conn = self.conn.as_mut().ok_or(StorageError::NotConnected)?;
        change(conn).map_err(|e| StorageError::WriteFailed(format!("{}: {}", what, e)))
    }
}

// ==================== User Resolution ====================

fn find_user_id(conn: &Connection, name: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM users WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )
    .optional()
}

/// Resolve a user id, creating the user on a miss
fn ensure_user_id(conn: &Connection, name: &str) -> rusqlite::Result<i64> {
    if let Some(id) = find_user_id(conn, name)? {
        return Ok(id);
    }
    conn.execute("INSERT INTO users (name) VALUES (?1)", params![name])?;
    log::info!("Provisioned user '{}'", name);
    Ok(conn.last_insert_rowid())
}

fn parse_date(value: String, column: usize) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

impl PersistenceBackend for RelationalBackend {
    fn connect(&mut self) -> Result<()> {
        let conn = self
            .open_connection()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        log::info!("Connected to relational store {:?}", self.location);
        self.conn = Some(conn);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| StorageError::Sqlite(e))?;
            log::info!("Closed relational store {:?}", self.location);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn get_vocabulary(&self, level: Option<u8>) -> Vec<VocabularyEntry> {
        self.read("vocabulary", |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, level, chinese, english, japanese FROM vocabulary
                 WHERE ?1 IS NULL OR level = ?1
                 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![level], |row| {
                let id: u32 = row.get(0)?;
                let entry = CatalogRow {
                    id: Some(id),
                    level: row.get(1)?,
                    chinese: row.get(2)?,
                    english: row.get(3)?,
                    japanese: row.get(4)?,
                }
                .into_entry(id);
                Ok(entry)
            })?;
            rows.collect()
        })
    }

    fn get_user_records(&self, user: &str) -> Vec<MasteryRecord> {
        self.read("user records", |conn| {
            let mut stmt = conn.prepare(
                "SELECT r.vocab_id, r.star FROM user_records r
                 JOIN users u ON r.user_id = u.id
                 WHERE u.name = ?1
                 ORDER BY r.vocab_id",
            )?;
            let rows = stmt.query_map(params![user], |row| {
                Ok(MasteryRecord::new(row.get(0)?, row.get(1)?))
            })?;
            rows.collect()
        })
    }

    fn get_review_list(&self, user: &str) -> Vec<ReviewEntry> {
        self.read("review list", |conn| {
            let mut stmt = conn.prepare(
                "SELECT r.vocab_id, r.weight FROM review_list r
                 JOIN users u ON r.user_id = u.id
                 WHERE u.name = ?1
                 ORDER BY r.vocab_id",
            )?;
            let rows = stmt.query_map(params![user], |row| {
                Ok(ReviewEntry::new(row.get(0)?, row.get(1)?))
            })?;
            rows.collect()
        })
    }

    fn get_bookmarks(&self, user: &str) -> Vec<Bookmark> {
        self.read("bookmarks", |conn| {
            let mut stmt = conn.prepare(
                "SELECT b.vocab_id FROM bookmarks b
                 JOIN users u ON b.user_id = u.id
                 WHERE u.name = ?1
                 ORDER BY b.vocab_id",
            )?;
            let rows = stmt.query_map(params![user], |row| {
                Ok(Bookmark { vocab_id: row.get(0)? })
            })?;
            rows.collect()
        })
    }

    fn get_daily_stats(&self, user: &str) -> Vec<DailyStat> {
        self.read("daily stats", |conn| {
            let mut stmt = conn.prepare(
                "SELECT d.date, d.total, d.correct, d.wrong FROM daily_stats d
                 JOIN users u ON d.user_id = u.id
                 WHERE u.name = ?1
                 ORDER BY d.date",
            )?;
            let rows = stmt.query_map(params![user], |row| {
                Ok(DailyStat {
                    date: parse_date(row.get(0)?, 0)?,
                    total: row.get(1)?,
                    correct: row.get(2)?,
                    wrong: row.get(3)?,
                })
            })?;
            rows.collect()
        })
    }

    fn list_users(&self) -> Vec<String> {
        self.read("users", |conn| {
            let mut stmt = conn.prepare("SELECT name FROM users ORDER BY name")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect()
        })
    }

    fn update_user_record(&mut self, user: &str, vocab_id: u32, star: u8) -> Result<()> {
        let user = check_user(user)?;
        let star = check_star(star)?;
        self.write("update user record", |conn| {
            let user_id = ensure_user_id(conn, user)?;
            conn.execute(
                "INSERT INTO user_records (user_id, vocab_id, star, last_reviewed)
                 VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
                 ON CONFLICT(user_id, vocab_id)
                 DO UPDATE SET star = excluded.star, last_reviewed = excluded.last_reviewed",
                params![user_id, vocab_id, star],
            )?;
            Ok(())
        })
    }

    fn add_to_review_list(&mut self, user: &str, vocab_id: u32, weight: f64) -> Result<()> {
        let user = check_user(user)?;
        let weight = check_weight(weight)?;
        self.write("add to review list", |conn| {
            let user_id = ensure_user_id(conn, user)?;
            conn.execute(
                "INSERT OR IGNORE INTO review_list (user_id, vocab_id, weight, added_at)
                 VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)",
                params![user_id, vocab_id, weight],
            )?;
            Ok(())
        })
    }

    fn update_review_weight(&mut self, user: &str, vocab_id: u32, weight: f64) -> Result<()> {
        let user = check_user(user)?;
        let weight = check_weight(weight)?;
        self.write("update review weight", |conn| {
            let Some(user_id) = find_user_id(conn, user)? else {
                return Ok(());
            };
            conn.execute(
                "UPDATE review_list SET weight = ?3 WHERE user_id = ?1 AND vocab_id = ?2",
                params![user_id, vocab_id, weight],
            )?;
            Ok(())
        })
    }

    fn remove_from_review_list(&mut self, user: &str, vocab_id: u32) -> Result<bool> {
        let user = check_user(user)?;
        self.write("remove from review list", |conn| {
            let Some(user_id) = find_user_id(conn, user)? else {
                return Ok(false);
            };
            let removed = conn.execute(
                "DELETE FROM review_list WHERE user_id = ?1 AND vocab_id = ?2",
                params![user_id, vocab_id],
            )?;
            Ok(removed > 0)
        })
    }

    fn add_bookmark(&mut self, user: &str, vocab_id: u32) -> Result<()> {
        let user = check_user(user)?;
        self.write("add bookmark", |conn| {
            let user_id = ensure_user_id(conn, user)?;
            conn.execute(
                "INSERT OR IGNORE INTO bookmarks (user_id, vocab_id, added_at)
                 VALUES (?1, ?2, CURRENT_TIMESTAMP)",
                params![user_id, vocab_id],
            )?;
            Ok(())
        })
    }

    fn remove_bookmark(&mut self, user: &str, vocab_id: u32) -> Result<bool> {
        let user = check_user(user)?;
        self.write("remove bookmark", |conn| {
            let Some(user_id) = find_user_id(conn, user)? else {
                return Ok(false);
            };
            let removed = conn.execute(
                "DELETE FROM bookmarks WHERE user_id = ?1 AND vocab_id = ?2",
                params![user_id, vocab_id],
            )?;
            Ok(removed > 0)
        })
    }

    fn update_daily_stats(
        &mut self,
        user: &str,
        date: NaiveDate,
        total: u32,
        correct: u32,
        wrong: u32,
    ) -> Result<()> {
        let user = check_user(user)?;
        self.write("update daily stats", |conn| {
            let user_id = ensure_user_id(conn, user)?;
            conn.execute(
                "INSERT INTO daily_stats (user_id, date, total, correct, wrong)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(user_id, date) DO UPDATE SET
                     total = total + excluded.total,
                     correct = correct + excluded.correct,
                     wrong = wrong + excluded.wrong",
                params![user_id, format_date(date), total, correct, wrong],
            )?;
            Ok(())
        })
    }

    fn import_vocabulary(&mut self, entries: &[VocabularyEntry]) -> Result<usize> {
        self.write("import vocabulary", |conn| {
            let tx = conn.transaction()?;
            let mut added = 0;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO vocabulary (id, chinese, english, japanese, level)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for entry in entries {
                    let row = CatalogRow::from(entry);
                    added += stmt.execute(params![
                        entry.id,
                        row.chinese,
                        row.english,
                        row.japanese,
                        entry.level
                    ])?;
                }
            }
            tx.commit()?;
            Ok(added)
        })
    }
}
