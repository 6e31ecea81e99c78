//! The persistence contract shared by every storage backend.

use chrono::NaiveDate;
use thiserror::Error;

use super::models::{Bookmark, DailyStat, MasteryRecord, ReviewEntry};
use crate::catalog::VocabularyEntry;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Backend is not connected")]
    NotConnected,

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Durable state for the catalog and every user's progress.
///
/// Reads never fail: an unconnected backend, an unknown user or an
/// unreadable row all yield an empty result. Writes report failures through
/// [`StorageError`].
pub trait PersistenceBackend {
    /// Open the underlying store. On failure no connection state is kept.
    fn connect(&mut self) -> Result<()>;

    /// Flush and release the underlying store
    fn close(&mut self) -> Result<()>;

    fn is_connected(&self) -> bool;

    /// All catalog entries, or only those at `level`
    fn get_vocabulary(&self, level: Option<u8>) -> Vec<VocabularyEntry>;

    fn get_user_records(&self, user: &str) -> Vec<MasteryRecord>;

    fn get_review_list(&self, user: &str) -> Vec<ReviewEntry>;

    fn get_bookmarks(&self, user: &str) -> Vec<Bookmark>;

    /// Daily statistics ordered by date
    fn get_daily_stats(&self, user: &str) -> Vec<DailyStat>;

    /// Users that have any stored progress
    fn list_users(&self) -> Vec<String>;

    /// Insert or overwrite the mastery level of a word
    fn update_user_record(&mut self, user: &str, vocab_id: u32, star: u8) -> Result<()>;

    /// Insert a word into the review list. Existing entries keep their weight.
    fn add_to_review_list(&mut self, user: &str, vocab_id: u32, weight: f64) -> Result<()>;

    /// Overwrite the weight of a review entry; absent entries are left alone
    fn update_review_weight(&mut self, user: &str, vocab_id: u32, weight: f64) -> Result<()>;

    /// Remove a word from the review list, returning whether it was present
    fn remove_from_review_list(&mut self, user: &str, vocab_id: u32) -> Result<bool>;

    fn add_bookmark(&mut self, user: &str, vocab_id: u32) -> Result<()>;

    /// Remove a bookmark, returning whether it was present
    fn remove_bookmark(&mut self, user: &str, vocab_id: u32) -> Result<bool>;

    /// Add answer totals onto the stored totals for `(user, date)`
    fn update_daily_stats(
        &mut self,
        user: &str,
        date: NaiveDate,
        total: u32,
        correct: u32,
        wrong: u32,
    ) -> Result<()>;

    /// Add catalog entries whose id is not stored yet; returns how many were added
    fn import_vocabulary(&mut self, entries: &[VocabularyEntry]) -> Result<usize>;
}

impl<B: PersistenceBackend + ?Sized> PersistenceBackend for Box<B> {
    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn get_vocabulary(&self, level: Option<u8>) -> Vec<VocabularyEntry> {
        (**self).get_vocabulary(level)
    }

    fn get_user_records(&self, user: &str) -> Vec<MasteryRecord> {
        (**self).get_user_records(user)
    }

    fn get_review_list(&self, user: &str) -> Vec<ReviewEntry> {
        (**self).get_review_list(user)
    }

    fn get_bookmarks(&self, user: &str) -> Vec<Bookmark> {
        (**self).get_bookmarks(user)
    }

    fn get_daily_stats(&self, user: &str) -> Vec<DailyStat> {
        (**self).get_daily_stats(user)
    }

    fn list_users(&self) -> Vec<String> {
        (**self).list_users()
    }

    fn update_user_record(&mut self, user: &str, vocab_id: u32, star: u8) -> Result<()> {
        (**self).update_user_record(user, vocab_id, star)
    }

    fn add_to_review_list(&mut self, user: &str, vocab_id: u32, weight: f64) -> Result<()> {
        (**self).add_to_review_list(user, vocab_id, weight)
    }

    fn update_review_weight(&mut self, user: &str, vocab_id: u32, weight: f64) -> Result<()> {
        (**self).update_review_weight(user, vocab_id, weight)
    }

    fn remove_from_review_list(&mut self, user: &str, vocab_id: u32) -> Result<bool> {
        (**self).remove_from_review_list(user, vocab_id)
    }

    fn add_bookmark(&mut self, user: &str, vocab_id: u32) -> Result<()> {
        (**self).add_bookmark(user, vocab_id)
    }

    fn remove_bookmark(&mut self, user: &str, vocab_id: u32) -> Result<bool> {
        (**self).remove_bookmark(user, vocab_id)
    }

    fn update_daily_stats(
        &mut self,
        user: &str,
        date: NaiveDate,
        total: u32,
        correct: u32,
        wrong: u32,
    ) -> Result<()> {
        (**self).update_daily_stats(user, date, total, correct, wrong)
    }

    fn import_vocabulary(&mut self, entries: &[VocabularyEntry]) -> Result<usize> {
        (**self).import_vocabulary(entries)
    }
}

/// Reject weights that cannot be stored
pub(crate) fn check_weight(weight: f64) -> Result<f64> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(super::models::clamp_review_weight(weight))
    } else {
        Err(StorageError::Validation(format!(
            "review weight must be finite and non-negative, got {}",
            weight
        )))
    }
}

pub(crate) fn check_star(star: u8) -> Result<u8> {
    if star <= super::models::MAX_STAR {
        Ok(star)
    } else {
        Err(StorageError::Validation(format!(
            "star must be at most {}, got {}",
            super::models::MAX_STAR,
            star
        )))
    }
}

pub(crate) fn check_user(user: &str) -> Result<&str> {
    let user = user.trim();
    if user.is_empty() {
        Err(StorageError::Validation("user name is empty".to_string()))
    } else {
        Ok(user)
    }
}
