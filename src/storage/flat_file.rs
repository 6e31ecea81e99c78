//! Flat-file backend
//!
//! Directory structure:
//! ```text
//! {data-dir}/
//! ├── vocabulary.csv    # id, level, chinese, english, japanese
//! ├── mastery.csv       # user, vocab_id, star
//! ├── review.csv        # user, vocab_id, weight
//! ├── bookmarks.csv     # user, vocab_id
//! └── daily_stats.csv   # user, date, total, correct, wrong
//! ```
//!
//! Every table is loaded on connect and every table is rewritten on each
//! mutating call, staged as `{table}.tmp` and renamed into place. Concurrent writers are not supported: two processes
//! sharing a directory will overwrite each other's changes.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::backend::{check_star, check_user, check_weight, PersistenceBackend, Result, StorageError};
use super::models::{Bookmark, DailyStat, MasteryRecord, ReviewEntry};
use crate::catalog::{CatalogRow, VocabularyCatalog, VocabularyEntry};

const VOCABULARY_FILE: &str = "vocabulary.csv";
const MASTERY_FILE: &str = "mastery.csv";
const REVIEW_FILE: &str = "review.csv";
const BOOKMARKS_FILE: &str = "bookmarks.csv";
const DAILY_STATS_FILE: &str = "daily_stats.csv";

#[derive(Debug, Serialize, Deserialize)]
struct MasteryRow {
    user: String,
    vocab_id: u32,
    star: u8,
}

#[derive(Debug, Serialize, Deserialize)]
struct ReviewRow {
    user: String,
    vocab_id: u32,
    weight: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct BookmarkRow {
    user: String,
    vocab_id: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct DailyStatRow {
    user: String,
    date: NaiveDate,
    total: u32,
    correct: u32,
    wrong: u32,
}

/// All tables, as held in memory between connect and close
#[derive(Debug, Clone, Default)]
struct Tables {
    vocabulary: VocabularyCatalog,
    mastery: BTreeMap<(String, u32), u8>,
    review: BTreeMap<(String, u32), f64>,
    bookmarks: BTreeSet<(String, u32)>,
    daily_stats: BTreeMap<(String, NaiveDate), DailyStat>,
}

/// Backend storing each concern in its own CSV table
pub struct FlatFileBackend {
    data_dir: PathBuf,
    tables: Option<Tables>,
}

impl FlatFileBackend {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            tables: None,
        }
    }

    /// Create the data directory if needed
    pub fn init(data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir)?;
        for file in [
            VOCABULARY_FILE,
            MASTERY_FILE,
            REVIEW_FILE,
            BOOKMARKS_FILE,
            DAILY_STATS_FILE,
        ] {
            let path = data_dir.join(file);
            if !path.exists() {
                fs::write(&path, "")?;
            }
        }
        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn table_path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    // ==================== Load / Save ====================

    fn load_tables(&self) -> Result<Tables> {
        let mut tables = Tables::default();

        let rows: Vec<CatalogRow> = read_table(&self.table_path(VOCABULARY_FILE))?;
        let mut next_id = rows
            .iter()
            .filter_map(|r| r.id)
            .max()
            .map_or(0, |max| max + 1);
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let missing_id = row.id.is_none();
            entries.push(row.into_entry(next_id));
            if missing_id {
                next_id += 1;
            }
        }
        tables.vocabulary = VocabularyCatalog::new(entries);

        for row in read_table::<MasteryRow>(&self.table_path(MASTERY_FILE))? {
            tables.mastery.insert((row.user, row.vocab_id), row.star);
        }
        for row in read_table::<ReviewRow>(&self.table_path(REVIEW_FILE))? {
            tables.review.insert((row.user, row.vocab_id), row.weight);
        }
        for row in read_table::<BookmarkRow>(&self.table_path(BOOKMARKS_FILE))? {
            tables.bookmarks.insert((row.user, row.vocab_id));
        }
        for row in read_table::<DailyStatRow>(&self.table_path(DAILY_STATS_FILE))? {
            tables.daily_stats.insert(
                (row.user, row.date),
                DailyStat {
                    date: row.date,
                    total: row.total,
                    correct: row.correct,
                    wrong: row.wrong,
                },
            );
        }

        Ok(tables)
    }

    /// Stage every table next to its target, then rename them into place.
    ///
    /// A table that fails to stage leaves every target untouched.
    fn save_tables(&self, tables: &Tables) -> Result<()> {
        let mut staged = Vec::with_capacity(5);
        let result = self.stage_tables(tables, &mut staged).and_then(|()| {
            for (target, _) in &staged {
                if target.is_dir() {
                    return Err(StorageError::WriteFailed(format!(
                        "{:?} is a directory",
                        target
                    )));
                }
            }
            for (target, temp) in &staged {
                fs::rename(temp, target)?;
            }
            Ok(())
        });

        if result.is_err() {
            for (_, temp) in &staged {
                let _ = fs::remove_file(temp);
            }
        }
        result
    }

    fn stage_tables(&self, tables: &Tables, staged: &mut Vec<(PathBuf, PathBuf)>) -> Result<()> {
        self.stage(
            staged,
            VOCABULARY_FILE,
            tables.vocabulary.entries().iter().map(CatalogRow::from),
        )?;
        self.stage(
            staged,
            MASTERY_FILE,
            tables.mastery.iter().map(|((user, vocab_id), star)| MasteryRow {
                user: user.clone(),
                vocab_id: *vocab_id,
                star: *star,
            }),
        )?;
        self.stage(
            staged,
            REVIEW_FILE,
            tables.review.iter().map(|((user, vocab_id), weight)| ReviewRow {
                user: user.clone(),
                vocab_id: *vocab_id,
                weight: *weight,
            }),
        )?;
        self.stage(
            staged,
            BOOKMARKS_FILE,
            tables.bookmarks.iter().map(|(user, vocab_id)| BookmarkRow {
                user: user.clone(),
                vocab_id: *vocab_id,
            }),
        )?;
        self.stage(
            staged,
            DAILY_STATS_FILE,
            tables.daily_stats.iter().map(|((user, _), stat)| DailyStatRow {
                user: user.clone(),
                date: stat.date,
                total: stat.total,
                correct: stat.correct,
                wrong: stat.wrong,
            }),
        )
    }

    fn stage<T: Serialize>(
        &self,
        staged: &mut Vec<(PathBuf, PathBuf)>,
        file: &str,
        rows: impl Iterator<Item = T>,
    ) -> Result<()> {
        let target = self.table_path(file);
        let temp = temp_path(&target);
        staged.push((target, temp.clone()));
        write_table(&temp, rows)
    }

    /// Apply a change to a copy of the tables, persist the copy, then swap it in.
    ///
    /// Memory only reflects the change once it is on disk.
    fn mutate<R>(&mut self, change: impl FnOnce(&mut Tables) -> R) -> Result<R> {
        let current = self.tables.as_ref().ok_or(StorageError::NotConnected)?;
        let mut next = current.clone();
        let result = change(&mut next);
        self.save_tables(&next)
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        self.tables = Some(next);
        Ok(result)
    }

    fn read<T>(&self, query: impl FnOnce(&Tables) -> Vec<T>) -> Vec<T> {
        match &self.tables {
            Some(tables) => query(tables),
            None => Vec::new(),
        }
    }
}

fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

fn temp_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_table<T: Serialize>(path: &Path, rows: impl Iterator<Item = T>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

impl PersistenceBackend for FlatFileBackend {
    fn connect(&mut self) -> Result<()> {
        if !self.data_dir.is_dir() {
            return Err(StorageError::Connection(format!(
                "data directory {:?} does not exist",
                self.data_dir
            )));
        }

        let tables = self
            .load_tables()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        log::info!(
            "Loaded flat-file store at {:?} ({} vocabulary entries)",
            self.data_dir,
            tables.vocabulary.len()
        );
        self.tables = Some(tables);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(tables) = self.tables.take() {
            self.save_tables(&tables)
                .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
            log::info!("Closed flat-file store at {:?}", self.data_dir);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.tables.is_some()
    }

    fn get_vocabulary(&self, level: Option<u8>) -> Vec<VocabularyEntry> {
        self.read(|t| {
            t.vocabulary
                .entries()
                .iter()
                .filter(|e| level.map_or(true, |l| e.level == l))
                .cloned()
                .collect()
        })
    }

    fn get_user_records(&self, user: &str) -> Vec<MasteryRecord> {
        self.read(|t| {
            t.mastery
                .iter()
                .filter(|((u, _), _)| u == user)
                .map(|((_, vocab_id), star)| MasteryRecord::new(*vocab_id, *star))
                .collect()
        })
    }

    fn get_review_list(&self, user: &str) -> Vec<ReviewEntry> {
        self.read(|t| {
            t.review
                .iter()
                .filter(|((u, _), _)| u == user)
                .map(|((_, vocab_id), weight)| ReviewEntry::new(*vocab_id, *weight))
                .collect()
        })
    }

    fn get_bookmarks(&self, user: &str) -> Vec<Bookmark> {
        self.read(|t| {
            t.bookmarks
                .iter()
                .filter(|(u, _)| u == user)
                .map(|(_, vocab_id)| Bookmark { vocab_id: *vocab_id })
                .collect()
        })
    }

    fn get_daily_stats(&self, user: &str) -> Vec<DailyStat> {
        self.read(|t| {
            t.daily_stats
                .iter()
                .filter(|((u, _), _)| u == user)
                .map(|(_, stat)| *stat)
                .collect()
        })
    }

    fn list_users(&self) -> Vec<String> {
        self.read(|t| {
            let users: BTreeSet<&String> = t
                .mastery
                .keys()
                .map(|(u, _)| u)
                .chain(t.review.keys().map(|(u, _)| u))
                .chain(t.bookmarks.iter().map(|(u, _)| u))
                .chain(t.daily_stats.keys().map(|(u, _)| u))
                .collect();
            users.into_iter().cloned().collect()
        })
    }

    fn update_user_record(&mut self, user: &str, vocab_id: u32, star: u8) -> Result<()> {
        let user = check_user(user)?.to_string();
        let star = check_star(star)?;
        self.mutate(|t| {
            t.mastery.insert((user, vocab_id), star);
        })
    }

    fn add_to_review_list(&mut self, user: &str, vocab_id: u32, weight: f64) -> Result<()> {
        let user = check_user(user)?.to_string();
        let weight = check_weight(weight)?;
        self.mutate(|t| {
            t.review.entry((user, vocab_id)).or_insert(weight);
        })
    }

    fn update_review_weight(&mut self, user: &str, vocab_id: u32, weight: f64) -> Result<()> {
        let user = check_user(user)?.to_string();
        let weight = check_weight(weight)?;
        self.mutate(|t| {
            if let Some(stored) = t.review.get_mut(&(user, vocab_id)) {
                *stored = weight;
            }
        })
    }

    fn remove_from_review_list(&mut self, user: &str, vocab_id: u32) -> Result<bool> {
        let user = check_user(user)?.to_string();
        self.mutate(|t| t.review.remove(&(user, vocab_id)).is_some())
    }

    fn add_bookmark(&mut self, user: &str, vocab_id: u32) -> Result<()> {
        let user = check_user(user)?.to_string();
        self.mutate(|t| {
            t.bookmarks.insert((user, vocab_id));
        })
    }

    fn remove_bookmark(&mut self, user: &str, vocab_id: u32) -> Result<bool> {
        let user = check_user(user)?.to_string();
        self.mutate(|t| t.bookmarks.remove(&(user, vocab_id)))
    }

    fn update_daily_stats(
        &mut self,
        user: &str,
        date: NaiveDate,
        total: u32,
        correct: u32,
        wrong: u32,
    ) -> Result<()> {
        let user = check_user(user)?.to_string();
        self.mutate(|t| {
            t.daily_stats
                .entry((user, date))
                .or_insert_with(|| DailyStat::new(date))
                .accumulate(total, correct, wrong);
        })
    }

    fn import_vocabulary(&mut self, entries: &[VocabularyEntry]) -> Result<usize> {
        self.mutate(|t| {
            let mut merged = t.vocabulary.entries().to_vec();
            let before = merged.len();
            for entry in entries {
                if t.vocabulary.find(entry.id).is_none()
                    && !merged[before..].iter().any(|e| e.id == entry.id)
                {
                    merged.push(entry.clone());
                }
            }
            let added = merged.len() - before;
            t.vocabulary = VocabularyCatalog::new(merged);
            added
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Language;
    use tempfile::TempDir;

    fn create_test_backend() -> (FlatFileBackend, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        FlatFileBackend::init(temp_dir.path()).unwrap();
        let mut backend = FlatFileBackend::new(temp_dir.path().to_path_buf());
        backend.connect().unwrap();
        (backend, temp_dir)
    }

    #[test]
    fn test_connect_fails_without_directory() {
        let temp_dir = TempDir::new().unwrap();
        let mut backend = FlatFileBackend::new(temp_dir.path().join("missing"));

        assert!(matches!(backend.connect(), Err(StorageError::Connection(_))));
        assert!(!backend.is_connected());
    }

    #[test]
    fn test_connect_fails_on_corrupt_table_without_partial_state() {
        let temp_dir = TempDir::new().unwrap();
        FlatFileBackend::init(temp_dir.path()).unwrap();
        fs::write(
            temp_dir.path().join(MASTERY_FILE),
            "user,vocab_id,star\nalice,not-a-number,1\n",
        )
        .unwrap();

        let mut backend = FlatFileBackend::new(temp_dir.path().to_path_buf());
        assert!(matches!(backend.connect(), Err(StorageError::Connection(_))));
        assert!(!backend.is_connected());
        assert!(backend.get_user_records("alice").is_empty());
    }

    #[test]
    fn test_changes_survive_reconnect() {
        let (mut backend, temp) = create_test_backend();
        backend
            .import_vocabulary(&[VocabularyEntry::new(0, 1)
                .with_text(Language::Chinese, "书")
                .with_text(Language::English, "book")])
            .unwrap();
        backend.update_user_record("alice", 0, 2).unwrap();
        backend.add_to_review_list("alice", 0, 10.0).unwrap();
        backend.add_bookmark("alice", 0).unwrap();

        // A fresh instance sees what the first one wrote
        let mut reopened = FlatFileBackend::new(temp.path().to_path_buf());
        reopened.connect().unwrap();
        assert_eq!(reopened.get_vocabulary(None).len(), 1);
        assert_eq!(reopened.get_user_records("alice"), vec![MasteryRecord::new(0, 2)]);
        assert_eq!(reopened.get_review_list("alice")[0].weight, 10.0);
        assert_eq!(reopened.get_bookmarks("alice").len(), 1);
    }

    #[test]
    fn test_vocabulary_rows_without_id_are_reindexed() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(VOCABULARY_FILE),
            "id,level,chinese,english,japanese\n4,1,水,water,水\n,1,火,fire,火\n,2,山,mountain,山\n",
        )
        .unwrap();

        let mut backend = FlatFileBackend::new(temp_dir.path().to_path_buf());
        backend.connect().unwrap();

        let ids: Vec<u32> = backend.get_vocabulary(None).iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![4, 5, 6]);
        assert_eq!(backend.get_vocabulary(Some(2))[0].text(Language::English), Some("mountain"));
    }

    #[test]
    fn test_failed_save_leaves_tables_untouched() {
        let (mut backend, temp) = create_test_backend();
        backend.update_user_record("alice", 0, 1).unwrap();
        let before = fs::read_to_string(temp.path().join(MASTERY_FILE)).unwrap();

        // A directory where a table should be cannot be replaced by a file
        fs::remove_file(temp.path().join(BOOKMARKS_FILE)).unwrap();
        fs::create_dir(temp.path().join(BOOKMARKS_FILE)).unwrap();

        assert!(matches!(
            backend.update_user_record("alice", 1, 2),
            Err(StorageError::WriteFailed(_))
        ));
        assert_eq!(backend.get_user_records("alice"), vec![MasteryRecord::new(0, 1)]);
        assert_eq!(fs::read_to_string(temp.path().join(MASTERY_FILE)).unwrap(), before);
        assert!(!temp.path().join("mastery.csv.tmp").exists());
    }

    #[test]
    fn test_failed_staging_leaves_tables_untouched() {
        let (mut backend, temp) = create_test_backend();
        fs::create_dir(temp.path().join("review.csv.tmp")).unwrap();

        assert!(backend.update_user_record("alice", 3, 2).is_err());
        assert!(backend.get_user_records("alice").is_empty());
        assert_eq!(fs::read_to_string(temp.path().join(MASTERY_FILE)).unwrap(), "");
        assert!(!temp.path().join("vocabulary.csv.tmp").exists());
        assert!(!temp.path().join("mastery.csv.tmp").exists());
    }

    #[test]
    fn test_writes_require_connection() {
        let temp_dir = TempDir::new().unwrap();
        let mut backend = FlatFileBackend::new(temp_dir.path().to_path_buf());

        assert!(matches!(
            backend.add_bookmark("alice", 1),
            Err(StorageError::NotConnected)
        ));
        assert!(backend.get_vocabulary(None).is_empty());
    }

    #[test]
    fn test_close_disconnects() {
        let (mut backend, _temp) = create_test_backend();
        backend.close().unwrap();
        assert!(!backend.is_connected());
        assert!(backend.list_users().is_empty());
    }
}
