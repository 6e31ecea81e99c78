//! Copying data between backends and exporting a user's data as JSON.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::backend::{PersistenceBackend, Result, StorageError};
use super::models::{Bookmark, DailyStat, MasteryRecord, ReviewEntry};

/// What a transfer copied
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReport {
    /// Catalog entries the target did not have yet
    pub vocabulary: usize,
    pub users: usize,
    pub records: usize,
    pub review_entries: usize,
    pub bookmarks: usize,
    pub daily_stats: usize,
}

/// Copy the catalog and per-user collections from `source` into `target`.
///
/// `users` limits the copy to the named users; `None` copies every user the
/// source knows. Catalog entries already in the target are skipped, mastery
/// records and review weights overwrite the target's, and daily statistics
/// are added onto whatever the target already holds.
pub fn transfer(
    source: &dyn PersistenceBackend,
    target: &mut dyn PersistenceBackend,
    users: Option<&[String]>,
) -> Result<TransferReport> {
    let mut report = TransferReport::default();

    let vocabulary = source.get_vocabulary(None);
    report.vocabulary = target.import_vocabulary(&vocabulary)?;

    let users = match users {
        Some(users) => users.to_vec(),
        None => source.list_users(),
    };

    for user in &users {
        for record in source.get_user_records(user) {
            target.update_user_record(user, record.vocab_id, record.star)?;
            report.records += 1;
        }

        for entry in source.get_review_list(user) {
            // add_to_review_list never overwrites, so follow up with the weight
            target.add_to_review_list(user, entry.vocab_id, entry.weight)?;
            target.update_review_weight(user, entry.vocab_id, entry.weight)?;
            report.review_entries += 1;
        }

        for bookmark in source.get_bookmarks(user) {
            target.add_bookmark(user, bookmark.vocab_id)?;
            report.bookmarks += 1;
        }

        for stat in source.get_daily_stats(user) {
            target.update_daily_stats(user, stat.date, stat.total, stat.correct, stat.wrong)?;
            report.daily_stats += 1;
        }

        report.users += 1;
    }

    log::info!(
        "Transfer complete: {} vocabulary entries, {} users, {} records, {} review entries",
        report.vocabulary,
        report.users,
        report.records,
        report.review_entries
    );

    Ok(report)
}

/// Everything stored for one user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserExport {
    pub user: String,
    pub exported_at: DateTime<Utc>,
    pub records: Vec<MasteryRecord>,
    pub review_list: Vec<ReviewEntry>,
    pub bookmarks: Vec<Bookmark>,
    pub daily_stats: Vec<DailyStat>,
}

/// Collect one user's data from a backend
pub fn export_user(backend: &dyn PersistenceBackend, user: &str) -> UserExport {
    UserExport {
        user: user.to_string(),
        exported_at: Utc::now(),
        records: backend.get_user_records(user),
        review_list: backend.get_review_list(user),
        bookmarks: backend.get_bookmarks(user),
        daily_stats: backend.get_daily_stats(user),
    }
}

/// Write one user's data to a pretty-printed JSON file.
///
/// A user the backend has never stored anything for is [`StorageError::NotFound`].
pub fn export_user_to_json(
    backend: &dyn PersistenceBackend,
    user: &str,
    output_path: &Path,
) -> Result<UserExport> {
    if !backend.list_users().iter().any(|u| u == user) {
        return Err(StorageError::NotFound(format!("user '{}'", user)));
    }
    let export = export_user(backend, user);
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(&export)?;
    fs::write(output_path, content)?;
    log::info!("Exported data for {} to {:?}", user, output_path);
    Ok(export)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Language, VocabularyEntry};
    use crate::storage::{FlatFileBackend, RelationalBackend};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn seeded_flat_file(temp_dir: &TempDir) -> FlatFileBackend {
        let dir = temp_dir.path().join("flat");
        FlatFileBackend::init(&dir).unwrap();
        let mut backend = FlatFileBackend::new(dir);
        backend.connect().unwrap();

        backend
            .import_vocabulary(&[
                VocabularyEntry::new(1, 1)
                    .with_text(Language::Chinese, "苹果")
                    .with_text(Language::English, "apple"),
                VocabularyEntry::new(2, 2)
                    .with_text(Language::Chinese, "香蕉")
                    .with_text(Language::English, "banana"),
            ])
            .unwrap();
        backend.update_user_record("mira", 1, 2).unwrap();
        backend.add_to_review_list("mira", 2, 10.0).unwrap();
        backend.update_review_weight("mira", 2, 14.4).unwrap();
        backend.add_bookmark("mira", 1).unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        backend.update_daily_stats("mira", date, 5, 3, 2).unwrap();
        backend.update_user_record("tomas", 2, 1).unwrap();
        backend
    }

    #[test]
    fn test_transfer_into_empty_relational_backend() {
        let temp_dir = TempDir::new().unwrap();
        let source = seeded_flat_file(&temp_dir);
        let mut target = RelationalBackend::in_memory();
        target.connect().unwrap();

        let report = transfer(&source, &mut target, None).unwrap();
        assert_eq!(report.vocabulary, 2);
        assert_eq!(report.users, 2);
        assert_eq!(report.records, 2);

        assert_eq!(target.get_vocabulary(None).len(), 2);
        assert_eq!(target.get_user_records("mira"), vec![MasteryRecord::new(1, 2)]);
        let review = target.get_review_list("mira");
        assert_eq!(review.len(), 1);
        assert!((review[0].weight - 14.4).abs() < 1e-9);
        assert_eq!(target.get_bookmarks("mira"), vec![Bookmark { vocab_id: 1 }]);
        let stats = target.get_daily_stats("mira");
        assert_eq!((stats[0].total, stats[0].correct, stats[0].wrong), (5, 3, 2));
        assert_eq!(target.get_user_records("tomas"), vec![MasteryRecord::new(2, 1)]);
    }

    #[test]
    fn test_transfer_selected_users_only() {
        let temp_dir = TempDir::new().unwrap();
        let source = seeded_flat_file(&temp_dir);
        let mut target = RelationalBackend::in_memory();
        target.connect().unwrap();

        let report = transfer(&source, &mut target, Some(&["tomas".to_string()])).unwrap();
        assert_eq!(report.users, 1);
        assert!(target.get_user_records("mira").is_empty());
        assert_eq!(target.list_users(), vec!["tomas".to_string()]);
    }

    #[test]
    fn test_transfer_skips_existing_vocabulary() {
        let temp_dir = TempDir::new().unwrap();
        let source = seeded_flat_file(&temp_dir);
        let mut target = RelationalBackend::in_memory();
        target.connect().unwrap();
        target
            .import_vocabulary(&[VocabularyEntry::new(1, 1).with_text(Language::English, "apple")])
            .unwrap();

        let report = transfer(&source, &mut target, Some(&[])).unwrap();
        assert_eq!(report.vocabulary, 1);
        assert_eq!(target.get_vocabulary(None).len(), 2);
    }

    #[test]
    fn test_export_user_to_json() {
        let temp_dir = TempDir::new().unwrap();
        let source = seeded_flat_file(&temp_dir);
        let output = temp_dir.path().join("exports").join("mira.json");

        let export = export_user_to_json(&source, "mira", &output).unwrap();
        assert_eq!(export.records.len(), 1);

        let content = fs::read_to_string(&output).unwrap();
        let parsed: UserExport = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.user, "mira");
        assert_eq!(parsed.bookmarks, vec![Bookmark { vocab_id: 1 }]);
        assert_eq!(parsed.daily_stats.len(), 1);
    }

    #[test]
    fn test_export_unknown_user_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let source = seeded_flat_file(&temp_dir);
        let output = temp_dir.path().join("nobody.json");

        assert!(matches!(
            export_user_to_json(&source, "nobody", &output),
            Err(StorageError::NotFound(_))
        ));
        assert!(!output.exists());
    }
}
