//! Behaviour every backend must share, run against each implementation.

use chrono::NaiveDate;
use tempfile::TempDir;

use super::backend::{PersistenceBackend, StorageError};
use super::models::{Bookmark, MasteryRecord, MAX_REVIEW_WEIGHT};
use super::{FlatFileBackend, RelationalBackend};
use crate::catalog::{Language, VocabularyEntry};

type Check = fn(&mut dyn PersistenceBackend);

const CHECKS: &[(&str, Check)] = &[
    ("record round trip", record_round_trip),
    ("review insert is idempotent", review_insert_is_idempotent),
    ("review weight is capped", review_weight_is_capped),
    ("absent review weight update", absent_review_weight_update_is_noop),
    ("bookmarks are idempotent", bookmarks_are_idempotent),
    ("daily stats are additive", daily_stats_are_additive),
    ("vocabulary level filter", vocabulary_level_filter),
    ("removals report presence", removals_report_presence),
    ("invalid input is rejected", invalid_input_is_rejected),
];

fn sample_vocabulary() -> Vec<VocabularyEntry> {
    vec![
        VocabularyEntry::new(1, 1)
            .with_text(Language::Chinese, "猫")
            .with_text(Language::English, "cat"),
        VocabularyEntry::new(2, 1)
            .with_text(Language::Chinese, "狗")
            .with_text(Language::English, "dog"),
        VocabularyEntry::new(3, 2)
            .with_text(Language::Chinese, "图书馆")
            .with_text(Language::English, "library")
            .with_text(Language::Japanese, "図書館"),
    ]
}

fn record_round_trip(backend: &mut dyn PersistenceBackend) {
    backend.update_user_record("ana", 7, 1).unwrap();
    backend.update_user_record("ana", 7, 2).unwrap();
    assert_eq!(backend.get_user_records("ana"), vec![MasteryRecord::new(7, 2)]);
    assert!(backend.get_user_records("ben").is_empty());
}

fn review_insert_is_idempotent(backend: &mut dyn PersistenceBackend) {
    backend.add_to_review_list("ana", 3, 10.0).unwrap();
    backend.add_to_review_list("ana", 3, 25.0).unwrap();
    let review = backend.get_review_list("ana");
    assert_eq!(review.len(), 1);
    assert_eq!(review[0].weight, 10.0);
}

fn review_weight_is_capped(backend: &mut dyn PersistenceBackend) {
    backend.add_to_review_list("ana", 4, 80.0).unwrap();
    backend.add_to_review_list("ana", 5, 10.0).unwrap();
    backend.update_review_weight("ana", 5, 1000.0).unwrap();
    for entry in backend.get_review_list("ana") {
        assert!(entry.weight <= MAX_REVIEW_WEIGHT);
    }
}

fn absent_review_weight_update_is_noop(backend: &mut dyn PersistenceBackend) {
    backend.update_review_weight("ana", 99, 12.0).unwrap();
    assert!(backend.get_review_list("ana").is_empty());
}

fn bookmarks_are_idempotent(backend: &mut dyn PersistenceBackend) {
    backend.add_bookmark("ana", 2).unwrap();
    backend.add_bookmark("ana", 2).unwrap();
    assert_eq!(backend.get_bookmarks("ana"), vec![Bookmark { vocab_id: 2 }]);
}

fn daily_stats_are_additive(backend: &mut dyn PersistenceBackend) {
    let date = NaiveDate::from_ymd_opt(2026, 5, 4).unwrap();
    backend.update_daily_stats("ana", date, 5, 3, 2).unwrap();
    backend.update_daily_stats("ana", date, 2, 1, 1).unwrap();

    let stats = backend.get_daily_stats("ana");
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].date, date);
    assert_eq!((stats[0].total, stats[0].correct, stats[0].wrong), (7, 4, 3));
}

fn vocabulary_level_filter(backend: &mut dyn PersistenceBackend) {
    assert_eq!(backend.import_vocabulary(&sample_vocabulary()).unwrap(), 3);
    assert_eq!(backend.import_vocabulary(&sample_vocabulary()).unwrap(), 0);

    assert_eq!(backend.get_vocabulary(None).len(), 3);
    let level_one: Vec<u32> = backend.get_vocabulary(Some(1)).iter().map(|e| e.id).collect();
    assert_eq!(level_one, vec![1, 2]);
    assert!(backend.get_vocabulary(Some(9)).is_empty());

    let library = backend
        .get_vocabulary(Some(2))
        .into_iter()
        .next()
        .unwrap();
    assert_eq!(library.text(Language::Japanese), Some("図書館"));
}

fn removals_report_presence(backend: &mut dyn PersistenceBackend) {
    backend.add_bookmark("ana", 1).unwrap();
    backend.add_to_review_list("ana", 1, 10.0).unwrap();

    assert!(backend.remove_bookmark("ana", 1).unwrap());
    assert!(!backend.remove_bookmark("ana", 1).unwrap());
    assert!(backend.remove_from_review_list("ana", 1).unwrap());
    assert!(!backend.remove_from_review_list("nobody", 1).unwrap());
}

fn invalid_input_is_rejected(backend: &mut dyn PersistenceBackend) {
    assert!(matches!(
        backend.update_user_record("ana", 1, 4),
        Err(StorageError::Validation(_))
    ));
    assert!(matches!(
        backend.add_to_review_list("ana", 1, f64::NAN),
        Err(StorageError::Validation(_))
    ));
    assert!(matches!(
        backend.update_review_weight("ana", 1, -2.0),
        Err(StorageError::Validation(_))
    ));
    assert!(matches!(
        backend.add_bookmark("  ", 1),
        Err(StorageError::Validation(_))
    ));
}

fn run_all(mut fresh: impl FnMut() -> Box<dyn PersistenceBackend>) {
    for (name, check) in CHECKS {
        let mut backend = fresh();
        backend.connect().unwrap();
        log::debug!("Running backend check: {}", name);
        check(backend.as_mut());
        backend.close().unwrap();
    }
}

fn assert_unconnected_behaviour(backend: &mut dyn PersistenceBackend) {
    assert!(!backend.is_connected());
    assert!(backend.get_vocabulary(None).is_empty());
    assert!(backend.get_user_records("ana").is_empty());
    assert!(backend.get_daily_stats("ana").is_empty());
    assert!(matches!(
        backend.add_bookmark("ana", 1),
        Err(StorageError::NotConnected)
    ));
}

#[test]
fn test_flat_file_backend_contract() {
    let temp_dir = TempDir::new().unwrap();
    let mut counter = 0;
    run_all(|| {
        counter += 1;
        let dir = temp_dir.path().join(format!("store-{}", counter));
        FlatFileBackend::init(&dir).unwrap();
        Box::new(FlatFileBackend::new(dir))
    });
}

#[test]
fn test_relational_backend_contract() {
    run_all(|| Box::new(RelationalBackend::in_memory()));
}

#[test]
fn test_relational_file_backend_contract() {
    let temp_dir = TempDir::new().unwrap();
    let mut counter = 0;
    run_all(|| {
        counter += 1;
        let path = temp_dir.path().join(format!("store-{}.db", counter));
        Box::new(RelationalBackend::open_file(path))
    });
}

#[test]
fn test_unconnected_backends() {
    let temp_dir = TempDir::new().unwrap();
    assert_unconnected_behaviour(&mut FlatFileBackend::new(temp_dir.path().to_path_buf()));
    assert_unconnected_behaviour(&mut RelationalBackend::in_memory());
}
