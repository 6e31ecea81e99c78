//! The trainer: one user drilling vocabulary against one backend.
//!
//! The trainer hydrates the user's mastery records, review list and
//! bookmarks when it opens, picks words through the schedulers, builds
//! questions and routes each answer back into storage. Every change is
//! written to the backend before the in-memory state follows it, so the two
//! never diverge when a write fails.

use std::collections::{BTreeSet, HashMap};
use std::mem;
use std::time::Duration;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::catalog::{validate_level, CatalogError, Language, VocabularyCatalog, VocabularyEntry};
use crate::quiz::{Question, QuestionGenerator, QuestionMode, SessionRecorder};
use crate::scheduler::{review, MasteryScheduler, ReviewQueue, SchedulerError};
use crate::stats::StatsSummary;
use crate::storage::{PersistenceBackend, StorageError, INITIAL_REVIEW_WEIGHT, MAX_STAR};

#[derive(Error, Debug)]
pub enum TrainerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Word {0} is not in the catalog")]
    UnknownWord(u32),

    #[error("Main and study language are both {0}")]
    SameLanguage(Language),
}

pub type Result<T> = std::result::Result<T, TrainerError>;

/// Study preferences for one trainer
#[derive(Debug, Clone, PartialEq)]
pub struct TrainerOptions {
    pub main_language: Language,
    pub study_language: Language,
    /// Restrict drilling to one difficulty level
    pub level: Option<u8>,
    pub questions_per_session: usize,
}

impl Default for TrainerOptions {
    fn default() -> Self {
        Self {
            main_language: Language::Chinese,
            study_language: Language::English,
            level: None,
            questions_per_session: crate::quiz::DEFAULT_QUESTIONS_PER_SESSION,
        }
    }
}

pub struct Trainer<B: PersistenceBackend> {
    backend: B,
    user: String,
    catalog: VocabularyCatalog,
    active: VocabularyCatalog,
    stars: HashMap<u32, u8>,
    review: ReviewQueue,
    bookmarks: BTreeSet<u32>,
    scheduler: MasteryScheduler,
    generator: QuestionGenerator,
    recorder: SessionRecorder,
    rng: StdRng,
}

impl<B: PersistenceBackend> Trainer<B> {
    /// Open a trainer for `user`, connecting the backend if needed
    pub fn open(backend: B, user: &str, options: TrainerOptions) -> Result<Self> {
        Self::open_with_rng(backend, user, options, StdRng::from_entropy())
    }

    /// Open a trainer with a caller-supplied random source
    pub fn open_with_rng(
        mut backend: B,
        user: &str,
        options: TrainerOptions,
        rng: StdRng,
    ) -> Result<Self> {
        if options.main_language == options.study_language {
            return Err(TrainerError::SameLanguage(options.main_language));
        }
        let user = user.trim();
        if user.is_empty() {
            return Err(StorageError::Validation("user name is empty".to_string()).into());
        }
        if !backend.is_connected() {
            backend.connect()?;
        }

        let catalog = VocabularyCatalog::new(backend.get_vocabulary(None));
        let stars = backend
            .get_user_records(user)
            .into_iter()
            .map(|r| (r.vocab_id, r.star))
            .collect();
        let (queued, stale): (Vec<_>, Vec<_>) = backend
            .get_review_list(user)
            .into_iter()
            .partition(|entry| catalog.find(entry.vocab_id).is_some());
        for entry in &stale {
            log::warn!(
                "Skipping review entry for word {} which is not in the catalog",
                entry.vocab_id
            );
        }
        let review = ReviewQueue::new(queued);
        let bookmarks = backend
            .get_bookmarks(user)
            .into_iter()
            .map(|b| b.vocab_id)
            .collect();

        log::info!(
            "Opened trainer for {} ({} words, {} in review)",
            user,
            catalog.len(),
            review.len()
        );

        let mut trainer = Self {
            backend,
            user: user.to_string(),
            active: catalog.clone(),
            catalog,
            stars,
            review,
            bookmarks,
            scheduler: MasteryScheduler::new(),
            generator: QuestionGenerator::new(options.main_language, options.study_language),
            recorder: SessionRecorder::new(options.questions_per_session),
            rng,
        };
        trainer.set_level(options.level)?;
        Ok(trainer)
    }

    // ==================== State ====================

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn catalog(&self) -> &VocabularyCatalog {
        &self.catalog
    }

    /// The catalog drilling currently draws from
    pub fn active_catalog(&self) -> &VocabularyCatalog {
        &self.active
    }

    pub fn review_queue(&self) -> &ReviewQueue {
        &self.review
    }

    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn star(&self, vocab_id: u32) -> u8 {
        self.stars.get(&vocab_id).copied().unwrap_or(0)
    }

    pub fn is_bookmarked(&self, vocab_id: u32) -> bool {
        self.bookmarks.contains(&vocab_id)
    }

    /// Bookmarked entries in catalog order
    pub fn bookmarked_words(&self) -> Vec<&VocabularyEntry> {
        self.bookmarks
            .iter()
            .filter_map(|id| self.catalog.find(*id))
            .collect()
    }

    /// Restrict drilling to `level`, or lift the restriction with `None`
    pub fn set_level(&mut self, level: Option<u8>) -> Result<()> {
        self.active = match level {
            Some(level) => self.catalog.at_level(validate_level(level)?),
            None => self.catalog.clone(),
        };
        Ok(())
    }

    pub fn summary(&self, today: NaiveDate) -> StatsSummary {
        StatsSummary::for_user(&self.backend, &self.user, today)
    }

    // ==================== Selection ====================

    /// Next word to drill, biased away from mastered words
    pub fn select_word(&mut self) -> Result<VocabularyEntry> {
        let word = self
            .scheduler
            .select_word(&self.active, &self.stars, &mut self.rng)?;
        Ok(word.clone())
    }

    /// Next word from the review list
    pub fn select_review_word(&mut self) -> Result<VocabularyEntry> {
        let entry = self.review.select(&mut self.rng)?;
        self.catalog
            .find(entry.vocab_id)
            .cloned()
            .ok_or(TrainerError::UnknownWord(entry.vocab_id))
    }

    /// Build a question about `word`; distractors come from the full catalog
    pub fn generate(&mut self, word: &VocabularyEntry, mode: QuestionMode) -> Result<Question> {
        let question = self
            .generator
            .generate(word, &self.catalog, mode, &mut self.rng)?;
        Ok(question)
    }

    /// Select a word for `mode` and build a question about it
    pub fn next_question(&mut self, mode: QuestionMode) -> Result<Question> {
        let word = match mode {
            QuestionMode::Drill => self.select_word()?,
            QuestionMode::Review => self.select_review_word()?,
        };
        self.generate(&word, mode)
    }

    // ==================== Answers ====================

    /// Record an answer to `question`.
    ///
    /// Drill answers promote the word's star when correct and queue the word
    /// for review when wrong. Review answers only adjust the review weight.
    pub fn record_answer(
        &mut self,
        question: &Question,
        correct: bool,
        elapsed: Duration,
    ) -> Result<()> {
        let vocab_id = question.word.id;

        match question.mode {
            QuestionMode::Drill if correct => {
                let star = self.star(vocab_id);
                if star < MAX_STAR {
                    self.backend
                        .update_user_record(&self.user, vocab_id, star + 1)?;
                    self.stars.insert(vocab_id, star + 1);
                }
                log::debug!("Word {} answered correctly, star {}", vocab_id, self.star(vocab_id));
            }
            QuestionMode::Drill => {
                self.backend
                    .add_to_review_list(&self.user, vocab_id, INITIAL_REVIEW_WEIGHT)?;
                self.review.insert(vocab_id);
                log::debug!("Word {} missed, queued for review", vocab_id);
            }
            QuestionMode::Review => match self.review.weight(vocab_id) {
                Some(weight) => {
                    let next = review::next_weight(weight, correct);
                    self.backend
                        .update_review_weight(&self.user, vocab_id, next)?;
                    self.review.record_outcome(vocab_id, correct);
                    log::debug!("Review weight of word {} now {:.2}", vocab_id, next);
                }
                None => {
                    log::warn!("Review answer for word {} which is not queued", vocab_id);
                }
            },
        }

        self.recorder.record(correct, elapsed);
        Ok(())
    }

    /// Bookmark a word. Returns false if it was bookmarked already.
    pub fn bookmark(&mut self, word: &VocabularyEntry) -> Result<bool> {
        if self.bookmarks.contains(&word.id) {
            return Ok(false);
        }
        self.backend.add_bookmark(&self.user, word.id)?;
        self.bookmarks.insert(word.id);
        Ok(true)
    }

    pub fn remove_bookmark(&mut self, vocab_id: u32) -> Result<bool> {
        let removed = self.backend.remove_bookmark(&self.user, vocab_id)?;
        self.bookmarks.remove(&vocab_id);
        Ok(removed)
    }

    pub fn remove_from_review(&mut self, vocab_id: u32) -> Result<bool> {
        let removed = self
            .backend
            .remove_from_review_list(&self.user, vocab_id)?;
        self.review.remove(vocab_id);
        Ok(removed)
    }

    // ==================== Session ====================

    /// Add the session's totals to `date`. Calling this twice double-counts.
    pub fn flush_session(&mut self, date: NaiveDate) -> Result<()> {
        self.recorder.flush(&mut self.backend, &self.user, date)?;
        Ok(())
    }

    /// Flush the session and start a fresh one, returning the finished session
    pub fn finish_session(&mut self, date: NaiveDate) -> Result<SessionRecorder> {
        self.flush_session(date)?;
        let fresh = SessionRecorder::new(self.recorder.planned());
        Ok(mem::replace(&mut self.recorder, fresh))
    }

    /// Close the backend and hand it back
    pub fn close(mut self) -> Result<B> {
        self.backend.close()?;
        log::info!("Closed trainer for {}", self.user);
        Ok(self.backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FlatFileBackend, RelationalBackend};
    use tempfile::TempDir;

    fn vocabulary() -> Vec<VocabularyEntry> {
        let words = [
            ("一", "one", 1),
            ("二", "two", 1),
            ("三", "three", 1),
            ("四", "four", 1),
            ("五", "five", 2),
            ("六", "six", 2),
        ];
        words
            .iter()
            .enumerate()
            .map(|(i, (zh, en, level))| {
                VocabularyEntry::new(i as u32 + 1, *level)
                    .with_text(Language::Chinese, *zh)
                    .with_text(Language::English, *en)
            })
            .collect()
    }

    fn open_trainer() -> Trainer<RelationalBackend> {
        let mut backend = RelationalBackend::in_memory();
        backend.connect().unwrap();
        backend.import_vocabulary(&vocabulary()).unwrap();
        Trainer::open_with_rng(
            backend,
            "kai",
            TrainerOptions::default(),
            StdRng::seed_from_u64(17),
        )
        .unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 1).unwrap()
    }

    #[test]
    fn test_review_entries_outside_catalog_are_skipped() {
        let mut backend = RelationalBackend::in_memory();
        backend.connect().unwrap();
        backend.import_vocabulary(&vocabulary()).unwrap();
        backend.add_to_review_list("kai", 1, 10.0).unwrap();
        backend.add_to_review_list("kai", 999, 50.0).unwrap();

        let mut trainer = Trainer::open_with_rng(
            backend,
            "kai",
            TrainerOptions::default(),
            StdRng::seed_from_u64(3),
        )
        .unwrap();

        assert_eq!(trainer.review_queue().len(), 1);
        assert!(!trainer.review_queue().contains(999));
        for _ in 0..100 {
            let question = trainer.next_question(QuestionMode::Review).unwrap();
            assert_eq!(question.word.id, 1);
        }
        // The stored entry is left for a catalog that may gain the word later
        assert_eq!(trainer.backend().get_review_list("kai").len(), 2);
    }

    #[test]
    fn test_correct_drill_answers_promote_up_to_cap() {
        let mut trainer = open_trainer();
        let word = trainer.catalog().find(2).unwrap().clone();
        let question = trainer.generate(&word, QuestionMode::Drill).unwrap();

        for _ in 0..5 {
            trainer
                .record_answer(&question, true, Duration::from_secs(1))
                .unwrap();
        }

        assert_eq!(trainer.star(2), MAX_STAR);
        let stored = trainer.backend().get_user_records("kai");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].star, MAX_STAR);
    }

    #[test]
    fn test_wrong_drill_answer_queues_without_demoting() {
        let mut trainer = open_trainer();
        let word = trainer.catalog().find(3).unwrap().clone();
        let question = trainer.generate(&word, QuestionMode::Drill).unwrap();

        trainer
            .record_answer(&question, true, Duration::from_secs(1))
            .unwrap();
        trainer
            .record_answer(&question, false, Duration::from_secs(1))
            .unwrap();
        trainer
            .record_answer(&question, false, Duration::from_secs(1))
            .unwrap();

        assert_eq!(trainer.star(3), 1);
        assert_eq!(trainer.review_queue().weight(3), Some(INITIAL_REVIEW_WEIGHT));
        let stored = trainer.backend().get_review_list("kai");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].weight, INITIAL_REVIEW_WEIGHT);
    }

    #[test]
    fn test_review_answers_adjust_weight_only() {
        let mut trainer = open_trainer();
        let word = trainer.catalog().find(4).unwrap().clone();
        let drill = trainer.generate(&word, QuestionMode::Drill).unwrap();
        trainer
            .record_answer(&drill, false, Duration::from_secs(1))
            .unwrap();

        let question = trainer.next_question(QuestionMode::Review).unwrap();
        assert_eq!(question.word.id, 4);
        trainer
            .record_answer(&question, false, Duration::from_secs(1))
            .unwrap();
        trainer
            .record_answer(&question, false, Duration::from_secs(1))
            .unwrap();

        let stored = trainer.backend().get_review_list("kai");
        assert!((stored[0].weight - 14.4).abs() < 1e-9);
        assert_eq!(trainer.review_queue().weight(4), Some(stored[0].weight));
        assert_eq!(trainer.star(4), 0);
    }

    #[test]
    fn test_empty_review_list() {
        let mut trainer = open_trainer();
        assert!(matches!(
            trainer.select_review_word(),
            Err(TrainerError::Scheduler(SchedulerError::EmptyCollection(_)))
        ));
    }

    #[test]
    fn test_level_restricts_drilling() {
        let mut trainer = open_trainer();
        trainer.set_level(Some(2)).unwrap();
        for _ in 0..50 {
            assert_eq!(trainer.select_word().unwrap().level, 2);
        }
        assert!(matches!(
            trainer.set_level(Some(7)),
            Err(TrainerError::Catalog(CatalogError::InvalidLevel(7)))
        ));
    }

    #[test]
    fn test_bookmark_is_idempotent() {
        let mut trainer = open_trainer();
        let word = trainer.catalog().find(1).unwrap().clone();

        assert!(trainer.bookmark(&word).unwrap());
        assert!(!trainer.bookmark(&word).unwrap());
        assert_eq!(trainer.bookmarked_words().len(), 1);
        assert_eq!(trainer.backend().get_bookmarks("kai").len(), 1);

        assert!(trainer.remove_bookmark(1).unwrap());
        assert!(!trainer.is_bookmarked(1));
    }

    #[test]
    fn test_finish_session_resets_recorder() {
        let mut trainer = open_trainer();
        for _ in 0..3 {
            let question = trainer.next_question(QuestionMode::Drill).unwrap();
            trainer
                .record_answer(&question, true, Duration::from_millis(500))
                .unwrap();
        }

        let finished = trainer.finish_session(today()).unwrap();
        assert_eq!(finished.total(), 3);
        assert_eq!(trainer.recorder().total(), 0);

        // Nothing new to count
        trainer.finish_session(today()).unwrap();
        let stats = trainer.backend().get_daily_stats("kai");
        assert_eq!((stats[0].total, stats[0].correct), (3, 3));
    }

    #[test]
    fn test_answers_before_failed_question_are_flushed() {
        let mut trainer = open_trainer();
        let question = trainer.next_question(QuestionMode::Drill).unwrap();
        trainer
            .record_answer(&question, true, Duration::from_secs(2))
            .unwrap();

        // Nothing has been missed yet, so review mode cannot produce a question
        assert!(matches!(
            trainer.next_question(QuestionMode::Review),
            Err(TrainerError::Scheduler(SchedulerError::EmptyCollection(_)))
        ));

        let finished = trainer.finish_session(today()).unwrap();
        assert_eq!(finished.correct_count(), 1);
        let stats = trainer.backend().get_daily_stats("kai");
        assert_eq!((stats[0].total, stats[0].correct, stats[0].wrong), (1, 1, 0));
    }

    #[test]
    fn test_state_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        FlatFileBackend::init(temp_dir.path()).unwrap();
        let mut backend = FlatFileBackend::new(temp_dir.path().to_path_buf());
        backend.connect().unwrap();
        backend.import_vocabulary(&vocabulary()).unwrap();

        let mut trainer = Trainer::open(backend, "kai", TrainerOptions::default()).unwrap();
        let word = trainer.catalog().find(5).unwrap().clone();
        let question = trainer.generate(&word, QuestionMode::Drill).unwrap();
        trainer
            .record_answer(&question, true, Duration::from_secs(1))
            .unwrap();
        trainer.bookmark(&word).unwrap();
        let backend = trainer.close().unwrap();
        assert!(!backend.is_connected());

        let reopened = Trainer::open(
            FlatFileBackend::new(temp_dir.path().to_path_buf()),
            "kai",
            TrainerOptions::default(),
        )
        .unwrap();
        assert_eq!(reopened.star(5), 1);
        assert!(reopened.is_bookmarked(5));
    }

    #[test]
    fn test_rejects_same_languages() {
        let options = TrainerOptions {
            study_language: Language::Chinese,
            ..TrainerOptions::default()
        };
        assert!(matches!(
            Trainer::open(RelationalBackend::in_memory(), "kai", options),
            Err(TrainerError::SameLanguage(Language::Chinese))
        ));
    }
}
