//! Adaptive vocabulary drilling.
//!
//! A [`Trainer`] picks words for one user through the mastery scheduler or
//! the review queue, turns them into questions and writes every answer back
//! through a [`PersistenceBackend`]: CSV tables in a directory or a SQLite
//! database.

pub mod catalog;
pub mod config;
pub mod quiz;
pub mod scheduler;
pub mod stats;
pub mod storage;
pub mod trainer;

pub use catalog::{Language, VocabularyCatalog, VocabularyEntry};
pub use config::{BackendConfig, Config, ConfigError};
pub use quiz::{Question, QuestionGenerator, QuestionMode, QuestionShape, SessionRecorder};
pub use scheduler::{MasteryScheduler, ReviewQueue, SchedulerError};
pub use stats::StatsSummary;
pub use storage::{BackendPool, FlatFileBackend, PersistenceBackend, RelationalBackend, StorageError};
pub use trainer::{Trainer, TrainerError, TrainerOptions};
