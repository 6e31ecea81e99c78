//! Word scheduling
//!
//! This module provides:
//! - Mastery-biased selection of the next word to drill
//! - The weighted review queue of previously missed words

pub mod mastery;
pub mod review;

use thiserror::Error;

pub use mastery::{acceptance_window, MasteryScheduler, MAX_ATTEMPTS};
pub use review::{ReviewQueue, CORRECT_FACTOR, WRONG_FACTOR};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Nothing to select from: {0}")]
    EmptyCollection(&'static str),

    #[error("Not enough distinct {language} translations for a {needed}-option question")]
    NotEnoughDistractors { language: String, needed: usize },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
