//! Review queue of previously missed words.
//!
//! Selection is proportional to each entry's weight. A correct answer makes
//! a word less urgent, a wrong one more urgent up to the weight cap. Entries
//! stay in the queue however low their weight falls.

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;

use super::{Result, SchedulerError};
use crate::storage::{clamp_review_weight, ReviewEntry, INITIAL_REVIEW_WEIGHT};

/// Weight multiplier after a correct review answer
pub const CORRECT_FACTOR: f64 = 0.8;

/// Weight multiplier after a wrong review answer
pub const WRONG_FACTOR: f64 = 1.2;

/// In-memory view of one user's review list
#[derive(Debug, Clone, Default)]
pub struct ReviewQueue {
    entries: Vec<ReviewEntry>,
}

impl ReviewQueue {
    pub fn new(entries: Vec<ReviewEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ReviewEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, vocab_id: u32) -> bool {
        self.entries.iter().any(|e| e.vocab_id == vocab_id)
    }

    pub fn weight(&self, vocab_id: u32) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.vocab_id == vocab_id)
            .map(|e| e.weight)
    }

    /// Add a missed word at the initial weight. Returns false if it was queued already.
    pub fn insert(&mut self, vocab_id: u32) -> bool {
        if self.contains(vocab_id) {
            return false;
        }
        self.entries
            .push(ReviewEntry::new(vocab_id, INITIAL_REVIEW_WEIGHT));
        true
    }

    pub fn remove(&mut self, vocab_id: u32) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.vocab_id != vocab_id);
        self.entries.len() < before
    }

    /// Weighted draw over the queue.
    ///
    /// Falls back to a uniform draw when the weights cannot form a
    /// distribution (all zero, for example).
    pub fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&ReviewEntry> {
        if self.entries.is_empty() {
            return Err(SchedulerError::EmptyCollection("review list"));
        }

        match WeightedIndex::new(self.entries.iter().map(|e| e.weight)) {
            Ok(dist) => Ok(&self.entries[dist.sample(rng)]),
            Err(e) => {
                log::debug!("Review weights unusable ({}), drawing uniformly", e);
                self.entries
                    .choose(rng)
                    .ok_or(SchedulerError::EmptyCollection("review list"))
            }
        }
    }

    /// Apply an answer to a queued word and return its new weight.
    ///
    /// Returns `None` when the word is not queued.
    pub fn record_outcome(&mut self, vocab_id: u32, correct: bool) -> Option<f64> {
        let entry = self.entries.iter_mut().find(|e| e.vocab_id == vocab_id)?;
        entry.weight = next_weight(entry.weight, correct);
        Some(entry.weight)
    }
}

/// Weight after one review answer
pub fn next_weight(weight: f64, correct: bool) -> f64 {
    if correct {
        clamp_review_weight(weight * CORRECT_FACTOR)
    } else {
        clamp_review_weight(weight * WRONG_FACTOR)
    }
}
