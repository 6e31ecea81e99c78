//! Mastery-biased word selection
//!
//! Rejection sampling over the catalog. A draw `x ~ Uniform(0, n)` lands in
//! the bucket of the entry at position `floor(x)`. The entry is accepted when
//! `x` falls in the upper `1 - star/3` of its bucket, so well-known words are
//! picked less often without keeping a probability table per word:
//!
//! | star | window |
//! |------|--------|
//! | 0    | 1      |
//! | 1    | 2/3    |
//! | 2    | 1/3    |
//! | 3    | 0      |

use std::collections::HashMap;

use rand::Rng;

use super::{Result, SchedulerError};
use crate::catalog::{VocabularyCatalog, VocabularyEntry};
use crate::storage::MAX_STAR;

/// Draws per selection before falling back to the last candidate
pub const MAX_ATTEMPTS: usize = 10;

/// Length of the acceptance window for a word at `star`
pub fn acceptance_window(star: u8) -> f64 {
    1.0 - f64::from(star.min(MAX_STAR)) / f64::from(MAX_STAR)
}

/// Picks the next word to drill
#[derive(Debug, Clone)]
pub struct MasteryScheduler {
    max_attempts: usize,
}

impl Default for MasteryScheduler {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
        }
    }
}

impl MasteryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scheduler with a custom attempt bound (at least one draw)
    pub fn with_max_attempts(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Select a word, biased away from entries with a high star.
    ///
    /// `stars` maps vocabulary ids to their star; missing ids count as 0.
    pub fn select_word<'a, R: Rng + ?Sized>(
        &self,
        catalog: &'a VocabularyCatalog,
        stars: &HashMap<u32, u8>,
        rng: &mut R,
    ) -> Result<&'a VocabularyEntry> {
        let entries = catalog.entries();
        if entries.is_empty() {
            return Err(SchedulerError::EmptyCollection("vocabulary catalog"));
        }

        let n = entries.len() as f64;
        let mut candidate = &entries[0];

        for _ in 0..self.max_attempts {
            let x = rng.gen::<f64>() * n;
            // x < n always, but guard the float edge anyway
            let idx = (x.floor() as usize).min(entries.len() - 1);
            candidate = &entries[idx];

            let star = stars.get(&candidate.id).copied().unwrap_or(0);
            if accepts(idx, x, star) {
                return Ok(candidate);
            }
        }

        log::debug!(
            "No word accepted after {} draws, falling back to id {}",
            self.max_attempts,
            candidate.id
        );
        Ok(candidate)
    }
}

/// `p >= x >= p - 1 + star/3` with the 1-based position `p = idx + 1`
fn accepts(idx: usize, x: f64, star: u8) -> bool {
    let position = idx as f64 + 1.0;
    let floor = position - acceptance_window(star);
    position >= x && x >= floor
}
