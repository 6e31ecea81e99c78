use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Highest mastery level a word can reach
pub const MAX_STAR: u8 = 3;

/// Weight given to a word when it first enters the review list
pub const INITIAL_REVIEW_WEIGHT: f64 = 10.0;

/// Upper bound on any stored review weight
pub const MAX_REVIEW_WEIGHT: f64 = 50.0;

/// Clamp a review weight into the storable range `[0, MAX_REVIEW_WEIGHT]`
pub fn clamp_review_weight(weight: f64) -> f64 {
    weight.clamp(0.0, MAX_REVIEW_WEIGHT)
}

/// Per-user mastery of one vocabulary entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryRecord {
    pub vocab_id: u32,
    pub star: u8,
}

impl MasteryRecord {
    pub fn new(vocab_id: u32, star: u8) -> Self {
        Self {
            vocab_id,
            star: star.min(MAX_STAR),
        }
    }

    /// Record after one more correct answer; saturates at `MAX_STAR`
    pub fn promoted(&self) -> Self {
        Self::new(self.vocab_id, self.star.saturating_add(1))
    }
}

/// A word in a user's review list
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
    pub vocab_id: u32,
    pub weight: f64,
}

impl ReviewEntry {
    pub fn new(vocab_id: u32, weight: f64) -> Self {
        Self {
            vocab_id,
            weight: clamp_review_weight(weight),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub vocab_id: u32,
}

/// Answer totals for one user on one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    pub date: NaiveDate,
    pub total: u32,
    pub correct: u32,
    pub wrong: u32,
}

impl DailyStat {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            total: 0,
            correct: 0,
            wrong: 0,
        }
    }

    /// Add another batch of answers onto this day's totals
    pub fn accumulate(&mut self, total: u32, correct: u32, wrong: u32) {
        self.total = self.total.saturating_add(total);
        self.correct = self.correct.saturating_add(correct);
        self.wrong = self.wrong.saturating_add(wrong);
    }
}

/// Format a date the way both backends store it
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
