//! Aggregate statistics over a user's daily records.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::storage::{DailyStat, PersistenceBackend};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    /// Days with at least one answer
    pub total_days: u32,
    pub total_answered: u32,
    pub total_correct: u32,
    pub total_wrong: u32,
    /// Percentage correct, 0 when nothing was answered
    pub accuracy: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub bookmark_count: usize,
    pub review_count: usize,
    pub mastered_count: usize,
}

impl StatsSummary {
    /// Summarise daily records as of `today`
    pub fn from_daily_stats(stats: &[DailyStat], today: NaiveDate) -> Self {
        let mut dates: Vec<NaiveDate> = stats
            .iter()
            .filter(|s| s.total > 0)
            .map(|s| s.date)
            .collect();
        dates.sort();
        dates.dedup();

        let total_correct: u32 = stats.iter().map(|s| s.correct).sum();
        let total_wrong: u32 = stats.iter().map(|s| s.wrong).sum();
        let total_answered = total_correct + total_wrong;
        let accuracy = if total_answered > 0 {
            f64::from(total_correct) * 100.0 / f64::from(total_answered)
        } else {
            0.0
        };

        Self {
            total_days: dates.len() as u32,
            total_answered,
            total_correct,
            total_wrong,
            accuracy,
            current_streak: current_streak(&dates, today),
            longest_streak: longest_streak(&dates),
            bookmark_count: 0,
            review_count: 0,
            mastered_count: 0,
        }
    }

    /// Summarise everything a backend holds for `user`
    pub fn for_user(backend: &dyn PersistenceBackend, user: &str, today: NaiveDate) -> Self {
        let mut summary = Self::from_daily_stats(&backend.get_daily_stats(user), today);
        summary.bookmark_count = backend.get_bookmarks(user).len();
        summary.review_count = backend.get_review_list(user).len();
        summary.mastered_count = backend
            .get_user_records(user)
            .iter()
            .filter(|r| r.star >= crate::storage::MAX_STAR)
            .count();
        summary
    }

    pub fn stats_for(stats: &[DailyStat], date: NaiveDate) -> Option<DailyStat> {
        stats.iter().find(|s| s.date == date).copied()
    }
}

/// Consecutive practice days ending today, or yesterday if today has no answers yet
fn current_streak(sorted_dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut check_date = today;
    if !sorted_dates.contains(&check_date) {
        check_date = check_date - Duration::days(1);
        if !sorted_dates.contains(&check_date) {
            return 0;
        }
    }

    let mut streak = 0;
    while sorted_dates.contains(&check_date) {
        streak += 1;
        check_date = check_date - Duration::days(1);
    }
    streak
}

fn longest_streak(sorted_dates: &[NaiveDate]) -> u32 {
    if sorted_dates.is_empty() {
        return 0;
    }

    let mut longest = 0;
    let mut current = 1;
    for pair in sorted_dates.windows(2) {
        if pair[1] - pair[0] == Duration::days(1) {
            current += 1;
        } else {
            longest = longest.max(current);
            current = 1;
        }
    }
    longest.max(current)
}
