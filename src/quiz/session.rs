//! Per-session answer tracking.

use std::time::Duration;

use chrono::NaiveDate;

use crate::storage::{PersistenceBackend, Result};

/// Planned questions per session unless configured otherwise
pub const DEFAULT_QUESTIONS_PER_SESSION: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerRecord {
    pub correct: bool,
    pub elapsed: Duration,
}

/// Counts and timings of the answers given in one session
#[derive(Debug, Clone)]
pub struct SessionRecorder {
    correct: u32,
    wrong: u32,
    answers: Vec<AnswerRecord>,
    planned: usize,
}

impl Default for SessionRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_QUESTIONS_PER_SESSION)
    }
}

impl SessionRecorder {
    /// Recorder for a session of `planned` questions
    pub fn new(planned: usize) -> Self {
        Self {
            correct: 0,
            wrong: 0,
            answers: Vec::new(),
            planned,
        }
    }

    pub fn record(&mut self, correct: bool, elapsed: Duration) {
        if correct {
            self.correct += 1;
        } else {
            self.wrong += 1;
        }
        self.answers.push(AnswerRecord { correct, elapsed });
    }

    pub fn correct_count(&self) -> u32 {
        self.correct
    }

    pub fn wrong_count(&self) -> u32 {
        self.wrong
    }

    pub fn total(&self) -> u32 {
        self.correct + self.wrong
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    pub fn planned(&self) -> usize {
        self.planned
    }

    /// Percentage of correct answers; 100 before anything is answered
    pub fn accuracy(&self) -> f64 {
        match self.total() {
            0 => 100.0,
            total => f64::from(self.correct) * 100.0 / f64::from(total),
        }
    }

    pub fn total_time(&self) -> Duration {
        self.answers.iter().map(|a| a.elapsed).sum()
    }

    /// Mean time per answer, zero before anything is answered
    pub fn average_time(&self) -> Duration {
        match u32::try_from(self.answers.len()) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(count) => self.total_time() / count,
        }
    }

    /// Percentage of the planned questions answered, capped at 100
    pub fn progress(&self) -> u8 {
        if self.planned == 0 {
            return 100;
        }
        let percent = self.answers.len() * 100 / self.planned;
        percent.min(100) as u8
    }

    pub fn is_complete(&self) -> bool {
        self.answers.len() >= self.planned
    }

    /// Add this session's totals to the user's statistics for `date`.
    ///
    /// Flushing twice counts the answers twice. An empty session writes nothing.
    pub fn flush(
        &self,
        backend: &mut dyn PersistenceBackend,
        user: &str,
        date: NaiveDate,
    ) -> Result<()> {
        if self.total() == 0 {
            log::debug!("Nothing answered, skipping statistics flush");
            return Ok(());
        }

        backend.update_daily_stats(user, date, self.total(), self.correct, self.wrong)?;
        log::info!(
            "Flushed session for {} on {}: {} answered, {} correct",
            user,
            date,
            self.total(),
            self.correct
        );
        Ok(())
    }
}
