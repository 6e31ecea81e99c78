//! Questions and session tracking
//!
//! This module provides:
//! - Question generation in three shapes with distractors
//! - Per-session answer counts, timings and progress

pub mod question;
pub mod session;

pub use question::{Question, QuestionGenerator, QuestionMode, QuestionShape};
pub use session::{AnswerRecord, SessionRecorder, DEFAULT_QUESTIONS_PER_SESSION};
