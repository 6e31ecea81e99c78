//! Question generation
//!
//! Three shapes, picked uniformly:
//! - Forward: prompt in the main language, four options in the study language
//! - Reverse: prompt in the study language, four options in the main language
//! - True/false: a pairing to judge, answered with 是 (A) or 否 (C)

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::{Language, VocabularyCatalog, VocabularyEntry};
use crate::scheduler::{Result, SchedulerError};

/// Option keys for multiple-choice questions
pub const CHOICE_KEYS: [char; 4] = ['A', 'B', 'C', 'D'];

/// Key and label of the "true" answer
pub const TRUE_OPTION: (char, &str) = ('A', "是");

/// Key and label of the "false" answer
pub const FALSE_OPTION: (char, &str) = ('C', "否");

const DISTRACTOR_COUNT: usize = CHOICE_KEYS.len() - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestionShape {
    Forward,
    Reverse,
    TrueFalse,
}

impl QuestionShape {
    pub const ALL: [QuestionShape; 3] = [Self::Forward, Self::Reverse, Self::TrueFalse];
}

/// Which scheduler produced a question; decides how its answer is recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestionMode {
    Drill,
    Review,
}

impl fmt::Display for QuestionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drill => f.write_str("drill"),
            Self::Review => f.write_str("review"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub prompt: String,
    pub options: BTreeMap<char, String>,
    pub correct_key: char,
    pub word: VocabularyEntry,
    pub shape: QuestionShape,
    pub mode: QuestionMode,
}

impl Question {
    /// Whether `key` is the right answer; keys are case-insensitive
    pub fn is_correct(&self, key: char) -> bool {
        key.to_ascii_uppercase() == self.correct_key
    }

    pub fn has_option(&self, key: char) -> bool {
        self.options.contains_key(&key.to_ascii_uppercase())
    }

    /// Text of the correct option
    pub fn correct_text(&self) -> &str {
        self.options
            .get(&self.correct_key)
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Turns a selected word into a question for one language pair
#[derive(Debug, Clone)]
pub struct QuestionGenerator {
    main_language: Language,
    study_language: Language,
}

impl QuestionGenerator {
    pub fn new(main_language: Language, study_language: Language) -> Self {
        Self {
            main_language,
            study_language,
        }
    }

    pub fn main_language(&self) -> Language {
        self.main_language
    }

    pub fn study_language(&self) -> Language {
        self.study_language
    }

    /// Build a question of a random shape about `word`.
    ///
    /// Distractors and false pairings are drawn from `catalog`.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        word: &VocabularyEntry,
        catalog: &VocabularyCatalog,
        mode: QuestionMode,
        rng: &mut R,
    ) -> Result<Question> {
        let shape = QuestionShape::ALL[rng.gen_range(0..QuestionShape::ALL.len())];
        self.generate_shape(word, catalog, mode, shape, rng)
    }

    /// Build a question of a given shape
    pub fn generate_shape<R: Rng + ?Sized>(
        &self,
        word: &VocabularyEntry,
        catalog: &VocabularyCatalog,
        mode: QuestionMode,
        shape: QuestionShape,
        rng: &mut R,
    ) -> Result<Question> {
        let main = self.main_language;
        let study = self.study_language;

        let (prompt, options, correct_key) = match shape {
            QuestionShape::Forward => {
                let prompt = format!("{}的{}是什么？", word.text_or_empty(main), study);
                let (options, key) =
                    choice_options(word.text_or_empty(study), study, catalog, rng)?;
                (prompt, options, key)
            }
            QuestionShape::Reverse => {
                let prompt = format!("{}的{}是什么？", word.text_or_empty(study), main);
                let (options, key) =
                    choice_options(word.text_or_empty(main), main, catalog, rng)?;
                (prompt, options, key)
            }
            QuestionShape::TrueFalse => {
                let target = if rng.gen_bool(0.5) {
                    word
                } else {
                    self.false_pairing(word, catalog, rng).unwrap_or(word)
                };
                let prompt = format!(
                    "判断{}的{}是否为{}？",
                    target.text_or_empty(main),
                    study,
                    word.text_or_empty(study)
                );
                let options = BTreeMap::from([
                    (TRUE_OPTION.0, TRUE_OPTION.1.to_string()),
                    (FALSE_OPTION.0, FALSE_OPTION.1.to_string()),
                ]);
                let key = if target.id == word.id {
                    TRUE_OPTION.0
                } else {
                    FALSE_OPTION.0
                };
                (prompt, options, key)
            }
        };

        log::debug!(
            "Generated {:?} {} question for word {}",
            shape,
            mode,
            word.id
        );

        Ok(Question {
            prompt,
            options,
            correct_key,
            word: word.clone(),
            shape,
            mode,
        })
    }

    /// A different entry whose pairing with `word` makes a false statement
    fn false_pairing<'a, R: Rng + ?Sized>(
        &self,
        word: &VocabularyEntry,
        catalog: &'a VocabularyCatalog,
        rng: &mut R,
    ) -> Option<&'a VocabularyEntry> {
        let candidates: Vec<&VocabularyEntry> = catalog
            .entries()
            .iter()
            .filter(|e| {
                e.id != word.id
                    && e.text(self.main_language).is_some()
                    && e.text(self.main_language) != word.text(self.main_language)
                    && e.text(self.study_language) != word.text(self.study_language)
            })
            .collect();

        let chosen = candidates.choose(rng).copied();
        if chosen.is_none() {
            log::debug!("No false pairing available for word {}, asking the true one", word.id);
        }
        chosen
    }
}

/// Shuffle the answer in among three distinct distractors
fn choice_options<R: Rng + ?Sized>(
    answer: &str,
    language: Language,
    catalog: &VocabularyCatalog,
    rng: &mut R,
) -> Result<(BTreeMap<char, String>, char)> {
    let pool: Vec<&str> = catalog
        .entries()
        .iter()
        .filter_map(|e| e.text(language))
        .filter(|text| *text != answer)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    if pool.len() < DISTRACTOR_COUNT {
        return Err(SchedulerError::NotEnoughDistractors {
            language: language.to_string(),
            needed: CHOICE_KEYS.len(),
        });
    }

    let mut texts: Vec<&str> = pool
        .choose_multiple(rng, DISTRACTOR_COUNT)
        .copied()
        .collect();
    texts.push(answer);
    texts.shuffle(rng);

    let mut options = BTreeMap::new();
    let mut correct_key = CHOICE_KEYS[0];
    for (key, text) in CHOICE_KEYS.into_iter().zip(texts) {
        if text == answer {
            correct_key = key;
        }
        options.insert(key, text.to_string());
    }
    Ok((options, correct_key))
}
