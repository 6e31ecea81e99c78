//! Data models for the vocabulary catalog

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest difficulty tier
pub const MIN_LEVEL: u8 = 1;

/// Highest difficulty tier
pub const MAX_LEVEL: u8 = 3;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid level {0}, expected {MIN_LEVEL}..={MAX_LEVEL}")]
    InvalidLevel(u8),

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),
}

/// Check that a difficulty level is one the catalog knows about
pub fn validate_level(level: u8) -> Result<u8, CatalogError> {
    if (MIN_LEVEL..=MAX_LEVEL).contains(&level) {
        Ok(level)
    } else {
        Err(CatalogError::InvalidLevel(level))
    }
}

/// A language a vocabulary entry can carry text for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Chinese,
    English,
    Japanese,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Chinese, Language::English, Language::Japanese];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Chinese => "Chinese",
            Self::English => "English",
            Self::Japanese => "Japanese",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CatalogError::UnknownLanguage(s.to_string()))
    }
}

/// A single vocabulary entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntry {
    pub id: u32,
    pub level: u8,
    #[serde(default)]
    pub text: BTreeMap<Language, String>,
}

impl VocabularyEntry {
    pub fn new(id: u32, level: u8) -> Self {
        Self {
            id,
            level,
            text: BTreeMap::new(),
        }
    }

    /// Builder-style setter; blank text is treated as absent
    pub fn with_text(mut self, language: Language, text: impl Into<String>) -> Self {
        self.set_text(language, text);
        self
    }

    pub fn set_text(&mut self, language: Language, text: impl Into<String>) {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            self.text.remove(&language);
        } else {
            self.text.insert(language, trimmed.to_string());
        }
    }

    pub fn text(&self, language: Language) -> Option<&str> {
        self.text.get(&language).map(String::as_str)
    }

    /// Text in the given language, or an empty string when the entry has none
    pub fn text_or_empty(&self, language: Language) -> &str {
        self.text(language).unwrap_or("")
    }
}

/// The set of entries a session draws questions from.
///
/// Entries are kept ordered by id. Schedulers address entries by position,
/// so a level-filtered catalog with gaps in its ids works the same way as
/// the full one.
#[derive(Debug, Clone, Default)]
pub struct VocabularyCatalog {
    entries: Vec<VocabularyEntry>,
}

impl VocabularyCatalog {
    pub fn new(mut entries: Vec<VocabularyEntry>) -> Self {
        entries.sort_by_key(|e| e.id);
        let before = entries.len();
        entries.dedup_by_key(|e| e.id);
        if entries.len() < before {
            log::warn!(
                "Catalog contained {} duplicate ids; keeping the first of each",
                before - entries.len()
            );
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[VocabularyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at a position in the catalog
    pub fn get(&self, position: usize) -> Option<&VocabularyEntry> {
        self.entries.get(position)
    }

    /// Entry with the given vocabulary id
    pub fn find(&self, id: u32) -> Option<&VocabularyEntry> {
        self.entries
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|pos| &self.entries[pos])
    }

    /// Sub-catalog restricted to one difficulty level
    pub fn at_level(&self, level: u8) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|e| e.level == level)
                .cloned()
                .collect(),
        }
    }

    /// Largest id in the catalog, if any
    pub fn max_id(&self) -> Option<u32> {
        self.entries.last().map(|e| e.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u32, level: u8, zh: &str, en: &str) -> VocabularyEntry {
        VocabularyEntry::new(id, level)
            .with_text(Language::Chinese, zh)
            .with_text(Language::English, en)
    }

    #[test]
    fn test_catalog_orders_by_id_and_drops_duplicates() {
        let catalog = VocabularyCatalog::new(vec![
            entry(2, 1, "猫", "cat"),
            entry(0, 1, "狗", "dog"),
            entry(2, 1, "鸟", "bird"),
            entry(1, 2, "鱼", "fish"),
        ]);

        let ids: Vec<u32> = catalog.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(catalog.find(2).unwrap().text(Language::English), Some("cat"));
        assert!(catalog.find(7).is_none());
        assert_eq!(catalog.max_id(), Some(2));
        assert_eq!(VocabularyCatalog::default().max_id(), None);
    }

    #[test]
    fn test_at_level_filters() {
        let catalog = VocabularyCatalog::new(vec![
            entry(0, 1, "狗", "dog"),
            entry(1, 2, "鱼", "fish"),
            entry(2, 1, "猫", "cat"),
        ]);

        let level_one = catalog.at_level(1);
        assert_eq!(level_one.len(), 2);
        assert_eq!(level_one.get(1).unwrap().id, 2);
        assert!(catalog.at_level(3).is_empty());
    }

    #[test]
    fn test_blank_text_is_absent() {
        let e = VocabularyEntry::new(0, 1)
            .with_text(Language::English, "  ")
            .with_text(Language::Japanese, " 犬 ");
        assert_eq!(e.text(Language::English), None);
        assert_eq!(e.text(Language::Japanese), Some("犬"));
        assert_eq!(e.text_or_empty(Language::English), "");
    }

    #[test]
    fn test_language_parsing() {
        assert_eq!("english".parse::<Language>().unwrap(), Language::English);
        assert_eq!("Chinese".parse::<Language>().unwrap(), Language::Chinese);
        assert!("klingon".parse::<Language>().is_err());
    }

    #[test]
    fn test_validate_level() {
        assert_eq!(validate_level(2).unwrap(), 2);
        assert!(matches!(validate_level(0), Err(CatalogError::InvalidLevel(0))));
        assert!(validate_level(4).is_err());
    }
}
