//! CSV catalog tables
//!
//! A catalog table has one row per entry:
//! ```text
//! id,level,chinese,english,japanese
//! 0,1,苹果,apple,りんご
//! ,2,图书馆,library,図書館
//! ```
//! The `id` column may be left blank; such rows receive dense ids following
//! the largest id already known.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::models::{validate_level, CatalogError, Language, VocabularyEntry};

type Result<T> = std::result::Result<T, CatalogError>;

/// One row of a catalog table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogRow {
    #[serde(default, alias = "ID")]
    pub id: Option<u32>,
    #[serde(alias = "Level")]
    pub level: u8,
    #[serde(default, alias = "Chinese")]
    pub chinese: Option<String>,
    #[serde(default, alias = "English")]
    pub english: Option<String>,
    #[serde(default, alias = "Japanese")]
    pub japanese: Option<String>,
}

impl CatalogRow {
    /// Build the entry for this row, using `id` when the row has none
    pub fn into_entry(self, id: u32) -> VocabularyEntry {
        let mut entry = VocabularyEntry::new(self.id.unwrap_or(id), self.level);
        for (language, text) in [
            (Language::Chinese, self.chinese),
            (Language::English, self.english),
            (Language::Japanese, self.japanese),
        ] {
            if let Some(text) = text {
                entry.set_text(language, text);
            }
        }
        entry
    }
}

impl From<&VocabularyEntry> for CatalogRow {
    fn from(entry: &VocabularyEntry) -> Self {
        Self {
            id: Some(entry.id),
            level: entry.level,
            chinese: entry.text(Language::Chinese).map(str::to_string),
            english: entry.text(Language::English).map(str::to_string),
            japanese: entry.text(Language::Japanese).map(str::to_string),
        }
    }
}

/// Read catalog rows from any reader.
///
/// Rows without an id get dense ids starting at `next_id`, or after the
/// largest id in the table if that is higher. Rows with an out-of-range level
/// are rejected.
pub fn read_catalog<R: Read>(reader: R, mut next_id: u32) -> Result<Vec<VocabularyEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for row in reader.deserialize::<CatalogRow>() {
        let row: CatalogRow = row?;
        validate_level(row.level)?;
        rows.push(row);
    }

    // Generated ids must not collide with ids given later in the same table
    if let Some(max_explicit) = rows.iter().filter_map(|r| r.id).max() {
        next_id = next_id.max(max_explicit.saturating_add(1));
    }

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let explicit = row.id;
        let entry = row.into_entry(next_id);
        if explicit.is_none() {
            next_id += 1;
        }
        entries.push(entry);
    }

    Ok(entries)
}

/// Read a catalog table from a CSV file
pub fn read_catalog_csv(path: &Path, next_id: u32) -> Result<Vec<VocabularyEntry>> {
    let file = std::fs::File::open(path)?;
    let entries = read_catalog(file, next_id)?;
    log::info!("Read {} catalog entries from {:?}", entries.len(), path);
    Ok(entries)
}
