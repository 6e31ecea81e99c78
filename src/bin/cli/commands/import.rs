use std::path::Path;

use anyhow::{Context, Result};

use lexidrill::catalog::read_catalog_csv;
use lexidrill::{PersistenceBackend, VocabularyCatalog};

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, csv: &Path, format: &OutputFormat) -> Result<()> {
    let mut backend = app.backend()?;

    let next_id = VocabularyCatalog::new(backend.get_vocabulary(None))
        .max_id()
        .map_or(0, |max| max + 1);
    let entries = read_catalog_csv(csv, next_id)
        .with_context(|| format!("Failed to read {}", csv.display()))?;
    let added = backend
        .import_vocabulary(&entries)
        .context("Failed to store vocabulary")?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "read": entries.len(),
                "added": added,
                "skipped": entries.len() - added,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!(
                "Imported {} of {} entries from {}",
                added,
                entries.len(),
                csv.display()
            );
            if added < entries.len() {
                println!("{} entries already existed and were skipped", entries.len() - added);
            }
        }
    }

    Ok(())
}
