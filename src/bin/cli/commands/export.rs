use std::path::Path;

use anyhow::{Context, Result};

use lexidrill::storage::export_user_to_json;

use crate::app::App;

pub fn run(app: &App, output: &Path) -> Result<()> {
    let backend = app.backend()?;
    let export = export_user_to_json(&backend, app.user(), output)
        .with_context(|| format!("Failed to export to {}", output.display()))?;

    println!(
        "Exported {} records, {} review entries, {} bookmarks and {} days of statistics to {}",
        export.records.len(),
        export.review_list.len(),
        export.bookmarks.len(),
        export.daily_stats.len(),
        output.display()
    );
    Ok(())
}
