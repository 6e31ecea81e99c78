use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use lexidrill::storage::transfer;
use lexidrill::{BackendConfig, PersistenceBackend};

use crate::app::App;
use crate::{BackendKind, OutputFormat};

pub fn run(app: &App, to_type: BackendKind, to_path: PathBuf, format: &OutputFormat) -> Result<()> {
    let target_config = match to_type {
        BackendKind::FlatFile => BackendConfig::FlatFile { path: to_path },
        BackendKind::Relational => BackendConfig::Relational { path: to_path },
    };
    if target_config == app.config.backend {
        bail!("Source and target are the same backend");
    }

    let source = app.backend()?;
    let mut target = target_config
        .connect()
        .with_context(|| format!("Failed to open target {}", target_config.path().display()))?;

    let report = transfer(&source, target.as_mut(), None).context("Transfer failed")?;
    target.close().context("Failed to close target")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Plain => {
            println!("Copied into {}:", target_config.path().display());
            println!("  Vocabulary entries: {}", report.vocabulary);
            println!("  Users:              {}", report.users);
            println!("  Mastery records:    {}", report.records);
            println!("  Review entries:     {}", report.review_entries);
            println!("  Bookmarks:          {}", report.bookmarks);
            println!("  Daily statistics:   {}", report.daily_stats);
        }
    }
    Ok(())
}
