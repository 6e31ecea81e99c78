use std::path::Path;

use anyhow::{bail, Context, Result};

use lexidrill::config::default_config_path;
use lexidrill::Config;

pub fn run(config_path: Option<&Path>, user: Option<&str>, force: bool) -> Result<()> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => default_config_path().context("Failed to locate config directory")?,
    };

    if path.exists() && !force {
        bail!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    let mut config = Config::default();
    if let Some(user) = user {
        config.user = user.to_string();
    }
    config
        .save(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Wrote {}", path.display());
    println!("Data will be stored at {}", config.backend.path().display());
    Ok(())
}
