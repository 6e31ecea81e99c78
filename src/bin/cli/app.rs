use std::path::Path;

use anyhow::{Context, Result};

use lexidrill::config::default_config_path;
use lexidrill::storage::{BackendPool, PooledBackend};
use lexidrill::{Config, Trainer};

/// Shared application state for CLI commands
pub struct App {
    pub config: Config,
    pub pool: BackendPool,
}

impl App {
    /// Load the config and set up the backend pool
    pub fn new(config_path: Option<&Path>, user: Option<&str>) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path.to_path_buf(),
            None => default_config_path().context("Failed to locate config directory")?,
        };

        let mut config = Config::load(&config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
        if let Some(user) = user {
            config.user = user.to_string();
            config.validate().context("Invalid --user")?;
        }

        let pool = config
            .backend_pool()
            .with_context(|| format!("Failed to prepare {}", config.backend.path().display()))?;

        Ok(Self { config, pool })
    }

    pub fn user(&self) -> &str {
        &self.config.user
    }

    /// Lease the configured backend
    pub fn backend(&self) -> Result<PooledBackend> {
        self.pool
            .acquire()
            .with_context(|| format!("Failed to open {}", self.config.backend.path().display()))
    }

    /// Open a trainer for the current user
    pub fn trainer(&self, level: Option<u8>) -> Result<Trainer<PooledBackend>> {
        let options = self.config.trainer_options(level);
        Trainer::open(self.backend()?, self.user(), options).context("Failed to start session")
    }

    pub fn close(&self) -> Result<()> {
        self.pool.close_all().context("Failed to close backend")
    }
}
