//! Configuration file handling
//!
//! ```toml
//! user = "default"
//! main_language = "chinese"
//! study_language = "english"
//! default_level = 2
//! questions_per_session = 30
//!
//! [backend]
//! type = "relational"
//! path = "/home/me/.local/share/lexidrill/lexidrill.db"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{Language, MAX_LEVEL, MIN_LEVEL};
use crate::quiz::DEFAULT_QUESTIONS_PER_SESSION;
use crate::storage::{
    BackendPool, FlatFileBackend, PersistenceBackend, RelationalBackend, SharedBackend,
};
use crate::trainer::TrainerOptions;

const APP_DIR: &str = "lexidrill";
const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "lexidrill.db";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine {0} directory")]
    DirNotFound(&'static str),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Which backend to use and where its data lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    /// CSV tables in a directory
    FlatFile { path: PathBuf },
    /// SQLite database file
    Relational { path: PathBuf },
}

impl BackendConfig {
    pub fn path(&self) -> &Path {
        match self {
            Self::FlatFile { path } | Self::Relational { path } => path,
        }
    }

    /// Create a missing flat-file data directory with empty tables
    pub fn prepare(&self) -> crate::storage::Result<()> {
        if let Self::FlatFile { path } = self {
            FlatFileBackend::init(path)?;
        }
        Ok(())
    }

    /// Build an unconnected backend
    pub fn build(&self) -> SharedBackend {
        match self {
            Self::FlatFile { path } => Box::new(FlatFileBackend::new(path.clone())),
            Self::Relational { path } => Box::new(RelationalBackend::open_file(path.clone())),
        }
    }

    /// Prepare, build and connect a backend
    pub fn connect(&self) -> crate::storage::Result<SharedBackend> {
        self.prepare()?;
        let mut backend = self.build();
        backend.connect()?;
        Ok(backend)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub user: String,
    pub main_language: Language,
    pub study_language: Language,
    pub default_level: u8,
    pub questions_per_session: usize,
    pub backend: BackendConfig,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = default_data_dir().unwrap_or_else(|_| PathBuf::from(APP_DIR));
        Self {
            user: "default".to_string(),
            main_language: Language::Chinese,
            study_language: Language::English,
            default_level: 2,
            questions_per_session: DEFAULT_QUESTIONS_PER_SESSION,
            backend: BackendConfig::Relational {
                path: data_dir.join(DATABASE_FILE),
            },
        }
    }
}

/// Default location of the config file
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join(APP_DIR).join(CONFIG_FILE))
        .ok_or(ConfigError::DirNotFound("config"))
}

/// Default directory for stored data
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::data_local_dir()
        .map(|p| p.join(APP_DIR))
        .ok_or(ConfigError::DirNotFound("data"))
}

impl Config {
    /// Load and validate a config file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config, creating its directory if needed
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.user.trim().is_empty() {
            return Err(ConfigError::Invalid("user must not be empty".to_string()));
        }
        if self.main_language == self.study_language {
            return Err(ConfigError::Invalid(format!(
                "main and study language are both {}",
                self.main_language
            )));
        }
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&self.default_level) {
            return Err(ConfigError::Invalid(format!(
                "default_level must be between {} and {}, got {}",
                MIN_LEVEL, MAX_LEVEL, self.default_level
            )));
        }
        if self.questions_per_session == 0 {
            return Err(ConfigError::Invalid(
                "questions_per_session must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Trainer options for drilling at `level` (the default level if `None`)
    pub fn trainer_options(&self, level: Option<u8>) -> TrainerOptions {
        TrainerOptions {
            main_language: self.main_language,
            study_language: self.study_language,
            level: Some(level.unwrap_or(self.default_level)),
            questions_per_session: self.questions_per_session,
        }
    }

    /// Build and connect the configured backend
    pub fn open_backend(&self) -> crate::storage::Result<SharedBackend> {
        self.backend.connect()
    }

    /// Pool over the configured backend; connects on first acquire
    pub fn backend_pool(&self) -> crate::storage::Result<BackendPool> {
        self.backend.prepare()?;
        let backend = self.backend.clone();
        Ok(BackendPool::new(move || backend.build()))
    }
}
