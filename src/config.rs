//! TOML configuration.
//!
//! ```toml
//! [explain]
//! threads = 4
//! mode = "iterative"
//!
//! [storage]
//! database = "span.sqlite"
//!
//! [logging]
//! filter = "info"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::search::{ExplorationMode, SearchOptions, DEFAULT_WORKERS};

/// Database file used when none is configured.
pub const DEFAULT_DATABASE: &str = "span.sqlite";

/// Loaded configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SpanConfig {
    /// Explain settings.
    #[serde(default)]
    pub explain: ExplainSection,
    /// Where spans are persisted.
    #[serde(default)]
    pub storage: StorageSection,
    /// Log filter.
    #[serde(default)]
    pub logging: LoggingSection,
}

/// `[explain]` table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExplainSection {
    /// Concurrent explains per search.
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Exploration strategy.
    #[serde(default)]
    pub mode: ExplorationMode,
}

impl Default for ExplainSection {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            mode: ExplorationMode::default(),
        }
    }
}

/// `[storage]` table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StorageSection {
    /// SQLite database file.
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

/// `[logging]` table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingSection {
    /// `tracing` filter directive.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_threads() -> usize {
    DEFAULT_WORKERS
}

fn default_database() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE)
}

fn default_filter() -> String {
    "info".to_string()
}

impl SpanConfig {
    /// Loads `explicit`, or the default location when `None`.
    ///
    /// A missing file at the default location yields the defaults; a missing
    /// explicit file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => read_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => read_file(&path)?,
                _ => SpanConfig::default(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: SpanConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.explain.threads == 0 {
            return Err(ConfigError::Invalid(
                "explain.threads must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Engine options described by `[explain]`.
    pub fn search_options(&self) -> Result<SearchOptions, ConfigError> {
        SearchOptions::new(self.explain.threads, self.explain.mode)
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}

fn read_file(path: &Path) -> Result<SpanConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// `hintspan/config.toml` under the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("hintspan").join("config.toml"))
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Offending file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// File is not valid TOML for this schema.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Offending file.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },
    /// Values parse but cannot be used.
    #[error("invalid config: {0}")]
    Invalid(String),
}
