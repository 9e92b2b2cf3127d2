//! Configuration for the repertoire shell
//!
//! Values come from, highest precedence first: command-line flags, an
//! optional TOML file, built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::Level;

use repertoire_engine::RecordLayout;

/// Data file used when nothing else is configured
pub const DEFAULT_DATA_FILE: &str = "client_list.txt";

/// Shell configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the fixed-width data file
    pub data_file: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Field widths of the data file
    pub layout: RecordLayout,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            log_level: "warn".to_string(),
            layout: RecordLayout::default(),
        }
    }
}

/// Values given on the command line; `None` keeps the configured value
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data_file: Option<PathBuf>,
    pub name_width: Option<usize>,
    pub log_level: Option<String>,
}

impl Config {
    /// Read a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Parse TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        Ok(config)
    }

    /// Build the effective configuration
    pub fn resolve(file: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let base = match file {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };
        let config = base.with_overrides(overrides);
        config
            .layout
            .validate()
            .with_context(|| format!("name width {}", config.layout.name_width))?;
        Ok(config)
    }

    fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(path) = overrides.data_file {
            self.data_file = path;
        }
        if let Some(width) = overrides.name_width {
            self.layout.name_width = width;
        }
        if let Some(level) = overrides.log_level {
            self.log_level = level;
        }
        self
    }

    /// Tracing level for the configured name; unknown names fall back to warn
    pub fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        }
    }
}
