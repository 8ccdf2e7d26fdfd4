use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::StoreError;

/// Environment variable naming the backend
pub const BACKEND_ENV: &str = "SHELFCTL_BACKEND";
/// Environment variable naming the CSV file
pub const CSV_PATH_ENV: &str = "SHELFCTL_CSV_PATH";
/// Environment variable holding the SQLite connection URL
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Which record store implementation to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Memory,
    #[default]
    Csv,
    Sqlite,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Csv => "csv",
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = StoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "csv" => Ok(Self::Csv),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(StoreError::config(format!(
                "unknown backend '{}' (expected memory, csv or sqlite)",
                other
            ))),
        }
    }
}

/// Settings consumed by [`crate::store::open_store`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: Backend,
    pub csv_path: PathBuf,
    pub database_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            csv_path: PathBuf::from("books.csv"),
            database_url: "sqlite://books.db".to_string(),
        }
    }
}

/// Top-level shelfctl configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShelfConfig {
    pub store: StoreConfig,
}

impl ShelfConfig {
    /// Load config from `path`, or from ~/.shelfctl/config.toml when `None`.
    ///
    /// A missing default file yields built-in defaults; a missing explicit
    /// file is an error. Environment overrides are applied on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_inner(path, false)
    }

    /// Like [`ShelfConfig::load`], but a missing explicit file also yields
    /// defaults (used before the file is created).
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        Self::load_inner(path, true)
    }

    fn load_inner(path: Option<&Path>, allow_missing: bool) -> Result<Self> {
        let mut config = match path {
            Some(path) if allow_missing && !path.exists() => Self::default(),
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env_overrides()?;
        config.expand_variables();
        Ok(config)
    }

    /// Parse a config file without applying overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {:?}", path))?;

        toml::from_str(&content)
            .context(format!("Failed to parse config file (invalid TOML): {:?}", path))
    }

    /// Get config file path: ~/.shelfctl/config.toml
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Get config directory: ~/.shelfctl
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".shelfctl")
    }

    /// Apply SHELFCTL_BACKEND, SHELFCTL_CSV_PATH and DATABASE_URL
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(backend) = lookup(BACKEND_ENV).filter(|v| !v.is_empty()) {
            self.store.backend = backend
                .parse()
                .context(format!("Invalid {} value", BACKEND_ENV))?;
        }
        if let Some(csv_path) = lookup(CSV_PATH_ENV).filter(|v| !v.is_empty()) {
            self.store.csv_path = PathBuf::from(csv_path);
        }
        if let Some(url) = lookup(DATABASE_URL_ENV).filter(|v| !v.is_empty()) {
            self.store.database_url = url;
        }
        Ok(())
    }

    /// Expand ${HOME} references in the store locations
    fn expand_variables(&mut self) {
        let mut vars = HashMap::new();
        vars.insert(
            "HOME".to_string(),
            dirs::home_dir()
                .map(|home| home.display().to_string())
                .unwrap_or_default(),
        );

        let csv_path = expand_string(&self.store.csv_path.display().to_string(), &vars);
        self.store.csv_path = PathBuf::from(csv_path);
        self.store.database_url = expand_string(&self.store.database_url, &vars);
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config to TOML")
    }

    /// Save config to `path`, creating the directory if needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_str = self.to_toml()?;

        fs::write(path, toml_str).context(format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }
}

/// Expand ${var} references in a string
fn expand_string(s: &str, vars: &HashMap<String, String>) -> String {
    let mut result = s.to_string();

    for (key, value) in vars {
        let pattern = format!("${{{}}}", key);
        result = result.replace(&pattern, value);
    }

    result
}
