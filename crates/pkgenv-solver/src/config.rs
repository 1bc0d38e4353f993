//! Resolver configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Settings shared by the resolver, the cache and the CLI.
///
/// Every field has a default, so a config file only names what it changes:
///
/// ```toml
/// cache_dir = "/var/cache/pkgenv"
/// cache_ttl_secs = 86400
/// max_steps = 10000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Context cache directory; the platform cache dir when unset
    pub cache_dir: Option<PathBuf>,
    pub cache_enabled: bool,
    pub cache_read_only: bool,
    /// Age after which `gc` removes cached contexts
    pub cache_ttl_secs: u64,
    /// Conflicts kept in a failure report
    pub max_reported_conflicts: usize,
    /// Candidates the solver may try before giving up
    pub max_steps: Option<usize>,
    /// Joins list variables when applying environment actions
    pub path_separator: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: None,
            cache_enabled: true,
            cache_read_only: false,
            cache_ttl_secs: 30 * 24 * 60 * 60,
            max_reported_conflicts: 10,
            max_steps: None,
            path_separator: default_separator().to_string(),
        }
    }
}

fn default_separator() -> &'static str {
    if cfg!(windows) {
        ";"
    } else {
        ":"
    }
}

/// Interpret a boolean environment value
fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply `PKGENV_CACHE_DIR`, `PKGENV_NO_CACHE` and
    /// `PKGENV_CACHE_READ_ONLY` from the process environment
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    fn apply_vars<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = var("PKGENV_CACHE_DIR").filter(|d| !d.is_empty()) {
            self.cache_dir = Some(PathBuf::from(dir));
        }
        if var("PKGENV_NO_CACHE").is_some_and(|v| is_truthy(&v)) {
            self.cache_enabled = false;
        }
        if var("PKGENV_CACHE_READ_ONLY").is_some_and(|v| is_truthy(&v)) {
            self.cache_read_only = true;
        }
    }

    /// The configured cache directory, or the platform default
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            ProjectDirs::from("", "", "pkgenv")
                .map(|dirs| dirs.cache_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".pkgenv-cache"))
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
