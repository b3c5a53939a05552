//! callsig.toml configuration
//!
//! Every field is optional; command line flags take precedence.
//!
//! # Example callsig.toml
//!
//! ```toml
//! signatures_dir = "/opt/callsig/signatures"
//! extensions = ["yaml", "yml"]
//! skip_library = true
//! skip_thunk = true
//! format = "json"
//! sort = true
//! ```

use crate::catalog::DEFAULT_EXTENSIONS;
use crate::cli::OutputFormat;
use crate::matcher::ScanOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "callsig.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Root of the signature tree
    pub signatures_dir: PathBuf,
    /// Declaration file extensions, compared case-insensitively
    pub extensions: Vec<String>,
    pub skip_library: bool,
    pub skip_thunk: bool,
    pub format: OutputFormat,
    /// Order matches by address
    pub sort: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            signatures_dir: PathBuf::from("signatures"),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            skip_library: true,
            skip_thunk: true,
            format: OutputFormat::Text,
            sort: false,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Load an explicit config, else `./callsig.toml` if present, else defaults
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.extensions.is_empty() {
            anyhow::bail!("extensions must list at least one file extension");
        }
        if let Some(bad) = self
            .extensions
            .iter()
            .find(|e| e.is_empty() || e.starts_with('.'))
        {
            anyhow::bail!("invalid extension '{}': give it without the leading dot", bad);
        }
        Ok(())
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            skip_library: self.skip_library,
            skip_thunk: self.skip_thunk,
        }
    }
}
