//! Configuration file parsing for `veil.toml`.
//!
//! Searches current directory then ancestors, falling back to
//! `~/.config/veil/veil.toml` if no project-level file is found.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use veil_compiler::WarningMode;

pub const CONFIG_FILE: &str = "veil.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid toml in '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct VeilConfig {
    #[serde(default)]
    pub analysis: AnalysisSection,
    #[serde(default)]
    pub output: OutputSection,
    /// `tracing` filter directive, e.g. `"veil_compiler=debug"`.
    #[serde(default)]
    pub log_level: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct AnalysisSection {
    #[serde(default)]
    pub warnings: WarningMode,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OutputSection {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default = "default_color")]
    pub color: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self { format: OutputFormat::default(), color: default_color() }
    }
}

fn default_color() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Rendered diagnostics
    #[default]
    Text,
    /// Warnings and indicator tables as JSON
    Json,
}

impl VeilConfig {
    /// Load config from `veil.toml`, searching current dir then parents, then
    /// the user config dir. Returns `Default` when no file is found.
    pub fn load() -> Result<(Option<PathBuf>, Self), ConfigError> {
        let found = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::find_from(&cwd))
            .or_else(Self::global_path);
        match found {
            Some(path) => {
                let cfg = Self::load_from(&path)?;
                Ok((Some(path), cfg))
            }
            None => Ok((None, Self::default())),
        }
    }

    /// Load config from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(&content)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Nearest `veil.toml` in `start` or one of its ancestors.
    pub fn find_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    fn global_path() -> Option<PathBuf> {
        let global = dirs::home_dir()?.join(".config").join("veil").join(CONFIG_FILE);
        global.is_file().then_some(global)
    }

    /// Generate a default `veil.toml` template.
    pub fn default_template() -> &'static str {
        r#"# Veil configuration

# Log filter, same syntax as RUST_LOG
# log_level = "veil_compiler=warn,veil_cli=info"

[analysis]
# "allow" drops advisory warnings, "deny" fails the check on any warning
warnings = "warn"

[output]
format = "text"
color = true
"#
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
