//! Configuration - JSON File with Field Defaults

use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::compositor::DEFAULT_OUTPUT_SIZE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconForgeConfig {
    #[serde(default = "default_output_size")]
    pub output_size: NonZeroU32,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_filename_prefix")]
    pub filename_prefix: String,
    #[serde(default = "default_label")]
    pub default_label: String,
    /// Naming for icons re-downloaded from a saved history entry.
    #[serde(default = "default_entry_filename_prefix")]
    pub entry_filename_prefix: String,
    #[serde(default = "default_entry_label")]
    pub entry_default_label: String,
    #[serde(default)]
    pub fonts: FontConfig,
    #[serde(default = "default_aspect_tolerance")]
    pub aspect_tolerance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontConfig {
    /// Tried in order; the bundled DejaVu Sans Bold is used when none is installed.
    #[serde(default = "default_font_families")]
    pub families: Vec<String>,
    /// Extra font files loaded before system fonts.
    #[serde(default)]
    pub files: Vec<PathBuf>,
    #[serde(default = "default_true")]
    pub load_system_fonts: bool,
}

fn default_true() -> bool { true }

fn default_output_size() -> NonZeroU32 { DEFAULT_OUTPUT_SIZE }

fn default_debounce_ms() -> u64 { 150 }

fn default_filename_prefix() -> String { "browser-profile".to_string() }

fn default_label() -> String { "icon".to_string() }

fn default_entry_filename_prefix() -> String { "icon".to_string() }

fn default_entry_label() -> String { "profile".to_string() }

fn default_font_families() -> Vec<String> { vec!["Inter".to_string()] }

fn default_aspect_tolerance() -> f64 { 0.01 }

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            families: default_font_families(),
            files: vec![],
            load_system_fonts: true,
        }
    }
}

impl Default for IconForgeConfig {
    fn default() -> Self {
        Self {
            output_size: default_output_size(),
            debounce_ms: default_debounce_ms(),
            filename_prefix: default_filename_prefix(),
            default_label: default_label(),
            entry_filename_prefix: default_entry_filename_prefix(),
            entry_default_label: default_entry_label(),
            fonts: FontConfig::default(),
            aspect_tolerance: default_aspect_tolerance(),
        }
    }
}

impl IconForgeConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load `path` if given, otherwise defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
