use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{Error, Result};

/// Height of one row in layout units.
pub const DEFAULT_ROW_HEIGHT: f32 = 24.0;

/// Horizontal offset of every child relative to its parent.
pub const DEFAULT_INDENT: f32 = 20.0;

/// Metrics used by the layout pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub row_height: f32,
    pub indent: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            row_height: DEFAULT_ROW_HEIGHT,
            indent: DEFAULT_INDENT,
        }
    }
}

/// Startup configuration shared by both hosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name given to the root node. Should end in `/` so the root can hold children.
    pub root_name: String,
    /// Entries created under the root when the controller starts.
    pub seed_entries: Vec<String>,
    pub layout: LayoutConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_name: String::from("Root/"),
            seed_entries: vec![
                String::from("SomeItem"),
                String::from("newfolder/"),
                String::from("folder2/"),
            ],
            layout: LayoutConfig::default(),
        }
    }
}

impl Config {
    /// Read a JSON config file. Missing fields fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(Error::Io(err)) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            other => other,
        }
    }
}
