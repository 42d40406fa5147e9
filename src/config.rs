//! Start-up configuration read from `config.toml`.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use directories::ProjectDirs;
use serde::Deserialize;

/// Refuse to read config files larger than this.
const MAX_CONFIG_FILE_BYTES: u64 = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Title of the first sheet.
    pub default_sheet: String,
    /// Extra sheets created at start-up, in order.
    pub sheets: Vec<String>,
    /// Show the raw text of broken formulas instead of an error marker.
    pub display_raw_errors: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_sheet: xl_core::DEFAULT_SHEET.to_string(),
            sheets: Vec::new(),
            display_raw_errors: false,
        }
    }
}

impl Config {
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read a config file. The file must exist.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let meta = std::fs::metadata(path)
            .with_context(|| format!("Config file not found: {}", path.display()))?;
        if meta.len() > MAX_CONFIG_FILE_BYTES {
            bail!(
                "Refusing to read {}: file too large ({} bytes, max {})",
                path.display(),
                meta.len(),
                MAX_CONFIG_FILE_BYTES
            );
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Read the user's config file if there is one, otherwise the defaults.
    pub fn load_default() -> anyhow::Result<Self> {
        match user_config_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "xl")?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("config.toml");
    Some(path)
}
