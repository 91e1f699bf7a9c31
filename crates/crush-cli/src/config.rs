use std::path::{Path, PathBuf};
use std::{env, fs};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crush_client::DEFAULT_API_URL;
use crush_core::{AdvancePolicy, DEFAULT_TRANSCRIPT_CAPACITY};

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Client settings from `<data dir>/config.toml`. Every field is optional
/// in the file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub advance_policy: AdvancePolicy,
    pub transcript_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            advance_policy: AdvancePolicy::default(),
            transcript_capacity: DEFAULT_TRANSCRIPT_CAPACITY,
        }
    }
}

impl Config {
    /// Load from `data_dir`, then apply `CRUSH_API_URL`.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        let mut config = match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content)
                .with_context(|| format!("invalid config {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };

        if let Ok(url) = env::var("CRUSH_API_URL")
            && !url.trim().is_empty()
        {
            config.api_url = url;
        }
        Ok(config)
    }

    fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Data directory: `CRUSH_DATA_DIR`, else `~/.crushcloud`.
pub fn data_dir() -> PathBuf {
    env::var("CRUSH_DATA_DIR")
        .ok()
        .filter(|d| !d.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(crush_store::default_base_dir)
}
