use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::error::Result;
use crate::store::SqliteStorage;

pub const DB_FILE_NAME: &str = "crush.db";

/// Default base directory for all client state: `~/.crushcloud`.
pub fn default_base_dir() -> PathBuf {
    dirs_home().join(".crushcloud")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Open the client database, creating the base directory as needed.
///
/// Layout:
/// ```text
/// ~/.crushcloud/
/// ├── config.toml
/// └── crush.db
/// ```
pub fn open_default(base_dir: Option<&Path>) -> Result<SqliteStorage> {
    let base = base_dir.map(PathBuf::from).unwrap_or_else(default_base_dir);
    fs::create_dir_all(&base)?;
    let path = base.join(DB_FILE_NAME);
    tracing::debug!("opening local storage at {}", path.display());
    SqliteStorage::open(&path)
}
