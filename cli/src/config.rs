use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

use larder_core::models::EXPORT_FILE_NAME;

/// Overrides the platform data directory when set.
pub const DATA_DIR_ENV: &str = "LARDER_DATA_DIR";

const DB_FILE_NAME: &str = "larder.db";

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let data_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => ProjectDirs::from("", "", "larder")
                .context("Could not determine home directory")?
                .data_dir()
                .to_path_buf(),
        };
        Self::from_data_dir(&data_dir)
    }

    pub fn from_data_dir(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Ok(Config {
            db_path: data_dir.join(DB_FILE_NAME),
            data_dir: data_dir.to_path_buf(),
        })
    }

    /// Default location for `larder export`: the current directory.
    pub fn default_export_path() -> PathBuf {
        PathBuf::from(EXPORT_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_data_dir_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("larder");
        let config = Config::from_data_dir(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(config.db_path, dir.join("larder.db"));
        assert_eq!(config.data_dir, dir);
    }

    #[test]
    fn test_default_export_path() {
        assert_eq!(
            Config::default_export_path(),
            PathBuf::from("grocery-data.json")
        );
    }
}
