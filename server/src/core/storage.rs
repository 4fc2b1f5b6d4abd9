//! Platform-aware data storage directory management
//!
//! ## Platform Paths
//!
//! | Type | Windows | macOS | Linux |
//! |------|---------|-------|-------|
//! | Data | `%APPDATA%\QueryForge\` | `~/Library/Application Support/QueryForge/` | `$XDG_DATA_HOME/queryforge/` |

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;

use super::constants::{APP_DOT_FOLDER, APP_NAME, ENV_DATA_DIR};
use crate::utils::file::expand_path;

/// Data subdirectories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSubdir {
    Sqlite,
}

impl DataSubdir {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DataSubdir::Sqlite => "sqlite",
        }
    }

    pub const fn all() -> &'static [DataSubdir] {
        &[DataSubdir::Sqlite]
    }
}

/// Application storage manager
#[derive(Debug, Clone)]
pub struct AppStorage {
    data_dir: PathBuf,
}

impl AppStorage {
    /// Create the data directory (and subdirectories) if missing
    pub async fn init() -> Result<Self> {
        let data_dir = Self::resolve_data_dir();
        Self::ensure_directories(&data_dir).await?;

        // canonicalize requires the path to exist
        let data_dir = data_dir.canonicalize().unwrap_or(data_dir);
        tracing::debug!(data_dir = %data_dir.display(), "Storage initialized");

        Ok(Self { data_dir })
    }

    /// Resolve data directory from env var or platform default
    pub fn resolve_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            return expand_path(&dir);
        }

        if let Some(proj_dirs) = ProjectDirs::from("", "", APP_NAME) {
            return proj_dirs.data_dir().to_path_buf();
        }

        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        cwd.join(APP_DOT_FOLDER)
    }

    async fn ensure_directories(data_dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        for subdir in DataSubdir::all() {
            let path = data_dir.join(subdir.as_str());
            tokio::fs::create_dir_all(&path).await.with_context(|| {
                format!(
                    "Failed to create {} directory: {}",
                    subdir.as_str(),
                    path.display()
                )
            })?;
        }
        Ok(())
    }

    /// Delete a data directory and everything in it
    ///
    /// Returns false when there was nothing to delete.
    pub async fn prune(data_dir: &Path) -> Result<bool> {
        if !data_dir.exists() {
            return Ok(false);
        }
        tokio::fs::remove_dir_all(data_dir)
            .await
            .with_context(|| format!("Failed to delete {}", data_dir.display()))?;
        tracing::debug!(path = %data_dir.display(), "Data directory deleted");
        Ok(true)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get path to a subdirectory (canonicalized)
    pub fn subdir(&self, subdir: DataSubdir) -> PathBuf {
        let path = self.data_dir.join(subdir.as_str());
        path.canonicalize().unwrap_or(path)
    }

    /// Get path to a file within a subdirectory
    pub fn subdir_path(&self, subdir: DataSubdir, filename: &str) -> PathBuf {
        self.data_dir.join(subdir.as_str()).join(filename)
    }

    #[cfg(test)]
    pub fn init_for_test(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }
}
