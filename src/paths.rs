//! Locations of the daemon socket and data files.
//!
//! Everything lives in one directory: `$EXAM_SPRINT_HOME` when set,
//! otherwise `~/.exam-sprint`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Environment variable overriding the data directory.
pub const HOME_ENV: &str = "EXAM_SPRINT_HOME";

/// Directory name under the user's home directory.
const DEFAULT_DIR_NAME: &str = ".exam-sprint";

/// Resolved paths of the per-user data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    root: PathBuf,
}

impl AppPaths {
    /// Resolves the data directory from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if neither the override nor a home directory is available.
    pub fn resolve() -> Result<Self> {
        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::at(dir));
        }

        let home = dirs::home_dir().context("ホームディレクトリを特定できません")?;
        Ok(Self::at(home.join(DEFAULT_DIR_NAME)))
    }

    /// Uses `root` as the data directory.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Unix socket the daemon listens on.
    pub fn socket(&self) -> PathBuf {
        self.root.join("sprint.sock")
    }

    /// Timer settings file.
    pub fn settings(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    /// Completed session history file.
    pub fn sessions(&self) -> PathBuf {
        self.root.join("sessions.json")
    }

    /// Engine snapshot file.
    pub fn state(&self) -> PathBuf {
        self.root.join("state.json")
    }
}
