//! Store error types.
//!
//! Errors raised by the settings and session history backings.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or writing persisted data.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying file I/O failed.
    #[error("ファイルの読み書きに失敗しました ({path}): {source}")]
    Io {
        /// File that was being accessed
        path: PathBuf,
        /// Original error
        #[source]
        source: std::io::Error,
    },

    /// The file contents were not valid JSON for the expected type.
    #[error("JSONの解析に失敗しました ({path}): {source}")]
    Json {
        /// File that was being parsed
        path: PathBuf,
        /// Original error
        #[source]
        source: serde_json::Error,
    },

    /// Settings failed validation.
    #[error("設定が不正です: {0}")]
    InvalidSettings(String),

    /// The backing store is unavailable.
    #[error("ストアが利用できません: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wraps a JSON error with the path it occurred on.
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}
