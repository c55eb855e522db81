//! JSON-file backings for settings, session history and the engine snapshot.
//!
//! Every file is rewritten whole on each change through a sibling temp
//! file and a rename, so readers never see a partial write. A missing file
//! reads as empty or default.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{SessionHistoryStore, SettingsProvider, StoreError};
use crate::types::{EngineSnapshot, SessionRecord, TimerSettings};

// ============================================================================
// Helpers
// ============================================================================

/// Reads and parses `path`, returning `None` if it does not exist.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    serde_json::from_str(&json)
        .map(Some)
        .map_err(|e| StoreError::json(path, e))
}

/// Returns `path` with `suffix` appended to its file name.
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Serializes `value` to `path`, creating the parent directory if needed.
///
/// The JSON goes to `<path>.tmp` first and is renamed over `path` once
/// flushed to disk.
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let json = serde_json::to_string_pretty(value).map_err(|e| StoreError::json(path, e))?;
    let temp_path = sibling_path(path, ".tmp");
    {
        let mut file = File::create(&temp_path).map_err(|e| StoreError::io(&temp_path, e))?;
        file.write_all(json.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|e| StoreError::io(&temp_path, e))?;
    }

    fs::rename(&temp_path, path).map_err(|e| StoreError::io(path, e))
}

// ============================================================================
// JsonHistoryStore
// ============================================================================

/// Session history persisted as a JSON array.
#[derive(Debug)]
pub struct JsonHistoryStore {
    path: PathBuf,
    records: Vec<SessionRecord>,
}

impl JsonHistoryStore {
    /// Opens the history at `path`, loading any existing records.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = read_json(&path)?.unwrap_or_default();
        Ok(Self { path, records })
    }

    /// Opens the history at `path`, setting an unparseable file aside.
    ///
    /// A file that is not valid JSON is renamed to `<path>.corrupt` and the
    /// history starts empty. Returns the quarantine path when that happened.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or moved aside.
    pub fn open_or_quarantine(
        path: impl Into<PathBuf>,
    ) -> Result<(Self, Option<PathBuf>), StoreError> {
        let path = path.into();
        match Self::open(&path) {
            Ok(store) => Ok((store, None)),
            Err(StoreError::Json { source, .. }) => {
                let corrupt = sibling_path(&path, ".corrupt");
                fs::rename(&path, &corrupt).map_err(|e| StoreError::io(&path, e))?;
                tracing::warn!(
                    "セッション履歴が壊れているため退避しました: {:?} ({})",
                    corrupt,
                    source
                );
                Ok((
                    Self {
                        path,
                        records: Vec::new(),
                    },
                    Some(corrupt),
                ))
            }
            Err(e) => Err(e),
        }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), StoreError> {
        write_json(&self.path, &self.records)
    }
}

impl SessionHistoryStore for JsonHistoryStore {
    fn append(&mut self, record: SessionRecord) -> Result<(), StoreError> {
        self.records.push(record);
        self.persist()
    }

    fn query_by_day(&self, date: NaiveDate) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.started_on(date))
            .cloned()
            .collect())
    }

    fn update_last_note(&mut self, note: &str) -> Result<bool, StoreError> {
        let Some(last) = self.records.last_mut() else {
            return Ok(false);
        };
        last.note = note.to_string();
        self.persist()?;
        Ok(true)
    }

    fn all(&self) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(self.records.clone())
    }
}

// ============================================================================
// SettingsFile
// ============================================================================

/// Settings read from a JSON file on every call.
///
/// Edits made while the daemon is running apply to the next transition
/// that reads durations.
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    /// Creates a provider for the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and validates the settings.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(&self) -> Result<TimerSettings, StoreError> {
        let settings: TimerSettings = read_json(&self.path)?.unwrap_or_default();
        settings.validate().map_err(StoreError::InvalidSettings)?;
        Ok(settings)
    }

    /// Validates and writes `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the file cannot be written.
    pub fn save(&self, settings: &TimerSettings) -> Result<(), StoreError> {
        settings.validate().map_err(StoreError::InvalidSettings)?;
        write_json(&self.path, settings)
    }
}

impl SettingsProvider for SettingsFile {
    fn durations(&self) -> TimerSettings {
        match self.load() {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("設定を読み込めません。既定値を使用します: {}", e);
                TimerSettings::default()
            }
        }
    }
}

// ============================================================================
// SnapshotFile
// ============================================================================

/// Persisted cycle position of the engine.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    /// Creates a snapshot file handle for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the snapshot, returning `None` if none was saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<EngineSnapshot>, StoreError> {
        read_json(&self.path)
    }

    /// Writes the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, snapshot: &EngineSnapshot) -> Result<(), StoreError> {
        write_json(&self.path, snapshot)
    }
}

// ============================================================================
// Tests
// ============================================================================
