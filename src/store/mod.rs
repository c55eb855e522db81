//! Collaborators the timer engine reads settings from and records sessions to.
//!
//! This module provides:
//! - `SettingsProvider`: read-only source of durations and cycle length
//! - `SessionHistoryStore`: append-only log of completed sessions
//! - In-memory and JSON-file backings for both

pub mod error;
pub mod file;
pub mod memory;

pub use error::StoreError;
pub use file::{JsonHistoryStore, SettingsFile, SnapshotFile};
pub use memory::MemoryHistory;

use chrono::NaiveDate;

use crate::types::{SessionRecord, TimerSettings};

// ============================================================================
// SettingsProvider
// ============================================================================

/// Source of timer durations.
///
/// The engine calls `durations` once per transition that needs them and
/// never writes through this interface.
pub trait SettingsProvider {
    /// Returns the current durations and cycle length.
    fn durations(&self) -> TimerSettings;
}

impl SettingsProvider for TimerSettings {
    fn durations(&self) -> TimerSettings {
        *self
    }
}

impl<T: SettingsProvider + ?Sized> SettingsProvider for Box<T> {
    fn durations(&self) -> TimerSettings {
        (**self).durations()
    }
}

// ============================================================================
// SessionHistoryStore
// ============================================================================

/// Log of completed sessions.
pub trait SessionHistoryStore {
    /// Appends a finalized record.
    fn append(&mut self, record: SessionRecord) -> Result<(), StoreError>;

    /// Returns the records that started on `date` (local time), oldest first.
    fn query_by_day(&self, date: NaiveDate) -> Result<Vec<SessionRecord>, StoreError>;

    /// Replaces the note of the most recently appended record.
    ///
    /// Returns false if the history is empty.
    fn update_last_note(&mut self, note: &str) -> Result<bool, StoreError>;

    /// Returns every record, oldest first.
    fn all(&self) -> Result<Vec<SessionRecord>, StoreError>;
}

impl<T: SessionHistoryStore + ?Sized> SessionHistoryStore for Box<T> {
    fn append(&mut self, record: SessionRecord) -> Result<(), StoreError> {
        (**self).append(record)
    }

    fn query_by_day(&self, date: NaiveDate) -> Result<Vec<SessionRecord>, StoreError> {
        (**self).query_by_day(date)
    }

    fn update_last_note(&mut self, note: &str) -> Result<bool, StoreError> {
        (**self).update_last_note(note)
    }

    fn all(&self) -> Result<Vec<SessionRecord>, StoreError> {
        (**self).all()
    }
}
