//! Exam Sprint library
//!
//! This library provides the core functionality for the Exam Sprint CLI.
//! It includes:
//! - Timer engine cycling focus sessions and breaks
//! - IPC server/client for daemon-CLI communication
//! - Settings, session history and snapshot stores
//! - CLI command parsing and display utilities
//! - Type definitions for settings, state and wire messages

pub mod cli;
pub mod daemon;
pub mod paths;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use daemon::{TimerEngine, TimerEvent};
pub use paths::AppPaths;
pub use store::{
    JsonHistoryStore, MemoryHistory, SessionHistoryStore, SettingsFile, SettingsProvider,
    SnapshotFile, StoreError,
};
pub use types::{
    EngineSnapshot, FocusSummary, IpcRequest, IpcResponse, ResponseData, SessionKind,
    SessionRecord, TimerSettings, TimerState, TimerStatus,
};
