//! Core data types for the study timer.
//!
//! This module defines the data structures used for:
//! - Timer status and session kinds
//! - Timer settings with validation
//! - Session records and engine state
//! - IPC request/response serialization

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// TimerStatus
// ============================================================================

/// Represents the run status of the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    /// No session in progress
    #[default]
    Idle,
    /// Countdown is active
    Running,
    /// Countdown is suspended
    Paused,
}

impl TimerStatus {
    /// Returns the string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerStatus::Idle => "idle",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
        }
    }

    /// Returns true if a session is in progress (running or paused).
    pub fn has_session(&self) -> bool {
        matches!(self, TimerStatus::Running | TimerStatus::Paused)
    }
}

// ============================================================================
// SessionKind
// ============================================================================

/// The kind of interval the timer is counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionKind {
    /// Focused study work
    #[default]
    Focus,
    /// Short rest between focus sessions
    ShortBreak,
    /// Long rest after a full cycle of focus sessions
    LongBreak,
}

impl SessionKind {
    /// Returns the string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Focus => "focus",
            SessionKind::ShortBreak => "short-break",
            SessionKind::LongBreak => "long-break",
        }
    }

    /// Returns true for both break kinds.
    pub fn is_break(&self) -> bool {
        !matches!(self, SessionKind::Focus)
    }
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "focus" => Ok(SessionKind::Focus),
            "short-break" => Ok(SessionKind::ShortBreak),
            "long-break" => Ok(SessionKind::LongBreak),
            other => Err(format!(
                "不明なセッション種別です: {} (focus, short-break, long-break)",
                other
            )),
        }
    }
}

// ============================================================================
// TimerSettings
// ============================================================================

fn default_focus_minutes() -> u32 {
    25
}

fn default_short_break_minutes() -> u32 {
    5
}

fn default_long_break_minutes() -> u32 {
    15
}

fn default_cycle_length() -> u32 {
    4
}

/// Durations and cycle length the engine reads from its settings provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSettings {
    /// Focus duration in minutes (1-120)
    #[serde(default = "default_focus_minutes")]
    pub focus_minutes: u32,
    /// Short break duration in minutes (1-60)
    #[serde(default = "default_short_break_minutes")]
    pub short_break_minutes: u32,
    /// Long break duration in minutes (1-60)
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u32,
    /// Completed focus sessions before a long break (1-12)
    #[serde(default = "default_cycle_length")]
    pub cycle_length: u32,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            focus_minutes: default_focus_minutes(),
            short_break_minutes: default_short_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
            cycle_length: default_cycle_length(),
        }
    }
}

impl TimerSettings {
    /// Returns settings with the specified focus duration.
    pub fn with_focus_minutes(mut self, minutes: u32) -> Self {
        self.focus_minutes = minutes;
        self
    }

    /// Returns settings with the specified short break duration.
    pub fn with_short_break_minutes(mut self, minutes: u32) -> Self {
        self.short_break_minutes = minutes;
        self
    }

    /// Returns settings with the specified long break duration.
    pub fn with_long_break_minutes(mut self, minutes: u32) -> Self {
        self.long_break_minutes = minutes;
        self
    }

    /// Returns settings with the specified cycle length.
    pub fn with_cycle_length(mut self, cycle_length: u32) -> Self {
        self.cycle_length = cycle_length;
        self
    }

    /// Configured duration of `kind` in minutes.
    pub fn minutes_for(&self, kind: SessionKind) -> u32 {
        match kind {
            SessionKind::Focus => self.focus_minutes,
            SessionKind::ShortBreak => self.short_break_minutes,
            SessionKind::LongBreak => self.long_break_minutes,
        }
    }

    /// Configured duration of `kind` in seconds.
    pub fn seconds_for(&self, kind: SessionKind) -> u32 {
        self.minutes_for(kind) * 60
    }

    /// Validates the settings.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=120).contains(&self.focus_minutes) {
            return Err("集中時間は1-120分の範囲で指定してください".to_string());
        }
        if !(1..=60).contains(&self.short_break_minutes) {
            return Err("短い休憩時間は1-60分の範囲で指定してください".to_string());
        }
        if !(1..=60).contains(&self.long_break_minutes) {
            return Err("長い休憩時間は1-60分の範囲で指定してください".to_string());
        }
        if !(1..=12).contains(&self.cycle_length) {
            return Err("長い休憩までの回数は1-12回の範囲で指定してください".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// SessionRecord
// ============================================================================

/// One timer run. Immutable once finalized, apart from its note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Kind of interval
    pub kind: SessionKind,
    /// Planned duration in minutes
    pub planned_minutes: u32,
    /// Associated task reference (if any)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Free-text note
    #[serde(default)]
    pub note: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run ended (unset while in progress)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// True only if the countdown reached zero naturally
    #[serde(default)]
    pub completed: bool,
}

impl SessionRecord {
    /// Creates an in-progress record starting at `started_at`.
    pub fn begin(
        kind: SessionKind,
        planned_minutes: u32,
        task_id: Option<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            planned_minutes,
            task_id,
            note: String::new(),
            started_at,
            ended_at: None,
            completed: false,
        }
    }

    /// Sets the end timestamp and completion flag.
    pub fn finish(&mut self, ended_at: DateTime<Utc>, completed: bool) {
        self.ended_at = Some(ended_at);
        self.completed = completed;
    }

    /// Returns true if the record started on `date` in the local time zone.
    pub fn started_on(&self, date: NaiveDate) -> bool {
        self.started_at.with_timezone(&Local).date_naive() == date
    }

    /// Returns true for a completed focus session.
    pub fn is_completed_focus(&self) -> bool {
        self.completed && self.kind == SessionKind::Focus
    }
}

// ============================================================================
// FocusSummary
// ============================================================================

/// Completed focus sessions for one local calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusSummary {
    /// Number of completed focus sessions
    pub count: u32,
    /// Sum of their planned minutes
    pub minutes: u32,
}

impl FocusSummary {
    /// Summarizes the completed focus sessions among `records` started on `date`.
    pub fn from_records<'a>(
        records: impl IntoIterator<Item = &'a SessionRecord>,
        date: NaiveDate,
    ) -> Self {
        records
            .into_iter()
            .filter(|r| r.is_completed_focus() && r.started_on(date))
            .fold(Self::default(), |acc, r| Self {
                count: acc.count + 1,
                minutes: acc.minutes + r.planned_minutes,
            })
    }
}

// ============================================================================
// TimerState
// ============================================================================

/// State owned by the timer engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    /// Run status
    pub status: TimerStatus,
    /// Kind of the current or next session
    pub kind: SessionKind,
    /// Seconds left on the countdown
    pub remaining_seconds: u32,
    /// Full duration of the current kind when the countdown was last reset
    pub total_seconds: u32,
    /// The in-progress record, present only while running or paused
    pub active_session: Option<SessionRecord>,
    /// Completed focus sessions since the last long break
    pub consecutive_focus_count: u32,
}

impl TimerState {
    /// Creates an idle state ready to count down a full focus session.
    pub fn new(settings: &TimerSettings) -> Self {
        let total = settings.seconds_for(SessionKind::Focus);
        Self {
            status: TimerStatus::Idle,
            kind: SessionKind::Focus,
            remaining_seconds: total,
            total_seconds: total,
            active_session: None,
            consecutive_focus_count: 0,
        }
    }

    /// Returns true if the countdown is active.
    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    /// Returns true if the countdown is suspended.
    pub fn is_paused(&self) -> bool {
        self.status == TimerStatus::Paused
    }

    /// Returns true if no session is in progress.
    pub fn is_idle(&self) -> bool {
        self.status == TimerStatus::Idle
    }

    /// Remaining time as `MM:SS`.
    pub fn formatted_time(&self) -> String {
        format_time(self.remaining_seconds)
    }

    /// Percent of the current countdown already elapsed.
    pub fn progress(&self) -> f64 {
        if self.total_seconds == 0 {
            return 0.0;
        }
        let elapsed = self.total_seconds.saturating_sub(self.remaining_seconds);
        f64::from(elapsed) / f64::from(self.total_seconds) * 100.0
    }

    /// Task reference of the active session (if any).
    pub fn task_id(&self) -> Option<&str> {
        self.active_session
            .as_ref()
            .and_then(|s| s.task_id.as_deref())
    }

    /// Cycle position worth keeping across restarts.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            kind: self.kind,
            consecutive_focus_count: self.consecutive_focus_count,
        }
    }
}

/// Formats seconds as zero-padded `MM:SS`.
///
/// Minutes are not wrapped at 60, so 7200 seconds is `120:00`.
pub fn format_time(total_seconds: u32) -> String {
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

// ============================================================================
// EngineSnapshot
// ============================================================================

/// Persisted cycle position, restored when the daemon starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    /// Kind to resume with
    #[serde(default)]
    pub kind: SessionKind,
    /// Completed focus sessions since the last long break
    #[serde(default)]
    pub consecutive_focus_count: u32,
}

// ============================================================================
// IPC Types
// ============================================================================

/// IPC request from client to daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum IpcRequest {
    /// Start a session of the current kind
    Start {
        /// Task reference to attach
        #[serde(rename = "taskId", default, skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
    },
    /// Pause the running session
    Pause,
    /// Resume the paused session
    Resume,
    /// Stop the session without recording it
    Stop,
    /// Skip the current break
    Skip,
    /// Return to an idle focus session
    Reset,
    /// Select the kind of the next session
    Kind {
        /// Kind to select
        kind: SessionKind,
    },
    /// Edit the note of the last completed session
    Note {
        /// New note text
        note: String,
    },
    /// Query the current status
    Status,
    /// Query today's focus summary
    Today,
}

/// Response data for IPC responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
    /// Current status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Current session kind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Remaining seconds
    #[serde(rename = "remainingSeconds", skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<u32>,
    /// Remaining time as MM:SS
    #[serde(rename = "formattedTime", skip_serializing_if = "Option::is_none")]
    pub formatted_time: Option<String>,
    /// Percent progress of the current countdown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    /// Completed focus sessions since the last long break
    #[serde(rename = "focusStreak", skip_serializing_if = "Option::is_none")]
    pub focus_streak: Option<u32>,
    /// Task reference of the active session
    #[serde(rename = "taskId", skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Completed focus sessions today
    #[serde(rename = "todayCount", skip_serializing_if = "Option::is_none")]
    pub today_count: Option<u32>,
    /// Focus minutes today
    #[serde(rename = "todayMinutes", skip_serializing_if = "Option::is_none")]
    pub today_minutes: Option<u32>,
}

impl ResponseData {
    /// Creates response data from timer state.
    pub fn from_timer_state(state: &TimerState) -> Self {
        Self {
            state: Some(state.status.as_str().to_string()),
            kind: Some(state.kind.as_str().to_string()),
            remaining_seconds: Some(state.remaining_seconds),
            formatted_time: Some(state.formatted_time()),
            progress: Some(state.progress()),
            focus_streak: Some(state.consecutive_focus_count),
            task_id: state.task_id().map(str::to_string),
            today_count: None,
            today_minutes: None,
        }
    }

    /// Adds today's focus summary.
    pub fn with_summary(mut self, summary: FocusSummary) -> Self {
        self.today_count = Some(summary.count);
        self.today_minutes = Some(summary.minutes);
        self
    }
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Optional response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }

    /// Returns true for an error response.
    pub fn is_error(&self) -> bool {
        self.status == "error"
    }
}

// ============================================================================
// Tests
// ============================================================================
