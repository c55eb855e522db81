//! Timer engine for the study timer.
//!
//! This module provides the core timer functionality:
//! - State transitions (idle / running / paused)
//! - Session kind rotation (focus → short break, long break every N focus sessions)
//! - An owned one-second tick source that exists only while running
//! - Recording completed sessions to the history store
//! - Event firing for logging and persistence
//!
//! Transitions called from a state where they have no effect are ignored
//! without an error.

use chrono::{Local, NaiveDate, Utc};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Duration, Instant, Interval, MissedTickBehavior};

use crate::store::{SessionHistoryStore, SettingsProvider, StoreError};
use crate::types::{
    EngineSnapshot, FocusSummary, SessionKind, SessionRecord, TimerSettings, TimerState,
    TimerStatus,
};

/// Interval between ticks.
const TICK_PERIOD: Duration = Duration::from_secs(1);

// ============================================================================
// TimerEvent
// ============================================================================

/// Events emitted after each applied transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// A session started
    Started {
        /// Kind of the session
        kind: SessionKind,
        /// Task reference (if any)
        task_id: Option<String>,
    },
    /// The running session was paused
    Paused {
        /// Seconds left when paused
        remaining_seconds: u32,
    },
    /// The paused session was resumed
    Resumed {
        /// Seconds left when resumed
        remaining_seconds: u32,
    },
    /// The session was stopped early and discarded
    Stopped {
        /// Kind of the discarded session
        kind: SessionKind,
    },
    /// The countdown reached zero
    Completed {
        /// The record appended to history
        record: SessionRecord,
        /// Kind selected for the next session
        next: SessionKind,
    },
    /// A break was skipped
    Skipped {
        /// Kind that was skipped
        from: SessionKind,
    },
    /// The next session kind was selected manually
    KindChanged {
        /// Selected kind
        kind: SessionKind,
    },
    /// The engine was returned to an idle focus session
    Reset,
    /// The note of the last completed session changed
    NoteUpdated,
}

// ============================================================================
// TimerEngine
// ============================================================================

/// Pomodoro state machine with its settings and history collaborators.
pub struct TimerEngine<S, H> {
    /// Current timer state
    state: TimerState,
    /// Source of durations
    settings: S,
    /// Completed session log
    history: H,
    /// One-second tick source, present only while running
    ticker: Option<Interval>,
    /// Event sender channel
    event_tx: mpsc::UnboundedSender<TimerEvent>,
}

impl<S, H> TimerEngine<S, H>
where
    S: SettingsProvider,
    H: SessionHistoryStore,
{
    /// Creates an idle engine ready to start a focus session.
    pub fn new(settings: S, history: H, event_tx: mpsc::UnboundedSender<TimerEvent>) -> Self {
        let state = TimerState::new(&settings.durations());
        Self {
            state,
            settings,
            history,
            ticker: None,
            event_tx,
        }
    }

    /// Restores a persisted cycle position.
    ///
    /// Only applies while idle. The counter is clamped below the cycle length.
    pub fn restore(&mut self, snapshot: EngineSnapshot) {
        if !self.state.is_idle() {
            return;
        }

        let settings = self.settings.durations();
        self.state.consecutive_focus_count = snapshot
            .consecutive_focus_count
            .min(settings.cycle_length.saturating_sub(1));
        self.enter_idle(snapshot.kind, &settings);
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Starts a session of the current kind.
    pub fn start(&mut self, task_id: Option<String>) {
        if !self.state.is_idle() {
            return;
        }

        let settings = self.settings.durations();
        let kind = self.state.kind;
        self.state.active_session = Some(SessionRecord::begin(
            kind,
            settings.minutes_for(kind),
            task_id.clone(),
            Utc::now(),
        ));
        self.reset_countdown(&settings);
        self.state.status = TimerStatus::Running;
        self.ticker = Some(new_ticker());

        tracing::debug!(kind = %kind, "session started");
        self.emit(TimerEvent::Started { kind, task_id });
    }

    /// Pauses the running session.
    pub fn pause(&mut self) {
        if !self.state.is_running() {
            return;
        }

        self.ticker = None;
        self.state.status = TimerStatus::Paused;

        tracing::debug!(remaining = self.state.remaining_seconds, "session paused");
        self.emit(TimerEvent::Paused {
            remaining_seconds: self.state.remaining_seconds,
        });
    }

    /// Resumes the paused session.
    pub fn resume(&mut self) {
        if !self.state.is_paused() {
            return;
        }

        self.state.status = TimerStatus::Running;
        self.ticker = Some(new_ticker());

        tracing::debug!(remaining = self.state.remaining_seconds, "session resumed");
        self.emit(TimerEvent::Resumed {
            remaining_seconds: self.state.remaining_seconds,
        });
    }

    /// Stops the session early. Stopped sessions are not recorded.
    pub fn stop(&mut self) {
        if !self.state.status.has_session() {
            return;
        }

        self.ticker = None;
        if let Some(mut session) = self.state.active_session.take() {
            session.finish(Utc::now(), false);
            tracing::debug!(id = %session.id, "session stopped and discarded");
        }

        let settings = self.settings.durations();
        let kind = self.state.kind;
        self.enter_idle(kind, &settings);
        self.emit(TimerEvent::Stopped { kind });
    }

    /// Advances the countdown by one second.
    ///
    /// Called by the daemon loop for every elapsed tick. The tick that brings
    /// the countdown to zero completes the session.
    pub fn tick(&mut self) {
        if !self.state.is_running() {
            return;
        }

        self.state.remaining_seconds = self.state.remaining_seconds.saturating_sub(1);
        if self.state.remaining_seconds == 0 {
            self.complete_session();
        }
    }

    /// Skips the current break without recording it.
    ///
    /// Focus sessions cannot be skipped; the call is ignored for them.
    pub fn skip(&mut self) {
        let from = self.state.kind;
        if !from.is_break() {
            return;
        }

        self.ticker = None;
        let settings = self.settings.durations();
        self.enter_idle(SessionKind::Focus, &settings);

        tracing::debug!(from = %from, "break skipped");
        self.emit(TimerEvent::Skipped { from });
    }

    /// Selects the kind of the next session.
    pub fn set_kind(&mut self, kind: SessionKind) {
        if !self.state.is_idle() {
            return;
        }

        let settings = self.settings.durations();
        self.enter_idle(kind, &settings);
        self.emit(TimerEvent::KindChanged { kind });
    }

    /// Discards any session and returns to an idle focus session.
    ///
    /// History and the focus counter are kept.
    pub fn reset(&mut self) {
        self.ticker = None;
        let settings = self.settings.durations();
        self.enter_idle(SessionKind::Focus, &settings);
        self.emit(TimerEvent::Reset);
    }

    /// Re-reads durations so an idle countdown matches the current settings.
    ///
    /// Running and paused sessions keep the duration they started with.
    pub fn refresh_idle_countdown(&mut self) {
        if !self.state.is_idle() {
            return;
        }

        let settings = self.settings.durations();
        self.reset_countdown(&settings);
    }

    /// Replaces the note on the most recently completed session.
    ///
    /// Returns false if there is no session to annotate or the store failed.
    pub fn update_session_note(&mut self, note: &str) -> bool {
        match self.history.update_last_note(note) {
            Ok(true) => {
                self.emit(TimerEvent::NoteUpdated);
                true
            }
            Ok(false) => false,
            Err(e) => {
                tracing::warn!("セッションメモを保存できませんでした: {}", e);
                false
            }
        }
    }

    /// Finalizes the active session and selects the next kind.
    fn complete_session(&mut self) {
        self.ticker = None;

        let finished = self.state.kind;
        let record = self.state.active_session.take().map(|mut session| {
            session.finish(Utc::now(), true);
            session
        });

        let settings = self.settings.durations();
        let next = match finished {
            SessionKind::Focus => {
                self.state.consecutive_focus_count += 1;
                if self.state.consecutive_focus_count >= settings.cycle_length {
                    self.state.consecutive_focus_count = 0;
                    SessionKind::LongBreak
                } else {
                    SessionKind::ShortBreak
                }
            }
            SessionKind::ShortBreak | SessionKind::LongBreak => SessionKind::Focus,
        };
        self.enter_idle(next, &settings);

        // The transition is committed before the store is touched.
        if let Some(record) = record {
            tracing::info!(kind = %finished, next = %next, "session completed");
            if let Err(e) = self.history.append(record.clone()) {
                tracing::warn!("セッション履歴を保存できませんでした: {}", e);
            }
            self.emit(TimerEvent::Completed { record, next });
        }
    }

    // ------------------------------------------------------------------------
    // Tick source
    // ------------------------------------------------------------------------

    /// Waits for the next tick.
    ///
    /// Never resolves while no tick source exists (idle or paused), so it can
    /// sit in a `select!` next to other work.
    pub async fn next_tick(&mut self) {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    /// Drives the countdown until the engine leaves `running`.
    pub async fn run_until_idle(&mut self) {
        while self.state.is_running() {
            self.next_tick().await;
            self.tick();
        }
    }

    /// Returns true while a tick source exists.
    pub fn has_tick_source(&self) -> bool {
        self.ticker.is_some()
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Returns a reference to the current timer state.
    pub fn get_state(&self) -> &TimerState {
        &self.state
    }

    /// Remaining time as `MM:SS`.
    pub fn formatted_time(&self) -> String {
        self.state.formatted_time()
    }

    /// Percent of the current countdown already elapsed.
    pub fn progress(&self) -> f64 {
        self.state.progress()
    }

    /// Completed focus sessions started on `date`.
    ///
    /// # Errors
    ///
    /// Returns an error if the history store cannot be queried.
    pub fn focus_summary_for(&self, date: NaiveDate) -> Result<FocusSummary, StoreError> {
        let records = self.history.query_by_day(date)?;
        Ok(FocusSummary::from_records(&records, date))
    }

    /// Completed focus sessions started today (local time).
    ///
    /// # Errors
    ///
    /// Returns an error if the history store cannot be queried.
    pub fn today_summary(&self) -> Result<FocusSummary, StoreError> {
        self.focus_summary_for(Local::now().date_naive())
    }

    /// Returns the history store.
    pub fn history(&self) -> &H {
        &self.history
    }

    /// Returns a mutable reference to the timer state (for testing).
    #[cfg(test)]
    pub fn get_state_mut(&mut self) -> &mut TimerState {
        &mut self.state
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn enter_idle(&mut self, kind: SessionKind, settings: &TimerSettings) {
        self.state.kind = kind;
        self.state.active_session = None;
        self.state.status = TimerStatus::Idle;
        self.reset_countdown(settings);
    }

    fn reset_countdown(&mut self, settings: &TimerSettings) {
        let total = settings.seconds_for(self.state.kind);
        self.state.total_seconds = total;
        self.state.remaining_seconds = total;
    }

    fn emit(&self, event: TimerEvent) {
        // A closed receiver only means nobody is listening.
        let _ = self.event_tx.send(event);
    }
}

/// Creates a tick source whose first tick is one period from now.
///
/// Ticks missed while nobody was waiting are skipped rather than delivered
/// in a burst.
fn new_ticker() -> Interval {
    let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

// ============================================================================
// Tests
// ============================================================================
