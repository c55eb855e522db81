//! Display utilities for the study timer CLI.
//!
//! This module provides formatted output for:
//! - Command results
//! - Status and today's summary
//! - Session history and settings
//! - Error messages
//!
//! Every `show_*` function prints what the matching `render_*` returns.

use std::fmt::Write as _;
use std::path::Path;

use chrono::{Local, NaiveDate};

use crate::types::{FocusSummary, IpcResponse, ResponseData, SessionRecord, TimerSettings};

/// Width of the status progress bar in characters.
const PROGRESS_BAR_WIDTH: usize = 20;

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the result of a timer command.
    pub fn show_action(response: &IpcResponse) {
        print!("{}", Self::render_action(response));
    }

    /// Shows the current timer status.
    pub fn show_status(response: &IpcResponse) {
        print!("{}", Self::render_status(response));
    }

    /// Shows today's focus summary.
    pub fn show_today(response: &IpcResponse) {
        print!("{}", Self::render_today(response));
    }

    /// Shows the sessions recorded on `date`.
    pub fn show_history(date: NaiveDate, records: &[SessionRecord]) {
        print!("{}", Self::render_history(date, records));
    }

    /// Shows the timer settings and where they are stored.
    pub fn show_settings(settings: &TimerSettings, path: &Path) {
        print!("{}", Self::render_settings(settings, path));
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("エラー: {}", message);
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    /// Renders a command result: the daemon's message plus the timer.
    pub fn render_action(response: &IpcResponse) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "* {}", response.message);

        if let Some(data) = &response.data {
            if let Some(kind) = &data.kind {
                let _ = writeln!(out, "  種別: {}", Self::kind_label(kind));
            }
            if let Some(time) = &data.formatted_time {
                let _ = writeln!(out, "  残り時間: {}", time);
            }
            if let Some(task) = &data.task_id {
                let _ = writeln!(out, "  タスク: {}", task);
            }
        }
        out
    }

    /// Renders the status screen.
    pub fn render_status(response: &IpcResponse) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Exam Sprint ステータス");
        let _ = writeln!(out, "─────────────────────────────");

        let Some(data) = &response.data else {
            let _ = writeln!(out, "タイマーは起動していません");
            return out;
        };

        let state = data.state.as_deref().unwrap_or("unknown");
        let _ = writeln!(out, "状態: {}", Self::state_label(state));
        if let Some(kind) = &data.kind {
            let _ = writeln!(out, "種別: {}", Self::kind_label(kind));
        }
        if let Some(time) = &data.formatted_time {
            let _ = writeln!(out, "残り時間: {}", time);
        }
        if let Some(progress) = data.progress {
            let _ = writeln!(out, "進捗: {}", Self::progress_bar(progress));
        }
        if let Some(task) = &data.task_id {
            let _ = writeln!(out, "タスク: {}", task);
        }
        if let Some(streak) = data.focus_streak {
            let _ = writeln!(out, "長い休憩までの集中: {} 回完了", streak);
        }
        if let Some(summary) = Self::summary_of(data) {
            let _ = writeln!(out, "{}", Self::summary_line(summary));
        }
        out
    }

    /// Renders today's focus summary.
    pub fn render_today(response: &IpcResponse) -> String {
        match response.data.as_ref().and_then(Self::summary_of) {
            Some(summary) => format!("{}\n", Self::summary_line(summary)),
            None => "本日の集計はありません\n".to_string(),
        }
    }

    /// Renders the sessions recorded on `date`, oldest first.
    pub fn render_history(date: NaiveDate, records: &[SessionRecord]) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} のセッション", date.format("%Y-%m-%d"));
        let _ = writeln!(out, "─────────────────────────────");

        if records.is_empty() {
            let _ = writeln!(out, "記録はありません");
            return out;
        }

        for record in records {
            let started = record.started_at.with_timezone(&Local);
            let _ = write!(
                out,
                "{}  {:<6} {:>3}分",
                started.format("%H:%M"),
                Self::kind_label(record.kind.as_str()),
                record.planned_minutes
            );
            if let Some(task) = &record.task_id {
                let _ = write!(out, "  [{}]", task);
            }
            if !record.note.is_empty() {
                let _ = write!(out, "  {}", record.note);
            }
            out.push('\n');
        }

        let summary = FocusSummary::from_records(records, date);
        let _ = writeln!(out, "─────────────────────────────");
        let _ = writeln!(out, "集中: {} 回 / {} 分", summary.count, summary.minutes);
        out
    }

    /// Renders the settings.
    pub fn render_settings(settings: &TimerSettings, path: &Path) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "集中時間: {} 分", settings.focus_minutes);
        let _ = writeln!(out, "短い休憩: {} 分", settings.short_break_minutes);
        let _ = writeln!(out, "長い休憩: {} 分", settings.long_break_minutes);
        let _ = writeln!(out, "長い休憩までの集中回数: {} 回", settings.cycle_length);
        let _ = writeln!(out, "設定ファイル: {}", path.display());
        out
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn kind_label(kind: &str) -> &str {
        match kind {
            "focus" => "集中",
            "short-break" => "短い休憩",
            "long-break" => "長い休憩",
            other => other,
        }
    }

    fn state_label(state: &str) -> &str {
        match state {
            "idle" => "待機中",
            "running" => "計測中",
            "paused" => "一時停止中",
            other => other,
        }
    }

    fn summary_of(data: &ResponseData) -> Option<FocusSummary> {
        Some(FocusSummary {
            count: data.today_count?,
            minutes: data.today_minutes?,
        })
    }

    fn summary_line(summary: FocusSummary) -> String {
        format!("本日の集中: {} 回 / {} 分", summary.count, summary.minutes)
    }

    /// Renders `percent` as `[####----] 50%`.
    fn progress_bar(percent: f64) -> String {
        let clamped = percent.clamp(0.0, 100.0);
        let filled = ((clamped / 100.0) * PROGRESS_BAR_WIDTH as f64).round() as usize;
        format!(
            "[{}{}] {:.0}%",
            "#".repeat(filled),
            "-".repeat(PROGRESS_BAR_WIDTH - filled),
            clamped
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
