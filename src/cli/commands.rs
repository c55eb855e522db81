//! Command definitions for the study timer CLI.
//!
//! Uses clap derive macro for argument parsing.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::types::SessionKind;

// ============================================================================
// CLI Structure
// ============================================================================

/// Exam Sprint - a Pomodoro timer for exam preparation
#[derive(Parser, Debug)]
#[command(
    name = "exam-sprint",
    version,
    about = "試験勉強向けポモドーロタイマーCLI",
    long_about = "集中セッションと休憩を交互に計測するポモドーロタイマー。\n\
                  タイマーはデーモンとして動作し、完了したセッションを履歴に記録します。",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start a session of the current kind
    Start(StartArgs),

    /// Pause the running session
    Pause,

    /// Resume the paused session
    Resume,

    /// Stop the session without recording it
    Stop,

    /// Skip the current break
    Skip,

    /// Discard any session and return to focus
    Reset,

    /// Select the kind of the next session
    Kind {
        /// focus, short-break or long-break
        kind: SessionKind,
    },

    /// Attach a note to the last completed session
    Note {
        /// Note text
        #[arg(value_parser = validate_note)]
        text: String,
    },

    /// Show current timer status
    Status,

    /// Show today's completed focus sessions
    Today,

    /// List recorded sessions for a day
    History(HistoryArgs),

    /// Show or change timer settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },

    /// Run the timer daemon in the foreground
    Daemon,

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Command Arguments
// ============================================================================

/// Arguments for the start command
#[derive(Args, Debug, Clone, Default)]
pub struct StartArgs {
    /// Task or subject this session is for
    #[arg(short, long, value_parser = validate_task_id)]
    pub task: Option<String>,
}

/// Arguments for the history command
#[derive(Args, Debug, Clone, Default)]
pub struct HistoryArgs {
    /// Day to list (YYYY-MM-DD, defaults to today)
    #[arg(short, long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,
}

/// Settings subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SettingsAction {
    /// Print the current settings
    Show,
    /// Change one or more settings
    Set(SettingsArgs),
}

/// Arguments for `settings set`
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Focus duration in minutes (1-120)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=120))]
    pub focus: Option<u32>,

    /// Short break duration in minutes (1-60)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=60))]
    pub short_break: Option<u32>,

    /// Long break duration in minutes (1-60)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=60))]
    pub long_break: Option<u32>,

    /// Focus sessions before a long break (1-12)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    pub cycle: Option<u32>,
}

impl SettingsArgs {
    /// Returns true if no setting was given.
    pub fn is_empty(&self) -> bool {
        self.focus.is_none()
            && self.short_break.is_none()
            && self.long_break.is_none()
            && self.cycle.is_none()
    }
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Validates the task reference.
///
/// - Must not be empty
/// - Must not exceed 100 characters
fn validate_task_id(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        return Err("タスク名は空にできません".to_string());
    }
    if s.chars().count() > 100 {
        return Err("タスク名は100文字以内にしてください".to_string());
    }
    Ok(s.to_string())
}

fn validate_note(s: &str) -> Result<String, String> {
    if s.chars().count() > 500 {
        return Err("メモは500文字以内にしてください".to_string());
    }
    Ok(s.to_string())
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("日付は YYYY-MM-DD 形式で指定してください: {}", s))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Cli Tests
    // ------------------------------------------------------------------------

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_no_args() {
            let cli = Cli::parse_from(["exam-sprint"]);
            assert!(cli.command.is_none());
            assert!(!cli.verbose);
        }

        #[test]
        fn test_parse_short_verbose_flag() {
            let cli = Cli::parse_from(["exam-sprint", "-v", "status"]);
            assert!(cli.verbose);
            assert!(matches!(cli.command, Some(Commands::Status)));
        }

        #[test]
        fn test_parse_unit_commands() {
            let cases = [
                ("pause", "Pause"),
                ("resume", "Resume"),
                ("stop", "Stop"),
                ("skip", "Skip"),
                ("reset", "Reset"),
                ("today", "Today"),
                ("daemon", "Daemon"),
            ];
            for (arg, name) in cases {
                let cli = Cli::parse_from(["exam-sprint", arg]);
                let parsed = format!("{:?}", cli.command.unwrap());
                assert_eq!(parsed, name);
            }
        }

        #[test]
        fn test_parse_kind() {
            let cli = Cli::parse_from(["exam-sprint", "kind", "long-break"]);
            match cli.command {
                Some(Commands::Kind { kind }) => assert_eq!(kind, SessionKind::LongBreak),
                _ => panic!("Expected Kind command"),
            }
        }

        #[test]
        fn test_parse_kind_rejects_unknown() {
            assert!(Cli::try_parse_from(["exam-sprint", "kind", "nap"]).is_err());
        }

        #[test]
        fn test_parse_note() {
            let cli = Cli::parse_from(["exam-sprint", "note", "covered chapter 2"]);
            match cli.command {
                Some(Commands::Note { text }) => assert_eq!(text, "covered chapter 2"),
                _ => panic!("Expected Note command"),
            }
        }

        #[test]
        fn test_parse_completions_zsh() {
            let cli = Cli::parse_from(["exam-sprint", "completions", "zsh"]);
            match cli.command {
                Some(Commands::Completions { shell }) => {
                    assert_eq!(shell, clap_complete::Shell::Zsh);
                }
                _ => panic!("Expected Completions command"),
            }
        }
    }

    // ------------------------------------------------------------------------
    // StartArgs / HistoryArgs Tests
    // ------------------------------------------------------------------------

    mod args_tests {
        use super::*;

        #[test]
        fn test_start_without_task() {
            let cli = Cli::parse_from(["exam-sprint", "start"]);
            match cli.command {
                Some(Commands::Start(args)) => assert!(args.task.is_none()),
                _ => panic!("Expected Start command"),
            }
        }

        #[test]
        fn test_start_with_task() {
            let cli = Cli::parse_from(["exam-sprint", "start", "--task", "linear-algebra"]);
            match cli.command {
                Some(Commands::Start(args)) => {
                    assert_eq!(args.task.as_deref(), Some("linear-algebra"))
                }
                _ => panic!("Expected Start command"),
            }
        }

        #[test]
        fn test_start_rejects_empty_task() {
            assert!(Cli::try_parse_from(["exam-sprint", "start", "--task", "  "]).is_err());
        }

        #[test]
        fn test_start_rejects_long_task() {
            let long = "あ".repeat(101);
            assert!(Cli::try_parse_from(["exam-sprint", "start", "-t", &long]).is_err());
        }

        #[test]
        fn test_history_with_date() {
            let cli = Cli::parse_from(["exam-sprint", "history", "--date", "2026-01-15"]);
            match cli.command {
                Some(Commands::History(args)) => {
                    assert_eq!(args.date, NaiveDate::from_ymd_opt(2026, 1, 15));
                }
                _ => panic!("Expected History command"),
            }
        }

        #[test]
        fn test_history_rejects_bad_date() {
            assert!(Cli::try_parse_from(["exam-sprint", "history", "-d", "15/01/2026"]).is_err());
        }
    }

    // ------------------------------------------------------------------------
    // Settings Tests
    // ------------------------------------------------------------------------

    mod settings_tests {
        use super::*;

        #[test]
        fn test_settings_without_action() {
            let cli = Cli::parse_from(["exam-sprint", "settings"]);
            assert!(matches!(
                cli.command,
                Some(Commands::Settings { action: None })
            ));
        }

        #[test]
        fn test_settings_set() {
            let cli = Cli::parse_from([
                "exam-sprint",
                "settings",
                "set",
                "--focus",
                "50",
                "--cycle",
                "3",
            ]);
            match cli.command {
                Some(Commands::Settings {
                    action: Some(SettingsAction::Set(args)),
                }) => {
                    assert_eq!(args.focus, Some(50));
                    assert_eq!(args.cycle, Some(3));
                    assert!(args.short_break.is_none());
                    assert!(!args.is_empty());
                }
                _ => panic!("Expected Settings Set command"),
            }
        }

        #[test]
        fn test_settings_set_rejects_out_of_range() {
            assert!(
                Cli::try_parse_from(["exam-sprint", "settings", "set", "--focus", "121"]).is_err()
            );
            assert!(
                Cli::try_parse_from(["exam-sprint", "settings", "set", "--cycle", "0"]).is_err()
            );
            assert!(Cli::try_parse_from([
                "exam-sprint",
                "settings",
                "set",
                "--short-break",
                "61"
            ])
            .is_err());
        }

        #[test]
        fn test_settings_args_empty() {
            assert!(SettingsArgs::default().is_empty());
        }
    }
}
