//! Exam Sprint - a Pomodoro timer for exam preparation
//!
//! Alternates focused study sessions with breaks:
//! - 25 minutes of focus
//! - 5 minutes of short break
//! - 15 minutes of long break after every 4 focus sessions

use anyhow::{Context, Result};
use chrono::Local;
use clap::{CommandFactory, Parser};

use exam_sprint::cli::{Cli, Commands, Display, IpcClient, SettingsAction, SettingsArgs};
use exam_sprint::daemon;
use exam_sprint::paths::AppPaths;
use exam_sprint::store::{JsonHistoryStore, SessionHistoryStore, SettingsFile};
use exam_sprint::types::TimerSettings;

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` takes precedence; otherwise warnings only, or info with `--verbose`.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Start(args)) => {
            let response = IpcClient::new()?.start(args.task).await?;
            Display::show_action(&response);
        }
        Some(Commands::Pause) => {
            let response = IpcClient::new()?.pause().await?;
            Display::show_action(&response);
        }
        Some(Commands::Resume) => {
            let response = IpcClient::new()?.resume().await?;
            Display::show_action(&response);
        }
        Some(Commands::Stop) => {
            let response = IpcClient::new()?.stop().await?;
            Display::show_action(&response);
        }
        Some(Commands::Skip) => {
            let response = IpcClient::new()?.skip().await?;
            Display::show_action(&response);
        }
        Some(Commands::Reset) => {
            let response = IpcClient::new()?.reset().await?;
            Display::show_action(&response);
        }
        Some(Commands::Kind { kind }) => {
            let response = IpcClient::new()?.set_kind(kind).await?;
            Display::show_action(&response);
        }
        Some(Commands::Note { text }) => {
            let response = IpcClient::new()?.note(&text).await?;
            Display::show_action(&response);
        }
        Some(Commands::Status) => {
            let response = IpcClient::new()?.status().await?;
            Display::show_status(&response);
        }
        Some(Commands::Today) => {
            let response = IpcClient::new()?.today().await?;
            Display::show_today(&response);
        }
        Some(Commands::History(args)) => {
            let paths = AppPaths::resolve()?;
            let date = args.date.unwrap_or_else(|| Local::now().date_naive());
            let store = JsonHistoryStore::open(paths.sessions())
                .context("セッション履歴を読み込めません")?;
            let records = store.query_by_day(date)?;
            Display::show_history(date, &records);
        }
        Some(Commands::Settings { action }) => {
            let paths = AppPaths::resolve()?;
            let file = SettingsFile::new(paths.settings());
            match action {
                None | Some(SettingsAction::Show) => {
                    Display::show_settings(&file.load()?, file.path());
                }
                Some(SettingsAction::Set(args)) => {
                    let updated = apply_settings(&file, &args)?;
                    Display::show_settings(&updated, file.path());
                }
            }
        }
        Some(Commands::Daemon) => {
            let paths = AppPaths::resolve()?;
            daemon::run(&paths).await?;
        }
        Some(Commands::Completions { shell }) => {
            generate_completions(shell);
        }
        None => {
            // No command provided, show help
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

/// Merges the given values into the stored settings and saves them.
fn apply_settings(file: &SettingsFile, args: &SettingsArgs) -> Result<TimerSettings> {
    if args.is_empty() {
        anyhow::bail!("変更する設定を1つ以上指定してください");
    }

    let mut settings = file.load()?;
    if let Some(focus) = args.focus {
        settings.focus_minutes = focus;
    }
    if let Some(short_break) = args.short_break {
        settings.short_break_minutes = short_break;
    }
    if let Some(long_break) = args.long_break {
        settings.long_break_minutes = long_break;
    }
    if let Some(cycle) = args.cycle {
        settings.cycle_length = cycle;
    }

    file.save(&settings)?;
    tracing::info!("設定を保存しました: {:?}", file.path());
    Ok(settings)
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_apply_settings_merges_values() {
        let dir = tempfile::tempdir().unwrap();
        let file = SettingsFile::new(dir.path().join("settings.json"));
        let args = SettingsArgs {
            focus: Some(45),
            cycle: Some(2),
            ..Default::default()
        };

        let updated = apply_settings(&file, &args).unwrap();

        assert_eq!(updated.focus_minutes, 45);
        assert_eq!(updated.short_break_minutes, 5);
        assert_eq!(updated.cycle_length, 2);
        assert_eq!(file.load().unwrap(), updated);
    }

    #[test]
    fn test_apply_settings_requires_a_value() {
        let dir = tempfile::tempdir().unwrap();
        let file = SettingsFile::new(dir.path().join("settings.json"));

        assert!(apply_settings(&file, &SettingsArgs::default()).is_err());
        assert!(!file.path().exists());
    }
}
