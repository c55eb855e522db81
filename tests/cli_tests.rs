//! Acceptance tests for the compiled `exam-sprint` binary.
//!
//! Each test points the binary at its own data directory through
//! `EXAM_SPRINT_HOME`, so no daemon or user files are touched.

use std::path::Path;

use assert_cmd::Command;
use chrono::Utc;
use predicates::prelude::*;
use tempfile::TempDir;

use exam_sprint::paths::{AppPaths, HOME_ENV};
use exam_sprint::store::{JsonHistoryStore, SessionHistoryStore};
use exam_sprint::types::{SessionKind, SessionRecord};

fn exam_sprint(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("exam-sprint").unwrap();
    cmd.env(HOME_ENV, home).env_remove("RUST_LOG");
    cmd
}

fn seed_history(home: &Path) {
    let paths = AppPaths::at(home);
    let mut store = JsonHistoryStore::open(paths.sessions()).unwrap();
    let now = Utc::now();

    let mut focus = SessionRecord::begin(
        SessionKind::Focus,
        25,
        Some("thermodynamics".to_string()),
        now,
    );
    focus.finish(now, true);
    store.append(focus).unwrap();

    let mut rest = SessionRecord::begin(SessionKind::ShortBreak, 5, None, now);
    rest.finish(now, true);
    store.append(rest).unwrap();
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();

    exam_sprint(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("history"))
        .stdout(predicate::str::contains("daemon"));
}

#[test]
fn test_settings_show_defaults() {
    let home = TempDir::new().unwrap();

    exam_sprint(home.path())
        .args(["settings", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("集中時間: 25 分"))
        .stdout(predicate::str::contains("長い休憩までの集中回数: 4 回"));
}

#[test]
fn test_settings_set_persists() {
    let home = TempDir::new().unwrap();

    exam_sprint(home.path())
        .args(["settings", "set", "--focus", "50", "--long-break", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("集中時間: 50 分"));

    exam_sprint(home.path())
        .arg("settings")
        .assert()
        .success()
        .stdout(predicate::str::contains("集中時間: 50 分"))
        .stdout(predicate::str::contains("長い休憩: 20 分"))
        .stdout(predicate::str::contains("短い休憩: 5 分"));

    assert!(AppPaths::at(home.path()).settings().exists());
}

#[test]
fn test_settings_set_rejects_out_of_range() {
    let home = TempDir::new().unwrap();

    exam_sprint(home.path())
        .args(["settings", "set", "--focus", "0"])
        .assert()
        .failure();

    assert!(!AppPaths::at(home.path()).settings().exists());
}

#[test]
fn test_settings_set_without_values_fails() {
    let home = TempDir::new().unwrap();

    exam_sprint(home.path())
        .args(["settings", "set"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("エラー:"));
}

#[test]
fn test_history_empty_day() {
    let home = TempDir::new().unwrap();

    exam_sprint(home.path())
        .args(["history", "--date", "2020-01-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2020-01-01 のセッション"))
        .stdout(predicate::str::contains("記録はありません"));
}

#[test]
fn test_history_lists_today() {
    let home = TempDir::new().unwrap();
    seed_history(home.path());

    exam_sprint(home.path())
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("[thermodynamics]"))
        .stdout(predicate::str::contains("短い休憩"))
        .stdout(predicate::str::contains("集中: 1 回 / 25 分"));
}

#[test]
fn test_unknown_kind_is_rejected() {
    let home = TempDir::new().unwrap();

    exam_sprint(home.path())
        .args(["kind", "nap"])
        .assert()
        .failure();
}

#[test]
fn test_status_without_daemon_fails() {
    let home = TempDir::new().unwrap();

    exam_sprint(home.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("デーモンに接続できません"));
}

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();

    exam_sprint(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("exam-sprint"));
}
