//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with HOME pointed at a temporary directory.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_breathroom"))
        .args(args)
        .env("HOME", home)
        .env_remove("BREATHROOM_ENV")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout).expect("stdout is JSON")
}

#[test]
fn test_session_plan() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["session", "plan", "--minutes", "5"]);
    assert_eq!(code, 0);

    let plan = json(&stdout);
    assert_eq!(plan["duration_minutes"], 5);
    assert_eq!(plan["total_cycles"], 16);
    assert_eq!(plan["total_duration_ms"], 16 * 19_000);
    assert_eq!(plan["preparation_ms"], 6_000);
}

#[test]
fn test_session_plan_uses_config_default() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["session", "plan"]);
    assert_eq!(code, 0);
    assert_eq!(json(&stdout)["duration_minutes"], 5);
}

#[test]
fn test_invalid_minutes_rejected() {
    let home = tempfile::tempdir().unwrap();
    for bad in ["0", "abc", "-3"] {
        let (_, _, code) = run_cli(home.path(), &["session", "plan", "--minutes", bad]);
        assert_ne!(code, 0, "minutes {bad:?} should be rejected");
    }
}

#[test]
fn test_unknown_track_rejected() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(
        home.path(),
        &["session", "start", "--ephemeral", "--music", "whale-song"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("whale-song"));
}

#[test]
fn test_config_get_default() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "session.duration_minutes"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "5");
}

#[test]
fn test_config_set_then_get() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "set", "session.music", "rain"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "session.music = rain");

    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "session.music"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "rain");
}

#[test]
fn test_config_set_invalid_value() {
    let home = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(
        home.path(),
        &["config", "set", "display.visual_intensity", "2.0"],
    );
    assert_eq!(code, 1);
}

#[test]
fn test_config_get_unknown_key() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["config", "get", "nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Unknown configuration key: nope"));
    assert!(stderr.contains("session.duration_minutes"));
}

#[test]
fn test_config_list_prints_every_key() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.lines().any(|l| l == "session.duration_minutes = 5"));
    assert!(stdout.lines().any(|l| l == "display.show_streak = true"));
    assert_eq!(stdout.lines().count(), 5);
}

#[test]
fn test_mixed_case_track_is_selectable() {
    let home = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(
        home.path(),
        &["config", "set", "music.tracks", r#"["rain","forest","Ocean"]"#],
    );
    assert_eq!(code, 0);

    let (stdout, _, code) = run_cli(home.path(), &["config", "set", "session.music", "ocean"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "session.music = ocean");

    // The saved file must still load and validate.
    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "session.music"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ocean");
}

#[test]
fn test_streak_show_empty() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["streak", "show"]);
    assert_eq!(code, 0);

    let streak = json(&stdout);
    assert_eq!(streak["count"], 0);
    assert_eq!(streak["liveCount"], 0);
    assert!(streak["lastSessionDate"].is_null());
}

#[test]
fn test_stats_all_empty() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["stats", "all"]);
    assert_eq!(code, 0);

    let stats = json(&stdout);
    assert_eq!(stats["total_sessions"], 0);
    assert_eq!(stats["completed_cycles"], 0);
}

#[test]
fn test_stats_history_empty() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["stats", "history", "--limit", "3"]);
    assert_eq!(code, 0);
    assert_eq!(json(&stdout), serde_json::json!([]));
}
