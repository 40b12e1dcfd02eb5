use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

const PLAYER_PAGE: &str = r#"{
    "frames": [
        { "name": "top", "videos": [] },
        { "name": "player", "videos": [ { "width": 1280, "height": 720, "playing": true } ] }
    ],
    "events": [
        { "at_ms": 500, "frame": "player", "action": { "type": "reset_rate_every", "period_ms": 300 } },
        { "at_ms": 1000, "frame": "player", "action": { "type": "load_source", "width": 1920, "height": 1080 } }
    ]
}"#;

const EMPTY_PAGE: &str = r#"{ "frames": [ { "name": "top" } ] }"#;

const RESTRICTED_PAGE: &str = r#"{ "restricted": "browser settings page", "frames": [ { "name": "top" } ] }"#;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

fn yeedio(prefs: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("yeedio"));
    cmd.env_remove("YEEDIO_LOG_STDERR")
        .arg("--prefs")
        .arg(prefs);
    cmd
}

#[test]
fn defaults_are_clamped_and_stored() {
    let dir = tempfile::tempdir().expect("tempdir");
    let prefs = dir.path().join("prefs.json");

    yeedio(&prefs)
        .args(["defaults", "--speed", "20", "--volume", "loud"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"speed":16.0,"volume":0}"#));

    let stored = fs::read_to_string(&prefs).expect("prefs file");
    assert!(stored.contains("globalDefaultSpeed"));
    assert!(stored.contains("globalDefaultVolume"));
}

#[test]
fn run_enforces_stored_speed_and_reports_resolution() {
    let dir = tempfile::tempdir().expect("tempdir");
    let prefs = write(dir.path(), "prefs.json", r#"{"speed": 2.0, "volume": 250}"#);
    let scenario = write(dir.path(), "page.json", PLAYER_PAGE);

    yeedio(&prefs)
        .arg("--scenario")
        .arg(&scenario)
        .args(["run", "--for-ms", "2100"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#"{"type":"RESOLUTION_CHANGED","width":1920,"height":1080}"#,
        ))
        .stdout(predicate::str::contains(r#""frame":"player""#))
        .stdout(predicate::str::contains(r#""playback_rate":2.0"#))
        .stdout(predicate::str::contains(r#""gain":2.5"#));
}

#[test]
fn set_reports_current_resolution() {
    let dir = tempfile::tempdir().expect("tempdir");
    let prefs = dir.path().join("prefs.json");
    let scenario = write(dir.path(), "page.json", PLAYER_PAGE);

    yeedio(&prefs)
        .arg("--scenario")
        .arg(&scenario)
        .args(["set", "--speed", "3", "--for-ms", "1100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("speed 3 volume 100%"))
        .stdout(predicate::str::contains("Current Resolution: 1920x1080"));

    let stored = fs::read_to_string(&prefs).expect("prefs file");
    assert!(stored.contains("\"speed\": 3.0"));
}

#[test]
fn state_without_video_falls_back_to_storage() {
    let dir = tempfile::tempdir().expect("tempdir");
    let prefs = write(dir.path(), "prefs.json", r#"{"globalDefaultSpeed": 1.5}"#);
    let scenario = write(dir.path(), "page.json", EMPTY_PAGE);

    yeedio(&prefs)
        .arg("--scenario")
        .arg(&scenario)
        .arg("state")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""speed":1.5"#))
        .stdout(predicate::str::contains("No video player found."));
}

#[test]
fn restricted_page_cannot_be_accessed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let prefs = dir.path().join("prefs.json");
    let scenario = write(dir.path(), "page.json", RESTRICTED_PAGE);

    yeedio(&prefs)
        .arg("--scenario")
        .arg(&scenario)
        .args(["set", "--volume", "300"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CANNOT ACCESS THIS PAGE."));
}

#[test]
fn missing_scenario_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let prefs = dir.path().join("prefs.json");

    yeedio(&prefs)
        .arg("state")
        .assert()
        .failure()
        .stderr(predicate::str::contains("scenario"));
}

#[test]
fn show_log_prints_component_tagged_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let prefs = dir.path().join("prefs.json");
    let scenario = write(dir.path(), "page.json", PLAYER_PAGE);

    yeedio(&prefs)
        .env("RUST_LOG", "info")
        .arg("--scenario")
        .arg(&scenario)
        .args(["run", "--for-ms", "100", "--show-log"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[INFO runner] Starting Yeedio CLI"));
}
