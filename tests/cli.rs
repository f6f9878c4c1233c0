//! Tests of the command-line binary's startup checks.
//!
//! Every case fails before a browser is launched, so Chrome is not needed.

use std::path::Path;
use std::process::{Command, Output};

const MISSING: &str = "error [config]: missing required credentials";

/// Run the binary with only `vars` in its environment, from `dir`.
fn run_in(dir: &Path, vars: &[(&str, &str)]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_leonardo-motion"))
        .env_clear()
        .envs(vars.iter().copied())
        .current_dir(dir)
        .output()
        .expect("Failed to run binary")
}

fn assert_missing(output: &Output, expected: &[&str], absent: &[&str]) {
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(1), "stderr: {}", stderr);
    assert!(stderr.contains(MISSING), "stderr: {}", stderr);
    for var in expected {
        assert!(stderr.contains(var), "{} not named in: {}", var, stderr);
    }
    for var in absent {
        assert!(!stderr.contains(var), "{} wrongly named in: {}", var, stderr);
    }
    assert!(!String::from_utf8_lossy(&output.stdout).contains("Video siap"));
}

#[test]
fn test_missing_email_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), &[("LEONARDO_PASSWORD", "hunter2")]);
    assert_missing(&output, &["LEONARDO_EMAIL"], &["LEONARDO_PASSWORD"]);
    // Bootstrap never got as far as the output directory.
    assert!(!dir.path().join("downloads").exists());
}

#[test]
fn test_missing_password_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), &[("LEONARDO_EMAIL", "a@b.com")]);
    assert_missing(&output, &["LEONARDO_PASSWORD"], &["LEONARDO_EMAIL"]);
    assert!(!dir.path().join("downloads").exists());
}

#[test]
fn test_missing_both_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), &[]);
    assert_missing(&output, &["LEONARDO_EMAIL", "LEONARDO_PASSWORD"], &[]);
    assert!(!dir.path().join("downloads").exists());
}

#[test]
fn test_empty_credential_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(
        dir.path(),
        &[("LEONARDO_EMAIL", ""), ("LEONARDO_PASSWORD", "hunter2")],
    );
    assert_missing(&output, &["LEONARDO_EMAIL"], &["LEONARDO_PASSWORD"]);
}

#[test]
fn test_dotenv_file_is_read() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".env"), "LEONARDO_EMAIL=a@b.com\n").unwrap();
    let output = run_in(dir.path(), &[]);
    assert_missing(&output, &["LEONARDO_PASSWORD"], &["LEONARDO_EMAIL"]);
}

#[test]
fn test_check_with_credentials_launches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_leonardo-motion"))
        .arg("--check")
        .env_clear()
        .env("LEONARDO_EMAIL", "a@b.com")
        .env("LEONARDO_PASSWORD", "hunter2")
        .env("LEONARDO_VIEWPORT", "1920x1080")
        .current_dir(dir.path())
        .output()
        .expect("Failed to run binary");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        output.status.code(),
        Some(0),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout.contains("Viewport: 1920x1080"), "stdout: {}", stdout);
    assert!(!stdout.contains("hunter2"), "stdout: {}", stdout);
    assert!(!dir.path().join("downloads").exists());
}
