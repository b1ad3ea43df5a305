//! The `wavsk` binary end to end.

mod common;

use std::process::Command;

use common::*;

fn wavsk() -> Command {
    Command::new(env!("CARGO_BIN_EXE_wavsk"))
}

#[test]
fn test_cli_runs_action_with_trailing_options() {
    let dir = tempfile::tempdir().unwrap();
    let samples = layout(&[(0, 200), (4000, 100), (0, 200)]);
    let input = write_mono_file(dir.path(), "in.wav", 8000, &samples);
    let output = dir.path().join("out.wav");

    let status = wavsk()
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .args(["--action", "silence-remover", "--", "--silencethreshold", "100"])
        .status()
        .unwrap();
    assert!(status.success());
    assert_eq!(read_all(&output).1, samples[200..300].to_vec());
}

#[test]
fn test_cli_fails_on_existing_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_mono_file(dir.path(), "in.wav", 8000, &[1; 10]);
    let output = dir.path().join("out.wav");
    std::fs::write(&output, b"x").unwrap();

    let status = wavsk()
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .args(["--action", "identity"])
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
}

#[test]
fn test_cli_rejects_unknown_action() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_mono_file(dir.path(), "in.wav", 8000, &[1; 10]);
    let status = wavsk()
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(dir.path().join("out.wav"))
        .args(["--action", "reverse"])
        .status()
        .unwrap();
    assert!(!status.success());
}
