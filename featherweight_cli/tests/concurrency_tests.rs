//! Concurrency tests for the `fw` binary.
//!
//! These tests verify that multiple processes can safely:
//! - Append to the WAL simultaneously (file locking)
//! - Update the progress file without losing it
//! - Read history while workouts are being logged

use assert_cmd::Command;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("fw"))
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[test]
fn test_sequential_workout_logging() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    for i in 0..5 {
        thread::sleep(Duration::from_millis(i * 5));
        cli()
            .arg("log")
            .arg("--data-dir")
            .arg(&data_dir)
            .arg("--exercise")
            .arg("squat")
            .arg("--set")
            .arg("100x5")
            .assert()
            .success();
    }

    let wal_content =
        std::fs::read_to_string(data_dir.join("wal/workouts.wal")).expect("Failed to read WAL");
    let workout_count = wal_content.lines().count();
    assert_eq!(workout_count, 5, "Expected 5 workouts, got {}", workout_count);
}

#[test]
fn test_parallel_workout_logging() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();
    std::fs::create_dir_all(data_dir.join("wal")).unwrap();

    let handles: Vec<_> = ["squat", "bench", "deadlift", "ohp"]
        .into_iter()
        .map(|exercise| {
            let data_dir = data_dir.clone();
            thread::spawn(move || {
                cli()
                    .arg("log")
                    .arg("--data-dir")
                    .arg(&data_dir)
                    .arg("--exercise")
                    .arg(exercise)
                    .arg("--set")
                    .arg("60x5")
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("logging thread panicked");
    }

    // Every append landed as its own intact line
    let wal_content =
        std::fs::read_to_string(data_dir.join("wal/workouts.wal")).expect("Failed to read WAL");
    assert_eq!(wal_content.lines().count(), 4);
    for line in wal_content.lines() {
        serde_json::from_str::<serde_json::Value>(line).expect("WAL line should be valid JSON");
    }

    // No update overwrote another process's rows
    let progress = std::fs::read_to_string(data_dir.join("wal/progress.json")).unwrap();
    let progress: serde_json::Value =
        serde_json::from_str(&progress).expect("progress should be valid JSON");
    for exercise in [
        "Barbell Back Squat",
        "Barbell Bench Press",
        "Conventional Deadlift",
        "Overhead Press",
    ] {
        assert!(
            progress["progress"][exercise].is_object(),
            "missing progress row for {}",
            exercise
        );
        assert!(
            progress["maxes"][exercise].is_object(),
            "missing 1RM for {}",
            exercise
        );
    }
}

#[test]
fn test_reads_between_writes() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    for _ in 0..3 {
        cli()
            .arg("log")
            .arg("--data-dir")
            .arg(&data_dir)
            .arg("--exercise")
            .arg("row")
            .arg("--set")
            .arg("70x8")
            .assert()
            .success();

        cli()
            .arg("next")
            .arg("--data-dir")
            .arg(&data_dir)
            .arg("--exercise")
            .arg("row")
            .assert()
            .success();

        cli()
            .arg("status")
            .arg("--data-dir")
            .arg(&data_dir)
            .assert()
            .success();
    }
}

#[test]
fn test_rollup_then_log_again() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    for round in 0..2 {
        cli()
            .arg("log")
            .arg("--data-dir")
            .arg(&data_dir)
            .arg("--exercise")
            .arg("bench")
            .arg("--set")
            .arg("80x5")
            .assert()
            .success();

        cli()
            .arg("rollup")
            .arg("--data-dir")
            .arg(&data_dir)
            .arg("--cleanup")
            .assert()
            .success();

        let csv = std::fs::read_to_string(data_dir.join("sets.csv")).unwrap();
        assert_eq!(csv.lines().count(), 2 + round);
    }
}
