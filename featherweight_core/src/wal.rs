//! Workout log: one JSON workout per line.
//!
//! The log is the source of truth for history until it is rolled up into the
//! CSV archive. Appends hold an exclusive fs2 lock and are synced before the
//! lock is released; readers take a shared lock.

use crate::{Result, Workout};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Destination for logged workouts
pub trait WorkoutSink {
    fn append(&mut self, workout: &Workout) -> Result<()>;
}

/// Appends workouts to a JSONL file
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WorkoutSink for JsonlSink {
    /// Append one workout as a single line
    ///
    /// Workouts with non-finite loads are refused: they would be written as
    /// `null` and silently dropped the next time the log is read.
    fn append(&mut self, workout: &Workout) -> Result<()> {
        workout.validate()?;

        let mut line = serde_json::to_vec(workout)?;
        line.push(b'\n');

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;
        let written = file.write_all(&line).and_then(|_| file.sync_data());
        file.unlock()?;
        written?;

        tracing::debug!(
            "Appended workout {} ({} exercises) to {:?}",
            workout.id,
            workout.exercises.len(),
            self.path
        );
        Ok(())
    }
}

/// Result of reading a workout log
#[derive(Debug, Default)]
pub struct WalScan {
    pub workouts: Vec<Workout>,
    /// 1-based numbers of lines that did not parse as a workout
    pub skipped_lines: Vec<usize>,
}

/// Read every parseable workout, recording the lines that were not
pub fn scan(path: &Path) -> Result<WalScan> {
    let mut result = WalScan::default();
    if !path.exists() {
        return Ok(result);
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    for (index, line) in BufReader::new(&file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Workout>(&line) {
            Ok(workout) => result.workouts.push(workout),
            Err(e) => {
                tracing::warn!("Skipping unreadable workout on line {}: {}", index + 1, e);
                result.skipped_lines.push(index + 1);
            }
        }
    }

    file.unlock()?;
    tracing::debug!(
        "Read {} workouts from {:?} ({} lines skipped)",
        result.workouts.len(),
        path,
        result.skipped_lines.len()
    );
    Ok(result)
}

/// Read all parseable workouts from a log file
pub fn read_workouts(path: &Path) -> Result<Vec<Workout>> {
    scan(path).map(|scan| scan.workouts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, ExerciseLog, SetLog};
    use chrono::Utc;

    fn squat_workout(weight: f64) -> Workout {
        Workout::new(
            Utc::now(),
            vec![ExerciseLog {
                exercise: "Barbell Back Squat".into(),
                sets: vec![SetLog::completed(weight, 5, Some(8.0)); 3],
                is_deload: false,
            }],
        )
    }

    #[test]
    fn test_append_then_read_preserves_sets() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut sink = JsonlSink::new(temp_dir.path().join("wal/workouts.wal"));

        let first = squat_workout(100.0);
        sink.append(&first).unwrap();
        sink.append(&squat_workout(102.5)).unwrap();

        let workouts = read_workouts(sink.path()).unwrap();
        assert_eq!(workouts.len(), 2);
        assert_eq!(workouts[0].id, first.id);
        assert_eq!(workouts[1].exercises[0].sets[0].weight, 102.5);
    }

    #[test]
    fn test_missing_log_reads_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let scan = scan(&temp_dir.path().join("nonexistent.wal")).unwrap();
        assert!(scan.workouts.is_empty());
        assert!(scan.skipped_lines.is_empty());
    }

    #[test]
    fn test_unreadable_lines_reported() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("workouts.wal");

        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&squat_workout(100.0)).unwrap();
        {
            let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
            writeln!(file, "{{ not a workout").unwrap();
        }
        sink.append(&squat_workout(105.0)).unwrap();

        let scan = scan(&wal_path).unwrap();
        assert_eq!(scan.workouts.len(), 2);
        assert_eq!(scan.skipped_lines, vec![2]);
    }

    #[test]
    fn test_non_finite_weight_not_appended() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("workouts.wal");
        let mut sink = JsonlSink::new(&wal_path);

        sink.append(&squat_workout(100.0)).unwrap();
        let result = sink.append(&squat_workout(f64::NAN));
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        let content = std::fs::read_to_string(&wal_path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert_eq!(read_workouts(&wal_path).unwrap().len(), 1);
    }
}
