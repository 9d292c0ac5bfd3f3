//! Workout history loading.
//!
//! Merges the live WAL with the CSV set archive and answers the progression
//! service's query: the most recent performances of one exercise, newest
//! first, bounded in count.

use crate::csv_rollup::CsvRow;
use crate::{Error, ExerciseLog, ExercisePerformance, Result, SetLog, Workout};
use chrono::{DateTime, Utc};
use csv::ReaderBuilder;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use uuid::Uuid;

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Other(format!("Invalid date '{}': {}", value, e)))
}

/// Rebuild workouts from archived set rows
fn load_workouts_from_csv(path: &Path) -> Result<Vec<Workout>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut order: Vec<Uuid> = Vec::new();
    let mut workouts: HashMap<Uuid, Workout> = HashMap::new();

    for result in reader.deserialize::<CsvRow>() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("Failed to deserialize CSV row: {}", e);
                continue;
            }
        };

        let id = match Uuid::parse_str(&row.workout_id) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("Skipping CSV row with invalid workout id: {}", e);
                continue;
            }
        };
        let performed_at = match parse_time(&row.performed_at) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!("Skipping CSV row: {}", e);
                continue;
            }
        };

        let workout = workouts.entry(id).or_insert_with(|| {
            order.push(id);
            Workout {
                id,
                performed_at,
                name: row.workout_name.clone(),
                exercises: Vec::new(),
                duration_seconds: row.duration,
            }
        });

        let set = SetLog {
            target_reps: row.target_reps,
            reps: row.reps,
            weight: row.weight,
            rpe: row.rpe,
            is_completed: row.is_completed,
            completed_at: row.completed_at.as_deref().and_then(|t| parse_time(t).ok()),
        };

        // Rows for one exercise are contiguous within a workout
        let continues_last = row.set_index > 0
            && workout
                .exercises
                .last()
                .map_or(false, |log| log.exercise == row.exercise);

        match workout.exercises.last_mut() {
            Some(log) if continues_last => log.sets.push(set),
            _ => {
                let log = ExerciseLog {
                    exercise: row.exercise,
                    sets: vec![set],
                    is_deload: row.is_deload,
                };
                workout.exercises.push(log);
            }
        }
    }

    Ok(order
        .into_iter()
        .filter_map(|id| workouts.remove(&id))
        .collect())
}

/// Load every workout from the WAL and CSV archive, newest first
///
/// Workouts present in both are returned once.
pub fn load_workouts(wal_path: &Path, csv_path: &Path) -> Result<Vec<Workout>> {
    let mut workouts = Vec::new();
    let mut seen_ids = HashSet::new();

    if wal_path.exists() {
        for workout in crate::wal::read_workouts(wal_path)? {
            if seen_ids.insert(workout.id) {
                workouts.push(workout);
            }
        }
        tracing::debug!("Loaded {} workouts from WAL", workouts.len());
    }

    if csv_path.exists() {
        let mut csv_count = 0;
        for workout in load_workouts_from_csv(csv_path)? {
            if seen_ids.insert(workout.id) {
                workouts.push(workout);
                csv_count += 1;
            }
        }
        tracing::debug!("Loaded {} workouts from CSV", csv_count);
    }

    workouts.sort_by(|a, b| b.performed_at.cmp(&a.performed_at));
    Ok(workouts)
}

/// Most recent performances of an exercise, newest first, at most `limit`
///
/// Exercise names compare case-insensitively.
pub fn load_recent_performance(
    wal_path: &Path,
    csv_path: &Path,
    exercise: &str,
    limit: usize,
) -> Result<Vec<ExercisePerformance>> {
    let workouts = load_workouts(wal_path, csv_path)?;
    let performances = recent_performance(&workouts, exercise, limit);

    tracing::info!(
        "Loaded {} recent performances of {}",
        performances.len(),
        exercise
    );

    Ok(performances)
}

/// Filter already-loaded workouts (newest first) down to one exercise
pub fn recent_performance(
    workouts: &[Workout],
    exercise: &str,
    limit: usize,
) -> Vec<ExercisePerformance> {
    workouts
        .iter()
        .flat_map(|w| {
            w.exercises
                .iter()
                .filter(|log| log.exercise.eq_ignore_ascii_case(exercise))
                .filter_map(move |log| ExercisePerformance::from_log(w.id, w.performed_at, log))
        })
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::WorkoutSink;
    use chrono::Duration;

    fn create_test_workout(exercise: &str, weight: f64, days_ago: i64) -> Workout {
        Workout::new(
            Utc::now() - Duration::days(days_ago),
            vec![ExerciseLog {
                exercise: exercise.into(),
                sets: vec![SetLog::completed(weight, 5, Some(8.0)); 3],
                is_deload: false,
            }],
        )
    }

    #[test]
    fn test_recent_performance_newest_first_and_bounded() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("workouts.wal");
        let csv_path = temp_dir.path().join("sets.csv");

        let mut sink = crate::wal::JsonlSink::new(&wal_path);
        sink.append(&create_test_workout("Squat", 100.0, 5)).unwrap();
        sink.append(&create_test_workout("Squat", 105.0, 1)).unwrap();
        sink.append(&create_test_workout("Bench", 80.0, 2)).unwrap();
        sink.append(&create_test_workout("Squat", 102.5, 3)).unwrap();

        let history = load_recent_performance(&wal_path, &csv_path, "squat", 2).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].weight, 105.0);
        assert_eq!(history[1].weight, 102.5);
    }

    #[test]
    fn test_csv_archive_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("workouts.wal");
        let csv_path = temp_dir.path().join("sets.csv");

        let mut workout = create_test_workout("Squat", 100.0, 1);
        workout.exercises.push(ExerciseLog {
            exercise: "Bench".into(),
            sets: vec![SetLog::completed(70.0, 8, None); 2],
            is_deload: true,
        });
        let mut sink = crate::wal::JsonlSink::new(&wal_path);
        sink.append(&workout).unwrap();

        crate::csv_rollup::wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();

        let loaded = load_workouts(&wal_path, &csv_path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, workout.id);
        assert_eq!(loaded[0].exercises.len(), 2);
        assert_eq!(loaded[0].exercises[0].sets.len(), 3);
        assert_eq!(loaded[0].exercises[1].sets.len(), 2);
        assert!(loaded[0].exercises[1].is_deload);
        assert_eq!(loaded[0].exercises[1].sets[0].rpe, None);
    }

    #[test]
    fn test_deduplication_across_wal_and_csv() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("workouts.wal");
        let csv_path = temp_dir.path().join("sets.csv");

        let workout = create_test_workout("Squat", 100.0, 1);
        let mut sink = crate::wal::JsonlSink::new(&wal_path);
        sink.append(&workout).unwrap();
        crate::csv_rollup::wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();

        // Same workout appended to a fresh WAL as well
        let mut sink = crate::wal::JsonlSink::new(&wal_path);
        sink.append(&workout).unwrap();

        let loaded = load_workouts(&wal_path, &csv_path).unwrap();
        assert_eq!(loaded.iter().filter(|w| w.id == workout.id).count(), 1);
    }

    #[test]
    fn test_missing_files_give_empty_history() {
        let temp_dir = tempfile::tempdir().unwrap();
        let history = load_recent_performance(
            &temp_dir.path().join("none.wal"),
            &temp_dir.path().join("none.csv"),
            "Squat",
            10,
        )
        .unwrap();
        assert!(history.is_empty());
    }
}
