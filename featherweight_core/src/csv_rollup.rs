//! CSV rollup for archiving WAL workouts.
//!
//! Each logged set becomes one CSV row so the archive stays readable in a
//! spreadsheet. The WAL is only archived after the CSV has been synced.

use crate::{Result, Workout};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::Path;

/// A row in the set archive
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CsvRow {
    pub workout_id: String,
    pub performed_at: String,
    pub workout_name: Option<String>,
    pub duration: Option<u32>,
    pub exercise: String,
    pub is_deload: bool,
    pub set_index: u32,
    pub target_reps: u32,
    pub reps: u32,
    pub weight: f64,
    pub rpe: Option<f64>,
    pub is_completed: bool,
    pub completed_at: Option<String>,
}

/// Flatten a workout into one row per set
pub(crate) fn workout_rows(workout: &Workout) -> Vec<CsvRow> {
    workout
        .exercises
        .iter()
        .flat_map(|log| {
            log.sets.iter().enumerate().map(move |(i, set)| CsvRow {
                workout_id: workout.id.to_string(),
                performed_at: workout.performed_at.to_rfc3339(),
                workout_name: workout.name.clone(),
                duration: workout.duration_seconds,
                exercise: log.exercise.clone(),
                is_deload: log.is_deload,
                set_index: i as u32,
                target_reps: set.target_reps,
                reps: set.reps,
                weight: set.weight,
                rpe: set.rpe,
                is_completed: set.is_completed,
                completed_at: set.completed_at.map(|t| t.to_rfc3339()),
            })
        })
        .collect()
}

/// Roll up WAL workouts into CSV and archive the WAL
///
/// This function:
/// 1. Reads all workouts from the WAL
/// 2. Appends their sets to the CSV file (creates with headers if needed)
/// 3. Syncs the CSV to disk
/// 4. Renames the WAL to .wal.processed
/// 5. Returns the number of workouts processed
pub fn wal_to_csv_and_archive(wal_path: &Path, csv_path: &Path) -> Result<usize> {
    let crate::wal::WalScan {
        workouts,
        skipped_lines,
    } = crate::wal::scan(wal_path)?;

    if workouts.is_empty() {
        tracing::info!("No workouts in WAL to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    // Only a fresh file gets the header row
    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    let mut row_count = 0;
    for workout in &workouts {
        for row in workout_rows(workout) {
            writer.serialize(row)?;
            row_count += 1;
        }
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Wrote {} sets from {} workouts to CSV", row_count, workouts.len());

    if !skipped_lines.is_empty() {
        tracing::warn!(
            "{} unreadable WAL lines left in the archived WAL (lines {:?})",
            skipped_lines.len(),
            skipped_lines
        );
    }

    let processed_path = wal_path.with_extension("wal.processed");
    std::fs::rename(wal_path, &processed_path)?;

    tracing::info!("Archived WAL to {:?}", processed_path);

    Ok(workouts.len())
}

/// Remove all .wal.processed files in the given directory
pub fn cleanup_processed_wals(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.extension().map_or(false, |ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed WAL: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed WAL files", count);
    }

    Ok(count)
}
