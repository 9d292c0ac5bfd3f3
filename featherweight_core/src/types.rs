//! Core domain types for Featherweight.
//!
//! This module defines the fundamental types used throughout the system:
//! - Logged workouts, exercises and sets
//! - Per-exercise progress aggregates and accepted 1RM records
//! - Progression decisions and personal records
//! - Exercise classification (movement patterns, muscle groups)

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Logged Training
// ============================================================================

/// A single set within an exercise log
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SetLog {
    pub target_reps: u32,
    pub reps: u32,
    /// Load in kilograms
    pub weight: f64,
    pub rpe: Option<f64>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SetLog {
    /// A completed set where the achieved reps met the target
    pub fn completed(weight: f64, reps: u32, rpe: Option<f64>) -> Self {
        Self {
            target_reps: reps,
            reps,
            weight,
            rpe,
            is_completed: true,
            completed_at: Some(Utc::now()),
        }
    }

    /// Reps short of the target (zero when the target was met or exceeded)
    pub fn missed_reps(&self) -> u32 {
        self.target_reps.saturating_sub(self.reps)
    }

    pub fn volume(&self) -> f64 {
        self.weight * self.reps as f64
    }

    /// Reject loads and RPEs that cannot be stored as JSON numbers
    ///
    /// Non-finite floats serialize as `null` and would make the record
    /// unreadable on the next load.
    pub fn validate(&self) -> Result<()> {
        match self.invalid_reason() {
            Some(reason) => Err(Error::InvalidInput(reason)),
            None => Ok(()),
        }
    }

    fn invalid_reason(&self) -> Option<String> {
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Some(format!("weight {} is not a valid load", self.weight));
        }
        match self.rpe {
            Some(rpe) if !(1.0..=10.0).contains(&rpe) => Some(format!("RPE {} outside 1-10", rpe)),
            _ => None,
        }
    }
}

/// One exercise performed within a workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseLog {
    pub exercise: String,
    pub sets: Vec<SetLog>,
    /// The prescription for this exercise was a deload
    #[serde(default)]
    pub is_deload: bool,
}

impl ExerciseLog {
    pub fn completed_sets(&self) -> impl Iterator<Item = &SetLog> {
        self.sets.iter().filter(|s| s.is_completed)
    }
}

/// A recorded workout
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Workout {
    pub id: Uuid,
    pub performed_at: DateTime<Utc>,
    pub name: Option<String>,
    pub exercises: Vec<ExerciseLog>,
    pub duration_seconds: Option<u32>,
}

impl Workout {
    pub fn new(performed_at: DateTime<Utc>, exercises: Vec<ExerciseLog>) -> Self {
        Self {
            id: Uuid::new_v4(),
            performed_at,
            name: None,
            exercises,
            duration_seconds: None,
        }
    }

    /// Check every set before the workout is persisted
    pub fn validate(&self) -> Result<()> {
        for log in &self.exercises {
            if let Some(reason) = log.sets.iter().find_map(SetLog::invalid_reason) {
                return Err(Error::InvalidInput(format!("{}: {}", log.exercise, reason)));
            }
        }
        Ok(())
    }
}

/// One exercise's result in one workout, as consumed by the progression service
#[derive(Clone, Debug, PartialEq)]
pub struct ExercisePerformance {
    pub workout_id: Uuid,
    pub exercise: String,
    pub performed_at: DateTime<Utc>,
    /// Heaviest weight used across the logged sets
    pub weight: f64,
    pub target_sets: u32,
    pub completed_sets: u32,
    pub target_reps_total: u32,
    pub completed_reps_total: u32,
    pub missed_reps: u32,
    pub avg_rpe: Option<f64>,
    pub is_deload: bool,
}

impl ExercisePerformance {
    /// Summarize an exercise log; returns None for a log without sets
    pub fn from_log(
        workout_id: Uuid,
        performed_at: DateTime<Utc>,
        log: &ExerciseLog,
    ) -> Option<Self> {
        if log.sets.is_empty() {
            return None;
        }

        let weight = log.sets.iter().map(|s| s.weight).fold(0.0_f64, f64::max);
        let completed: Vec<&SetLog> = log.completed_sets().collect();
        let rpes: Vec<f64> = completed.iter().filter_map(|s| s.rpe).collect();
        let avg_rpe = if rpes.is_empty() {
            None
        } else {
            Some(rpes.iter().sum::<f64>() / rpes.len() as f64)
        };

        // Uncompleted sets count all their target reps as missed
        let missed_reps = log
            .sets
            .iter()
            .map(|s| if s.is_completed { s.missed_reps() } else { s.target_reps })
            .sum();

        Some(Self {
            workout_id,
            exercise: log.exercise.clone(),
            performed_at,
            weight,
            target_sets: log.sets.len() as u32,
            completed_sets: completed.len() as u32,
            target_reps_total: log.sets.iter().map(|s| s.target_reps).sum(),
            completed_reps_total: completed.iter().map(|s| s.reps).sum(),
            missed_reps,
            avg_rpe,
            is_deload: log.is_deload,
        })
    }
}

// ============================================================================
// Progress Aggregates
// ============================================================================

/// Direction of an exercise's recent working weight
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressTrend {
    Improving,
    Stalling,
    Declining,
}

impl fmt::Display for ProgressTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Improving => write!(f, "improving"),
            Self::Stalling => write!(f, "stalling"),
            Self::Declining => write!(f, "declining"),
        }
    }
}

/// Per-exercise aggregate, mutated after every workout containing the exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GlobalExerciseProgress {
    pub exercise: String,
    pub current_working_weight: f64,
    pub estimated_max: f64,
    pub consecutive_stalls: u32,
    pub failure_streak: u32,
    pub trend: ProgressTrend,
    pub best_single_rep: Option<f64>,
    pub best_three_rep: Option<f64>,
    pub best_five_rep: Option<f64>,
    pub best_eight_rep: Option<f64>,
    pub avg_session_volume: f64,
    pub total_sessions: u32,
    pub recent_avg_rpe: Option<f64>,
    pub last_session_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// The currently accepted 1RM for an exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserExerciseMax {
    pub exercise: String,
    pub one_rm_estimate: f64,
    pub one_rm_confidence: f64,
    /// Human-readable provenance, e.g. "100kg x 3 @ RPE 8"
    pub one_rm_context: String,
    pub one_rm_date: DateTime<Utc>,
}

/// Persistent progress store: one aggregate and at most one max per exercise
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ProgressState {
    #[serde(default)]
    pub progress: HashMap<String, GlobalExerciseProgress>,
    #[serde(default)]
    pub maxes: HashMap<String, UserExerciseMax>,
}

// ============================================================================
// Progression Decisions
// ============================================================================

/// What the next session should do with the working weight
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionAction {
    Progress,
    Maintain,
    Deload,
}

impl fmt::Display for ProgressionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Progress => write!(f, "PROGRESS"),
            Self::Maintain => write!(f, "MAINTAIN"),
            Self::Deload => write!(f, "DELOAD"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DeloadDetails {
    pub previous_weight: f64,
    pub percentage: f64,
    pub consecutive_failures: u32,
}

/// Transient progression result; recomputed each time it is queried
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProgressionDecision {
    pub exercise: String,
    pub weight: f64,
    pub action: ProgressionAction,
    pub reason: String,
    pub is_deload: bool,
    pub deload_details: Option<DeloadDetails>,
}

// ============================================================================
// Personal Records
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrKind {
    /// Heaviest weight for exactly this many reps
    RepMax { reps: u32 },
    EstimatedOneRm,
}

impl fmt::Display for PrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RepMax { reps } => write!(f, "{}RM", reps),
            Self::EstimatedOneRm => write!(f, "estimated 1RM"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PersonalRecord {
    pub exercise: String,
    pub kind: PrKind,
    pub weight: f64,
    pub previous: Option<f64>,
    pub achieved_at: DateTime<Utc>,
}

// ============================================================================
// Exercise Classification
// ============================================================================

/// Fundamental movement pattern of an exercise
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MovementPattern {
    Squat,
    Hinge,
    Lunge,
    HorizontalPush,
    VerticalPush,
    HorizontalPull,
    VerticalPull,
    Carry,
    Isolation,
    Core,
}

impl MovementPattern {
    pub fn is_push(self) -> bool {
        matches!(self, Self::HorizontalPush | Self::VerticalPush)
    }

    pub fn is_pull(self) -> bool {
        matches!(self, Self::HorizontalPull | Self::VerticalPull)
    }
}

impl fmt::Display for MovementPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Squat => "squat",
            Self::Hinge => "hinge",
            Self::Lunge => "lunge",
            Self::HorizontalPush => "horizontal push",
            Self::VerticalPush => "vertical push",
            Self::HorizontalPull => "horizontal pull",
            Self::VerticalPull => "vertical pull",
            Self::Carry => "carry",
            Self::Isolation => "isolation",
            Self::Core => "core",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MuscleGroup {
    Chest,
    Back,
    Shoulders,
    Quads,
    Hamstrings,
    Glutes,
    Biceps,
    Triceps,
    Calves,
    Core,
}

impl fmt::Display for MuscleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Chest => "chest",
            Self::Back => "back",
            Self::Shoulders => "shoulders",
            Self::Quads => "quads",
            Self::Hamstrings => "hamstrings",
            Self::Glutes => "glutes",
            Self::Biceps => "biceps",
            Self::Triceps => "triceps",
            Self::Calves => "calves",
            Self::Core => "core",
        };
        write!(f, "{}", name)
    }
}

/// A catalog entry describing one exercise
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExerciseDefinition {
    pub name: String,
    pub aliases: Vec<String>,
    pub pattern: MovementPattern,
    pub primary_muscles: Vec<MuscleGroup>,
    pub secondary_muscles: Vec<MuscleGroup>,
}

/// The catalog of known exercises, keyed by lowercase canonical name
#[derive(Clone, Debug)]
pub struct Catalog {
    pub exercises: HashMap<String, ExerciseDefinition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(weight: f64, target: u32, reps: u32, completed: bool) -> SetLog {
        SetLog {
            target_reps: target,
            reps,
            weight,
            rpe: Some(8.0),
            is_completed: completed,
            completed_at: None,
        }
    }

    #[test]
    fn test_performance_counts_missed_reps() {
        let log = ExerciseLog {
            exercise: "Squat".into(),
            sets: vec![set(100.0, 5, 5, true), set(100.0, 5, 3, true), set(100.0, 5, 0, false)],
            is_deload: false,
        };

        let perf = ExercisePerformance::from_log(Uuid::new_v4(), Utc::now(), &log).unwrap();
        assert_eq!(perf.target_sets, 3);
        assert_eq!(perf.completed_sets, 2);
        assert_eq!(perf.missed_reps, 7);
        assert_eq!(perf.completed_reps_total, 8);
        assert_eq!(perf.weight, 100.0);
        assert_eq!(perf.avg_rpe, Some(8.0));
    }

    #[test]
    fn test_performance_empty_log() {
        let log = ExerciseLog {
            exercise: "Squat".into(),
            sets: vec![],
            is_deload: false,
        };
        assert!(ExercisePerformance::from_log(Uuid::new_v4(), Utc::now(), &log).is_none());
    }

    #[test]
    fn test_non_finite_sets_rejected() {
        assert!(SetLog::completed(100.0, 5, Some(8.0)).validate().is_ok());
        assert!(SetLog::completed(f64::NAN, 5, None).validate().is_err());
        assert!(SetLog::completed(f64::INFINITY, 5, None).validate().is_err());
        assert!(SetLog::completed(-5.0, 5, None).validate().is_err());
        assert!(SetLog::completed(100.0, 5, Some(f64::NAN)).validate().is_err());

        let workout = Workout::new(
            Utc::now(),
            vec![ExerciseLog {
                exercise: "Bench".into(),
                sets: vec![
                    SetLog::completed(80.0, 5, None),
                    SetLog::completed(f64::NAN, 5, None),
                ],
                is_deload: false,
            }],
        );
        let err = workout.validate().unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: Bench: weight NaN is not a valid load");
    }

    #[test]
    fn test_pattern_push_pull() {
        assert!(MovementPattern::HorizontalPush.is_push());
        assert!(MovementPattern::VerticalPull.is_pull());
        assert!(!MovementPattern::Squat.is_push());
        assert!(!MovementPattern::Hinge.is_pull());
    }
}
