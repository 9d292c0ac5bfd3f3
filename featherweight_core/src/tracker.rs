//! Per-exercise progress tracking.
//!
//! After each workout every exercise with completed sets updates its
//! `GlobalExerciseProgress` row: stall and failure counters, trend, rolling
//! RPE, session volume, rep-specific PRs and the accepted 1RM.

use crate::one_rm::{self, OneRmEstimator};
use crate::{
    ExerciseLog, GlobalExerciseProgress, PersonalRecord, PrKind, ProgressState, ProgressTrend,
    SetLog, UserExerciseMax, Workout,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Weights closer than this count as the same working weight
const WEIGHT_EPSILON: f64 = 0.01;

/// Rolling RPE keeps this many parts history per part new session
const RPE_HISTORY_WEIGHT: f64 = 4.0;

/// Rep counts with a tracked best weight
const TRACKED_REP_MAXES: [u32; 4] = [1, 3, 5, 8];

/// A newly accepted 1RM
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct MaxUpdate {
    pub exercise: String,
    pub previous: Option<f64>,
    pub estimate: f64,
    pub confidence: f64,
    pub context: String,
}

/// What a workout changed in the progress store
#[derive(Clone, Debug, Default, Serialize)]
pub struct WorkoutSummary {
    pub exercises_updated: Vec<String>,
    pub personal_records: Vec<PersonalRecord>,
    pub max_updates: Vec<MaxUpdate>,
}

/// Completed sets whose load and RPE are finite
fn usable_sets(log: &ExerciseLog) -> impl Iterator<Item = &SetLog> {
    log.completed_sets().filter(|s| s.validate().is_ok())
}

/// Session figures computed from an exercise's completed sets
struct SessionStats {
    max_weight: f64,
    volume: f64,
    avg_rpe: Option<f64>,
}

impl SessionStats {
    fn from_log(log: &ExerciseLog) -> Option<Self> {
        let mut max_weight: Option<f64> = None;
        let mut volume = 0.0;
        let mut rpe_sum = 0.0;
        let mut rpe_count = 0;

        for set in usable_sets(log) {
            max_weight = Some(max_weight.map_or(set.weight, |w| w.max(set.weight)));
            volume += set.volume();
            if let Some(rpe) = set.rpe {
                rpe_sum += rpe;
                rpe_count += 1;
            }
        }

        max_weight.map(|max_weight| SessionStats {
            max_weight,
            volume,
            avg_rpe: (rpe_count > 0).then(|| rpe_sum / rpe_count as f64),
        })
    }
}

/// Applies workouts to the progress store
pub struct ProgressTracker<'a> {
    estimator: &'a OneRmEstimator,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(estimator: &'a OneRmEstimator) -> Self {
        Self { estimator }
    }

    /// Update every exercise in the workout and report what changed
    pub fn record_workout(&self, state: &mut ProgressState, workout: &Workout) -> WorkoutSummary {
        let mut summary = WorkoutSummary::default();

        for log in &workout.exercises {
            let Some(stats) = SessionStats::from_log(log) else {
                tracing::debug!("No completed sets for {}, skipping progress update", log.exercise);
                continue;
            };

            self.update_progress(state, log, &stats, workout.performed_at, &mut summary);
            self.update_max(state, log, workout.performed_at, &mut summary);
            summary.exercises_updated.push(log.exercise.clone());
        }

        tracing::info!(
            "Recorded workout {}: {} exercises, {} PRs",
            workout.id,
            summary.exercises_updated.len(),
            summary.personal_records.len()
        );

        summary
    }

    fn update_progress(
        &self,
        state: &mut ProgressState,
        log: &ExerciseLog,
        stats: &SessionStats,
        performed_at: DateTime<Utc>,
        summary: &mut WorkoutSummary,
    ) {
        let now = Utc::now();
        let progress = state
            .progress
            .entry(log.exercise.clone())
            .or_insert_with(|| GlobalExerciseProgress {
                exercise: log.exercise.clone(),
                current_working_weight: stats.max_weight,
                estimated_max: 0.0,
                consecutive_stalls: 0,
                failure_streak: 0,
                trend: ProgressTrend::Improving,
                best_single_rep: None,
                best_three_rep: None,
                best_five_rep: None,
                best_eight_rep: None,
                avg_session_volume: 0.0,
                total_sessions: 0,
                recent_avg_rpe: None,
                last_session_at: performed_at,
                last_updated: now,
            });

        // First session has nothing to compare against
        if progress.total_sessions > 0 {
            let previous = progress.current_working_weight;
            if (stats.max_weight - previous).abs() < WEIGHT_EPSILON {
                progress.consecutive_stalls += 1;
                progress.trend = ProgressTrend::Stalling;
            } else if stats.max_weight > previous {
                progress.consecutive_stalls = 0;
                progress.failure_streak = 0;
                progress.trend = ProgressTrend::Improving;
            } else {
                progress.failure_streak += 1;
                progress.trend = ProgressTrend::Declining;
            }
        }
        progress.current_working_weight = stats.max_weight;

        if let Some(session_rpe) = stats.avg_rpe {
            progress.recent_avg_rpe = Some(match progress.recent_avg_rpe {
                Some(prior) => {
                    (prior * RPE_HISTORY_WEIGHT + session_rpe) / (RPE_HISTORY_WEIGHT + 1.0)
                }
                None => session_rpe,
            });
        }

        progress.total_sessions += 1;
        let n = progress.total_sessions as f64;
        progress.avg_session_volume += (stats.volume - progress.avg_session_volume) / n;

        for reps in TRACKED_REP_MAXES {
            let best = usable_sets(log)
                .filter(|s| s.reps == reps)
                .map(|s| s.weight)
                .fold(None, |acc: Option<f64>, w| Some(acc.map_or(w, |a| a.max(w))));
            let Some(best) = best else { continue };

            let slot = rep_max_slot(progress, reps);
            if slot.map_or(true, |current| best > current) {
                summary.personal_records.push(PersonalRecord {
                    exercise: log.exercise.clone(),
                    kind: PrKind::RepMax { reps },
                    weight: best,
                    previous: *slot,
                    achieved_at: performed_at,
                });
                *slot = Some(best);
            }
        }

        progress.last_session_at = performed_at;
        progress.last_updated = now;

        tracing::debug!(
            "{}: working weight {}, trend {}, stalls {}, failures {}",
            log.exercise,
            progress.current_working_weight,
            progress.trend,
            progress.consecutive_stalls,
            progress.failure_streak
        );
    }

    fn update_max(
        &self,
        state: &mut ProgressState,
        log: &ExerciseLog,
        performed_at: DateTime<Utc>,
        summary: &mut WorkoutSummary,
    ) {
        let stored = state.maxes.get(&log.exercise);
        let stored_value = stored.map(|m| m.one_rm_estimate);

        let Some(candidate) = self.estimator.best_estimate(&log.sets, stored_value) else {
            return;
        };
        if !one_rm::should_update(stored, &candidate) {
            return;
        }

        tracing::info!(
            "New 1RM for {}: {:.1} ({}, confidence {:.2})",
            log.exercise,
            candidate.estimate,
            candidate.context,
            candidate.confidence
        );

        if let Some(previous) = stored_value {
            summary.personal_records.push(PersonalRecord {
                exercise: log.exercise.clone(),
                kind: PrKind::EstimatedOneRm,
                weight: candidate.estimate,
                previous: Some(previous),
                achieved_at: performed_at,
            });
        }

        if let Some(progress) = state.progress.get_mut(&log.exercise) {
            progress.estimated_max = progress.estimated_max.max(candidate.estimate);
        }

        summary.max_updates.push(MaxUpdate {
            exercise: log.exercise.clone(),
            previous: stored_value,
            estimate: candidate.estimate,
            confidence: candidate.confidence,
            context: candidate.context.clone(),
        });

        state.maxes.insert(
            log.exercise.clone(),
            UserExerciseMax {
                exercise: log.exercise.clone(),
                one_rm_estimate: candidate.estimate,
                one_rm_confidence: candidate.confidence,
                one_rm_context: candidate.context,
                one_rm_date: performed_at,
            },
        );
    }
}

fn rep_max_slot(progress: &mut GlobalExerciseProgress, reps: u32) -> &mut Option<f64> {
    match reps {
        1 => &mut progress.best_single_rep,
        3 => &mut progress.best_three_rep,
        5 => &mut progress.best_five_rep,
        _ => &mut progress.best_eight_rep,
    }
}
