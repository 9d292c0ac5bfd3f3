//! One-rep-max estimation with confidence scoring.
//!
//! Estimates come from the Brzycki formula, with reps-in-reserve folded into
//! singles when an RPE is logged. Each estimate carries a confidence taken from
//! a fixed rep/RPE table; estimates under the confidence threshold are dropped.

use crate::config::EstimatorConfig;
use crate::{SetLog, UserExerciseMax};
use serde::{Deserialize, Serialize};

/// Effective rep counts above this fall back to the linear estimate
const BRZYCKI_MAX_REPS: u32 = 15;

/// Sets outside this rep range never produce an accepted estimate
const MIN_SCORED_REPS: u32 = 1;
const MAX_SCORED_REPS: u32 = 12;

/// Confidence floor for a single heavier than the stored max
const NEW_SINGLE_CONFIDENCE: f64 = 0.90;

const RPE_HIGH: f64 = 9.0;
const RPE_LOW: f64 = 6.0;
const RPE_ADJUSTMENT: f64 = 0.05;

/// A scored 1RM estimate derived from one set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct OneRmEstimate {
    pub estimate: f64,
    pub confidence: f64,
    pub context: String,
}

/// Estimate 1RM from a single set
///
/// Returns None for zero reps, a non-positive or non-finite weight, or a
/// non-finite RPE.
pub fn estimate_one_rm(weight: f64, reps: u32, rpe: Option<f64>) -> Option<f64> {
    if reps == 0 || !weight.is_finite() || weight <= 0.0 {
        return None;
    }
    if rpe.map_or(false, |rpe| !rpe.is_finite()) {
        return None;
    }

    let effective_reps = effective_reps(reps, rpe);

    let estimate = if effective_reps == 1 {
        weight
    } else if effective_reps <= BRZYCKI_MAX_REPS {
        weight / (1.0278 - 0.0278 * effective_reps as f64)
    } else {
        weight * 1.5
    };

    Some(estimate)
}

/// Rep count after adding reps-in-reserve to an RPE-rated single
fn effective_reps(reps: u32, rpe: Option<f64>) -> u32 {
    match (reps, rpe) {
        (1, Some(rpe)) => 1 + (10.0 - rpe).max(0.0).trunc() as u32,
        _ => reps,
    }
}

/// Confidence for an estimate from a set with the given reps and RPE
///
/// `stored_max` is the currently accepted 1RM, if any. A single above it is
/// direct evidence of a new max and scores at least 0.90.
pub fn confidence(reps: u32, rpe: Option<f64>, weight: f64, stored_max: Option<f64>) -> f64 {
    let base = match reps {
        1 => 0.90,
        2..=3 => 0.85,
        4..=5 => 0.80,
        6..=8 => 0.70,
        9..=10 => 0.65,
        11..=12 => 0.60,
        _ => return 0.0,
    };

    let adjusted = match rpe {
        Some(rpe) if rpe >= RPE_HIGH => base + RPE_ADJUSTMENT,
        Some(rpe) if rpe <= RPE_LOW => base - RPE_ADJUSTMENT,
        _ => base,
    };

    let beats_stored = stored_max.map_or(false, |max| weight > max);
    let adjusted = if reps == 1 && beats_stored {
        adjusted.max(NEW_SINGLE_CONFIDENCE)
    } else {
        adjusted
    };

    round_confidence(adjusted.clamp(0.0, 1.0))
}

fn round_confidence(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Whether a candidate estimate should replace the stored max
///
/// Candidates reaching this point already passed the confidence threshold.
pub fn should_update(current: Option<&UserExerciseMax>, candidate: &OneRmEstimate) -> bool {
    match current {
        None => true,
        Some(current) => candidate.estimate > current.one_rm_estimate,
    }
}

/// Format a weight without a trailing ".0"
pub fn format_weight(weight: f64) -> String {
    if weight.fract() == 0.0 {
        format!("{:.0}", weight)
    } else {
        format!("{}", (weight * 100.0).round() / 100.0)
    }
}

/// Provenance string for a set, e.g. "100kg x 3 @ RPE 8"
pub fn format_context(weight: f64, reps: u32, rpe: Option<f64>) -> String {
    match rpe {
        Some(rpe) => format!("{}kg x {} @ RPE {}", format_weight(weight), reps, format_weight(rpe)),
        None => format!("{}kg x {}", format_weight(weight), reps),
    }
}

/// Scores completed sets against the confidence threshold
#[derive(Clone, Debug)]
pub struct OneRmEstimator {
    min_confidence: f64,
}

impl Default for OneRmEstimator {
    fn default() -> Self {
        Self::from_config(&EstimatorConfig::default())
    }
}

impl OneRmEstimator {
    pub fn new(min_confidence: f64) -> Self {
        Self { min_confidence }
    }

    pub fn from_config(config: &EstimatorConfig) -> Self {
        Self::new(config.min_confidence)
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    /// Score one set; None if it is incomplete, out of range or not confident enough
    pub fn evaluate_set(&self, set: &SetLog, stored_max: Option<f64>) -> Option<OneRmEstimate> {
        if !set.is_completed || !(MIN_SCORED_REPS..=MAX_SCORED_REPS).contains(&set.reps) {
            return None;
        }

        let estimate = estimate_one_rm(set.weight, set.reps, set.rpe)?;
        let confidence = confidence(set.reps, set.rpe, set.weight, stored_max);

        if confidence < self.min_confidence {
            tracing::debug!(
                "Skipping 1RM estimate from {}: confidence {:.2} below {:.2}",
                format_context(set.weight, set.reps, set.rpe),
                confidence,
                self.min_confidence
            );
            return None;
        }

        Some(OneRmEstimate {
            estimate,
            confidence,
            context: format_context(set.weight, set.reps, set.rpe),
        })
    }

    /// Highest-scoring estimate across a session's sets
    pub fn best_estimate<'a, I>(&self, sets: I, stored_max: Option<f64>) -> Option<OneRmEstimate>
    where
        I: IntoIterator<Item = &'a SetLog>,
    {
        sets.into_iter()
            .filter_map(|set| self.evaluate_set(set, stored_max))
            .max_by(|a, b| a.estimate.total_cmp(&b.estimate))
    }
}
