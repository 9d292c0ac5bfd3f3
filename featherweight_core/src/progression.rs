//! Progression logic for choosing the next working weight.
//!
//! The decision is evaluated per exercise at the start of a programme-driven
//! workout, from the most recent performances (newest first):
//! - No history: start from half the 1RM, or the empty bar
//! - Repeated failures: deload by the programme percentage
//! - Coming off a deload: climb back toward the pre-deload weight
//! - Last session succeeded: add the increment
//! - Otherwise: repeat the weight

use crate::one_rm::format_weight;
use crate::{
    DeloadDetails, Error, ExercisePerformance, ProgressionAction, ProgressionDecision, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Fraction of the 1RM used for a first session
const STARTING_ONE_RM_FRACTION: f64 = 0.5;

/// When to deload and by how much
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DeloadRule {
    #[serde(default = "default_trigger_failures")]
    pub trigger_failures: u32,

    /// Multiplier applied to the last weight, e.g. 0.85
    #[serde(default = "default_deload_percentage")]
    pub percentage: f64,

    #[serde(default = "default_minimum_weight")]
    pub minimum_weight: f64,
}

impl Default for DeloadRule {
    fn default() -> Self {
        Self {
            trigger_failures: default_trigger_failures(),
            percentage: default_deload_percentage(),
            minimum_weight: default_minimum_weight(),
        }
    }
}

/// Programme-supplied definition of a successful session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct SuccessCriteria {
    /// Completed sets required; all target sets when absent
    #[serde(default)]
    pub min_completed_sets: Option<u32>,

    #[serde(default)]
    pub allowed_missed_reps: u32,

    /// Inclusive band the session's average RPE must fall in
    #[serde(default)]
    pub rpe_range: Option<(f64, f64)>,
}

impl SuccessCriteria {
    pub fn is_success(&self, performance: &ExercisePerformance) -> bool {
        let required_sets = self.min_completed_sets.unwrap_or(performance.target_sets);
        if performance.completed_sets < required_sets {
            return false;
        }
        if performance.missed_reps > self.allowed_missed_reps {
            return false;
        }
        match (self.rpe_range, performance.avg_rpe) {
            (Some((low, high)), Some(rpe)) => (low..=high).contains(&rpe),
            _ => true,
        }
    }
}

/// Progression rules from a programme definition
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProgrammeRules {
    #[serde(default = "default_increment")]
    pub default_increment: f64,

    /// Per-exercise increments, keyed by exercise name
    #[serde(default)]
    pub increments: HashMap<String, f64>,

    #[serde(default)]
    pub deload: DeloadRule,

    #[serde(default)]
    pub success: Option<SuccessCriteria>,

    #[serde(default = "default_rounding")]
    pub rounding: f64,

    #[serde(default = "default_empty_bar_weight")]
    pub empty_bar_weight: f64,
}

impl Default for ProgrammeRules {
    fn default() -> Self {
        Self {
            default_increment: default_increment(),
            increments: HashMap::new(),
            deload: DeloadRule::default(),
            success: None,
            rounding: default_rounding(),
            empty_bar_weight: default_empty_bar_weight(),
        }
    }
}

fn default_increment() -> f64 {
    2.5
}

fn default_trigger_failures() -> u32 {
    3
}

fn default_deload_percentage() -> f64 {
    0.85
}

fn default_minimum_weight() -> f64 {
    20.0
}

fn default_rounding() -> f64 {
    2.5
}

fn default_empty_bar_weight() -> f64 {
    20.0
}

impl ProgrammeRules {
    /// Load rules from a TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let rules: ProgrammeRules = toml::from_str(&contents)?;
        rules.validate()?;
        tracing::info!("Loaded programme rules from {:?}", path);
        Ok(rules)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_increment < 0.0 || self.increments.values().any(|i| *i < 0.0) {
            return Err(Error::Config("increments must not be negative".into()));
        }
        if !(self.deload.percentage > 0.0 && self.deload.percentage <= 1.0) {
            return Err(Error::Config(format!(
                "deload percentage must be within (0, 1], got {}",
                self.deload.percentage
            )));
        }
        if self.deload.trigger_failures == 0 {
            return Err(Error::Config("deload trigger must be at least 1 failure".into()));
        }
        if self.rounding <= 0.0 {
            return Err(Error::Config(format!("rounding must be positive, got {}", self.rounding)));
        }
        Ok(())
    }

    /// Increment for an exercise, falling back to the default
    pub fn increment_for(&self, exercise: &str) -> f64 {
        self.increments
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(exercise))
            .map(|(_, inc)| *inc)
            .unwrap_or(self.default_increment)
    }

    /// Whether a recorded performance met the programme's criteria
    pub fn is_success(&self, performance: &ExercisePerformance) -> bool {
        match &self.success {
            Some(criteria) => criteria.is_success(performance),
            None => SuccessCriteria::default().is_success(performance),
        }
    }

    fn round(&self, weight: f64) -> f64 {
        round_to_increment(weight, self.rounding)
    }
}

/// Round a weight to the nearest multiple of `increment`
pub fn round_to_increment(weight: f64, increment: f64) -> f64 {
    (weight / increment).round() * increment
}

/// Decide the next weight for an exercise
///
/// `history` must be ordered most recent first.
pub fn decide(
    exercise: &str,
    history: &[ExercisePerformance],
    current_one_rm: Option<f64>,
    rules: &ProgrammeRules,
) -> ProgressionDecision {
    let Some(last) = history.first() else {
        return starting_decision(exercise, current_one_rm, rules);
    };

    let increment = rules.increment_for(exercise);
    let failures = consecutive_failures(history, rules);

    let decision = if failures >= rules.deload.trigger_failures
        && last.weight < rules.deload.minimum_weight
    {
        // Nothing lighter to drop to
        ProgressionDecision {
            exercise: exercise.to_string(),
            weight: last.weight,
            action: ProgressionAction::Maintain,
            reason: format!(
                "{} consecutive failed sessions at {}kg, already below the {}kg deload floor",
                failures,
                format_weight(last.weight),
                format_weight(rules.deload.minimum_weight)
            ),
            is_deload: false,
            deload_details: None,
        }
    } else if failures >= rules.deload.trigger_failures {
        let deload_weight = rules
            .round(last.weight * rules.deload.percentage)
            .max(rules.deload.minimum_weight)
            .min(last.weight);

        ProgressionDecision {
            exercise: exercise.to_string(),
            weight: deload_weight,
            action: ProgressionAction::Deload,
            reason: format!(
                "{} consecutive failed sessions at {}kg, deloading to {}%",
                failures,
                format_weight(last.weight),
                format_weight(rules.deload.percentage * 100.0)
            ),
            is_deload: true,
            deload_details: Some(DeloadDetails {
                previous_weight: last.weight,
                percentage: rules.deload.percentage,
                consecutive_failures: failures,
            }),
        }
    } else if last.is_deload {
        let target = last.weight + increment;
        let (weight, reason) = match pre_deload_weight(history) {
            Some(cap) if target >= cap => (
                cap.max(last.weight),
                format!("Recovered from deload, back to {}kg", format_weight(cap)),
            ),
            Some(cap) => (
                target,
                format!("Recovering from deload toward {}kg", format_weight(cap)),
            ),
            None => (target, "Recovering from deload".to_string()),
        };

        ProgressionDecision {
            exercise: exercise.to_string(),
            weight,
            action: ProgressionAction::Progress,
            reason,
            is_deload: false,
            deload_details: None,
        }
    } else if rules.is_success(last) {
        ProgressionDecision {
            exercise: exercise.to_string(),
            weight: last.weight + increment,
            action: ProgressionAction::Progress,
            reason: format!(
                "Completed {}kg, adding {}kg",
                format_weight(last.weight),
                format_weight(increment)
            ),
            is_deload: false,
            deload_details: None,
        }
    } else {
        ProgressionDecision {
            exercise: exercise.to_string(),
            weight: last.weight,
            action: ProgressionAction::Maintain,
            reason: format!(
                "Missed target at {}kg ({} of {} failures before deload)",
                format_weight(last.weight),
                failures,
                rules.deload.trigger_failures
            ),
            is_deload: false,
            deload_details: None,
        }
    };

    tracing::debug!(
        "{}: {} at {}kg ({})",
        exercise,
        decision.action,
        decision.weight,
        decision.reason
    );

    decision
}

fn starting_decision(
    exercise: &str,
    current_one_rm: Option<f64>,
    rules: &ProgrammeRules,
) -> ProgressionDecision {
    let (weight, reason) = match current_one_rm {
        Some(one_rm) if one_rm > 0.0 => {
            let weight = rules
                .round(one_rm * STARTING_ONE_RM_FRACTION)
                .max(rules.empty_bar_weight);
            (
                weight,
                format!("First workout: 50% of {}kg 1RM", format_weight(one_rm)),
            )
        }
        _ => (
            rules.empty_bar_weight,
            "First workout: starting with the empty bar".to_string(),
        ),
    };

    ProgressionDecision {
        exercise: exercise.to_string(),
        weight,
        action: ProgressionAction::Maintain,
        reason,
        is_deload: false,
        deload_details: None,
    }
}

/// Failed non-deload sessions at the head of the history
fn consecutive_failures(history: &[ExercisePerformance], rules: &ProgrammeRules) -> u32 {
    history
        .iter()
        .take_while(|p| !p.is_deload && !rules.is_success(p))
        .count() as u32
}

/// Weight of the first non-deload session behind the leading deload run
fn pre_deload_weight(history: &[ExercisePerformance]) -> Option<f64> {
    history.iter().find(|p| !p.is_deload).map(|p| p.weight)
}
