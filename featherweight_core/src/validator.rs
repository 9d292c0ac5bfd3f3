//! Post-hoc checks for generated programmes.
//!
//! The validator is stateless: it sums weekly sets per muscle group, compares
//! them with experience-level bands, checks push/pull and quad/hamstring
//! balance, estimates workout durations and looks for missing fundamental
//! movement patterns. Each issue costs a fixed penalty from a score of 1.0.

use crate::config::ValidatorConfig;
use crate::one_rm::format_weight;
use crate::programme::{ExperienceLevel, Programme, ProgrammeWorkout};
use crate::{Catalog, MovementPattern, MuscleGroup};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

const ERROR_PENALTY: f64 = 0.15;
const WARNING_PENALTY: f64 = 0.05;

/// Volume above this multiple of the band's upper bound is unsafe
const EXCESSIVE_VOLUME_FACTOR: f64 = 1.5;

const PUSH_PULL_RANGE: (f64, f64) = (0.67, 1.5);
const QUAD_HAM_RANGE: (f64, f64) = (0.5, 2.0);

const WARMUP_MINUTES: f64 = 5.0;
const SECONDS_PER_SET: f64 = 40.0;
const DEFAULT_REST_SECONDS: u32 = 120;

const MAX_SETS_PER_EXERCISE: u32 = 10;

const FUNDAMENTAL_PATTERNS: [MovementPattern; 4] = [
    MovementPattern::Squat,
    MovementPattern::Hinge,
    MovementPattern::HorizontalPush,
    MovementPattern::VerticalPull,
];

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "ERROR"),
            Self::Warning => write!(f, "WARNING"),
            Self::Info => write!(f, "INFO"),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Structure,
    Volume,
    Balance,
    Duration,
    MovementPattern,
    Exercise,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub category: IssueCategory,
    pub message: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ValidationResult {
    /// 1.0 minus per-issue penalties, within [0, 1]
    pub score: f64,
    pub is_valid: bool,
    pub issues: Vec<ValidationIssue>,
    /// Sets per primary muscle group, keyed by week number
    pub weekly_volume: BTreeMap<u32, BTreeMap<MuscleGroup, u32>>,
}

impl ValidationResult {
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }
}

/// Weekly set range (inclusive) for a muscle group at an experience level
pub fn volume_band(level: ExperienceLevel, muscle: MuscleGroup) -> (u32, u32) {
    use ExperienceLevel::*;
    use MuscleGroup::*;

    match (level, muscle) {
        (Beginner, Chest) => (6, 12),
        (Beginner, Back) => (8, 14),
        (Beginner, Shoulders) => (4, 10),
        (Beginner, Quads) => (6, 12),
        (Beginner, Hamstrings) => (4, 10),
        (Beginner, Glutes) => (4, 10),
        (Beginner, Biceps | Triceps) => (0, 8),
        (Beginner, Calves) => (0, 8),
        (Beginner, Core) => (0, 10),

        (Intermediate, Chest) => (10, 18),
        (Intermediate, Back) => (12, 20),
        (Intermediate, Shoulders) => (8, 16),
        (Intermediate, Quads) => (10, 18),
        (Intermediate, Hamstrings) => (8, 14),
        (Intermediate, Glutes) => (6, 14),
        (Intermediate, Biceps | Triceps) => (4, 14),
        (Intermediate, Calves) => (0, 12),
        (Intermediate, Core) => (0, 12),

        (Advanced, Chest) => (12, 22),
        (Advanced, Back) => (14, 25),
        (Advanced, Shoulders) => (10, 20),
        (Advanced, Quads) => (12, 22),
        (Advanced, Hamstrings) => (10, 18),
        (Advanced, Glutes) => (8, 18),
        (Advanced, Biceps | Triceps) => (6, 18),
        (Advanced, Calves) => (0, 16),
        (Advanced, Core) => (0, 16),
    }
}

const ALL_MUSCLES: [MuscleGroup; 10] = [
    MuscleGroup::Chest,
    MuscleGroup::Back,
    MuscleGroup::Shoulders,
    MuscleGroup::Quads,
    MuscleGroup::Hamstrings,
    MuscleGroup::Glutes,
    MuscleGroup::Biceps,
    MuscleGroup::Triceps,
    MuscleGroup::Calves,
    MuscleGroup::Core,
];

/// Estimated minutes for a workout, including warm-up
pub fn estimate_duration_minutes(workout: &ProgrammeWorkout) -> f64 {
    let seconds: f64 = workout
        .exercises
        .iter()
        .map(|e| {
            let rest = e.rest_seconds.unwrap_or(DEFAULT_REST_SECONDS) as f64;
            e.sets as f64 * (SECONDS_PER_SET + rest)
        })
        .sum();
    WARMUP_MINUTES + seconds / 60.0
}

#[derive(Default)]
struct Tally {
    push_sets: u32,
    pull_sets: u32,
    quad_sets: u32,
    hamstring_sets: u32,
    patterns: HashSet<MovementPattern>,
    unknown: BTreeSet<String>,
}

pub struct ProgrammeValidator<'a> {
    catalog: &'a Catalog,
    min_workout_minutes: f64,
    max_workout_minutes: f64,
}

impl<'a> ProgrammeValidator<'a> {
    pub fn new(catalog: &'a Catalog, config: &ValidatorConfig) -> Self {
        Self {
            catalog,
            min_workout_minutes: config.min_workout_minutes,
            max_workout_minutes: config.max_workout_minutes,
        }
    }

    pub fn validate(&self, programme: &Programme) -> ValidationResult {
        let mut issues = Vec::new();
        let mut weekly_volume = BTreeMap::new();
        let mut tally = Tally::default();

        if programme.weeks.is_empty() {
            issues.push(issue(
                Severity::Error,
                IssueCategory::Structure,
                "Programme has no weeks".into(),
            ));
        }

        for week in &programme.weeks {
            if week.workouts.is_empty() {
                issues.push(issue(
                    Severity::Error,
                    IssueCategory::Structure,
                    format!("Week {} has no workouts", week.week_number),
                ));
            }

            let mut volume: BTreeMap<MuscleGroup, u32> = BTreeMap::new();
            for workout in &week.workouts {
                self.check_workout(week.week_number, workout, &mut issues);
                self.tally_workout(workout, &mut volume, &mut tally);
            }
            weekly_volume.insert(week.week_number, volume);
        }

        self.check_volume(programme.experience, &weekly_volume, &mut issues);
        check_balance(&tally, &mut issues);

        if !programme.weeks.is_empty() {
            for pattern in FUNDAMENTAL_PATTERNS {
                if !tally.patterns.contains(&pattern) {
                    issues.push(issue(
                        Severity::Warning,
                        IssueCategory::MovementPattern,
                        format!("No {} movement in the programme", pattern),
                    ));
                }
            }
        }

        for name in &tally.unknown {
            issues.push(issue(
                Severity::Info,
                IssueCategory::Exercise,
                format!("Unrecognized exercise '{}' excluded from volume and balance checks", name),
            ));
        }

        let errors = issues.iter().filter(|i| i.severity == Severity::Error).count();
        let warnings = issues.iter().filter(|i| i.severity == Severity::Warning).count();
        let penalty = ERROR_PENALTY * errors as f64 + WARNING_PENALTY * warnings as f64;
        let score = (1.0 - penalty).clamp(0.0, 1.0);

        tracing::info!(
            "Validated programme '{}': score {:.2}, {} errors, {} warnings",
            programme.name,
            score,
            errors,
            warnings
        );

        ValidationResult {
            score,
            is_valid: errors == 0,
            issues,
            weekly_volume,
        }
    }

    fn check_workout(
        &self,
        week: u32,
        workout: &ProgrammeWorkout,
        issues: &mut Vec<ValidationIssue>,
    ) {
        if workout.exercises.is_empty() {
            issues.push(issue(
                Severity::Error,
                IssueCategory::Structure,
                format!("Week {} '{}' has no exercises", week, workout.name),
            ));
            return;
        }

        for exercise in &workout.exercises {
            if exercise.sets == 0 || exercise.reps == 0 {
                issues.push(issue(
                    Severity::Error,
                    IssueCategory::Exercise,
                    format!(
                        "Week {} '{}': {} has {} sets of {} reps",
                        week, workout.name, exercise.name, exercise.sets, exercise.reps
                    ),
                ));
            }
            if exercise.sets > MAX_SETS_PER_EXERCISE {
                issues.push(issue(
                    Severity::Warning,
                    IssueCategory::Exercise,
                    format!(
                        "Week {} '{}': {} sets of {} is excessive",
                        week, workout.name, exercise.sets, exercise.name
                    ),
                ));
            }
            if let Some(rpe) = exercise.rpe {
                if !(1.0..=10.0).contains(&rpe) {
                    issues.push(issue(
                        Severity::Error,
                        IssueCategory::Exercise,
                        format!(
                            "Week {} '{}': {} has RPE {} outside 1-10",
                            week,
                            workout.name,
                            exercise.name,
                            format_weight(rpe)
                        ),
                    ));
                }
            }
        }

        let minutes = estimate_duration_minutes(workout);
        if minutes > self.max_workout_minutes {
            issues.push(issue(
                Severity::Warning,
                IssueCategory::Duration,
                format!(
                    "Week {} '{}' runs about {:.0} minutes (over {:.0})",
                    week, workout.name, minutes, self.max_workout_minutes
                ),
            ));
        } else if minutes < self.min_workout_minutes {
            issues.push(issue(
                Severity::Warning,
                IssueCategory::Duration,
                format!(
                    "Week {} '{}' runs about {:.0} minutes (under {:.0})",
                    week, workout.name, minutes, self.min_workout_minutes
                ),
            ));
        }
    }

    fn tally_workout(
        &self,
        workout: &ProgrammeWorkout,
        volume: &mut BTreeMap<MuscleGroup, u32>,
        tally: &mut Tally,
    ) {
        for exercise in &workout.exercises {
            let Some((pattern, muscles)) = self.catalog.classify(&exercise.name) else {
                tally.unknown.insert(exercise.name.clone());
                continue;
            };

            tally.patterns.insert(pattern);
            if pattern.is_push() {
                tally.push_sets = tally.push_sets.saturating_add(exercise.sets);
            } else if pattern.is_pull() {
                tally.pull_sets = tally.pull_sets.saturating_add(exercise.sets);
            }

            for muscle in muscles {
                let sets = volume.entry(muscle).or_insert(0);
                *sets = sets.saturating_add(exercise.sets);
                match muscle {
                    MuscleGroup::Quads => {
                        tally.quad_sets = tally.quad_sets.saturating_add(exercise.sets)
                    }
                    MuscleGroup::Hamstrings => {
                        tally.hamstring_sets = tally.hamstring_sets.saturating_add(exercise.sets)
                    }
                    _ => {}
                }
            }
        }
    }

    /// One issue per muscle and direction, listing the affected weeks
    fn check_volume(
        &self,
        level: ExperienceLevel,
        weekly_volume: &BTreeMap<u32, BTreeMap<MuscleGroup, u32>>,
        issues: &mut Vec<ValidationIssue>,
    ) {
        for muscle in ALL_MUSCLES {
            let (min, max) = volume_band(level, muscle);
            let mut low = Vec::new();
            let mut high = Vec::new();
            let mut excessive = Vec::new();

            for (week, volume) in weekly_volume {
                let sets = volume.get(&muscle).copied().unwrap_or(0);
                if (sets as f64) > max as f64 * EXCESSIVE_VOLUME_FACTOR {
                    excessive.push(*week);
                } else if sets > max {
                    high.push(*week);
                } else if sets < min {
                    low.push(*week);
                }
            }

            let band = format!("{} range {}-{} sets/week", level, min, max);
            if !excessive.is_empty() {
                issues.push(issue(
                    Severity::Error,
                    IssueCategory::Volume,
                    format!(
                        "{} volume far above {} in weeks {}",
                        muscle,
                        band,
                        join_weeks(&excessive)
                    ),
                ));
            }
            if !high.is_empty() {
                issues.push(issue(
                    Severity::Warning,
                    IssueCategory::Volume,
                    format!("{} volume above {} in weeks {}", muscle, band, join_weeks(&high)),
                ));
            }
            if !low.is_empty() {
                issues.push(issue(
                    Severity::Warning,
                    IssueCategory::Volume,
                    format!("{} volume below {} in weeks {}", muscle, band, join_weeks(&low)),
                ));
            }
        }
    }
}

fn check_balance(tally: &Tally, issues: &mut Vec<ValidationIssue>) {
    if let Some(message) =
        ratio_issue("Push:pull", tally.push_sets, tally.pull_sets, PUSH_PULL_RANGE)
    {
        issues.push(issue(Severity::Warning, IssueCategory::Balance, message));
    }
    if let Some(message) =
        ratio_issue("Quad:hamstring", tally.quad_sets, tally.hamstring_sets, QUAD_HAM_RANGE)
    {
        issues.push(issue(Severity::Warning, IssueCategory::Balance, message));
    }
}

fn ratio_issue(label: &str, a: u32, b: u32, (low, high): (f64, f64)) -> Option<String> {
    if a == 0 && b == 0 {
        return None;
    }
    if b == 0 {
        return Some(format!("{} imbalance: {} sets to none", label, a));
    }
    let ratio = a as f64 / b as f64;
    if ratio < low || ratio > high {
        Some(format!(
            "{} ratio {:.2} outside {:.2}-{:.2} ({} to {} sets)",
            label, ratio, low, high, a, b
        ))
    } else {
        None
    }
}

fn join_weeks(weeks: &[u32]) -> String {
    weeks.iter().map(|w| w.to_string()).collect::<Vec<_>>().join(", ")
}

fn issue(severity: Severity, category: IssueCategory, message: String) -> ValidationIssue {
    ValidationIssue {
        severity,
        category,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::get_default_catalog;
    use crate::programme::{ProgrammeExercise, ProgrammeWeek};

    fn ex(name: &str, sets: u32, reps: u32) -> ProgrammeExercise {
        ProgrammeExercise {
            name: name.into(),
            sets,
            reps,
            rest_seconds: Some(120),
            rpe: None,
        }
    }

    fn workout(name: &str, exercises: Vec<ProgrammeExercise>) -> ProgrammeWorkout {
        ProgrammeWorkout {
            name: name.into(),
            exercises,
        }
    }

    /// Full-body beginner programme that sits inside every band
    fn balanced_programme() -> Programme {
        let day_a = workout(
            "Day A",
            vec![
                ex("Barbell Back Squat", 3, 5),
                ex("Barbell Bench Press", 3, 5),
                ex("Barbell Row", 3, 8),
                ex("Romanian Deadlift", 3, 8),
                ex("Overhead Press", 2, 8),
                ex("Barbell Curl", 2, 10),
            ],
        );
        let day_b = workout(
            "Day B",
            vec![
                ex("Front Squat", 3, 5),
                ex("Incline Bench Press", 3, 8),
                ex("Lat Pulldown", 3, 10),
                ex("Conventional Deadlift", 2, 5),
                ex("Face Pull", 2, 15),
                ex("Tricep Pushdown", 2, 12),
            ],
        );

        Programme {
            name: "Balanced".into(),
            experience: ExperienceLevel::Beginner,
            weeks: (1..=2)
                .map(|week_number| ProgrammeWeek {
                    week_number,
                    workouts: vec![day_a.clone(), day_b.clone()],
                })
                .collect(),
        }
    }

    fn validate(programme: &Programme) -> ValidationResult {
        let config = ValidatorConfig::default();
        ProgrammeValidator::new(get_default_catalog(), &config).validate(programme)
    }

    #[test]
    fn test_balanced_programme_scores_well() {
        let result = validate(&balanced_programme());
        assert!(result.is_valid, "issues: {:?}", result.issues);
        assert_eq!(result.errors().count(), 0);
        assert!(result.score >= 0.9, "score {} issues {:?}", result.score, result.issues);
        assert_eq!(result.weekly_volume[&1][&MuscleGroup::Quads], 6);
    }

    #[test]
    fn test_empty_programme_is_invalid() {
        let programme = Programme {
            name: "Empty".into(),
            experience: ExperienceLevel::Intermediate,
            weeks: vec![],
        };
        let result = validate(&programme);
        assert!(!result.is_valid);
        assert!((0.0..=1.0).contains(&result.score));
    }

    #[test]
    fn test_missing_patterns_flagged() {
        let programme = Programme {
            name: "Bench only".into(),
            experience: ExperienceLevel::Beginner,
            weeks: vec![ProgrammeWeek {
                week_number: 1,
                workouts: vec![workout("Push", vec![ex("Bench Press", 4, 8), ex("Dip", 4, 10)])],
            }],
        };

        let result = validate(&programme);
        let pattern_issues: Vec<_> = result
            .issues
            .iter()
            .filter(|i| i.category == IssueCategory::MovementPattern)
            .collect();
        assert_eq!(pattern_issues.len(), 3);
        assert!(result
            .issues
            .iter()
            .any(|i| i.category == IssueCategory::Balance && i.message.starts_with("Push:pull")));
    }

    #[test]
    fn test_quad_dominant_programme_flagged() {
        let mut programme = balanced_programme();
        for week in &mut programme.weeks {
            week.workouts[0].exercises.push(ex("Leg Press", 4, 12));
            week.workouts[1].exercises.push(ex("Leg Extension", 4, 15));
            for workout in &mut week.workouts {
                workout.exercises.retain(|e| !e.name.contains("Deadlift"));
            }
        }

        let result = validate(&programme);
        assert!(result
            .issues
            .iter()
            .any(|i| i.message.starts_with("Quad:hamstring")));
    }

    #[test]
    fn test_duration_limits() {
        let long = workout("Marathon", (0..8).map(|_| ex("Barbell Back Squat", 6, 5)).collect());
        assert!(estimate_duration_minutes(&long) > 120.0);

        let short = workout("Quick", vec![ex("Push Up", 2, 10)]);
        assert!(estimate_duration_minutes(&short) < 20.0);

        let programme = Programme {
            name: "Extremes".into(),
            experience: ExperienceLevel::Advanced,
            weeks: vec![ProgrammeWeek {
                week_number: 1,
                workouts: vec![long, short],
            }],
        };
        let result = validate(&programme);
        let durations = result
            .issues
            .iter()
            .filter(|i| i.category == IssueCategory::Duration)
            .count();
        assert_eq!(durations, 2);
    }

    #[test]
    fn test_structural_errors() {
        let programme = Programme {
            name: "Broken".into(),
            experience: ExperienceLevel::Beginner,
            weeks: vec![ProgrammeWeek {
                week_number: 1,
                workouts: vec![
                    workout("Empty", vec![]),
                    workout("Zero", vec![ex("Barbell Back Squat", 0, 5)]),
                ],
            }],
        };

        let result = validate(&programme);
        assert!(!result.is_valid);
        assert!(result.errors().count() >= 2);
    }

    #[test]
    fn test_excessive_volume_is_error() {
        let programme = Programme {
            name: "Chest day every day".into(),
            experience: ExperienceLevel::Beginner,
            weeks: vec![ProgrammeWeek {
                week_number: 1,
                workouts: (0..3)
                    .map(|i| workout(&format!("Day {}", i), vec![ex("Bench", 10, 8)]))
                    .collect(),
            }],
        };

        let result = validate(&programme);
        assert!(result
            .errors()
            .any(|i| i.category == IssueCategory::Volume && i.message.starts_with("chest")));
    }

    #[test]
    fn test_score_always_in_unit_range() {
        let junk = Programme {
            name: "Junk".into(),
            experience: ExperienceLevel::Advanced,
            weeks: (1..=6)
                .map(|week_number| ProgrammeWeek {
                    week_number,
                    workouts: vec![workout(
                        "Bad",
                        vec![ex("Curl", 0, 0), ex("Mystery Move", 3, 3)],
                    )],
                })
                .collect(),
        };
        let result = validate(&junk);
        assert_eq!(result.score, 0.0);
        assert!(result.issues.iter().any(|i| i.severity == Severity::Info));
    }

    #[test]
    fn test_huge_set_counts_saturate() {
        let programme = Programme {
            name: "Overflow".into(),
            experience: ExperienceLevel::Beginner,
            weeks: vec![ProgrammeWeek {
                week_number: 1,
                workouts: vec![workout(
                    "Forever",
                    vec![
                        ex("Barbell Bench Press", 3_000_000_000, 5),
                        ex("Incline Bench Press", 3_000_000_000, 5),
                        ex("Barbell Back Squat", u32::MAX, 5),
                        ex("Front Squat", u32::MAX, 5),
                    ],
                )],
            }],
        };

        let result = validate(&programme);
        assert_eq!(result.weekly_volume[&1][&MuscleGroup::Chest], u32::MAX);
        assert_eq!(result.weekly_volume[&1][&MuscleGroup::Quads], u32::MAX);
        assert!(!result.is_valid);
        assert!(result
            .errors()
            .any(|i| i.category == IssueCategory::Volume && i.message.starts_with("chest")));
    }
}
