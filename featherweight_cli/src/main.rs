use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use featherweight_core::one_rm::format_weight;
use featherweight_core::validator::Severity;
use featherweight_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fw")]
#[command(about = "Featherweight strength training tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log sets for an exercise and update progress
    Log {
        /// Exercise name (aliases like "bench" or "ohp" are resolved)
        #[arg(long)]
        exercise: String,

        /// Set as WEIGHTxREPS or WEIGHTxREPS@RPE, e.g. 100x5@8
        #[arg(long = "set", required = true)]
        sets: Vec<String>,

        /// Target reps per set (defaults to the reps achieved)
        #[arg(long)]
        target_reps: Option<u32>,

        /// Mark this session as a deload
        #[arg(long)]
        deload: bool,

        /// When the workout happened (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<String>,
    },

    /// Show the prescribed weight for the next session
    Next {
        #[arg(long)]
        exercise: String,

        /// Programme rules TOML file (defaults to the config's rules)
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Estimate a one-rep max from a single set
    Estimate {
        #[arg(long)]
        weight: f64,

        #[arg(long)]
        reps: u32,

        #[arg(long)]
        rpe: Option<f64>,

        /// Compare against this exercise's stored max
        #[arg(long)]
        exercise: Option<String>,
    },

    /// Validate a programme JSON file
    Validate {
        path: PathBuf,
    },

    /// Show tracked progress
    Status {
        #[arg(long)]
        exercise: Option<String>,
    },

    /// Roll up WAL workouts to CSV
    Rollup {
        /// Clean up processed WAL files after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

/// Data file locations under the data directory
struct Paths {
    wal_dir: PathBuf,
    wal: PathBuf,
    progress: PathBuf,
    csv: PathBuf,
}

impl Paths {
    fn new(data_dir: &Path) -> Self {
        let wal_dir = data_dir.join("wal");
        Self {
            wal: wal_dir.join("workouts.wal"),
            progress: wal_dir.join("progress.json"),
            csv: data_dir.join("sets.csv"),
            wal_dir,
        }
    }
}

fn main() -> Result<()> {
    featherweight_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let paths = Paths::new(&data_dir);
    tracing::debug!("Using data directory {:?}", data_dir);

    match cli.command {
        Commands::Log {
            exercise,
            sets,
            target_reps,
            deload,
            at,
        } => cmd_log(
            &paths,
            &config,
            &exercise,
            &sets,
            target_reps,
            deload,
            at.as_deref(),
        ),
        Commands::Next { exercise, rules } => {
            cmd_next(&paths, &config, &exercise, rules.as_deref())
        }
        Commands::Estimate {
            weight,
            reps,
            rpe,
            exercise,
        } => cmd_estimate(&paths, &config, weight, reps, rpe, exercise.as_deref()),
        Commands::Validate { path } => cmd_validate(&config, &path),
        Commands::Status { exercise } => cmd_status(&paths, exercise.as_deref()),
        Commands::Rollup { cleanup } => cmd_rollup(&paths, cleanup),
    }
}

/// Parse "100x5" or "100x5@8" into (weight, reps, rpe)
fn parse_set(input: &str) -> Result<(f64, u32, Option<f64>)> {
    let invalid = || Error::InvalidInput(format!("set '{}' is not WEIGHTxREPS[@RPE]", input));

    let (main, rpe) = match input.split_once('@') {
        Some((main, rpe)) => (main, Some(rpe.trim().parse::<f64>().map_err(|_| invalid())?)),
        None => (input, None),
    };
    let (weight, reps) = main
        .to_lowercase()
        .split_once('x')
        .map(|(w, r)| (w.trim().to_string(), r.trim().to_string()))
        .ok_or_else(invalid)?;

    let weight: f64 = weight.parse().map_err(|_| invalid())?;
    let reps: u32 = reps.parse().map_err(|_| invalid())?;

    if !weight.is_finite() || weight < 0.0 {
        return Err(Error::InvalidInput(format!(
            "set '{}' needs a finite, non-negative weight",
            input
        )));
    }
    // NaN fails the range check too
    if let Some(rpe) = rpe {
        if !(1.0..=10.0).contains(&rpe) {
            return Err(Error::InvalidInput(format!("RPE {} outside 1-10", rpe)));
        }
    }

    Ok((weight, reps, rpe))
}

fn cmd_log(
    paths: &Paths,
    config: &Config,
    exercise: &str,
    set_args: &[String],
    target_reps: Option<u32>,
    deload: bool,
    at: Option<&str>,
) -> Result<()> {
    let performed_at = match at {
        Some(value) => DateTime::parse_from_rfc3339(value)
            .map_err(|e| Error::InvalidInput(format!("invalid --at '{}': {}", value, e)))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let exercise = get_default_catalog().canonical_name(exercise);

    let sets = set_args
        .iter()
        .map(|input| {
            let (weight, reps, rpe) = parse_set(input)?;
            Ok(SetLog {
                target_reps: target_reps.unwrap_or(reps),
                reps,
                weight,
                rpe,
                is_completed: reps > 0,
                completed_at: (reps > 0).then_some(performed_at),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let workout = Workout::new(
        performed_at,
        vec![ExerciseLog {
            exercise: exercise.clone(),
            sets,
            is_deload: deload,
        }],
    );

    std::fs::create_dir_all(&paths.wal_dir)?;
    let mut sink = JsonlSink::new(&paths.wal);
    sink.append(&workout)?;
    tracing::info!("Logged workout {} for {}", workout.id, exercise);

    let estimator = OneRmEstimator::from_config(&config.estimator);
    let tracker = ProgressTracker::new(&estimator);
    let summary = ProgressState::update(&paths.progress, |state| {
        Ok(tracker.record_workout(state, &workout))
    })?;

    println!("✓ Logged {} set(s) of {}", workout.exercises[0].sets.len(), exercise);

    for pr in &summary.personal_records {
        match pr.previous {
            Some(previous) => println!(
                "  ★ New {} PR: {}kg (was {}kg)",
                pr.kind,
                format_weight(pr.weight),
                format_weight(previous)
            ),
            None => println!("  ★ New {} PR: {}kg", pr.kind, format_weight(pr.weight)),
        }
    }
    for update in &summary.max_updates {
        println!(
            "  1RM estimate: {}kg (confidence {:.2}, from {})",
            format_weight(update.estimate),
            update.confidence,
            update.context
        );
    }

    Ok(())
}

fn cmd_next(
    paths: &Paths,
    config: &Config,
    exercise: &str,
    rules_path: Option<&Path>,
) -> Result<()> {
    let rules = match rules_path {
        Some(path) => ProgrammeRules::load_from(path)?,
        None => config.progression.rules.clone(),
    };

    let exercise = get_default_catalog().canonical_name(exercise);
    let history = load_recent_performance(
        &paths.wal,
        &paths.csv,
        &exercise,
        config.progression.history_limit,
    )?;
    let state = ProgressState::load(&paths.progress)?;
    let one_rm = state.maxes.get(&exercise).map(|m| m.one_rm_estimate);

    let decision = decide(&exercise, &history, one_rm, &rules);

    println!("{}: {} at {}kg", decision.exercise, decision.action, format_weight(decision.weight));
    println!("  {}", decision.reason);
    if let Some(details) = &decision.deload_details {
        println!(
            "  Deload from {}kg after {} failed sessions",
            format_weight(details.previous_weight),
            details.consecutive_failures
        );
    }

    Ok(())
}

fn cmd_estimate(
    paths: &Paths,
    config: &Config,
    weight: f64,
    reps: u32,
    rpe: Option<f64>,
    exercise: Option<&str>,
) -> Result<()> {
    let stored = match exercise {
        Some(name) => {
            let name = get_default_catalog().canonical_name(name);
            ProgressState::load(&paths.progress)?
                .maxes
                .get(&name)
                .map(|m| m.one_rm_estimate)
        }
        None => None,
    };

    let set = SetLog::completed(weight, reps, rpe);
    set.validate()?;

    let estimator = OneRmEstimator::from_config(&config.estimator);

    match estimator.evaluate_set(&set, stored) {
        Some(estimate) => {
            println!(
                "Estimated 1RM: {}kg (confidence {:.2})",
                format_weight((estimate.estimate * 10.0).round() / 10.0),
                estimate.confidence
            );
            if let Some(stored) = stored {
                if estimate.estimate > stored {
                    println!("  Beats stored max of {}kg", format_weight(stored));
                }
            }
        }
        None => {
            println!(
                "No reliable estimate from {} (confidence below {:.2})",
                one_rm::format_context(weight, reps, rpe),
                estimator.min_confidence()
            );
        }
    }

    Ok(())
}

fn cmd_validate(config: &Config, path: &Path) -> Result<()> {
    let programme = Programme::load_from(path)?;
    let validator = ProgrammeValidator::new(get_default_catalog(), &config.validator);
    let result = validator.validate(&programme);

    println!("Programme: {} ({})", programme.name, programme.experience);
    println!("Score: {:.2}", result.score);

    let mut issues: Vec<_> = result.issues.iter().collect();
    issues.sort_by_key(|i| i.severity);
    for issue in issues {
        println!("  [{}] {}", issue.severity, issue.message);
    }

    let error_count = result.errors().count();
    if error_count > 0 {
        return Err(Error::Validation(format!(
            "programme has {} error(s)",
            error_count
        )));
    }

    if result.issues.iter().all(|i| i.severity == Severity::Info) {
        println!("✓ No issues found");
    }

    Ok(())
}

fn cmd_status(paths: &Paths, exercise: Option<&str>) -> Result<()> {
    let state = ProgressState::load(&paths.progress)?;
    let filter = exercise.map(|name| get_default_catalog().canonical_name(name));

    let mut rows: Vec<_> = state
        .progress
        .values()
        .filter(|p| filter.as_ref().map_or(true, |f| p.exercise.eq_ignore_ascii_case(f)))
        .collect();
    rows.sort_by(|a, b| a.exercise.cmp(&b.exercise));

    if rows.is_empty() {
        println!("No progress recorded yet.");
        return Ok(());
    }

    for progress in rows {
        println!("{}", progress.exercise);
        println!(
            "  Working weight: {}kg ({}, {} stalls, {} failures)",
            format_weight(progress.current_working_weight),
            progress.trend,
            progress.consecutive_stalls,
            progress.failure_streak
        );
        if let Some(max) = state.maxes.get(&progress.exercise) {
            println!(
                "  1RM: {}kg ({}, confidence {:.2})",
                format_weight((max.one_rm_estimate * 10.0).round() / 10.0),
                max.one_rm_context,
                max.one_rm_confidence
            );
        }
        let bests: Vec<String> = [
            (1, progress.best_single_rep),
            (3, progress.best_three_rep),
            (5, progress.best_five_rep),
            (8, progress.best_eight_rep),
        ]
        .iter()
        .filter_map(|(reps, best)| best.map(|w| format!("{}RM {}kg", reps, format_weight(w))))
        .collect();
        if !bests.is_empty() {
            println!("  Bests: {}", bests.join(", "));
        }
        println!(
            "  Sessions: {}, avg volume {:.0}kg",
            progress.total_sessions, progress.avg_session_volume
        );
    }

    Ok(())
}

fn cmd_rollup(paths: &Paths, cleanup: bool) -> Result<()> {
    if !paths.wal.exists() {
        println!("No WAL file found - nothing to roll up.");
        return Ok(());
    }

    let count = featherweight_core::csv_rollup::wal_to_csv_and_archive(&paths.wal, &paths.csv)?;

    println!("✓ Rolled up {} workouts to CSV", count);
    println!("  CSV: {}", paths.csv.display());

    if cleanup {
        let cleaned = featherweight_core::csv_rollup::cleanup_processed_wals(&paths.wal_dir)?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed WAL files", cleaned);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set() {
        assert_eq!(parse_set("100x5").unwrap(), (100.0, 5, None));
        assert_eq!(parse_set("102.5X3@8.5").unwrap(), (102.5, 3, Some(8.5)));
        assert!(parse_set("100").is_err());
        assert!(parse_set("100x5@11").is_err());
        assert!(parse_set("heavy x 5").is_err());
    }

    #[test]
    fn test_parse_set_rejects_non_finite_values() {
        assert!(parse_set("nanx5").is_err());
        assert!(parse_set("infx5").is_err());
        assert!(parse_set("-infx5").is_err());
        assert!(parse_set("100x5@nan").is_err());
        assert!(parse_set("100x5@inf").is_err());
        assert!(parse_set("-20x5").is_err());
    }
}
