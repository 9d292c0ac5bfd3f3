#![forbid(unsafe_code)]

//! Core domain model and business logic for Featherweight.
//!
//! This crate provides:
//! - Domain types (workouts, sets, progress aggregates, decisions)
//! - One-rep-max estimation with confidence scoring
//! - Progress tracking and PR detection
//! - Programme-driven progression (progress, maintain, deload)
//! - Programme validation
//! - Persistence (WAL, CSV archive, progress state)

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod wal;
pub mod csv_rollup;
pub mod state;
pub mod history;
pub mod one_rm;
pub mod tracker;
pub mod progression;
pub mod programme;
pub mod validator;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog};
pub use config::Config;
pub use wal::{JsonlSink, WorkoutSink};
pub use history::{load_recent_performance, load_workouts};
pub use one_rm::{OneRmEstimate, OneRmEstimator};
pub use tracker::{ProgressTracker, WorkoutSummary};
pub use progression::{decide, ProgrammeRules};
pub use programme::Programme;
pub use validator::{ProgrammeValidator, ValidationResult};
