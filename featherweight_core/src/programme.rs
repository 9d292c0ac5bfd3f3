//! Generated training programme definitions.
//!
//! Programmes arrive as JSON from an external authoring step and are checked
//! by the validator before use.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beginner => write!(f, "beginner"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Advanced => write!(f, "advanced"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProgrammeExercise {
    pub name: String,
    pub sets: u32,
    pub reps: u32,
    #[serde(default)]
    pub rest_seconds: Option<u32>,
    #[serde(default)]
    pub rpe: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProgrammeWorkout {
    pub name: String,
    pub exercises: Vec<ProgrammeExercise>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProgrammeWeek {
    pub week_number: u32,
    pub workouts: Vec<ProgrammeWorkout>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Programme {
    pub name: String,
    pub experience: ExperienceLevel,
    pub weeks: Vec<ProgrammeWeek>,
}

impl Programme {
    /// Load a programme from a JSON file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let programme: Programme = serde_json::from_str(&contents)?;
        tracing::info!(
            "Loaded programme '{}' ({} weeks) from {:?}",
            programme.name,
            programme.weeks.len(),
            path
        );
        Ok(programme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_programme_json() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("programme.json");

        let json = r#"{
            "name": "Starter",
            "experience": "beginner",
            "weeks": [
                {
                    "week_number": 1,
                    "workouts": [
                        {
                            "name": "Day A",
                            "exercises": [
                                { "name": "Squat", "sets": 3, "reps": 5, "rest_seconds": 180 },
                                { "name": "Bench", "sets": 3, "reps": 5 }
                            ]
                        }
                    ]
                }
            ]
        }"#;
        std::fs::write(&path, json).unwrap();

        let programme = Programme::load_from(&path).unwrap();
        assert_eq!(programme.experience, ExperienceLevel::Beginner);
        assert_eq!(programme.weeks[0].workouts[0].exercises.len(), 2);
        assert_eq!(programme.weeks[0].workouts[0].exercises[1].rest_seconds, None);
    }

    #[test]
    fn test_malformed_programme_is_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("bad.json");
        std::fs::write(&path, "{ \"name\": \"x\" }").unwrap();

        assert!(matches!(Programme::load_from(&path), Err(crate::Error::Json(_))));
    }
}
