//! Default catalog of exercises.
//!
//! Maps exercise names (and common aliases) to their movement pattern and
//! the muscle groups they train. Used to normalize logged exercise names and
//! to classify programme exercises for validation.

use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

use MovementPattern as P;
use MuscleGroup as M;

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// (name, aliases, pattern, primary, secondary)
type Entry = (
    &'static str,
    &'static [&'static str],
    MovementPattern,
    &'static [MuscleGroup],
    &'static [MuscleGroup],
);

const ENTRIES: &[Entry] = &[
    // Squat
    (
        "Barbell Back Squat",
        &["squat", "back squat", "bb squat"],
        P::Squat,
        &[M::Quads, M::Glutes],
        &[M::Hamstrings, M::Core],
    ),
    ("Front Squat", &["fs"], P::Squat, &[M::Quads], &[M::Glutes, M::Core]),
    ("Goblet Squat", &[], P::Squat, &[M::Quads], &[M::Glutes, M::Core]),
    ("Leg Press", &[], P::Squat, &[M::Quads], &[M::Glutes]),
    // Hinge
    (
        "Conventional Deadlift",
        &["deadlift", "dl", "conventional dl"],
        P::Hinge,
        &[M::Hamstrings, M::Glutes, M::Back],
        &[M::Core],
    ),
    (
        "Romanian Deadlift",
        &["rdl", "romanian dl"],
        P::Hinge,
        &[M::Hamstrings, M::Glutes],
        &[M::Back],
    ),
    ("Hip Thrust", &["barbell hip thrust"], P::Hinge, &[M::Glutes], &[M::Hamstrings]),
    ("Good Morning", &[], P::Hinge, &[M::Hamstrings], &[M::Glutes, M::Back]),
    // Lunge
    (
        "Bulgarian Split Squat",
        &["bss", "split squat"],
        P::Lunge,
        &[M::Quads, M::Glutes],
        &[M::Hamstrings],
    ),
    ("Walking Lunge", &["lunge", "lunges"], P::Lunge, &[M::Quads, M::Glutes], &[M::Hamstrings]),
    // Horizontal push
    (
        "Barbell Bench Press",
        &["bench", "bench press", "bb bench"],
        P::HorizontalPush,
        &[M::Chest],
        &[M::Triceps, M::Shoulders],
    ),
    (
        "Dumbbell Bench Press",
        &["db bench", "db bench press"],
        P::HorizontalPush,
        &[M::Chest],
        &[M::Triceps, M::Shoulders],
    ),
    (
        "Incline Bench Press",
        &["incline bench"],
        P::HorizontalPush,
        &[M::Chest, M::Shoulders],
        &[M::Triceps],
    ),
    ("Push Up", &["pushup", "press up"], P::HorizontalPush, &[M::Chest], &[M::Triceps, M::Core]),
    ("Dip", &["dips"], P::HorizontalPush, &[M::Chest, M::Triceps], &[M::Shoulders]),
    // Vertical push
    (
        "Overhead Press",
        &["ohp", "press", "military press", "shoulder press"],
        P::VerticalPush,
        &[M::Shoulders],
        &[M::Triceps, M::Core],
    ),
    (
        "Dumbbell Shoulder Press",
        &["db shoulder press", "db ohp"],
        P::VerticalPush,
        &[M::Shoulders],
        &[M::Triceps],
    ),
    // Horizontal pull
    (
        "Barbell Row",
        &["row", "bent over row", "bb row", "pendlay row"],
        P::HorizontalPull,
        &[M::Back],
        &[M::Biceps],
    ),
    ("Dumbbell Row", &["db row", "one arm row"], P::HorizontalPull, &[M::Back], &[M::Biceps]),
    ("Seated Cable Row", &["cable row"], P::HorizontalPull, &[M::Back], &[M::Biceps]),
    ("Face Pull", &[], P::HorizontalPull, &[M::Shoulders], &[M::Back]),
    // Vertical pull
    ("Pull Up", &["pullup"], P::VerticalPull, &[M::Back], &[M::Biceps]),
    ("Chin Up", &["chinup"], P::VerticalPull, &[M::Back, M::Biceps], &[]),
    ("Lat Pulldown", &["pulldown", "lat pull down"], P::VerticalPull, &[M::Back], &[M::Biceps]),
    // Isolation
    ("Barbell Curl", &["curl", "bicep curl", "biceps curl"], P::Isolation, &[M::Biceps], &[]),
    ("Dumbbell Curl", &["db curl", "hammer curl"], P::Isolation, &[M::Biceps], &[]),
    ("Tricep Pushdown", &["pushdown", "triceps pushdown"], P::Isolation, &[M::Triceps], &[]),
    (
        "Skull Crusher",
        &["skullcrusher", "lying tricep extension"],
        P::Isolation,
        &[M::Triceps],
        &[],
    ),
    ("Lateral Raise", &["side raise", "lat raise"], P::Isolation, &[M::Shoulders], &[]),
    ("Leg Extension", &[], P::Isolation, &[M::Quads], &[]),
    ("Leg Curl", &["hamstring curl", "lying leg curl"], P::Isolation, &[M::Hamstrings], &[]),
    ("Calf Raise", &["standing calf raise"], P::Isolation, &[M::Calves], &[]),
    ("Chest Fly", &["fly", "cable fly", "pec deck"], P::Isolation, &[M::Chest], &[]),
    // Core and carries
    ("Plank", &[], P::Core, &[M::Core], &[]),
    ("Hanging Leg Raise", &["leg raise"], P::Core, &[M::Core], &[]),
    ("Farmer's Walk", &["farmers walk", "farmer carry"], P::Carry, &[M::Core], &[M::Back]),
];

/// Keyword fallbacks for names not in the catalog, checked in order
const KEYWORD_RULES: &[(&str, MovementPattern, &[MuscleGroup])] = &[
    ("deadlift", P::Hinge, &[M::Hamstrings, M::Glutes, M::Back]),
    ("rdl", P::Hinge, &[M::Hamstrings, M::Glutes]),
    ("thrust", P::Hinge, &[M::Glutes]),
    ("lunge", P::Lunge, &[M::Quads, M::Glutes]),
    ("split squat", P::Lunge, &[M::Quads, M::Glutes]),
    ("squat", P::Squat, &[M::Quads, M::Glutes]),
    ("leg press", P::Squat, &[M::Quads]),
    ("curl", P::Isolation, &[M::Biceps]),
    ("extension", P::Isolation, &[M::Triceps]),
    ("raise", P::Isolation, &[M::Shoulders]),
    ("fly", P::Isolation, &[M::Chest]),
    ("pulldown", P::VerticalPull, &[M::Back]),
    ("pull up", P::VerticalPull, &[M::Back]),
    ("chin", P::VerticalPull, &[M::Back]),
    ("row", P::HorizontalPull, &[M::Back]),
    ("overhead", P::VerticalPush, &[M::Shoulders]),
    ("shoulder press", P::VerticalPush, &[M::Shoulders]),
    ("bench", P::HorizontalPush, &[M::Chest]),
    ("push", P::HorizontalPush, &[M::Chest]),
    ("press", P::HorizontalPush, &[M::Chest]),
    ("plank", P::Core, &[M::Core]),
];

/// Builds the default catalog
pub fn build_default_catalog() -> Catalog {
    let exercises = ENTRIES
        .iter()
        .map(|(name, aliases, pattern, primary, secondary)| {
            (
                name.to_lowercase(),
                ExerciseDefinition {
                    name: name.to_string(),
                    aliases: aliases.iter().map(|a| a.to_string()).collect(),
                    pattern: *pattern,
                    primary_muscles: primary.to_vec(),
                    secondary_muscles: secondary.to_vec(),
                },
            )
        })
        .collect();

    Catalog { exercises }
}

/// Lowercase, drop punctuation, collapse whitespace
fn normalize(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

impl Catalog {
    /// Find an exercise by name, alias, or closest token overlap
    pub fn find_exercise(&self, query: &str) -> Option<&ExerciseDefinition> {
        let query = normalize(query);
        if query.is_empty() {
            return None;
        }

        if let Some(def) = self.exercises.get(&query) {
            return Some(def);
        }

        for def in self.exercises.values() {
            if normalize(&def.name) == query || def.aliases.iter().any(|a| normalize(a) == query) {
                return Some(def);
            }
        }

        // Token overlap: every query token must appear in the candidate name
        let tokens: HashSet<&str> = query.split(' ').collect();
        let mut best: Option<(&ExerciseDefinition, usize)> = None;
        for def in self.exercises.values() {
            let name = normalize(&def.name);
            let name_tokens: HashSet<&str> = name.split(' ').collect();
            if !tokens.is_subset(&name_tokens) {
                continue;
            }
            // Prefer the candidate with the fewest extra tokens, then by name
            let extra = name_tokens.len() - tokens.len();
            let better = match best {
                None => true,
                Some((current, current_extra)) => {
                    extra < current_extra || (extra == current_extra && def.name < current.name)
                }
            };
            if better {
                best = Some((def, extra));
            }
        }

        best.map(|(def, _)| def)
    }

    /// Pattern and primary muscles for an exercise name
    ///
    /// Falls back to keyword rules; None when nothing matches.
    pub fn classify(&self, name: &str) -> Option<(MovementPattern, Vec<MuscleGroup>)> {
        if let Some(def) = self.find_exercise(name) {
            return Some((def.pattern, def.primary_muscles.clone()));
        }

        let normalized = normalize(name);
        KEYWORD_RULES
            .iter()
            .find(|(keyword, _, _)| normalized.contains(keyword))
            .map(|(_, pattern, muscles)| (*pattern, muscles.to_vec()))
    }

    /// Canonical catalog name for a logged name, or the trimmed input if unknown
    pub fn canonical_name(&self, name: &str) -> String {
        self.find_exercise(name)
            .map(|def| def.name.clone())
            .unwrap_or_else(|| name.trim().to_string())
    }

    /// Validate the catalog for internal consistency
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen_aliases: HashMap<String, &str> = HashMap::new();

        for (key, def) in &self.exercises {
            if key != &def.name.to_lowercase() {
                errors.push(format!("Exercise '{}' stored under key '{}'", def.name, key));
            }

            if def.primary_muscles.is_empty() {
                errors.push(format!("Exercise '{}' has no primary muscles", def.name));
            }

            for alias in &def.aliases {
                let alias = normalize(alias);
                if self.exercises.contains_key(&alias) {
                    errors.push(format!(
                        "Alias '{}' of '{}' shadows another exercise",
                        alias, def.name
                    ));
                }
                if let Some(other) = seen_aliases.insert(alias.clone(), &def.name) {
                    errors.push(format!(
                        "Alias '{}' used by both '{}' and '{}'",
                        alias, other, def.name
                    ));
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        let catalog = build_default_catalog();
        assert_eq!(catalog.exercises.len(), ENTRIES.len());
    }

    #[test]
    fn test_default_catalog_validates() {
        let catalog = get_default_catalog();
        let errors = catalog.validate();
        assert!(
            errors.is_empty(),
            "Default catalog has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_find_by_name_and_alias() {
        let catalog = get_default_catalog();
        let bench = catalog.find_exercise("barbell bench press").unwrap();
        assert_eq!(bench.name, "Barbell Bench Press");
        assert_eq!(catalog.find_exercise("Bench").unwrap().name, "Barbell Bench Press");
        assert_eq!(catalog.find_exercise("OHP").unwrap().name, "Overhead Press");
        assert_eq!(catalog.find_exercise("RDL").unwrap().name, "Romanian Deadlift");
        assert_eq!(catalog.find_exercise("pull-up").unwrap().name, "Pull Up");
    }

    #[test]
    fn test_find_by_token_overlap() {
        let catalog = get_default_catalog();
        assert_eq!(catalog.find_exercise("dumbbell row").unwrap().name, "Dumbbell Row");
        assert_eq!(catalog.find_exercise("cable row").unwrap().name, "Seated Cable Row");
        assert_eq!(catalog.find_exercise("Incline Press").unwrap().name, "Incline Bench Press");
        assert!(catalog.find_exercise("zercher carry").is_none());
        assert!(catalog.find_exercise("   ").is_none());
    }

    #[test]
    fn test_classify_falls_back_to_keywords() {
        let catalog = get_default_catalog();
        let (pattern, muscles) = catalog.classify("Safety Bar Squat").unwrap();
        assert_eq!(pattern, MovementPattern::Squat);
        assert!(muscles.contains(&MuscleGroup::Quads));

        let (pattern, _) = catalog.classify("Deficit Deadlift").unwrap();
        assert_eq!(pattern, MovementPattern::Hinge);

        assert!(catalog.classify("Sled Drag").is_none());
    }

    #[test]
    fn test_canonical_name() {
        let catalog = get_default_catalog();
        assert_eq!(catalog.canonical_name("squat"), "Barbell Back Squat");
        assert_eq!(catalog.canonical_name("  Zercher Squat "), "Zercher Squat");
    }
}
