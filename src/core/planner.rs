use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::intent::canonical_muscle_group;
use crate::core::sources::{ExerciseSource, MuscleQuery};
use crate::core::targets::{all_meal_targets, estimate_daily_totals};
use crate::models::{DailyTotals, ExerciseRecord, FitnessLevel, NutritionTarget, UserProfile};

/// Muscle groups trained when the profile names none
pub const DEFAULT_MUSCLE_GROUPS: [&str; 6] = ["chest", "back", "legs", "shoulders", "arms", "core"];

/// Exercises chosen for one muscle group
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MuscleGroupPlan {
    pub muscle_group: String,
    pub exercises: Vec<ExerciseRecord>,
    /// False when the built-in bodyweight defaults were substituted
    pub from_catalog: bool,
}

/// Structured training and nutrition plan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutPlan {
    pub user_id: Option<String>,
    pub fitness_level: FitnessLevel,
    pub goal: Option<String>,
    pub sets: u8,
    pub reps: String,
    pub rest_seconds: u16,
    pub groups: Vec<MuscleGroupPlan>,
    pub fallback_groups: Vec<String>,
    pub daily_totals: Option<DailyTotals>,
    pub meal_targets: Vec<NutritionTarget>,
}

/// Sets, rep range and rest for a fitness level
pub fn volume_for(level: FitnessLevel) -> (u8, &'static str, u16) {
    match level {
        FitnessLevel::Beginner => (3, "10-12", 60),
        FitnessLevel::Intermediate => (4, "8-12", 90),
        FitnessLevel::Advanced => (5, "6-10", 120),
    }
}

/// How many exercises each muscle group gets
pub fn exercises_per_group(level: FitnessLevel) -> usize {
    match level {
        FitnessLevel::Beginner => 3,
        FitnessLevel::Intermediate => 4,
        FitnessLevel::Advanced => 5,
    }
}

fn bodyweight(name: &str, muscle: &str, category: &str, description: &str) -> ExerciseRecord {
    ExerciseRecord {
        name: name.to_string(),
        description: description.to_string(),
        primary_muscles: vec![muscle.to_string()],
        secondary_muscles: vec![],
        equipment: vec!["none (bodyweight)".to_string()],
        category: category.to_string(),
    }
}

/// Built-in bodyweight exercises used when a catalog lookup fails
pub fn default_exercises(muscle_group: &str) -> Vec<ExerciseRecord> {
    match muscle_group {
        "chest" => vec![
            bodyweight("Push-ups", "chest", "Chest", "Hands under shoulders, body in a straight line, lower until the chest nearly touches the floor."),
            bodyweight("Incline push-ups", "chest", "Chest", "Push-ups with hands on a bench or step to reduce the load."),
        ],
        "back" | "lats" => vec![
            bodyweight("Superman hold", "back", "Back", "Lie face down and lift arms and legs off the floor, hold for a few seconds."),
            bodyweight("Reverse snow angels", "back", "Back", "Face down, sweep straight arms from the hips to overhead while squeezing the shoulder blades."),
        ],
        "legs" | "quads" | "hamstrings" | "glutes" | "calves" => vec![
            bodyweight("Bodyweight squats", "legs", "Legs", "Feet shoulder-width apart, sit the hips back and down, keep the chest up."),
            bodyweight("Reverse lunges", "legs", "Legs", "Step back and lower the back knee toward the floor, then drive through the front heel."),
            bodyweight("Glute bridges", "glutes", "Legs", "Lie on your back, feet flat, and lift the hips until knees, hips and shoulders line up."),
        ],
        "shoulders" => vec![
            bodyweight("Pike push-ups", "shoulders", "Shoulders", "Hips high in an inverted V, bend the elbows to bring the head toward the floor."),
            bodyweight("Arm circles", "shoulders", "Shoulders", "Small controlled circles with straight arms, both directions."),
        ],
        "arms" | "biceps" | "triceps" => vec![
            bodyweight("Bench dips", "triceps", "Arms", "Hands on a bench behind you, lower by bending the elbows, then press up."),
            bodyweight("Diamond push-ups", "triceps", "Arms", "Push-ups with hands together under the chest."),
        ],
        _ => vec![
            bodyweight("Plank", "core", "Abs", "Forearms on the floor, body straight from head to heels, brace the abs."),
            bodyweight("Dead bug", "core", "Abs", "On your back, extend opposite arm and leg while keeping the lower back flat."),
        ],
    }
}

/// Builds workout plans by fanning out one exercise lookup per muscle group
#[derive(Clone)]
pub struct WorkoutPlanner {
    source: Arc<dyn ExerciseSource>,
}

impl WorkoutPlanner {
    pub fn new(source: Arc<dyn ExerciseSource>) -> Self {
        Self { source }
    }

    pub async fn build_plan(&self, profile: Option<&UserProfile>, today: chrono::NaiveDate) -> WorkoutPlan {
        let level = profile.map(UserProfile::level).unwrap_or_default();
        let equipment = profile.map(|p| p.equipment.clone()).unwrap_or_default();
        let groups = muscle_groups(profile);
        let per_group = exercises_per_group(level);

        // Each branch resolves on its own; one failing group never aborts the rest
        let lookups = join_all(groups.iter().map(|group| {
            let query = MuscleQuery {
                muscle_group: group.clone(),
                equipment: equipment.clone(),
                level,
            };
            async move {
                let result = self.source.by_muscles(&query).await;
                (query.muscle_group, result)
            }
        }))
        .await;

        let mut fallback_groups = Vec::new();
        let group_plans: Vec<MuscleGroupPlan> = lookups
            .into_iter()
            .map(|(muscle_group, result)| match result {
                Ok(mut exercises) if !exercises.is_empty() => {
                    exercises.truncate(per_group);
                    MuscleGroupPlan {
                        muscle_group,
                        exercises,
                        from_catalog: true,
                    }
                }
                other => {
                    match other {
                        Err(e) => tracing::warn!("Exercise lookup for {} failed, using defaults: {}", muscle_group, e),
                        Ok(_) => tracing::debug!("No catalog exercises for {}, using defaults", muscle_group),
                    }
                    fallback_groups.push(muscle_group.clone());
                    MuscleGroupPlan {
                        exercises: default_exercises(&muscle_group),
                        muscle_group,
                        from_catalog: false,
                    }
                }
            })
            .collect();

        let daily_totals = profile.and_then(|p| estimate_daily_totals(p, today));
        let meal_targets = daily_totals
            .map(|daily| all_meal_targets(&daily, profile.and_then(|p| p.meal_distribution.as_ref())))
            .unwrap_or_default();

        let (sets, reps, rest_seconds) = volume_for(level);

        WorkoutPlan {
            user_id: profile.map(|p| p.user_id.clone()).filter(|id| !id.is_empty()),
            fitness_level: level,
            goal: profile.and_then(|p| p.fitness_goal.clone()),
            sets,
            reps: reps.to_string(),
            rest_seconds,
            groups: group_plans,
            fallback_groups,
            daily_totals,
            meal_targets,
        }
    }
}

/// Canonical, de-duplicated muscle groups from the profile, or the defaults
fn muscle_groups(profile: Option<&UserProfile>) -> Vec<String> {
    let mut groups: Vec<String> = Vec::new();
    for raw in profile.map(|p| p.target_muscle_groups.as_slice()).unwrap_or(&[]) {
        if raw.trim().is_empty() {
            continue;
        }
        let group = canonical_muscle_group(raw);
        if !groups.contains(&group) {
            groups.push(group);
        }
    }

    if groups.is_empty() {
        groups = DEFAULT_MUSCLE_GROUPS.iter().map(|g| g.to_string()).collect();
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sources::SourceError;
    use async_trait::async_trait;

    struct FlakySource;

    #[async_trait]
    impl ExerciseSource for FlakySource {
        async fn by_muscles(&self, query: &MuscleQuery) -> Result<Vec<ExerciseRecord>, SourceError> {
            match query.muscle_group.as_str() {
                "back" => Err(SourceError::Transport("timeout".into())),
                "core" => Ok(vec![]),
                group => Ok((0..6)
                    .map(|i| ExerciseRecord {
                        name: format!("{} move {}", group, i),
                        description: String::new(),
                        primary_muscles: vec![group.to_string()],
                        secondary_muscles: vec![],
                        equipment: vec![],
                        category: group.to_string(),
                    })
                    .collect()),
            }
        }

        async fn by_name(&self, _name: &str) -> Result<Vec<ExerciseRecord>, SourceError> {
            Ok(vec![])
        }
    }

    fn today() -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[tokio::test]
    async fn test_failed_groups_isolated() {
        let planner = WorkoutPlanner::new(Arc::new(FlakySource));

        let plan = planner.build_plan(None, today()).await;

        assert_eq!(plan.groups.len(), DEFAULT_MUSCLE_GROUPS.len());
        assert_eq!(plan.fallback_groups, vec!["back", "core"]);

        let chest = &plan.groups[0];
        assert_eq!(chest.muscle_group, "chest");
        assert!(chest.from_catalog);
        assert_eq!(chest.exercises.len(), 3);

        let back = &plan.groups[1];
        assert!(!back.from_catalog);
        assert_eq!(back.exercises[0].name, "Superman hold");
    }

    #[tokio::test]
    async fn test_profile_groups_and_level() {
        let planner = WorkoutPlanner::new(Arc::new(FlakySource));
        let profile = UserProfile {
            user_id: "u1".to_string(),
            fitness_level: Some("Advanced".to_string()),
            target_muscle_groups: vec!["Pecs".to_string(), "chest".to_string(), "Leg".to_string()],
            ..Default::default()
        };

        let plan = planner.build_plan(Some(&profile), today()).await;

        let names: Vec<&str> = plan.groups.iter().map(|g| g.muscle_group.as_str()).collect();
        assert_eq!(names, vec!["chest", "legs"]);
        assert_eq!(plan.fitness_level, FitnessLevel::Advanced);
        assert_eq!(plan.sets, 5);
        assert_eq!(plan.groups[0].exercises.len(), 5);
        assert_eq!(plan.user_id.as_deref(), Some("u1"));
        assert!(plan.daily_totals.is_none());
        assert!(plan.meal_targets.is_empty());
    }
}
