use std::sync::Arc;
use thiserror::Error;

use crate::core::{
    allergen::AllergenChecker,
    gateway::{GatewayError, GeneratedReply, TextGenerator},
    intent::{ClassifyContext, ExerciseTarget, Intent, IntentClassifier, IntentKind},
    matcher::{MealFilters, MealMatcher},
    planner::WorkoutPlanner,
    prompt::{PromptComposer, PromptContext},
    sources::{ExerciseSource, MuscleQuery},
    targets::{estimate_daily_totals, meal_targets},
};
use crate::models::{AllergyCheckResult, ExerciseRecord, MatchedMeal, MealRecord, NutritionTarget, UserProfile};
use crate::services::catalog::{find_meal, CatalogError, NutritionCatalog};

/// Default number of meal suggestions handed to the prompt
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;

/// Most exercises embedded in an exercise answer
const MAX_EXERCISES: usize = 5;

/// Errors that abort a chat request
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Generation failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Nutrition catalog unavailable: {0}")]
    Catalog(#[from] CatalogError),
}

/// Routed reply with the intent that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub intent: IntentKind,
    pub response: GeneratedReply,
}

/// Data gathered for one message before prompt composition
#[derive(Default)]
struct Gathered {
    allergy: Option<AllergyCheckResult>,
    target: Option<NutritionTarget>,
    matches: Vec<MatchedMeal>,
    nutrition: Option<MealRecord>,
    exercises: Vec<ExerciseRecord>,
    plan: Option<crate::core::planner::WorkoutPlan>,
}

/// Chat pipeline: classify, gather, compose, generate
#[derive(Clone)]
pub struct ChatRouter {
    classifier: IntentClassifier,
    composer: PromptComposer,
    matcher: MealMatcher,
    checker: AllergenChecker,
    catalog: Arc<NutritionCatalog>,
    exercises: Arc<dyn ExerciseSource>,
    planner: WorkoutPlanner,
    generator: Arc<dyn TextGenerator>,
    suggestion_limit: usize,
}

impl ChatRouter {
    pub fn new(
        catalog: Arc<NutritionCatalog>,
        checker: AllergenChecker,
        exercises: Arc<dyn ExerciseSource>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(),
            composer: PromptComposer::new(),
            matcher: MealMatcher::default(),
            checker,
            catalog,
            planner: WorkoutPlanner::new(exercises.clone()),
            exercises,
            generator,
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }

    pub fn with_matcher(mut self, matcher: MealMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_suggestion_limit(mut self, limit: usize) -> Self {
        self.suggestion_limit = limit.max(1);
        self
    }

    pub fn planner(&self) -> &WorkoutPlanner {
        &self.planner
    }

    /// Classify a message, gather the data its intent needs and generate a reply
    pub async fn respond(&self, message: &str, profile: Option<&UserProfile>) -> Result<ChatReply, RouterError> {
        let today = chrono::Utc::now().date_naive();
        let intent = self
            .classifier
            .classify(message, &ClassifyContext::for_profile(profile));

        tracing::info!("Routing message as {:?}", intent.kind());

        let gathered = self.gather(&intent, profile, today).await?;

        let mut ctx = PromptContext::new(message, &intent, today);
        ctx.profile = profile;
        ctx.allergy = gathered.allergy.as_ref();
        ctx.target = gathered.target.as_ref();
        ctx.matches = &gathered.matches;
        ctx.nutrition = gathered.nutrition.as_ref();
        ctx.exercises = &gathered.exercises;
        ctx.plan = gathered.plan.as_ref();

        let composed = self.composer.compose(&ctx);
        tracing::debug!("Composed prompt of {} chars", composed.text.len());

        let mut response = self.generator.generate(&composed.text).await?;
        if let Some(prefix) = &composed.required_prefix {
            response = response.with_required_prefix(prefix);
        }

        Ok(ChatReply {
            intent: intent.kind(),
            response,
        })
    }

    /// Forward a message to the generation backend without routing
    ///
    /// The reply is always plain text; structured output is serialized.
    pub async fn simple(&self, message: &str) -> Result<String, RouterError> {
        Ok(self.generator.generate(message.trim()).await?.into_text())
    }

    async fn gather(
        &self,
        intent: &Intent,
        profile: Option<&UserProfile>,
        today: chrono::NaiveDate,
    ) -> Result<Gathered, RouterError> {
        let mut gathered = Gathered::default();
        let allergies: &[String] = profile.map(|p| p.allergies.as_slice()).unwrap_or(&[]);

        match intent {
            Intent::MealSafety { meal_name } => {
                let result = self.checker.check_safety(meal_name, allergies).await;
                tracing::info!("Allergy check for {}: {:?}", meal_name, result.status);
                gathered.allergy = Some(result);
            }
            Intent::MealSuggestion { meal_time } => {
                let Some(profile) = profile else {
                    return Ok(gathered);
                };
                let Some(daily) = estimate_daily_totals(profile, today) else {
                    tracing::debug!("No daily totals for {}, suggesting without a target", profile.user_id);
                    return Ok(gathered);
                };

                let target = meal_targets(&daily, *meal_time, profile.meal_distribution.as_ref());
                let catalog = self.catalog.meals().await?;
                let filters = MealFilters {
                    likes: &profile.food_likes,
                    dislikes: &profile.food_dislikes,
                    allergens: allergies,
                };

                let mut matches = self
                    .matcher
                    .find_matches(&catalog, &target, filters, &self.checker)
                    .await;
                matches.truncate(self.suggestion_limit);

                gathered.matches = matches;
                gathered.target = Some(target);
            }
            Intent::NutritionLookup { meal_name } => {
                let catalog = self.catalog.meals().await?;
                let record = find_meal(&catalog, meal_name).cloned();

                if !allergies.is_empty() {
                    // Unverifiable is allowed through here, carried as a warning
                    let check = match &record {
                        Some(meal) => self.checker.check_record(meal, allergies).await,
                        None => self.checker.check_safety(meal_name, allergies).await,
                    };
                    gathered.allergy = Some(check);
                }
                gathered.nutrition = record;
            }
            Intent::ExerciseQuery { target } => {
                gathered.exercises = self.lookup_exercises(target, profile).await;
            }
            Intent::WorkoutRequest => {
                gathered.plan = Some(self.planner.build_plan(profile, today).await);
            }
            Intent::Greeting | Intent::GeneralQuery => {}
        }

        Ok(gathered)
    }

    async fn lookup_exercises(&self, target: &ExerciseTarget, profile: Option<&UserProfile>) -> Vec<ExerciseRecord> {
        let result = match target {
            ExerciseTarget::Muscle(group) => {
                let query = MuscleQuery {
                    muscle_group: group.clone(),
                    equipment: profile.map(|p| p.equipment.clone()).unwrap_or_default(),
                    level: profile.map(UserProfile::level).unwrap_or_default(),
                };
                self.exercises.by_muscles(&query).await
            }
            ExerciseTarget::Named(name) => self.exercises.by_name(name).await,
        };

        match result {
            Ok(mut exercises) => {
                exercises.truncate(MAX_EXERCISES);
                exercises
            }
            Err(e) => {
                tracing::warn!("Exercise lookup for {:?} failed, answering without data: {}", target, e);
                vec![]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sources::{IngredientSource, SourceError};
    use crate::models::{DailyTotals, Ingredient, NutritionFacts};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct NoRecipes;

    #[async_trait]
    impl IngredientSource for NoRecipes {
        async fn ingredients(&self, _meal_name: &str) -> Result<Option<Vec<Ingredient>>, SourceError> {
            Ok(None)
        }
    }

    struct DownExercises;

    #[async_trait]
    impl ExerciseSource for DownExercises {
        async fn by_muscles(&self, _query: &MuscleQuery) -> Result<Vec<ExerciseRecord>, SourceError> {
            Err(SourceError::Transport("connection refused".into()))
        }

        async fn by_name(&self, _name: &str) -> Result<Vec<ExerciseRecord>, SourceError> {
            Err(SourceError::Transport("connection refused".into()))
        }
    }

    #[derive(Default)]
    struct RecordingGenerator {
        prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingGenerator {
        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl TextGenerator for RecordingGenerator {
        async fn generate(&self, prompt: &str) -> Result<GeneratedReply, GatewayError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.fail {
                return Err(GatewayError::Status {
                    status: 503,
                    body: "model loading".into(),
                });
            }
            Ok(GeneratedReply::Text("It has what you asked about.".into()))
        }
    }

    fn meal(name: &str, calories: f64, protein: f64, carbs: f64, fat: f64) -> MealRecord {
        MealRecord {
            name: name.to_string(),
            category: "Breakfast".to_string(),
            ingredients: vec![],
            instructions: String::new(),
            nutrition: Some(NutritionFacts { calories, protein, carbs, fat }),
        }
    }

    fn router(generator: Arc<RecordingGenerator>) -> ChatRouter {
        let catalog = NutritionCatalog::from_records(vec![
            meal("Oat Bowl", 500.0, 38.0, 60.0, 17.0),
            meal("Triple Burger", 1400.0, 70.0, 90.0, 80.0),
        ]);
        ChatRouter::new(
            Arc::new(catalog),
            AllergenChecker::with_substring_policy(Arc::new(NoRecipes)),
            Arc::new(DownExercises),
            generator,
        )
    }

    fn profile(allergies: &[&str]) -> UserProfile {
        UserProfile {
            user_id: "u1".to_string(),
            name: "Sam".to_string(),
            allergies: allergies.iter().map(|a| a.to_string()).collect(),
            daily_targets: Some(DailyTotals {
                calories: 2000.0,
                protein: 150.0,
                carbs: 200.0,
                fat: 67.0,
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unsafe_meal_reply_starts_with_verdict() {
        let generator = Arc::new(RecordingGenerator::default());
        let router = router(generator.clone());

        let reply = router
            .respond("can I eat peanut butter toast?", Some(&profile(&["peanut"])))
            .await
            .unwrap();

        assert_eq!(reply.intent, IntentKind::MealSafety);
        let text = reply.response.as_text().unwrap();
        assert!(text.starts_with("NO, you should not eat peanut butter toast."));
        assert!(generator.last_prompt().contains("ALLERGY WARNING"));
    }

    #[tokio::test]
    async fn test_suggestion_embeds_target_and_matches() {
        let generator = Arc::new(RecordingGenerator::default());
        let router = router(generator.clone());

        let reply = router
            .respond("what should I eat for breakfast", Some(&profile(&[])))
            .await
            .unwrap();

        assert_eq!(reply.intent, IntentKind::MealSuggestion);
        let prompt = generator.last_prompt();
        assert!(prompt.contains("TARGET FOR BREAKFAST: 500 kcal, 38 g protein, 60 g carbs, 17 g fat"));
        assert!(prompt.contains("1. Oat Bowl"));
        assert!(!prompt.contains("Triple Burger"));
    }

    #[tokio::test]
    async fn test_exercise_lookup_failure_is_isolated() {
        let generator = Arc::new(RecordingGenerator::default());
        let router = router(generator.clone());

        let reply = router.respond("exercises for my chest", None).await.unwrap();

        assert_eq!(reply.intent, IntentKind::ExerciseQuery);
        assert_eq!(generator.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_gateway_failure_surfaces() {
        let generator = Arc::new(RecordingGenerator {
            fail: true,
            ..Default::default()
        });
        let router = router(generator);

        let err = router.respond("hello", None).await.unwrap_err();
        assert!(matches!(err, RouterError::Gateway(GatewayError::Status { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_simple_passes_message_through() {
        let generator = Arc::new(RecordingGenerator::default());
        let router = router(generator.clone());

        let reply = router.simple("  tell me a joke  ").await.unwrap();
        assert_eq!(generator.last_prompt(), "tell me a joke");
        assert_eq!(reply, "It has what you asked about.");
    }
}
