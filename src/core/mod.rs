// Core pipeline exports
pub mod allergen;
pub mod filters;
pub mod gateway;
pub mod intent;
pub mod matcher;
pub mod planner;
pub mod prompt;
pub mod router;
pub mod sources;
pub mod targets;

pub use allergen::{AllergenChecker, AllergenMatchPolicy, SubstringPolicy, SynonymPolicy};
pub use filters::{matches_any_token, within_tolerance};
pub use gateway::{interpret_output, GatewayError, GeneratedReply, TextGenerator};
pub use intent::{ClassifyContext, ExerciseTarget, Intent, IntentClassifier, IntentKind};
pub use matcher::{MealFilters, MealMatcher};
pub use planner::{WorkoutPlan, WorkoutPlanner};
pub use prompt::{ComposedPrompt, PromptComposer, PromptContext};
pub use router::{ChatReply, ChatRouter, RouterError};
pub use sources::{ExerciseSource, IngredientSource, MuscleQuery, ProfileSource, SourceError};
pub use targets::{estimate_daily_totals, meal_targets};
