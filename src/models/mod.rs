// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    AllergyCheckResult, AllergyStatus, DailyTotals, ExerciseRecord, FitnessLevel, Ingredient,
    MatchedMeal, MealDistribution, MealRecord, MealShare, MealTime, NutritionFacts,
    NutritionTarget, UserProfile,
};
pub use requests::{ChatRequest, FitnessRecommendationsRequest, SimpleChatRequest};
pub use responses::{ChatResponse, ErrorResponse, HealthResponse, ReloadResponse, SimpleChatResponse};
