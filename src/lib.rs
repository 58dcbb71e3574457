//! Nutri Coach - intent-routing chat backend for nutrition and fitness coaching
//!
//! Incoming messages are classified by regex rules, the matching handler gathers
//! profile, recipe, allergen and exercise data, and a locally hosted language
//! model phrases the answer from a prompt that embeds every computed figure.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{AllergenChecker, ChatRouter, IntentClassifier, MealMatcher, PromptComposer, WorkoutPlanner};
pub use models::{AllergyCheckResult, AllergyStatus, MealRecord, NutritionTarget, UserProfile};
