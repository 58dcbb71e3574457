// Service exports
pub mod catalog;
pub mod mealdb;
pub mod ollama;
pub mod profile_store;
pub mod wger;

pub use catalog::{find_meal, CatalogError, NutritionCatalog};
pub use mealdb::{MealDbClient, MealDbError};
pub use ollama::{GenerationOptions, OllamaClient};
pub use profile_store::{ProfileStoreClient, ProfileStoreError};
pub use wger::{WgerClient, WgerError};
