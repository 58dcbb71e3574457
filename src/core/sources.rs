//! Collaborator seams for the external data sources.
//!
//! The HTTP clients in `crate::services` implement these traits; the core
//! pipeline only ever sees the traits, so tests can substitute in-memory fakes.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ExerciseRecord, FitnessLevel, Ingredient, UserProfile};

/// Failure of an external lookup
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SourceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Read access to stored user profiles
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<UserProfile, SourceError>;
}

/// Per-name recipe lookup returning the ingredient list
///
/// `Ok(None)` means the source answered but knows no recipe by that name.
#[async_trait]
pub trait IngredientSource: Send + Sync {
    async fn ingredients(&self, meal_name: &str) -> Result<Option<Vec<Ingredient>>, SourceError>;
}

/// Exercise lookup for one muscle group
#[derive(Debug, Clone, PartialEq)]
pub struct MuscleQuery {
    pub muscle_group: String,
    pub equipment: Vec<String>,
    pub level: FitnessLevel,
}

/// Exercise catalog queries
#[async_trait]
pub trait ExerciseSource: Send + Sync {
    async fn by_muscles(&self, query: &MuscleQuery) -> Result<Vec<ExerciseRecord>, SourceError>;

    async fn by_name(&self, name: &str) -> Result<Vec<ExerciseRecord>, SourceError>;
}
