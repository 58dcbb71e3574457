use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{MealRecord, NutritionFacts};
use crate::services::mealdb::meal_from_value;

/// Errors raised while loading the nutrition catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    meal: Value,
    #[serde(default)]
    nutrition: Option<NutritionFacts>,
}

/// Parse a catalog document: a JSON array of `{meal, nutrition}` entries.
///
/// Entries without a meal name or with negative nutrition values are logged
/// and dropped; they never reach the matcher.
pub fn parse_catalog(json: &str) -> Result<Vec<MealRecord>, CatalogError> {
    let entries: Vec<CatalogEntry> = serde_json::from_str(json)?;
    let total = entries.len();

    let meals: Vec<MealRecord> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let Some(mut meal) = meal_from_value(&entry.meal) else {
                tracing::warn!("Catalog entry {} has no meal name, skipping", index);
                return None;
            };
            if let Some(nutrition) = entry.nutrition {
                meal.nutrition = Some(nutrition);
            }
            if meal.nutrition.is_some_and(|n| !n.is_valid()) {
                tracing::warn!("Catalog entry {} has invalid nutrition values, skipping", meal.name);
                return None;
            }
            Some(meal)
        })
        .collect();

    tracing::info!("Parsed nutrition catalog: {} of {} entries usable", meals.len(), total);
    Ok(meals)
}

/// Look up a meal by name: exact (case-insensitive) first, then containment
/// in either direction, preferring the longest catalog name
pub fn find_meal<'a>(meals: &'a [MealRecord], name: &str) -> Option<&'a MealRecord> {
    let query = name.trim().to_lowercase();
    if query.is_empty() {
        return None;
    }

    meals
        .iter()
        .find(|m| m.name.to_lowercase() == query)
        .or_else(|| {
            meals
                .iter()
                .filter(|m| {
                    let candidate = m.name.to_lowercase();
                    candidate.contains(&query) || query.contains(&candidate)
                })
                .max_by_key(|m| m.name.len())
        })
}

enum CatalogOrigin {
    File(PathBuf),
    Fixed(Arc<Vec<MealRecord>>),
}

/// Recipe catalog with nutrition facts, loaded on first use.
///
/// Readers get a shared snapshot; a reload swaps the whole snapshot at once.
pub struct NutritionCatalog {
    origin: CatalogOrigin,
    meals: RwLock<Option<Arc<Vec<MealRecord>>>>,
}

impl NutritionCatalog {
    /// Catalog backed by a JSON file, read lazily
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            origin: CatalogOrigin::File(path.into()),
            meals: RwLock::new(None),
        }
    }

    /// Catalog over an in-memory list of meals
    pub fn from_records(records: Vec<MealRecord>) -> Self {
        let records = Arc::new(records);
        Self {
            origin: CatalogOrigin::Fixed(records.clone()),
            meals: RwLock::new(Some(records)),
        }
    }

    /// Current snapshot, loading it on first access
    pub async fn meals(&self) -> Result<Arc<Vec<MealRecord>>, CatalogError> {
        if let Some(meals) = self.meals.read().await.as_ref() {
            return Ok(meals.clone());
        }

        let mut guard = self.meals.write().await;
        // Another request may have loaded it while we waited
        if let Some(meals) = guard.as_ref() {
            return Ok(meals.clone());
        }

        let loaded = Arc::new(self.load().await?);
        *guard = Some(loaded.clone());
        Ok(loaded)
    }

    /// Re-read the source and swap the snapshot, returning the meal count
    pub async fn reload(&self) -> Result<usize, CatalogError> {
        let loaded = self.load().await?;
        let count = loaded.len();
        *self.meals.write().await = Some(Arc::new(loaded));
        tracing::info!("Nutrition catalog reloaded with {} meals", count);
        Ok(count)
    }

    /// Number of meals currently loaded, without triggering a load
    pub async fn loaded_len(&self) -> usize {
        self.meals
            .read()
            .await
            .as_ref()
            .map(|meals| meals.len())
            .unwrap_or(0)
    }

    async fn load(&self) -> Result<Vec<MealRecord>, CatalogError> {
        match &self.origin {
            CatalogOrigin::Fixed(records) => Ok(records.as_ref().clone()),
            CatalogOrigin::File(path) => {
                tracing::info!("Loading nutrition catalog from {}", path.display());
                let raw = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| CatalogError::Io {
                        path: path.display().to_string(),
                        source,
                    })?;
                parse_catalog(&raw)
            }
        }
    }
}
