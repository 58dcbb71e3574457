use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::core::sources::{IngredientSource, SourceError};
use crate::models::{Ingredient, MealRecord, NutritionFacts};

/// TheMealDB numbers its ingredient slots 1 through 20
const INGREDIENT_SLOTS: usize = 20;

/// Errors that can occur when querying TheMealDB
#[derive(Debug, Error)]
pub enum MealDbError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl From<MealDbError> for SourceError {
    fn from(err: MealDbError) -> Self {
        match err {
            MealDbError::InvalidResponse(msg) => SourceError::InvalidResponse(msg),
            other => SourceError::Transport(other.to_string()),
        }
    }
}

/// TheMealDB recipe search client
pub struct MealDbClient {
    base_url: String,
    client: Client,
}

impl MealDbClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, MealDbError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    /// Search recipes by name
    pub async fn search(&self, name: &str) -> Result<Vec<MealRecord>, MealDbError> {
        let url = format!(
            "{}/search.php?s={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(name.trim())
        );

        tracing::debug!("Searching recipes: {}", url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(MealDbError::ApiError(format!(
                "Recipe search failed: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;

        // TheMealDB answers {"meals": null} when nothing matches
        let meals = match json.get("meals") {
            Some(Value::Array(meals)) => meals,
            Some(Value::Null) => return Ok(vec![]),
            _ => return Err(MealDbError::InvalidResponse("Missing meals field".into())),
        };

        Ok(meals.iter().filter_map(meal_from_value).collect())
    }
}

#[async_trait]
impl IngredientSource for MealDbClient {
    async fn ingredients(&self, meal_name: &str) -> Result<Option<Vec<Ingredient>>, SourceError> {
        let meals = self.search(meal_name).await?;

        let best = meals
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(meal_name.trim()))
            .or_else(|| meals.first());

        Ok(best.map(|meal| meal.ingredients.clone()))
    }
}

fn text_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// Build a meal from either a plain `{name, ingredients: [...]}` object or a
/// raw TheMealDB record with numbered `strIngredientN`/`strMeasureN` fields
pub fn meal_from_value(value: &Value) -> Option<MealRecord> {
    let name = text_field(value, &["name", "strMeal"])?.to_string();

    let ingredients = match value.get("ingredients") {
        Some(Value::Array(items)) => items.iter().filter_map(ingredient_from_value).collect(),
        _ => numbered_ingredients(value),
    };

    let nutrition = value
        .get("nutrition")
        .and_then(|n| serde_json::from_value::<NutritionFacts>(n.clone()).ok());

    Some(MealRecord {
        name,
        category: text_field(value, &["category", "strCategory"])
            .unwrap_or_default()
            .to_string(),
        ingredients,
        instructions: text_field(value, &["instructions", "strInstructions"])
            .unwrap_or_default()
            .to_string(),
        nutrition,
    })
}

fn ingredient_from_value(value: &Value) -> Option<Ingredient> {
    match value {
        Value::String(name) if !name.trim().is_empty() => Some(Ingredient {
            name: name.trim().to_string(),
            measure: String::new(),
        }),
        Value::Object(_) => Some(Ingredient {
            name: text_field(value, &["name", "ingredient"])?.to_string(),
            measure: text_field(value, &["measure"]).unwrap_or_default().to_string(),
        }),
        _ => None,
    }
}

/// Collect the non-empty numbered ingredient slots of a TheMealDB record
pub fn numbered_ingredients(value: &Value) -> Vec<Ingredient> {
    (1..=INGREDIENT_SLOTS)
        .filter_map(|i| {
            let name = text_field(value, &[format!("strIngredient{}", i).as_str()])?;
            let measure = text_field(value, &[format!("strMeasure{}", i).as_str()]).unwrap_or_default();
            Some(Ingredient {
                name: name.to_string(),
                measure: measure.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbered_fields() {
        let raw = json!({
            "strMeal": "Pancakes",
            "strCategory": "Dessert",
            "strInstructions": "Mix and fry.",
            "strIngredient1": "Flour",
            "strMeasure1": "100g",
            "strIngredient2": " Eggs ",
            "strMeasure2": "2",
            "strIngredient3": "",
            "strMeasure3": " ",
            "strIngredient4": null
        });

        let meal = meal_from_value(&raw).unwrap();
        assert_eq!(meal.name, "Pancakes");
        assert_eq!(meal.category, "Dessert");
        assert_eq!(meal.ingredients.len(), 2);
        assert_eq!(meal.ingredients[1].name, "Eggs");
        assert_eq!(meal.ingredients[1].measure, "2");
        assert!(meal.nutrition.is_none());
    }

    #[test]
    fn test_plain_shape() {
        let raw = json!({
            "name": "Oatmeal",
            "ingredients": [{"name": "Oats", "measure": "50g"}, "Milk"]
        });

        let meal = meal_from_value(&raw).unwrap();
        assert_eq!(meal.ingredients[0].measure, "50g");
        assert_eq!(meal.ingredients[1].name, "Milk");
        assert_eq!(meal.category, "");
    }

    #[test]
    fn test_nameless_meal_rejected() {
        assert!(meal_from_value(&json!({"strCategory": "Beef"})).is_none());
    }

    #[test]
    fn test_error_conversion() {
        let err: SourceError = MealDbError::InvalidResponse("bad".into()).into();
        assert_eq!(err, SourceError::InvalidResponse("bad".into()));

        let err: SourceError = MealDbError::ApiError("500".into()).into();
        assert!(matches!(err, SourceError::Transport(_)));
    }
}
