use crate::core::allergen::contains_either;
use crate::models::{MealRecord, NutritionTarget};

/// Check that every nutrition axis of a meal sits inside the tolerance band
///
/// This is Stage 1 of the meal matching pipeline. All four bounds must hold;
/// a meal without nutrition facts never qualifies.
#[inline]
pub fn within_tolerance(meal: &MealRecord, target: &NutritionTarget, tolerance: f64) -> bool {
    let Some(facts) = meal.nutrition else {
        return false;
    };

    let in_band = |value: f64, goal: f64| {
        value >= goal * (1.0 - tolerance) && value <= goal * (1.0 + tolerance)
    };

    in_band(facts.calories, target.calories)
        && in_band(facts.protein, target.protein)
        && in_band(facts.carbs, target.carbs)
        && in_band(facts.fat, target.fat)
}

/// Check whether a meal name matches any food token in either direction
///
/// Used for both dislikes (Stage 2) and likes (Stage 4).
#[inline]
pub fn matches_any_token(meal_name: &str, tokens: &[String]) -> bool {
    tokens.iter().any(|token| contains_either(meal_name, token))
}
