use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// User profile as stored in the profile store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_birth_date")]
    pub birth_date: Option<chrono::NaiveDate>,
    /// Body weight in kilograms
    #[serde(default)]
    pub weight: Option<f64>,
    /// Height in centimeters
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub fitness_level: Option<String>,
    #[serde(default)]
    pub fitness_goal: Option<String>,
    #[serde(default)]
    pub activity_level: Option<String>,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub target_muscle_groups: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub food_likes: Vec<String>,
    #[serde(default)]
    pub food_dislikes: Vec<String>,
    #[serde(default)]
    pub daily_targets: Option<DailyTotals>,
    #[serde(default)]
    pub meal_distribution: Option<MealDistribution>,
}

impl UserProfile {
    /// Age in whole years, derived from the birth date when not stored directly
    pub fn age_on(&self, today: chrono::NaiveDate) -> Option<u32> {
        self.age
            .or_else(|| self.birth_date.and_then(|born| today.years_since(born)))
    }

    pub fn has_allergies(&self) -> bool {
        self.allergies.iter().any(|a| !a.trim().is_empty())
    }

    /// Parsed fitness level, defaulting to beginner
    pub fn level(&self) -> FitnessLevel {
        self.fitness_level
            .as_deref()
            .map(FitnessLevel::parse)
            .unwrap_or_default()
    }
}

/// Accepts "YYYY-MM-DD" as well as RFC 3339 timestamps
fn deserialize_birth_date<'de, D>(deserializer: D) -> Result<Option<chrono::NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        let date_part = s.get(..10).unwrap_or(&s);
        chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
    }))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitnessLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl FitnessLevel {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "intermediate" | "medium" => FitnessLevel::Intermediate,
            "advanced" | "expert" => FitnessLevel::Advanced,
            _ => FitnessLevel::Beginner,
        }
    }
}

impl fmt::Display for FitnessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FitnessLevel::Beginner => "beginner",
            FitnessLevel::Intermediate => "intermediate",
            FitnessLevel::Advanced => "advanced",
        };
        f.write_str(label)
    }
}

/// A single ingredient line of a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    #[serde(default)]
    pub measure: String,
}

/// Nutrition facts: kilocalories for energy, grams for macros
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionFacts {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl NutritionFacts {
    pub fn is_valid(&self) -> bool {
        [self.calories, self.protein, self.carbs, self.fat]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// Meal from the recipe catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealRecord {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub nutrition: Option<NutritionFacts>,
}

/// Exercise from the external exercise catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseRecord {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub primary_muscles: Vec<String>,
    #[serde(default)]
    pub secondary_muscles: Vec<String>,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealTime {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealTime {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "breakfast" => Some(MealTime::Breakfast),
            "lunch" => Some(MealTime::Lunch),
            "dinner" | "supper" => Some(MealTime::Dinner),
            "snack" | "snacks" => Some(MealTime::Snack),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MealTime::Breakfast => "breakfast",
            MealTime::Lunch => "lunch",
            MealTime::Dinner => "dinner",
            MealTime::Snack => "snack",
        }
    }

    pub const ALL: [MealTime; 4] = [
        MealTime::Breakfast,
        MealTime::Lunch,
        MealTime::Dinner,
        MealTime::Snack,
    ];
}

impl fmt::Display for MealTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Daily calorie and macro totals for a user
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

/// Fraction of each daily axis allotted to one meal time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MealShare {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl MealShare {
    pub const fn uniform(fraction: f64) -> Self {
        Self {
            calories: fraction,
            protein: fraction,
            carbs: fraction,
            fat: fraction,
        }
    }
}

/// Meal-time distribution of daily totals
///
/// Fractions need not sum to 1: snacks overlap the discretionary allowance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MealDistribution {
    pub breakfast: MealShare,
    pub lunch: MealShare,
    pub dinner: MealShare,
    pub snack: MealShare,
}

impl MealDistribution {
    pub fn share(&self, meal_time: MealTime) -> MealShare {
        match meal_time {
            MealTime::Breakfast => self.breakfast,
            MealTime::Lunch => self.lunch,
            MealTime::Dinner => self.dinner,
            MealTime::Snack => self.snack,
        }
    }
}

impl Default for MealDistribution {
    fn default() -> Self {
        Self {
            breakfast: MealShare {
                calories: 0.25,
                protein: 0.25,
                carbs: 0.30,
                fat: 0.25,
            },
            lunch: MealShare::uniform(0.35),
            dinner: MealShare::uniform(0.35),
            snack: MealShare::uniform(0.05),
        }
    }
}

/// Per-meal calorie and macro target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionTarget {
    pub meal_time: MealTime,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllergyStatus {
    Safe,
    Unsafe,
    Unverifiable,
}

/// Outcome of an allergen safety check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllergyCheckResult {
    pub status: AllergyStatus,
    pub matched_allergens: Vec<String>,
    pub matched_ingredients: Vec<String>,
    pub explanation: String,
}

impl AllergyCheckResult {
    pub fn safe(explanation: impl Into<String>) -> Self {
        Self {
            status: AllergyStatus::Safe,
            matched_allergens: vec![],
            matched_ingredients: vec![],
            explanation: explanation.into(),
        }
    }

    pub fn unverifiable(explanation: impl Into<String>) -> Self {
        Self {
            status: AllergyStatus::Unverifiable,
            matched_allergens: vec![],
            matched_ingredients: vec![],
            explanation: explanation.into(),
        }
    }

    pub fn is_safe(&self) -> bool {
        self.status == AllergyStatus::Safe
    }

    /// True for unsafe and unverifiable results
    pub fn needs_warning(&self) -> bool {
        self.status != AllergyStatus::Safe
    }
}

/// Catalog meal accepted by the matcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedMeal {
    pub meal: MealRecord,
    pub liked: bool,
}
