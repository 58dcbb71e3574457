use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::core::sources::{IngredientSource, SourceError};
use crate::models::{AllergyCheckResult, AllergyStatus, Ingredient, MealRecord};

/// Strategy deciding when a meal name or ingredient counts as an allergen hit
pub trait AllergenMatchPolicy: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Direct check of the allergen against the meal name itself
    fn in_name(&self, meal_name: &str, allergen: &str) -> bool;

    /// Check of one recipe ingredient against one allergen
    fn in_ingredient(&self, ingredient: &str, allergen: &str) -> bool;
}

/// Case-insensitive containment in either direction
#[inline]
pub fn contains_either(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

/// Literal substring matching.
///
/// "dairy" does not textually contain "cheese" (nor the reverse), so this
/// policy under-detects allergen families. `SynonymPolicy` covers that gap.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringPolicy;

impl AllergenMatchPolicy for SubstringPolicy {
    fn name(&self) -> &'static str {
        "substring"
    }

    fn in_name(&self, meal_name: &str, allergen: &str) -> bool {
        let allergen = allergen.trim().to_lowercase();
        !allergen.is_empty() && meal_name.to_lowercase().contains(&allergen)
    }

    fn in_ingredient(&self, ingredient: &str, allergen: &str) -> bool {
        contains_either(ingredient, allergen)
    }
}

/// Substring matching after expanding each allergen through a synonym table
#[derive(Debug, Clone, Default)]
pub struct SynonymPolicy {
    synonyms: HashMap<String, Vec<String>>,
}

impl SynonymPolicy {
    pub fn new(table: HashMap<String, Vec<String>>) -> Self {
        let synonyms = table
            .into_iter()
            .map(|(allergen, words)| {
                let words = words.into_iter().map(|w| w.trim().to_lowercase()).collect();
                (allergen.trim().to_lowercase(), words)
            })
            .collect();
        Self { synonyms }
    }

    /// Table covering the common allergen families
    pub fn with_common_allergens() -> Self {
        let table = [
            ("dairy", &["milk", "cheese", "butter", "cream", "yogurt", "yoghurt", "whey", "ghee", "parmesan", "mozzarella", "cheddar"][..]),
            ("gluten", &["wheat", "flour", "bread", "pasta", "barley", "rye", "noodle", "couscous", "spaghetti"][..]),
            ("nuts", &["peanut", "almond", "walnut", "cashew", "pecan", "hazelnut", "pistachio"][..]),
            ("shellfish", &["shrimp", "prawn", "crab", "lobster", "mussel", "clam", "oyster", "scallop"][..]),
            ("fish", &["salmon", "tuna", "cod", "anchovy", "haddock", "mackerel", "sardine"][..]),
            ("egg", &["eggs", "mayonnaise", "meringue"][..]),
            ("soy", &["soya", "tofu", "edamame", "soy sauce", "miso", "tempeh"][..]),
        ]
        .into_iter()
        .map(|(allergen, words)| {
            (allergen.to_string(), words.iter().map(|w| w.to_string()).collect())
        })
        .collect();
        Self::new(table)
    }

    /// Add synonyms on top of the existing table
    pub fn merged(mut self, extra: HashMap<String, Vec<String>>) -> Self {
        for (allergen, words) in SynonymPolicy::new(extra).synonyms {
            let entry = self.synonyms.entry(allergen).or_default();
            for word in words {
                if !entry.contains(&word) {
                    entry.push(word);
                }
            }
        }
        self
    }

    fn expand<'a>(&'a self, allergen: &'a str) -> impl Iterator<Item = &'a str> {
        let extra = self
            .synonyms
            .get(&allergen.trim().to_lowercase())
            .map(|words| words.as_slice())
            .unwrap_or(&[]);
        std::iter::once(allergen).chain(extra.iter().map(String::as_str))
    }
}

impl AllergenMatchPolicy for SynonymPolicy {
    fn name(&self) -> &'static str {
        "synonyms"
    }

    fn in_name(&self, meal_name: &str, allergen: &str) -> bool {
        self.expand(allergen)
            .any(|word| SubstringPolicy.in_name(meal_name, word))
    }

    fn in_ingredient(&self, ingredient: &str, allergen: &str) -> bool {
        self.expand(allergen)
            .any(|word| contains_either(ingredient, word))
    }
}

/// Determines whether a meal is safe for a list of allergens.
///
/// Fail-closed: nothing here ever reports `Safe` without either an empty
/// allergen list or a completed ingredient comparison.
#[derive(Clone)]
pub struct AllergenChecker {
    source: Arc<dyn IngredientSource>,
    policy: Arc<dyn AllergenMatchPolicy>,
}

impl AllergenChecker {
    pub fn new(source: Arc<dyn IngredientSource>, policy: Arc<dyn AllergenMatchPolicy>) -> Self {
        Self { source, policy }
    }

    pub fn with_substring_policy(source: Arc<dyn IngredientSource>) -> Self {
        Self::new(source, Arc::new(SubstringPolicy))
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Check a meal by name, consulting the ingredient source when the name
    /// alone does not settle it
    pub async fn check_safety(&self, meal_name: &str, allergens: &[String]) -> AllergyCheckResult {
        let allergens = clean_allergens(allergens);
        if allergens.is_empty() {
            return AllergyCheckResult::safe("No allergies on file.");
        }

        if let Some(result) = self.direct_match(meal_name, &allergens) {
            return result;
        }

        self.lookup_and_check(meal_name, &allergens).await
    }

    /// Check a catalog meal, preferring its own ingredient list over a lookup
    pub async fn check_record(&self, meal: &MealRecord, allergens: &[String]) -> AllergyCheckResult {
        let allergens = clean_allergens(allergens);
        if allergens.is_empty() {
            return AllergyCheckResult::safe("No allergies on file.");
        }

        if let Some(result) = self.direct_match(&meal.name, &allergens) {
            return result;
        }

        if meal.ingredients.is_empty() {
            return self.lookup_and_check(&meal.name, &allergens).await;
        }

        self.ingredient_match(&meal.name, &meal.ingredients, &allergens)
    }

    fn direct_match(&self, meal_name: &str, allergens: &[String]) -> Option<AllergyCheckResult> {
        let hits: Vec<String> = allergens
            .iter()
            .filter(|allergen| self.policy.in_name(meal_name, allergen))
            .cloned()
            .collect();

        if hits.is_empty() {
            return None;
        }

        tracing::debug!("Direct allergen match for {}: {:?}", meal_name, hits);
        Some(AllergyCheckResult {
            status: AllergyStatus::Unsafe,
            explanation: format!(
                "{} appears to contain {}, which you are allergic to.",
                meal_name,
                hits.join(", ")
            ),
            matched_allergens: hits,
            matched_ingredients: vec![],
        })
    }

    async fn lookup_and_check(&self, meal_name: &str, allergens: &[String]) -> AllergyCheckResult {
        let listed = allergens.join(", ");

        match self.source.ingredients(meal_name).await {
            Ok(Some(ingredients)) if !ingredients.is_empty() => {
                self.ingredient_match(meal_name, &ingredients, allergens)
            }
            Ok(_) | Err(SourceError::NotFound(_)) => {
                tracing::debug!("No recipe found for {}, result is unverifiable", meal_name);
                AllergyCheckResult::unverifiable(format!(
                    "Could not find the ingredients of {}. Please check them manually for: {}.",
                    meal_name, listed
                ))
            }
            Err(SourceError::Transport(e)) => {
                tracing::warn!("Ingredient lookup for {} failed: {}", meal_name, e);
                AllergyCheckResult::unverifiable(format!(
                    "Could not look up the ingredients of {} right now. Please check them manually for: {}.",
                    meal_name, listed
                ))
            }
            Err(e) => {
                tracing::warn!("Unexpected ingredient lookup error for {}, failing closed: {}", meal_name, e);
                AllergyCheckResult {
                    status: AllergyStatus::Unsafe,
                    matched_allergens: vec![],
                    matched_ingredients: vec![],
                    explanation: format!(
                        "Could not verify {} against your allergies ({}), so it is treated as unsafe.",
                        meal_name, listed
                    ),
                }
            }
        }
    }

    fn ingredient_match(
        &self,
        meal_name: &str,
        ingredients: &[Ingredient],
        allergens: &[String],
    ) -> AllergyCheckResult {
        // One hit per allergen: the first ingredient that triggers it
        let hits: Vec<(&String, &Ingredient)> = allergens
            .iter()
            .filter_map(|allergen| {
                ingredients
                    .iter()
                    .find(|ingredient| self.policy.in_ingredient(&ingredient.name, allergen))
                    .map(|ingredient| (allergen, ingredient))
            })
            .collect();

        if hits.is_empty() {
            return AllergyCheckResult::safe(format!(
                "None of the {} ingredients in {} match your allergies ({}).",
                ingredients.len(),
                meal_name,
                allergens.join(", ")
            ));
        }

        let mut matched_ingredients: Vec<String> = Vec::with_capacity(hits.len());
        for (_, ingredient) in &hits {
            if !matched_ingredients.contains(&ingredient.name) {
                matched_ingredients.push(ingredient.name.clone());
            }
        }

        let details = hits
            .iter()
            .map(|(allergen, ingredient)| format!("{} ({})", ingredient.name, allergen))
            .collect::<Vec<_>>()
            .join(", ");

        AllergyCheckResult {
            status: AllergyStatus::Unsafe,
            matched_allergens: hits.iter().map(|(allergen, _)| (*allergen).clone()).collect(),
            matched_ingredients,
            explanation: format!("{} contains ingredients you are allergic to: {}.", meal_name, details),
        }
    }
}

impl fmt::Debug for AllergenChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllergenChecker")
            .field("policy", &self.policy.name())
            .finish()
    }
}

/// Trims, drops empties and removes case-insensitive duplicates
fn clean_allergens(allergens: &[String]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(allergens.len());
    for allergen in allergens {
        let trimmed = allergen.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !cleaned.iter().any(|a| a.eq_ignore_ascii_case(trimmed)) {
            cleaned.push(trimmed.to_string());
        }
    }
    cleaned
}
