use futures_util::stream::{self, StreamExt};

use crate::core::{
    allergen::AllergenChecker,
    filters::{matches_any_token, within_tolerance},
};
use crate::models::{MatchedMeal, MealRecord, NutritionTarget};

/// Default fractional deviation allowed on each nutrition axis
pub const DEFAULT_TOLERANCE: f64 = 0.15;

/// Default number of allergen checks (and recipe lookups) in flight at once
pub const DEFAULT_CHECK_CONCURRENCY: usize = 4;

/// Food preferences and restrictions applied while matching
#[derive(Debug, Clone, Copy)]
pub struct MealFilters<'a> {
    pub likes: &'a [String],
    pub dislikes: &'a [String],
    pub allergens: &'a [String],
}

/// Meal matching orchestrator - implements the multi-stage filtering pipeline
///
/// # Pipeline Stages
/// 1. Nutrition tolerance band (all four axes)
/// 2. Disliked-food exclusion
/// 3. Allergen check, only explicitly safe meals survive
/// 4. Liked-food flagging
/// 5. Stable ordering, liked meals first
#[derive(Debug, Clone, Copy)]
pub struct MealMatcher {
    tolerance: f64,
    check_concurrency: usize,
}

impl MealMatcher {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance: tolerance.max(0.0),
            check_concurrency: DEFAULT_CHECK_CONCURRENCY,
        }
    }

    /// Cap the number of allergen checks running at once (minimum 1)
    pub fn with_check_concurrency(mut self, limit: usize) -> Self {
        self.check_concurrency = limit.max(1);
        self
    }

    pub fn with_default_tolerance() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn check_concurrency(&self) -> usize {
        self.check_concurrency
    }

    /// Find catalog meals fitting a nutrition target
    ///
    /// The result is unbounded; callers truncate to their own top-N.
    pub async fn find_matches(
        &self,
        catalog: &[MealRecord],
        target: &NutritionTarget,
        filters: MealFilters<'_>,
        checker: &AllergenChecker,
    ) -> Vec<MatchedMeal> {
        // Stage 1 & 2: cheap filters before any allergen work
        let candidates: Vec<&MealRecord> = catalog
            .iter()
            .filter(|meal| within_tolerance(meal, target, self.tolerance))
            .filter(|meal| !matches_any_token(&meal.name, filters.dislikes))
            .collect();

        tracing::debug!(
            "{} of {} catalog meals within {:.0}% of the {} target",
            candidates.len(),
            catalog.len(),
            self.tolerance * 100.0,
            target.meal_time
        );

        // Stage 3: bounded concurrent allergen checks; buffered keeps catalog order
        let checks: Vec<_> = stream::iter(
            candidates
                .iter()
                .map(|meal| checker.check_record(meal, filters.allergens)),
        )
        .buffered(self.check_concurrency)
        .collect()
        .await;

        // Stage 4: liked flag
        let mut matches: Vec<MatchedMeal> = candidates
            .into_iter()
            .zip(checks)
            .filter_map(|(meal, check)| {
                if !check.is_safe() {
                    tracing::debug!("Excluding {}: {}", meal.name, check.explanation);
                    return None;
                }
                Some(MatchedMeal {
                    liked: matches_any_token(&meal.name, filters.likes),
                    meal: meal.clone(),
                })
            })
            .collect();

        // Stage 5: sort_by_key is stable, so catalog order holds within each group
        matches.sort_by_key(|m| !m.liked);

        matches
    }
}

impl Default for MealMatcher {
    fn default() -> Self {
        Self::with_default_tolerance()
    }
}
