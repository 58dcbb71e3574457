use crate::models::{DailyTotals, MealDistribution, MealTime, NutritionTarget, UserProfile};

/// Calories per gram of protein/carbs and of fat
const KCAL_PER_GRAM_PROTEIN: f64 = 4.0;
const KCAL_PER_GRAM_CARBS: f64 = 4.0;
const KCAL_PER_GRAM_FAT: f64 = 9.0;

const MIN_DAILY_CALORIES: f64 = 1200.0;

/// Derive the calorie and macro target for one meal time.
///
/// The per-user distribution replaces the default table when present.
/// Results are rounded to whole units.
pub fn meal_targets(
    daily: &DailyTotals,
    meal_time: MealTime,
    distribution: Option<&MealDistribution>,
) -> NutritionTarget {
    let share = distribution
        .copied()
        .unwrap_or_default()
        .share(meal_time);

    NutritionTarget {
        meal_time,
        calories: (daily.calories * share.calories).round(),
        protein: (daily.protein * share.protein).round(),
        carbs: (daily.carbs * share.carbs).round(),
        fat: (daily.fat * share.fat).round(),
    }
}

/// Targets for every meal time, in breakfast/lunch/dinner/snack order
pub fn all_meal_targets(
    daily: &DailyTotals,
    distribution: Option<&MealDistribution>,
) -> Vec<NutritionTarget> {
    MealTime::ALL
        .iter()
        .map(|meal_time| meal_targets(daily, *meal_time, distribution))
        .collect()
}

/// Daily totals for a user: stored targets win, otherwise estimated.
///
/// Estimation uses the Mifflin-St Jeor BMR scaled by activity level and
/// adjusted for the fitness goal, split 30% protein / 40% carbs / 30% fat.
/// Returns `None` when weight, height or age is unknown.
pub fn estimate_daily_totals(profile: &UserProfile, today: chrono::NaiveDate) -> Option<DailyTotals> {
    if let Some(stored) = profile.daily_targets {
        return Some(stored);
    }

    let weight = profile.weight.filter(|w| *w > 0.0)?;
    let height = profile.height.filter(|h| *h > 0.0)?;
    let age = profile.age_on(today)? as f64;

    let base = 10.0 * weight + 6.25 * height - 5.0 * age;
    let bmr = match profile.gender.as_deref().map(str::to_lowercase).as_deref() {
        Some("male") | Some("m") => base + 5.0,
        Some("female") | Some("f") => base - 161.0,
        _ => base - 78.0,
    };

    let tdee = bmr * activity_factor(profile.activity_level.as_deref());
    let calories = adjust_for_goal(tdee, profile.fitness_goal.as_deref()).round();

    Some(DailyTotals {
        calories,
        protein: (calories * 0.30 / KCAL_PER_GRAM_PROTEIN).round(),
        carbs: (calories * 0.40 / KCAL_PER_GRAM_CARBS).round(),
        fat: (calories * 0.30 / KCAL_PER_GRAM_FAT).round(),
    })
}

fn activity_factor(level: Option<&str>) -> f64 {
    let level = level.unwrap_or_default().trim().to_lowercase().replace(['_', '-'], " ");
    match level.as_str() {
        "sedentary" => 1.2,
        "moderate" | "moderately active" => 1.55,
        "active" => 1.725,
        "very active" | "extra active" => 1.9,
        // "light", "lightly active" and unknown values
        _ => 1.375,
    }
}

fn adjust_for_goal(tdee: f64, goal: Option<&str>) -> f64 {
    let goal = goal.unwrap_or_default().to_lowercase();
    if goal.contains("lose") || goal.contains("loss") || goal.contains("cut") {
        (tdee - 500.0).max(MIN_DAILY_CALORIES)
    } else if goal.contains("gain") || goal.contains("muscle") || goal.contains("bulk") {
        tdee + 300.0
    } else {
        tdee
    }
}
