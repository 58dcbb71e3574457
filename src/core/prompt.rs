use crate::core::intent::{ExerciseTarget, Intent};
use crate::core::planner::WorkoutPlan;
use crate::models::{
    AllergyCheckResult, AllergyStatus, ExerciseRecord, MatchedMeal, MealRecord, MealTime,
    NutritionTarget, UserProfile,
};

const ASSISTANT_ROLE: &str = "You are a friendly, practical nutrition and fitness assistant. \
Keep answers concise and grounded in the data provided below.";

/// Longest exercise description embedded in a prompt
const MAX_DESCRIPTION_CHARS: usize = 240;

/// Everything a prompt may draw on for one request
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    pub message: &'a str,
    pub intent: &'a Intent,
    pub today: chrono::NaiveDate,
    pub profile: Option<&'a UserProfile>,
    pub allergy: Option<&'a AllergyCheckResult>,
    pub target: Option<&'a NutritionTarget>,
    pub matches: &'a [MatchedMeal],
    pub nutrition: Option<&'a MealRecord>,
    pub exercises: &'a [ExerciseRecord],
    pub plan: Option<&'a WorkoutPlan>,
}

impl<'a> PromptContext<'a> {
    pub fn new(message: &'a str, intent: &'a Intent, today: chrono::NaiveDate) -> Self {
        Self {
            message,
            intent,
            today,
            profile: None,
            allergy: None,
            target: None,
            matches: &[],
            nutrition: None,
            exercises: &[],
            plan: None,
        }
    }
}

/// Prompt text plus the literal the reply must open with, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    pub text: String,
    pub required_prefix: Option<String>,
}

/// The fixed opening of a reply about an unsafe meal
pub fn unsafe_meal_prefix(meal_name: &str) -> String {
    format!("NO, you should not eat {}.", meal_name)
}

/// Builds the instruction block for the generation backend.
///
/// Every figure is embedded literally; the backend is told to quote, never
/// recompute, them.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptComposer;

impl PromptComposer {
    pub fn new() -> Self {
        Self
    }

    pub fn compose(&self, ctx: &PromptContext<'_>) -> ComposedPrompt {
        let mut sections = vec![ASSISTANT_ROLE.to_string()];
        let mut required_prefix = None;

        if let Some(profile) = ctx.profile {
            sections.push(user_info_block(profile, ctx.today));
        }

        if let Some(allergy) = ctx.allergy.filter(|a| a.needs_warning()) {
            sections.push(allergy_warning_block(allergy));
        }

        match ctx.intent {
            Intent::Greeting => sections.push(greeting_section(ctx.profile)),
            Intent::MealSafety { meal_name } => {
                let (section, prefix) = meal_safety_section(meal_name, ctx.allergy);
                sections.push(section);
                required_prefix = prefix;
            }
            Intent::MealSuggestion { meal_time } => {
                sections.push(meal_suggestion_section(*meal_time, ctx));
                if let Some(notes) = preference_notes(ctx.profile, ctx.matches) {
                    sections.push(notes);
                }
            }
            Intent::NutritionLookup { meal_name } => {
                sections.push(nutrition_section(meal_name, ctx.nutrition));
            }
            Intent::ExerciseQuery { target } => {
                sections.push(exercise_section(target, ctx.exercises, ctx.profile));
            }
            Intent::WorkoutRequest => sections.push(workout_section(ctx.plan)),
            Intent::GeneralQuery => sections.push(
                "Answer the user's question helpfully. If it is unrelated to food, \
nutrition, health or fitness, answer briefly and offer help with those topics."
                    .to_string(),
            ),
        }

        if !matches!(ctx.intent, Intent::Greeting) {
            sections.push(format!("User message: \"{}\"", ctx.message.trim()));
        }

        ComposedPrompt {
            text: sections.join("\n\n"),
            required_prefix,
        }
    }
}

fn join_or(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.join(", ")
    }
}

fn user_info_block(profile: &UserProfile, today: chrono::NaiveDate) -> String {
    let mut lines = vec!["USER PROFILE:".to_string()];

    if !profile.name.is_empty() {
        lines.push(format!("- Name: {}", profile.name));
    }
    if let Some(age) = profile.age_on(today) {
        lines.push(format!("- Age: {}", age));
    }
    if let Some(gender) = &profile.gender {
        lines.push(format!("- Gender: {}", gender));
    }
    if let Some(weight) = profile.weight {
        lines.push(format!("- Weight: {} kg", weight));
    }
    if let Some(height) = profile.height {
        lines.push(format!("- Height: {} cm", height));
    }
    lines.push(format!("- Fitness level: {}", profile.level()));
    if let Some(goal) = &profile.fitness_goal {
        lines.push(format!("- Goal: {}", goal));
    }
    if let Some(activity) = &profile.activity_level {
        lines.push(format!("- Activity level: {}", activity));
    }
    lines.push(format!("- Equipment: {}", join_or(&profile.equipment, "none")));
    lines.push(format!("- Allergies: {}", join_or(&profile.allergies, "none")));
    lines.push(format!("- Likes: {}", join_or(&profile.food_likes, "not specified")));
    lines.push(format!("- Dislikes: {}", join_or(&profile.food_dislikes, "not specified")));

    lines.join("\n")
}

fn allergy_warning_block(allergy: &AllergyCheckResult) -> String {
    let mut lines = vec![match allergy.status {
        AllergyStatus::Unsafe => "ALLERGY WARNING: this food is NOT safe for the user.".to_string(),
        _ => "ALLERGY WARNING: the ingredients could not be verified against the user's allergies."
            .to_string(),
    }];

    if !allergy.matched_allergens.is_empty() {
        lines.push(format!("- Matched allergens: {}", allergy.matched_allergens.join(", ")));
    }
    if !allergy.matched_ingredients.is_empty() {
        lines.push(format!("- Problem ingredients: {}", allergy.matched_ingredients.join(", ")));
    }
    lines.push(format!("- Details: {}", allergy.explanation));
    lines.push("Always mention this warning in your answer.".to_string());

    lines.join("\n")
}

fn greeting_section(profile: Option<&UserProfile>) -> String {
    let addressee = profile
        .map(|p| p.name.trim())
        .filter(|name| !name.is_empty())
        .map(|name| format!(" Address the user as {}.", name))
        .unwrap_or_default();

    format!(
        "The user just greeted you. Reply with a short, warm greeting.{} \
Mention in one sentence that you can suggest meals, look up nutrition facts, \
check foods against allergies and plan workouts.",
        addressee
    )
}

fn meal_safety_section(meal_name: &str, allergy: Option<&AllergyCheckResult>) -> (String, Option<String>) {
    match allergy.map(|a| a.status) {
        Some(AllergyStatus::Unsafe) => {
            let prefix = unsafe_meal_prefix(meal_name);
            let section = format!(
                "SAFETY CHECK RESULT: {meal} is NOT safe for this user.\n\
Your response MUST begin with exactly: \"{prefix}\"\n\
Then name the allergens involved and suggest one or two safe alternatives. \
Never soften or contradict this verdict.",
                meal = meal_name,
                prefix = prefix
            );
            (section, Some(prefix))
        }
        Some(AllergyStatus::Safe) => (
            format!(
                "SAFETY CHECK RESULT: none of the user's allergens were found in {}. \
Tell the user it appears safe based on the known ingredients, and remind them \
to check labels because recipes vary.",
                meal_name
            ),
            None,
        ),
        _ => (
            format!(
                "SAFETY CHECK RESULT: {} could not be verified. Do not say it is safe. \
Tell the user to check the ingredient list manually for their allergens before eating it.",
                meal_name
            ),
            None,
        ),
    }
}

fn format_target(target: &NutritionTarget) -> String {
    format!(
        "{} kcal, {} g protein, {} g carbs, {} g fat",
        target.calories, target.protein, target.carbs, target.fat
    )
}

fn format_meal_line(index: usize, matched: &MatchedMeal) -> String {
    let meal = &matched.meal;
    let facts = meal
        .nutrition
        .map(|n| {
            format!(
                "{} kcal, {} g protein, {} g carbs, {} g fat",
                n.calories, n.protein, n.carbs, n.fat
            )
        })
        .unwrap_or_else(|| "nutrition unknown".to_string());
    let liked = if matched.liked { " [liked]" } else { "" };
    format!("{}. {} ({}) - {}{}", index + 1, meal.name, meal.category, facts, liked)
}

fn meal_suggestion_section(meal_time: MealTime, ctx: &PromptContext<'_>) -> String {
    let mut lines = Vec::new();

    match ctx.target {
        Some(target) => lines.push(format!("TARGET FOR {}: {}", meal_time.as_str().to_uppercase(), format_target(target))),
        None => lines.push(format!(
            "No calorie target is known for this user's {}. Suggest a balanced option and say \
that adding weight, height and age to their profile enables personalised targets.",
            meal_time
        )),
    }

    if ctx.matches.is_empty() {
        if ctx.target.is_some() {
            lines.push(format!(
                "No catalog meal fits this target safely. Suggest one simple {} idea close to the \
target and label its figures as estimates.",
                meal_time
            ));
        }
    } else {
        lines.push("MATCHING MEALS:".to_string());
        lines.extend(ctx.matches.iter().enumerate().map(|(i, m)| format_meal_line(i, m)));
        lines.push(
            "Recommend only meals from this list. Quote their nutrition figures exactly as \
written; do not recalculate them."
                .to_string(),
        );
    }

    lines.join("\n")
}

fn preference_notes(profile: Option<&UserProfile>, matches: &[MatchedMeal]) -> Option<String> {
    let mut notes = Vec::new();

    if matches.iter().any(|m| m.liked) {
        notes.push("- Meals marked [liked] contain foods the user enjoys; lead with them.".to_string());
    }
    if let Some(profile) = profile.filter(|p| !p.food_dislikes.is_empty()) {
        notes.push(format!(
            "- The user dislikes: {}. Never suggest these.",
            profile.food_dislikes.join(", ")
        ));
    }

    (!notes.is_empty()).then(|| format!("PREFERENCE NOTES:\n{}", notes.join("\n")))
}

fn nutrition_section(meal_name: &str, record: Option<&MealRecord>) -> String {
    let Some(meal) = record else {
        return format!(
            "\"{}\" is not in the nutrition catalog. Say that exact figures are unavailable, then \
give a rough estimate clearly labelled as an estimate.",
            meal_name
        );
    };

    let mut lines = vec![format!("NUTRITION FACTS FOR {} ({}):", meal.name, meal.category)];
    match meal.nutrition {
        Some(n) => {
            lines.push(format!("- Calories: {} kcal", n.calories));
            lines.push(format!("- Protein: {} g", n.protein));
            lines.push(format!("- Carbs: {} g", n.carbs));
            lines.push(format!("- Fat: {} g", n.fat));
        }
        None => lines.push("- Nutrition figures are not recorded for this meal.".to_string()),
    }
    if !meal.ingredients.is_empty() {
        let ingredients: Vec<String> = meal.ingredients.iter().map(|i| i.name.clone()).collect();
        lines.push(format!("- Ingredients: {}", ingredients.join(", ")));
    }
    lines.push("Report these figures exactly as written; do not recalculate them.".to_string());

    lines.join("\n")
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}

fn format_exercise(exercise: &ExerciseRecord) -> String {
    let mut line = format!("- {}", exercise.name);
    if !exercise.category.is_empty() {
        line.push_str(&format!(" [{}]", exercise.category));
    }
    if !exercise.equipment.is_empty() {
        line.push_str(&format!(" (equipment: {})", exercise.equipment.join(", ")));
    }
    if !exercise.description.is_empty() {
        line.push_str(&format!(": {}", truncate_chars(&exercise.description, MAX_DESCRIPTION_CHARS)));
    }
    line
}

fn exercise_section(target: &ExerciseTarget, exercises: &[ExerciseRecord], profile: Option<&UserProfile>) -> String {
    let mut lines = vec![match target {
        ExerciseTarget::Muscle(group) => format!("The user wants exercises for their {}.", group),
        ExerciseTarget::Named(name) => format!("The user wants to know how to perform: {}.", name),
    }];

    if exercises.is_empty() {
        lines.push(
            "No exercise catalog data is available. Answer from general knowledge and include \
key form and safety cues."
                .to_string(),
        );
    } else {
        lines.push("EXERCISES FROM THE CATALOG:".to_string());
        lines.extend(exercises.iter().map(format_exercise));
        lines.push("Base your answer on these exercises and include key form cues.".to_string());
    }

    if let Some(profile) = profile {
        lines.push(format!(
            "Tailor the advice to a {} trainee with this equipment: {}.",
            profile.level(),
            join_or(&profile.equipment, "bodyweight only")
        ));
    }

    lines.join("\n")
}

fn workout_section(plan: Option<&WorkoutPlan>) -> String {
    let Some(plan) = plan else {
        return "Build a balanced full-body beginner workout routine.".to_string();
    };

    let mut lines = vec![
        format!("WORKOUT PLAN ({} level):", plan.fitness_level),
        format!(
            "- Every exercise: {} sets of {} reps, {} s rest between sets",
            plan.sets, plan.reps, plan.rest_seconds
        ),
    ];
    for group in &plan.groups {
        let names: Vec<&str> = group.exercises.iter().map(|e| e.name.as_str()).collect();
        lines.push(format!("- {}: {}", group.muscle_group, names.join(", ")));
    }
    lines.push(
        "Present this plan as a weekly routine. Use exactly these exercises and set/rep numbers."
            .to_string(),
    );

    lines.join("\n")
}
