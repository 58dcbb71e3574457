use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::models::{MealTime, UserProfile};

/// Payload-free intent tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntentKind {
    Greeting,
    MealSafety,
    MealSuggestion,
    NutritionLookup,
    ExerciseQuery,
    WorkoutRequest,
    GeneralQuery,
}

/// What an exercise question is about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExerciseTarget {
    /// Canonical muscle group name, e.g. "chest"
    Muscle(String),
    /// Free-text exercise name, e.g. "deadlift"
    Named(String),
}

/// Classified purpose of an inbound message with its extracted entities
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    MealSafety { meal_name: String },
    MealSuggestion { meal_time: MealTime },
    NutritionLookup { meal_name: String },
    ExerciseQuery { target: ExerciseTarget },
    WorkoutRequest,
    GeneralQuery,
}

impl Intent {
    pub fn kind(&self) -> IntentKind {
        match self {
            Intent::Greeting => IntentKind::Greeting,
            Intent::MealSafety { .. } => IntentKind::MealSafety,
            Intent::MealSuggestion { .. } => IntentKind::MealSuggestion,
            Intent::NutritionLookup { .. } => IntentKind::NutritionLookup,
            Intent::ExerciseQuery { .. } => IntentKind::ExerciseQuery,
            Intent::WorkoutRequest => IntentKind::WorkoutRequest,
            Intent::GeneralQuery => IntentKind::GeneralQuery,
        }
    }
}

/// Facts about the caller that gate some rules
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifyContext {
    pub has_profile: bool,
    pub has_allergies: bool,
}

impl ClassifyContext {
    pub fn for_profile(profile: Option<&UserProfile>) -> Self {
        Self {
            has_profile: profile.is_some(),
            has_allergies: profile.map(UserProfile::has_allergies).unwrap_or(false),
        }
    }
}

/// One row of the ordered rule table
struct IntentRule {
    kind: IntentKind,
    applies: fn(&ClassifyContext) -> bool,
    patterns: Vec<Regex>,
    extract: fn(&Captures<'_>) -> Option<Intent>,
}

const TAIL: &str = r"[\s!?.,]*$";
const MEAL_TIME: &str = r"(?P<time>breakfast|lunch|dinner|supper|snacks?)";
const MUSCLE: &str = r"(?P<muscle>chest|pecs|back|lats|shoulders?|delts|arms?|biceps|triceps|legs?|quads|quadriceps|hamstrings|glutes|calves|abs|core|obliques)";

const GREETING_PATTERNS: &[&str] = &[
    r"^(?:hi|hello|hey|hiya|howdy|yo|greetings|good\s+(?:morning|afternoon|evening))(?:\s+there)?(?:[\s,]+(?:coach|buddy|friend))?{TAIL}",
];

const MEAL_SAFETY_PATTERNS: &[&str] = &[
    r"^is\s+it\s+safe\s+(?:for\s+me\s+)?to\s+eat\s+(?P<meal>.+?){TAIL}",
    r"^(?:can|may|could)\s+i\s+(?:safely\s+)?(?:eat|have|try)\s+(?P<meal>.+?){TAIL}",
    r"^(?:is|are)\s+(?P<meal>.+?)\s+(?:safe|ok|okay|alright)(?:\s+for\s+me)?(?:\s+to\s+eat)?{TAIL}",
    r"^(?:am\s+i|would\s+i\s+be)\s+allergic\s+to\s+(?P<meal>.+?){TAIL}",
    r"^does\s+(?P<meal>.+?)\s+(?:contain|have)\s+.+$",
    r"^should\s+i\s+(?:avoid|eat)\s+(?P<meal>.+?){TAIL}",
];

const MEAL_SUGGESTION_PATTERNS: &[&str] = &[
    r"\bwhat\s+(?:should|can|could|do\s+you\s+think)\s+i\s+(?:eat|have|make|cook)\s+for\s+(?:a\s+)?{MEAL_TIME}\b",
    r"\b(?:suggest|recommend)\s+(?:me\s+)?(?:a\s+|an\s+|some\s+)?(?:good\s+|healthy\s+)?{MEAL_TIME}\b",
    r"\b{MEAL_TIME}\s+(?:recommendations?|suggestions?|ideas?|options?)\b",
    r"\bwhat(?:'s|\s+is)\s+(?:a\s+)?(?:good|healthy)\s+{MEAL_TIME}\b",
    r"\bideas?\s+for\s+(?:a\s+)?{MEAL_TIME}\b",
];

const NUTRITION_LOOKUP_PATTERNS: &[&str] = &[
    r"^how\s+many\s+(?:calories|kcals?|carbs|grams\s+of\s+\w+)\s+(?:are\s+)?(?:in|does)\s+(?P<meal>.+?)(?:\s+(?:have|contain))?{TAIL}",
    r"^how\s+much\s+(?:protein|fat|carbs?|sugar|energy)\s+(?:is\s+|does\s+)?(?:in\s+)?(?P<meal>.+?)(?:\s+(?:have|contain))?{TAIL}",
    r"^(?:what(?:'s|\s+is|\s+are)\s+the\s+)?(?:nutrition(?:al)?(?:\s+(?:info|information|facts|values?))?|macros|calories)\s+(?:of|in|for)\s+(?P<meal>.+?){TAIL}",
    r"^(?:show|give|tell)\s+me\s+(?:the\s+)?(?:nutrition(?:al)?(?:\s+(?:info|information|facts))?|macros|calories)\s+(?:of|in|for)\s+(?P<meal>.+?){TAIL}",
    r"^(?:is|are)\s+(?P<meal>.+?)\s+(?:healthy|nutritious|fattening|high\s+in\s+\w+|low\s+in\s+\w+|ok|okay)(?:\s+for\s+me)?{TAIL}",
];

const EXERCISE_QUERY_PATTERNS: &[&str] = &[
    r"\b(?:exercises?|moves|workouts?)\s+(?:for|to\s+(?:train|build|strengthen|work|target|tone))\s+(?:my\s+|the\s+)?{MUSCLE}\b",
    r"\b(?:train|work\s+out|strengthen|build|target|tone)\s+(?:my\s+|the\s+)?{MUSCLE}\b",
    r"\b{MUSCLE}\s+(?:exercises?|workouts?|day)\b",
    r"^how\s+(?:do\s+i|to|should\s+i|can\s+i)\s+(?:do|perform|execute)\s+(?P<exercise>.+?)(?:\s+(?:correctly|properly|right))?{TAIL}",
    r"\b(?:proper\s+|correct\s+|good\s+)?form\s+(?:for|on)\s+(?P<exercise>.+?){TAIL}",
    r"^(?:explain|describe)\s+(?P<exercise>.+?)\s+exercise{TAIL}",
];

const WORKOUT_REQUEST_PATTERNS: &[&str] = &[
    r"\b(?:workout|training|exercise|fitness|gym)\s+(?:plan|routine|program(?:me)?|schedule|split)\b",
    r"\b(?:give|create|make|build|design|suggest|recommend)\s+(?:me\s+)?(?:a\s+|an\s+|some\s+)?(?:new\s+|good\s+|full[\s-]body\s+)?(?:workout|routine|training)\b",
    r"\bwhat\s+(?:workout|exercises?|training)\s+should\s+i\s+do\b",
    r"\b(?:i\s+want|help\s+me)\s+to\s+(?:work\s*out|exercise|train)\b",
];

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| {
            let expanded = p
                .replace("{TAIL}", TAIL)
                .replace("{MEAL_TIME}", MEAL_TIME)
                .replace("{MUSCLE}", MUSCLE);
            Regex::new(&format!("(?i){}", expanded)).expect("valid intent pattern")
        })
        .collect()
}

static RULES: LazyLock<Vec<IntentRule>> = LazyLock::new(|| {
    vec![
        IntentRule {
            kind: IntentKind::Greeting,
            applies: |_| true,
            patterns: compile(GREETING_PATTERNS),
            extract: |_| Some(Intent::Greeting),
        },
        IntentRule {
            kind: IntentKind::MealSafety,
            applies: |ctx| ctx.has_allergies,
            patterns: compile(MEAL_SAFETY_PATTERNS),
            extract: |caps| entity(caps, "meal").map(|meal_name| Intent::MealSafety { meal_name }),
        },
        IntentRule {
            kind: IntentKind::MealSuggestion,
            applies: |ctx| ctx.has_profile,
            patterns: compile(MEAL_SUGGESTION_PATTERNS),
            extract: |caps| {
                caps.name("time")
                    .and_then(|m| MealTime::parse(m.as_str()))
                    .map(|meal_time| Intent::MealSuggestion { meal_time })
            },
        },
        IntentRule {
            kind: IntentKind::NutritionLookup,
            applies: |_| true,
            patterns: compile(NUTRITION_LOOKUP_PATTERNS),
            extract: |caps| {
                entity(caps, "meal").map(|meal_name| Intent::NutritionLookup { meal_name })
            },
        },
        IntentRule {
            kind: IntentKind::ExerciseQuery,
            applies: |_| true,
            patterns: compile(EXERCISE_QUERY_PATTERNS),
            extract: |caps| {
                let target = if let Some(m) = caps.name("muscle") {
                    ExerciseTarget::Muscle(canonical_muscle_group(m.as_str()))
                } else {
                    ExerciseTarget::Named(entity(caps, "exercise")?)
                };
                Some(Intent::ExerciseQuery { target })
            },
        },
        IntentRule {
            kind: IntentKind::WorkoutRequest,
            applies: |_| true,
            patterns: compile(WORKOUT_REQUEST_PATTERNS),
            extract: |_| Some(Intent::WorkoutRequest),
        },
    ]
});

/// Reads a named capture and strips leading articles and stray punctuation
fn entity(caps: &Captures<'_>, name: &str) -> Option<String> {
    let mut value = caps.name(name)?.as_str().trim();
    loop {
        let lower = value.to_lowercase();
        let stripped = ["a ", "an ", "the ", "some ", "my "]
            .iter()
            .find(|article| lower.starts_with(*article))
            .map(|article| value[article.len()..].trim_start());
        match stripped {
            Some(rest) => value = rest,
            None => break,
        }
    }
    let value = value.trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace());
    (!value.is_empty()).then(|| value.to_string())
}

/// Maps muscle words and their synonyms onto the canonical group names
pub fn canonical_muscle_group(word: &str) -> String {
    let lower = word.trim().to_lowercase();
    let canonical = match lower.as_str() {
        "pecs" => "chest",
        "lats" => "back",
        "shoulder" | "delts" => "shoulders",
        "arm" => "arms",
        "leg" => "legs",
        "quadriceps" => "quads",
        "abs" => "core",
        other => other,
    };
    canonical.to_string()
}

fn normalize(message: &str) -> String {
    message.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Deterministic first-match-wins intent classifier over a static rule table
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Rule evaluation order; `GeneralQuery` is the implicit catch-all
    pub fn priority() -> Vec<IntentKind> {
        RULES
            .iter()
            .map(|rule| rule.kind)
            .chain(std::iter::once(IntentKind::GeneralQuery))
            .collect()
    }

    pub fn classify(&self, message: &str, ctx: &ClassifyContext) -> Intent {
        let text = normalize(message);

        for rule in RULES.iter().filter(|rule| (rule.applies)(ctx)) {
            for pattern in &rule.patterns {
                if let Some(intent) = pattern.captures(&text).and_then(|caps| (rule.extract)(&caps)) {
                    tracing::debug!("Classified message as {:?}", rule.kind);
                    return intent;
                }
            }
        }

        tracing::debug!("No intent rule matched, falling back to general query");
        Intent::GeneralQuery
    }
}
