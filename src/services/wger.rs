use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

use crate::core::planner::exercises_per_group;
use crate::core::sources::{ExerciseSource, MuscleQuery, SourceError};
use crate::models::ExerciseRecord;

/// Numeric language id of English in wger
const ENGLISH: u64 = 2;

/// Results requested per muscle query, relative to what the plan keeps
const OVERFETCH: usize = 4;

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Errors that can occur when querying wger
#[derive(Debug, Error)]
pub enum WgerError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl From<WgerError> for SourceError {
    fn from(err: WgerError) -> Self {
        match err {
            WgerError::InvalidResponse(msg) => SourceError::InvalidResponse(msg),
            other => SourceError::Transport(other.to_string()),
        }
    }
}

/// wger muscle ids for a canonical muscle group
pub fn muscle_ids(group: &str) -> &'static [u32] {
    match group {
        "chest" => &[4],
        "back" => &[12, 9],
        "lats" => &[12],
        "shoulders" => &[2],
        "biceps" => &[1],
        "triceps" => &[5],
        "arms" => &[1, 5],
        "core" => &[6, 14],
        "quads" => &[10],
        "hamstrings" => &[11],
        "glutes" => &[8],
        "calves" => &[7],
        "legs" => &[10, 11, 8, 7],
        _ => &[],
    }
}

/// wger equipment ids for a profile's equipment list.
///
/// Bodyweight is always allowed once any equipment is named.
pub fn equipment_ids(equipment: &[String]) -> Vec<u32> {
    let mut ids: Vec<u32> = equipment
        .iter()
        .filter_map(|item| {
            let item = item.trim().to_lowercase();
            let id = match item.as_str() {
                "barbell" => 1,
                "sz-bar" | "ez bar" | "ez-bar" => 2,
                "dumbbell" | "dumbbells" => 3,
                "mat" | "gym mat" | "yoga mat" => 4,
                "swiss ball" | "exercise ball" => 5,
                "pull-up bar" | "pullup bar" => 6,
                "none" | "bodyweight" | "body weight" => 7,
                "bench" => 8,
                "incline bench" => 9,
                "kettlebell" | "kettlebells" => 10,
                "resistance band" | "band" | "bands" => 11,
                _ => return None,
            };
            Some(id)
        })
        .collect();

    if !ids.is_empty() {
        ids.push(7);
    }
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Remove markup and collapse whitespace
pub fn strip_html(text: &str) -> String {
    let plain = HTML_TAG.replace_all(text, " ");
    WHITESPACE.replace_all(plain.trim(), " ").into_owned()
}

fn join_ids(ids: &[u32]) -> String {
    ids.iter().map(u32::to_string).collect::<Vec<_>>().join(",")
}

fn names(items: Option<&Value>) -> Vec<String> {
    items
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    item.get("name_en")
                        .and_then(Value::as_str)
                        .filter(|s| !s.is_empty())
                        .or_else(|| item.get("name").and_then(Value::as_str))
                        .map(str::to_string)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Convert one `exerciseinfo` record.
///
/// Newer wger versions keep names in a `translations` list; older ones put
/// `name` and `description` at the top level.
pub fn exercise_from_info(info: &Value) -> Option<ExerciseRecord> {
    let translation = info
        .get("translations")
        .and_then(Value::as_array)
        .and_then(|list| {
            list.iter()
                .find(|t| t.get("language").and_then(Value::as_u64) == Some(ENGLISH))
        });

    let source = translation.unwrap_or(info);
    let name = source
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())?
        .to_string();

    let description = source
        .get("description")
        .and_then(Value::as_str)
        .map(strip_html)
        .unwrap_or_default();

    let category = match info.get("category") {
        Some(Value::Object(cat)) => cat.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
        Some(Value::String(cat)) => cat.clone(),
        _ => String::new(),
    };

    Some(ExerciseRecord {
        name,
        description,
        primary_muscles: names(info.get("muscles")),
        secondary_muscles: names(info.get("muscles_secondary")),
        equipment: names(info.get("equipment")),
        category,
    })
}

/// wger exercise database client
pub struct WgerClient {
    base_url: String,
    client: Client,
}

impl WgerClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, WgerError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    async fn get_json(&self, url: &str) -> Result<Value, WgerError> {
        tracing::debug!("Querying exercises: {}", url);

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WgerError::ApiError(format!(
                "Exercise query failed: {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }

    /// Exercises training one muscle group with the given equipment
    pub async fn exercises_for(&self, query: &MuscleQuery) -> Result<Vec<ExerciseRecord>, WgerError> {
        let muscles = muscle_ids(&query.muscle_group);
        if muscles.is_empty() {
            tracing::debug!("No wger muscle ids for {}", query.muscle_group);
            return Ok(vec![]);
        }

        let mut url = format!(
            "{}/exerciseinfo/?language={}&limit={}&muscles={}",
            self.base_url.trim_end_matches('/'),
            ENGLISH,
            exercises_per_group(query.level) * OVERFETCH,
            urlencoding::encode(&join_ids(muscles))
        );
        let equipment = equipment_ids(&query.equipment);
        if !equipment.is_empty() {
            url.push_str(&format!("&equipment={}", urlencoding::encode(&join_ids(&equipment))));
        }

        let json = self.get_json(&url).await?;
        let results = json
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| WgerError::InvalidResponse("Missing results array".into()))?;

        Ok(results.iter().filter_map(exercise_from_info).collect())
    }

    /// Exercises whose name matches a search term
    pub async fn search(&self, term: &str) -> Result<Vec<ExerciseRecord>, WgerError> {
        let base = self.base_url.trim_end_matches('/');
        let url = format!(
            "{}/exercise/search/?term={}&language=english",
            base,
            urlencoding::encode(term.trim())
        );

        let json = self.get_json(&url).await?;
        let suggestions = json
            .get("suggestions")
            .and_then(Value::as_array)
            .ok_or_else(|| WgerError::InvalidResponse("Missing suggestions array".into()))?;

        let mut exercises: Vec<ExerciseRecord> = suggestions
            .iter()
            .filter_map(|s| {
                let data = s.get("data")?;
                let name = data
                    .get("name")
                    .or_else(|| s.get("value"))
                    .and_then(Value::as_str)?
                    .to_string();
                Some(ExerciseRecord {
                    name,
                    description: String::new(),
                    primary_muscles: vec![],
                    secondary_muscles: vec![],
                    equipment: vec![],
                    category: data
                        .get("category")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                })
            })
            .collect();

        // Search suggestions carry no description; fill in the best hit
        let base_id = suggestions
            .first()
            .and_then(|s| s.get("data"))
            .and_then(|d| d.get("base_id").or_else(|| d.get("id")))
            .and_then(Value::as_u64);

        if let (Some(id), Some(first)) = (base_id, exercises.first_mut()) {
            match self.get_json(&format!("{}/exerciseinfo/{}/", base, id)).await {
                Ok(info) => {
                    if let Some(detail) = exercise_from_info(&info) {
                        first.description = detail.description;
                        first.primary_muscles = detail.primary_muscles;
                        first.secondary_muscles = detail.secondary_muscles;
                        first.equipment = detail.equipment;
                    }
                }
                Err(e) => tracing::warn!("Exercise detail {} unavailable: {}", id, e),
            }
        }

        Ok(exercises)
    }
}

#[async_trait]
impl ExerciseSource for WgerClient {
    async fn by_muscles(&self, query: &MuscleQuery) -> Result<Vec<ExerciseRecord>, SourceError> {
        Ok(self.exercises_for(query).await?)
    }

    async fn by_name(&self, name: &str) -> Result<Vec<ExerciseRecord>, SourceError> {
        Ok(self.search(name).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Lie on the bench.</p>\n<ul><li>Press  up</li></ul>"),
            "Lie on the bench. Press up"
        );
        assert_eq!(strip_html("plain"), "plain");
    }

    #[test]
    fn test_muscle_ids() {
        assert_eq!(muscle_ids("chest"), &[4]);
        assert_eq!(muscle_ids("legs").len(), 4);
        assert!(muscle_ids("neck").is_empty());
    }

    #[test]
    fn test_equipment_ids() {
        let ids = equipment_ids(&["Dumbbells".to_string(), "bench".to_string(), "laser".to_string()]);
        assert_eq!(ids, vec![3, 7, 8]);
        assert!(equipment_ids(&[]).is_empty());
    }

    #[test]
    fn test_exercise_from_translated_info() {
        let info = json!({
            "id": 73,
            "category": {"id": 11, "name": "Chest"},
            "muscles": [{"id": 4, "name": "Pectoralis major", "name_en": "Chest"}],
            "muscles_secondary": [{"id": 5, "name": "Triceps brachii", "name_en": "Triceps"}],
            "equipment": [{"id": 1, "name": "Barbell"}],
            "translations": [
                {"name": "Bankdrücken", "description": "<p>De</p>", "language": 1},
                {"name": "Bench Press", "description": "<p>Lower the bar.</p>", "language": 2}
            ]
        });

        let exercise = exercise_from_info(&info).unwrap();
        assert_eq!(exercise.name, "Bench Press");
        assert_eq!(exercise.description, "Lower the bar.");
        assert_eq!(exercise.category, "Chest");
        assert_eq!(exercise.primary_muscles, vec!["Chest"]);
        assert_eq!(exercise.secondary_muscles, vec!["Triceps"]);
        assert_eq!(exercise.equipment, vec!["Barbell"]);
    }

    #[test]
    fn test_exercise_from_legacy_info() {
        let info = json!({"name": "Crunches", "description": "Curl up.", "category": "Abs"});

        let exercise = exercise_from_info(&info).unwrap();
        assert_eq!(exercise.name, "Crunches");
        assert_eq!(exercise.category, "Abs");
        assert!(exercise_from_info(&json!({"id": 1})).is_none());
    }
}
