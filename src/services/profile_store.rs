use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

use crate::core::sources::{ProfileSource, SourceError};
use crate::models::UserProfile;

/// Errors that can occur when reading profiles from Firestore
#[derive(Debug, Error)]
pub enum ProfileStoreError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl From<ProfileStoreError> for SourceError {
    fn from(err: ProfileStoreError) -> Self {
        match err {
            ProfileStoreError::NotFound(msg) => SourceError::NotFound(msg),
            ProfileStoreError::InvalidResponse(msg) => SourceError::InvalidResponse(msg),
            other => SourceError::Transport(other.to_string()),
        }
    }
}

/// Firestore REST client for the user profile collection
pub struct ProfileStoreClient {
    base_url: String,
    project_id: String,
    collection: String,
    api_key: Option<String>,
    client: Client,
}

impl ProfileStoreClient {
    pub fn new(
        base_url: String,
        project_id: String,
        collection: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProfileStoreError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            project_id,
            collection,
            api_key: api_key.filter(|k| !k.is_empty()),
            client,
        })
    }

    fn document_url(&self, user_id: &str) -> String {
        let mut url = format!(
            "{}/projects/{}/databases/(default)/documents/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.project_id,
            self.collection,
            urlencoding::encode(user_id)
        );
        if let Some(key) = &self.api_key {
            url.push_str(&format!("?key={}", urlencoding::encode(key)));
        }
        url
    }

    /// Fetch one user's profile document
    pub async fn fetch_profile(&self, user_id: &str) -> Result<UserProfile, ProfileStoreError> {
        let user_id = user_id.trim();
        if user_id.is_empty() || user_id.contains('/') {
            return Err(ProfileStoreError::NotFound(format!("Invalid user id {:?}", user_id)));
        }

        let url = self.document_url(user_id);
        tracing::debug!("Fetching profile for user {}", user_id);

        let response = self.client.get(&url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(ProfileStoreError::NotFound(format!("Profile not found for user {}", user_id)))
            }
            status if !status.is_success() => {
                return Err(ProfileStoreError::ApiError(format!("Failed to fetch profile: {}", status)))
            }
            _ => {}
        }

        let json: Value = response.json().await?;
        let mut data = decode_document(&json)
            .ok_or_else(|| ProfileStoreError::InvalidResponse("Missing fields object".into()))?;

        if let Value::Object(map) = &mut data {
            map.entry("userId")
                .or_insert_with(|| Value::String(user_id.to_string()));
        }

        serde_json::from_value(data)
            .map_err(|e| ProfileStoreError::InvalidResponse(format!("Failed to parse profile: {}", e)))
    }
}

#[async_trait]
impl ProfileSource for ProfileStoreClient {
    async fn get_profile(&self, user_id: &str) -> Result<UserProfile, SourceError> {
        Ok(self.fetch_profile(user_id).await?)
    }
}

/// Flatten a Firestore document's typed `fields` into plain JSON
pub fn decode_document(document: &Value) -> Option<Value> {
    let fields = document.get("fields")?.as_object()?;
    Some(decode_fields(fields))
}

fn decode_fields(fields: &Map<String, Value>) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(key, value)| (key.clone(), decode_value(value)))
            .collect(),
    )
}

/// Decode one Firestore typed value such as `{"integerValue": "42"}`
pub fn decode_value(value: &Value) -> Value {
    let Some((kind, inner)) = value.as_object().and_then(|obj| obj.iter().next()) else {
        return Value::Null;
    };

    match kind.as_str() {
        "stringValue" | "booleanValue" | "doubleValue" | "referenceValue" => inner.clone(),
        // Firestore sends 64-bit integers as strings
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or_else(|| inner.clone()),
        "timestampValue" => inner.clone(),
        "nullValue" => Value::Null,
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => inner
            .get("fields")
            .and_then(Value::as_object)
            .map(decode_fields)
            .unwrap_or_else(|| Value::Object(Map::new())),
        other => {
            tracing::debug!("Unsupported Firestore value type {}", other);
            Value::Null
        }
    }
}
