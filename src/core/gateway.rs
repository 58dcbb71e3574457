use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by the generation backend
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Generation backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Text returned by the generation backend
///
/// Serialized untagged, so API clients see either a string or an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeneratedReply {
    Text(String),
    Structured(Value),
}

impl GeneratedReply {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            GeneratedReply::Text(text) => Some(text),
            GeneratedReply::Structured(_) => None,
        }
    }

    /// Flatten into plain text, serializing structured replies
    pub fn into_text(self) -> String {
        match self {
            GeneratedReply::Text(text) => text,
            GeneratedReply::Structured(value) => value.to_string(),
        }
    }

    /// Ensure a text reply starts with the given literal
    ///
    /// Structured replies are rendered to text first so the prefix is never lost.
    pub fn with_required_prefix(self, prefix: &str) -> Self {
        let text = self.into_text();
        let trimmed = text.trim_start();
        if trimmed.starts_with(prefix) {
            GeneratedReply::Text(trimmed.to_string())
        } else {
            GeneratedReply::Text(format!("{} {}", prefix, trimmed).trim_end().to_string())
        }
    }
}

/// Interpret raw backend output: JSON objects become structured values,
/// plain text is trimmed, and malformed JSON is returned exactly as received
pub fn interpret_output(raw: &str) -> GeneratedReply {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => GeneratedReply::Structured(value),
            Err(e) => {
                tracing::debug!("Backend output looked like JSON but did not parse: {}", e);
                GeneratedReply::Text(raw.to_string())
            }
        };
    }
    GeneratedReply::Text(trimmed.to_string())
}

/// Blocking (non-streaming) text generation
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GeneratedReply, GatewayError>;
}
