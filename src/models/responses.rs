use serde::{Deserialize, Serialize};
use crate::core::gateway::GeneratedReply;
use crate::core::intent::IntentKind;

/// Response for the routed chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: GeneratedReply,
    pub intent: IntentKind,
}

/// Response for the unrouted chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleChatResponse {
    pub response: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub catalog_meals: usize,
}

/// Catalog reload response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub meals: usize,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
