use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request body for the routed chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
    #[serde(default, alias = "user_id", rename = "userId")]
    pub user_id: Option<String>,
}

/// Request body for the fitness plan endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FitnessRecommendationsRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
}

/// Request body for the unrouted chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SimpleChatRequest {
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
}
