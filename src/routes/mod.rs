// Route exports
pub mod chat;
pub mod fitness;
pub mod health;

use actix_web::{error, http::StatusCode, web, HttpResponse};
use std::sync::Arc;

use crate::core::{ChatRouter, ProfileSource, RouterError};
use crate::models::ErrorResponse;
use crate::services::NutritionCatalog;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ChatRouter>,
    pub profiles: Arc<dyn ProfileSource>,
    pub catalog: Arc<NutritionCatalog>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(health::configure)
        .configure(chat::configure)
        .configure(fitness::configure);
}

pub(crate) fn error_response(status: StatusCode, error: &str, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message: message.into(),
        status_code: status.as_u16(),
    })
}

pub(crate) fn router_error_response(err: &RouterError) -> HttpResponse {
    match err {
        RouterError::Gateway(e) => {
            tracing::error!("Generation backend failed: {}", e);
            error_response(StatusCode::BAD_GATEWAY, "Generation failed", e.to_string())
        }
        RouterError::Catalog(e) => {
            tracing::error!("Nutrition catalog unavailable: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Catalog unavailable", e.to_string())
        }
    }
}

/// JSON error body for rejected payloads
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}
