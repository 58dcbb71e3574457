use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use uuid::Uuid;
use validator::Validate;

use super::{error_response, router_error_response, AppState};
use crate::core::SourceError;
use crate::models::{ChatRequest, ChatResponse, ReloadResponse, SimpleChatRequest, SimpleChatResponse};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/chat", web::post().to(chat))
        .route("/simple-chat", web::post().to(simple_chat))
        .route("/catalog/reload", web::post().to(reload_catalog));
}

/// Routed chat endpoint
///
/// POST /chat
///
/// Request body:
/// ```json
/// {
///   "message": "string",
///   "userId": "string"
/// }
/// ```
async fn chat(state: web::Data<AppState>, req: web::Json<ChatRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for chat request: {:?}", errors);
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    let message = req.message.trim();
    if message.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", "message: must not be blank");
    }

    let request_id = Uuid::new_v4();
    let user_id = req.user_id.as_deref().map(str::trim).filter(|id| !id.is_empty());
    tracing::info!("[{}] Chat request from user {:?}", request_id, user_id);

    let profile = match user_id {
        Some(id) => match state.profiles.get_profile(id).await {
            Ok(profile) => Some(profile),
            Err(SourceError::NotFound(e)) => {
                tracing::warn!("[{}] No profile for {}, answering without one: {}", request_id, id, e);
                None
            }
            Err(e) => {
                tracing::error!("[{}] Failed to fetch profile for {}: {}", request_id, id, e);
                return error_response(StatusCode::BAD_GATEWAY, "Failed to fetch user profile", e.to_string());
            }
        },
        None => None,
    };

    match state.router.respond(message, profile.as_ref()).await {
        Ok(reply) => {
            tracing::info!("[{}] Answered as {:?}", request_id, reply.intent);
            HttpResponse::Ok().json(ChatResponse {
                response: reply.response,
                intent: reply.intent,
            })
        }
        Err(e) => {
            tracing::error!("[{}] Chat request failed: {}", request_id, e);
            router_error_response(&e)
        }
    }
}

/// Unrouted chat endpoint
///
/// POST /simple-chat
async fn simple_chat(state: web::Data<AppState>, req: web::Json<SimpleChatRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    let message = req.message.trim();
    if message.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", "message: must not be blank");
    }

    match state.router.simple(message).await {
        Ok(response) => HttpResponse::Ok().json(SimpleChatResponse { response }),
        Err(e) => {
            tracing::error!("Simple chat request failed: {}", e);
            router_error_response(&e)
        }
    }
}

/// Re-read the nutrition catalog from disk
///
/// POST /catalog/reload
async fn reload_catalog(state: web::Data<AppState>) -> impl Responder {
    match state.catalog.reload().await {
        Ok(meals) => HttpResponse::Ok().json(ReloadResponse { meals }),
        Err(e) => {
            tracing::error!("Catalog reload failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Catalog reload failed", e.to_string())
        }
    }
}
