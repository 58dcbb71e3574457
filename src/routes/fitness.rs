use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use validator::Validate;

use super::{error_response, AppState};
use crate::core::SourceError;
use crate::models::FitnessRecommendationsRequest;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/fitness-recommendations", web::post().to(fitness_recommendations));
}

/// Structured workout and nutrition plan for a stored profile
///
/// POST /fitness-recommendations
///
/// Request body:
/// ```json
/// { "userId": "string" }
/// ```
async fn fitness_recommendations(
    state: web::Data<AppState>,
    req: web::Json<FitnessRecommendationsRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for fitness request: {:?}", errors);
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    let user_id = req.user_id.trim();
    tracing::info!("Building fitness plan for user: {}", user_id);

    let profile = match state.profiles.get_profile(user_id).await {
        Ok(profile) => profile,
        Err(SourceError::NotFound(e)) => {
            return error_response(StatusCode::NOT_FOUND, "User profile not found", e);
        }
        Err(e) => {
            tracing::error!("Failed to fetch profile for {}: {}", user_id, e);
            return error_response(StatusCode::BAD_GATEWAY, "Failed to fetch user profile", e.to_string());
        }
    };

    let plan = state
        .router
        .planner()
        .build_plan(Some(&profile), chrono::Utc::now().date_naive())
        .await;

    if !plan.fallback_groups.is_empty() {
        tracing::warn!("Plan for {} used default exercises for {:?}", user_id, plan.fallback_groups);
    }

    HttpResponse::Ok().json(plan)
}
