use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tracing::warn;

use super::domain::SiteSelection;
use super::engine::PredictionError;
use super::service::RiskAssessmentService;

/// Router builder exposing the option lists and the assessment endpoint.
pub fn risk_router(service: Arc<RiskAssessmentService>) -> Router {
    Router::new()
        .route("/api/v1/risk/options", get(options_handler))
        .route("/api/v1/risk/assessments", post(assess_handler))
        .with_state(service)
}

pub(crate) async fn options_handler(
    State(service): State<Arc<RiskAssessmentService>>,
) -> Response {
    let payload = json!({
        "strategy": service.strategy(),
        "options": service.options(),
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn assess_handler(
    State(service): State<Arc<RiskAssessmentService>>,
    axum::Json(selection): axum::Json<SiteSelection>,
) -> Response {
    match service.assess(selection) {
        Ok(assessment) => (StatusCode::OK, axum::Json(assessment)).into_response(),
        Err(PredictionError::Encoding(error)) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(PredictionError::Inference(error)) => {
            warn!(%error, "classifier inference failed");
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
