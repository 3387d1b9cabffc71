use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::Recommendation,
    services::InteractionInput,
};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct RecordInteractionRequest {
    pub actor_id: Uuid,
    #[serde(flatten)]
    pub interaction: InteractionInput,
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub actor_id: Uuid,
    pub items: Vec<Recommendation>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Ranked recommendations for one actor
pub async fn get_recommendations(
    State(state): State<AppState>,
    Path(actor_id): Path<Uuid>,
) -> AppResult<Json<RecommendationsResponse>> {
    let items = state
        .recommendations
        .get_ranked_recommendations(actor_id)
        .await?;

    Ok(Json(RecommendationsResponse { actor_id, items }))
}

/// Records an interaction; the score recompute finishes in the background
pub async fn record_interaction(
    State(state): State<AppState>,
    payload: Result<Json<RecordInteractionRequest>, JsonRejection>,
) -> AppResult<StatusCode> {
    let Json(request) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;

    state
        .recommendations
        .record_interaction(request.actor_id, request.interaction)
        .await?;

    Ok(StatusCode::ACCEPTED)
}
