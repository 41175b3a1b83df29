//! HTTP request handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use gcard_common::MessageId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::AppState;
use crate::error::Error;
use crate::playback::{ControllerSnapshot, PointerTarget};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    git_hash: String,
    build_timestamp: String,
    build_profile: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct CardResponse {
    title: String,
    portraits: Vec<PortraitView>,
}

#[derive(Debug, Serialize)]
pub struct PortraitView {
    id: MessageId,
    image: String,
    alt: String,
    caption: String,
}

#[derive(Debug, Serialize)]
pub struct StateResponse {
    #[serde(flatten)]
    snapshot: ControllerSnapshot,
    /// Greeting text for the active message
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    pub target: PointerTarget,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActivateResponse {
    pub resumed: bool,
}

type ApiError = (StatusCode, Json<StatusResponse>);

fn error_response(error: Error) -> ApiError {
    let status = match &error {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidState(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(StatusResponse {
            status: format!("error: {}", error),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "gcard-ap".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
    })
}

/// GET /card - title and portraits for rendering
pub async fn get_card(State(state): State<AppState>) -> Json<CardResponse> {
    let catalog = &state.catalog;
    Json(CardResponse {
        title: catalog.title.clone(),
        portraits: catalog
            .portraits
            .iter()
            .map(|p| PortraitView {
                id: p.id,
                image: p.image.clone(),
                alt: p.alt.clone(),
                caption: p.caption.clone(),
            })
            .collect(),
    })
}

/// GET /state - controller snapshot plus the active greeting text
pub async fn get_state(State(state): State<AppState>) -> Result<Json<StateResponse>, ApiError> {
    let snapshot = state.card.snapshot().await.map_err(error_response)?;
    let message = snapshot
        .active_message_id
        .and_then(|id| state.catalog.message_text(id))
        .map(str::to_string);

    Ok(Json(StateResponse { snapshot, message }))
}

/// POST /portraits/:id/activate
pub async fn activate_portrait(
    State(state): State<AppState>,
    Path(id): Path<MessageId>,
) -> Result<Json<StatusResponse>, ApiError> {
    if state.catalog.portrait(id).is_none() {
        warn!("Activation of unknown portrait {}", id);
        return Err(error_response(Error::NotFound(format!("portrait {}", id))));
    }

    info!("Portrait {} activated", id);
    state.card.activate_image(id).await.map_err(error_response)?;

    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}

/// POST /activate - pointer activation on the card area
pub async fn activate_area(
    State(state): State<AppState>,
    Json(request): Json<ActivateRequest>,
) -> Result<Json<ActivateResponse>, ApiError> {
    debug!("Card area activated on {:?}", request.target);
    let resumed = state
        .card
        .activate_background(request.target)
        .await
        .map_err(error_response)?;

    Ok(Json(ActivateResponse { resumed }))
}
