//! HTTP control surface
//!
//! Presentation pages drive the card through these endpoints and follow
//! its progress on the SSE stream.

pub mod handlers;
pub mod sse;

use axum::{
    routing::{get, post},
    Router,
};
use gcard_common::config::CardConfig;
use gcard_common::events::EventBus;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{Error, Result};
use crate::playback::CardHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Card runtime
    pub card: CardHandle,
    /// Portraits, captions and greeting texts
    pub catalog: Arc<CardConfig>,
    pub events: EventBus,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/card", get(handlers::get_card))
        .route("/state", get(handlers::get_state))
        .route("/portraits/:id/activate", post(handlers::activate_portrait))
        .route("/activate", post(handlers::activate_area))
        .route("/events", get(sse::event_stream))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve the API until `shutdown` resolves
pub async fn serve<F>(port: u16, state: AppState, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    info!("HTTP server stopped");
    Ok(())
}
