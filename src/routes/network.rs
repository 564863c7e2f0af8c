//! Dealer network routes: connection requests and status.

use crate::cache;
use crate::error::{AppError, Result};
use crate::events::AppEvent;
use crate::middleware::auth::AuthUser;
use crate::models::ConnectionState;
use crate::routes::require_approved;
use crate::services::connections::IncomingRequest;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Network routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/connections/{id}/status", get(connection_status))
        .route("/api/connections/{id}/accept", post(accept_connection))
        .route(
            "/api/connections/{id}",
            post(send_connection).delete(remove_connection),
        )
        .route("/api/requests/connections", get(list_connection_requests))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "mobile/src/lib/generated/")
)]
pub struct ConnectionStatusResponse {
    pub status: ConnectionState,
}

/// Resolve the connection state between the viewer and another dealer.
async fn connection_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(other_id): Path<String>,
) -> Result<Json<ConnectionStatusResponse>> {
    let status = state.connections.status(&user.user_id, &other_id).await?;
    Ok(Json(ConnectionStatusResponse { status }))
}

/// Send a connection request: `none -> sent`.
async fn send_connection(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(other_id): Path<String>,
) -> Result<Json<ConnectionStatusResponse>> {
    require_approved(&state, &user).await?;

    // The receiver must still exist; a rejected dealer's profile is gone.
    state
        .db
        .get_profile(&other_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Dealer {} not found", other_id)))?;

    let status = state.connections.send(&user.user_id, &other_id).await?;

    state.events.emit(AppEvent::ConnectionRequested {
        sender_id: user.user_id,
        receiver_id: other_id,
    });

    Ok(Json(ConnectionStatusResponse { status }))
}

/// Accept an inbound pending request: `pending -> connected`.
async fn accept_connection(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(other_id): Path<String>,
) -> Result<Json<ConnectionStatusResponse>> {
    let status = state.connections.accept(&user.user_id, &other_id).await?;

    state.events.emit(AppEvent::ConnectionAccepted {
        accepter_id: user.user_id.clone(),
        sender_id: other_id,
    });

    refresh_request_cache(&state, &user.user_id);

    Ok(Json(ConnectionStatusResponse { status }))
}

/// Remove whatever edge exists: cancel, decline, or disconnect.
/// Removing an absent edge succeeds and resolves to `none`.
async fn remove_connection(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(other_id): Path<String>,
) -> Result<Json<ConnectionStatusResponse>> {
    let status = state.connections.remove(&user.user_id, &other_id).await?;

    refresh_request_cache(&state, &user.user_id);

    Ok(Json(ConnectionStatusResponse { status }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "mobile/src/lib/generated/")
)]
pub struct ConnectionRequestsResponse {
    pub requests: Vec<IncomingRequest>,
    /// True when served from the local cache while a refresh runs
    pub stale: bool,
}

/// List inbound pending requests with sender summaries.
///
/// Serves the cached snapshot instantly when present and refreshes it
/// in the background.
async fn list_connection_requests(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ConnectionRequestsResponse>> {
    let key = cache::keys::connection_requests(&user.user_id);

    if let Some(cached) = state.cache.get::<Vec<IncomingRequest>>(&key) {
        refresh_request_cache(&state, &user.user_id);
        return Ok(Json(ConnectionRequestsResponse {
            requests: cached,
            stale: true,
        }));
    }

    let requests = state.connections.incoming(&user.user_id).await?;
    state.cache.put(&key, &requests);

    Ok(Json(ConnectionRequestsResponse {
        requests,
        stale: false,
    }))
}

/// Overwrite the viewer's cached request list in the background.
fn refresh_request_cache(state: &Arc<AppState>, user_id: &str) {
    let state = state.clone();
    let user_id = user_id.to_string();
    tokio::spawn(async move {
        match state.connections.incoming(&user_id).await {
            Ok(fresh) => state
                .cache
                .put(&cache::keys::connection_requests(&user_id), &fresh),
            Err(e) => tracing::warn!(error = %e, "Connection request cache refresh failed"),
        }
    });
}
