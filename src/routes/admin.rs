//! Admin routes: dealer approval and rejection.

use crate::error::Result;
use crate::events::AppEvent;
use crate::middleware::auth::AuthUser;
use crate::models::Profile;
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

/// Admin routes. Layered behind `require_auth` + `require_admin` in
/// routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/dealers/pending", get(list_pending))
        .route("/admin/dealers/{id}/approve", post(approve_dealer))
        .route("/admin/dealers/{id}/reject", post(reject_dealer))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "mobile/src/lib/generated/")
)]
pub struct PendingDealer {
    pub id: String,
    pub shop_name: String,
    pub city: String,
    pub phone: String,
    pub email: String,
    pub created_at: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "mobile/src/lib/generated/")
)]
pub struct PendingDealersResponse {
    pub dealers: Vec<PendingDealer>,
}

/// List dealers awaiting approval, oldest first.
async fn list_pending(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
) -> Result<Json<PendingDealersResponse>> {
    tracing::debug!(admin_id = %admin.user_id, "Listing pending dealers");

    let dealers = state
        .db
        .list_pending_dealers()
        .await?
        .into_iter()
        .map(|p: Profile| PendingDealer {
            id: p.id,
            shop_name: p.shop_name,
            city: p.city,
            phone: p.phone,
            email: p.email,
            created_at: p.created_at,
        })
        .collect();

    Ok(Json(PendingDealersResponse { dealers }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "mobile/src/lib/generated/")
)]
pub struct AdminActionResponse {
    pub success: bool,
    pub message: String,
}

/// Approve a dealer sign-up.
async fn approve_dealer(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<AdminActionResponse>> {
    let profile = state.db.approve_dealer(&user_id).await?;

    tracing::info!(
        admin_id = %admin.user_id,
        user_id = %profile.id,
        shop = %profile.shop_name,
        "Dealer approved"
    );

    state.events.emit(AppEvent::DealerApproved { user_id });

    Ok(Json(AdminActionResponse {
        success: true,
        message: format!("{} approved", profile.shop_name),
    }))
}

/// Reject a dealer: delete their hosted images, rows, and credential.
async fn reject_dealer(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<AdminActionResponse>> {
    tracing::info!(admin_id = %admin.user_id, user_id = %user_id, "Admin-initiated dealer rejection");

    let deleted = state
        .accounts
        .reject_dealer(&user_id, &state.media)
        .await?;

    state.events.emit(AppEvent::DealerRejected { user_id });

    Ok(Json(AdminActionResponse {
        success: true,
        message: format!("Dealer removed ({} records deleted)", deleted),
    }))
}
