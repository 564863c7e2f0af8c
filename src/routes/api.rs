//! API routes for authenticated dealers.

use crate::cache;
use crate::error::{AppError, Result};
use crate::events::AppEvent;
use crate::middleware::auth::AuthUser;
use crate::models::post::PostDraft;
use crate::models::{DeviceRequest, Post, PostSubmission, Profile, PushToken};
use crate::routes::{require_approved, validate_input};
use crate::services::search::{ProductDoc, Scored, ShopDoc};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me).put(update_me))
        .route("/api/feed", get(get_feed))
        .route("/api/posts", post(create_post))
        .route("/api/posts/{id}", put(update_post).delete(delete_post))
        .route("/api/posts/submissions/{client_ref}", get(get_submission))
        .route("/api/search", get(search))
        .route("/api/profiles/{id}", get(get_public_profile))
        .route(
            "/api/requests/devices",
            get(list_device_requests).post(create_device_request),
        )
        .route(
            "/api/requests/devices/{id}",
            axum::routing::delete(delete_device_request),
        )
        .route("/api/push-token", put(register_push_token))
}

// ─── Current Profile ─────────────────────────────────────────

/// Full profile response for the owner.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "mobile/src/lib/generated/")
)]
pub struct ProfileResponse {
    pub id: String,
    pub shop_name: String,
    pub city: String,
    pub phone: String,
    pub email: String,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub approved: bool,
    pub connection_count: u32,
    pub created_at: String,
}

impl From<Profile> for ProfileResponse {
    fn from(p: Profile) -> Self {
        Self {
            id: p.id,
            shop_name: p.shop_name,
            city: p.city,
            phone: p.phone,
            email: p.email,
            bio: p.bio,
            profile_image: p.profile_image,
            approved: p.approved,
            connection_count: p.connection_count,
            created_at: p.created_at,
        }
    }
}

/// Get current dealer profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let profile = state
        .db
        .get_profile(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user.user_id)))?;

    Ok(Json(ProfileResponse::from(profile)))
}

#[derive(Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub shop_name: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(equal = 10, message = "Phone number must be 10 digits"))]
    pub phone: String,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
    pub profile_image: Option<String>,
}

/// Self-edit profile fields. Email and role are not editable.
async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>> {
    validate_input(&request)?;
    if !request.phone.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::BadRequest(
            "Phone number must be 10 digits".to_string(),
        ));
    }

    let mut profile = state
        .db
        .get_profile(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user.user_id)))?;

    let old_image = profile.profile_image.clone();

    profile.shop_name = request.shop_name.trim().to_string();
    profile.city = request.city.trim().to_string();
    profile.phone = request.phone;
    profile.bio = request.bio.map(|b| b.trim().to_string()).filter(|b| !b.is_empty());
    profile.profile_image = request.profile_image;

    state.db.upsert_profile(&profile).await?;

    // A replaced profile picture is dead on the CDN.
    if let Some(old) = old_image {
        if profile.profile_image.as_deref() != Some(old.as_str()) {
            let media = state.media.clone();
            tokio::spawn(async move {
                media.delete_images(&[old]).await;
            });
        }
    }

    Ok(Json(ProfileResponse::from(profile)))
}

// ─── Feed ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct FeedQuery {
    /// Cursor for forward pagination (opaque token).
    cursor: Option<String>,
    /// Pagination: items per page
    #[serde(default = "default_per_page")]
    per_page: u32,
}

fn default_per_page() -> u32 {
    20
}

const MAX_PER_PAGE: u32 = 50;
const CURSOR_PARTS: usize = 2;

/// Decoded feed cursor: the last seen post's sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FeedCursor {
    created_at: String,
    post_id: String,
}

fn parse_cursor(cursor: Option<&str>) -> Result<Option<FeedCursor>> {
    cursor
        .map(|raw| {
            let invalid_cursor =
                || AppError::BadRequest("Invalid 'cursor' parameter".to_string());

            let decoded = URL_SAFE_NO_PAD.decode(raw).map_err(|_| invalid_cursor())?;
            let decoded_str = std::str::from_utf8(&decoded).map_err(|_| invalid_cursor())?;

            let parts: Vec<&str> = decoded_str.split('|').collect();
            if parts.len() != CURSOR_PARTS {
                return Err(invalid_cursor());
            }

            chrono::DateTime::parse_from_rfc3339(parts[0]).map_err(|_| invalid_cursor())?;

            Ok(FeedCursor {
                created_at: parts[0].to_string(),
                post_id: parts[1].to_string(),
            })
        })
        .transpose()
}

fn encode_cursor(cursor: &FeedCursor) -> String {
    let payload = format!("{}|{}", cursor.created_at, cursor.post_id);
    URL_SAFE_NO_PAD.encode(payload)
}

/// Shop summary embedded in feed and search results.
#[derive(Serialize, Clone, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "mobile/src/lib/generated/")
)]
pub struct ShopSummary {
    pub shop_name: String,
    pub city: String,
    pub profile_image: Option<String>,
    /// For the WhatsApp contact deep link
    pub phone: String,
}

#[derive(Serialize, Clone, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "mobile/src/lib/generated/")
)]
pub struct FeedPost {
    pub id: String,
    pub user_id: String,
    pub product_name: String,
    pub description: Option<String>,
    pub price: Option<u32>,
    pub hide_price: bool,
    pub media_urls: Vec<String>,
    pub created_at: String,
    pub shop: Option<ShopSummary>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "mobile/src/lib/generated/")
)]
pub struct FeedResponse {
    pub posts: Vec<FeedPost>,
    pub per_page: u32,
    pub next_cursor: Option<String>,
}

fn to_feed_post(post: Post, shop: Option<&Profile>) -> FeedPost {
    FeedPost {
        id: post.id,
        user_id: post.user_id,
        product_name: post.product_name,
        description: post.description,
        price: post.price,
        hide_price: post.hide_price,
        media_urls: post.media_urls,
        created_at: post.created_at,
        shop: shop.map(|p| ShopSummary {
            shop_name: p.shop_name.clone(),
            city: p.city.clone(),
            profile_image: p.profile_image.clone(),
            phone: p.phone.clone(),
        }),
    }
}

/// Get the global feed, newest first, with keyed-cursor pagination.
async fn get_feed(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<FeedQuery>,
) -> Result<Json<FeedResponse>> {
    tracing::debug!(
        user_id = %user.user_id,
        cursor = ?params.cursor,
        per_page = params.per_page,
        "Fetching feed"
    );

    let limit = params.per_page.min(MAX_PER_PAGE).max(1);
    let cursor = parse_cursor(params.cursor.as_deref())?;

    // Fetch one extra item to determine if another page is available.
    let fetch_limit = limit.saturating_add(1);
    let mut posts = state
        .db
        .get_feed_page(
            cursor.as_ref().map(|c| crate::db::firestore::PostQueryCursor {
                created_at: &c.created_at,
            }),
            fetch_limit,
        )
        .await?;

    let has_more = posts.len() > limit as usize;
    if has_more {
        posts.truncate(limit as usize);
    }

    let next_cursor = if has_more {
        posts.last().map(|p| {
            encode_cursor(&FeedCursor {
                created_at: p.created_at.clone(),
                post_id: p.id.clone(),
            })
        })
    } else {
        None
    };

    let user_ids: Vec<String> = posts.iter().map(|p| p.user_id.clone()).collect();
    let profiles = state.db.get_profiles_map(&user_ids).await?;

    let posts = posts
        .into_iter()
        .map(|post| {
            let shop = profiles.get(&post.user_id);
            to_feed_post(post, shop)
        })
        .collect();

    Ok(Json(FeedResponse {
        posts,
        per_page: limit,
        next_cursor,
    }))
}

// ─── Posts ───────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 120, message = "Product name is required"))]
    pub product_name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub price: Option<u32>,
    #[serde(default)]
    pub hide_price: bool,
    #[validate(length(min = 1, max = 4, message = "A post needs 1 to 4 images"))]
    pub media_urls: Vec<String>,
    /// Client-side temporary ID for optimistic reconciliation
    pub client_ref: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "mobile/src/lib/generated/")
)]
pub struct PostResponse {
    pub post: Post,
    pub client_ref: Option<String>,
}

/// Create a listing. Approved dealers only.
async fn create_post(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreatePostRequest>,
) -> Result<Json<PostResponse>> {
    validate_input(&request)?;
    require_approved(&state, &user).await?;

    let client_ref = request.client_ref.clone();
    let draft = PostDraft {
        user_id: user.user_id.clone(),
        product_name: request.product_name.trim().to_string(),
        description: request
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        price: request.price,
        hide_price: request.hide_price,
        media_urls: request.media_urls,
    };

    let post = state.posts.create(draft, client_ref.clone()).await?;

    state.events.emit(AppEvent::PostCreated {
        post_id: post.id.clone(),
        user_id: user.user_id,
    });

    Ok(Json(PostResponse { post, client_ref }))
}

#[derive(Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 120))]
    pub product_name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub price: Option<u32>,
    #[serde(default)]
    pub hide_price: bool,
    #[validate(length(min = 1, max = 4, message = "A post needs 1 to 4 images"))]
    pub media_urls: Vec<String>,
}

/// Edit a listing. Owner only.
async fn update_post(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(post_id): Path<String>,
    Json(request): Json<UpdatePostRequest>,
) -> Result<Json<PostResponse>> {
    validate_input(&request)?;

    let updated = Post {
        id: post_id.clone(),
        user_id: user.user_id.clone(),
        product_name: request.product_name.trim().to_string(),
        description: request
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        price: request.price,
        hide_price: request.hide_price,
        media_urls: request.media_urls,
        created_at: String::new(), // preserved by the service
    };

    let post = state.posts.update(&user.user_id, &post_id, updated).await?;

    state.events.emit(AppEvent::PostUpdated {
        post_id,
        user_id: user.user_id,
    });

    Ok(Json(PostResponse {
        post,
        client_ref: None,
    }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "mobile/src/lib/generated/")
)]
pub struct AckResponse {
    pub success: bool,
}

/// Delete a listing. Owner only; CDN cleanup is best-effort.
async fn delete_post(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(post_id): Path<String>,
) -> Result<Json<AckResponse>> {
    state.posts.delete(&user.user_id, &post_id).await?;

    state.events.emit(AppEvent::PostDeleted {
        post_id,
        user_id: user.user_id,
    });

    Ok(Json(AckResponse { success: true }))
}

/// Reconcile an optimistic submission by its client reference.
async fn get_submission(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
    Path(client_ref): Path<String>,
) -> Result<Json<PostSubmission>> {
    state
        .posts
        .reconcile(&client_ref)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", client_ref)))
}

// ─── Search ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub products: Vec<Scored<ProductDoc>>,
    pub shops: Vec<Scored<ShopDoc>>,
}

/// Free-text search over listings and shops.
///
/// A blank query returns empty lists, distinct from "searched and
/// found nothing".
async fn search(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    state.search.ensure_loaded(&state.db).await?;

    let products = state.search.search_products(&params.q);
    let shops = state.search.search_shops(&params.q);

    tracing::debug!(
        user_id = %user.user_id,
        query = %params.q,
        products = products.len(),
        shops = shops.len(),
        "Search executed"
    );

    Ok(Json(SearchResponse {
        query: params.q,
        products,
        shops,
    }))
}

// ─── Public Profiles ─────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "mobile/src/lib/generated/")
)]
pub struct PublicProfileResponse {
    pub id: String,
    pub shop_name: String,
    pub city: String,
    pub phone: String,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub connection_count: u32,
    pub posts: Vec<Post>,
}

/// View another dealer's profile and their listings.
async fn get_public_profile(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<PublicProfileResponse>> {
    let profile = state
        .db
        .get_profile(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user_id)))?;

    let posts = state.db.get_posts_for_user(&user_id).await?;

    Ok(Json(PublicProfileResponse {
        id: profile.id,
        shop_name: profile.shop_name,
        city: profile.city,
        phone: profile.phone,
        bio: profile.bio,
        profile_image: profile.profile_image,
        connection_count: profile.connection_count,
        posts,
    }))
}

// ─── Device Requests ─────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "mobile/src/lib/generated/")
)]
pub struct DeviceRequestsResponse {
    pub requests: Vec<DeviceRequest>,
    /// True when served from the local cache while a refresh runs
    pub stale: bool,
}

/// List active device requests, newest first.
///
/// Serves the cached snapshot instantly when present and refreshes it
/// in the background; the next call sees fresh data.
async fn list_device_requests(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
) -> Result<Json<DeviceRequestsResponse>> {
    if let Some(cached) = state.cache.get::<Vec<DeviceRequest>>(cache::keys::DEVICE_REQUESTS) {
        let state_clone = state.clone();
        tokio::spawn(async move {
            match state_clone.db.list_device_requests().await {
                Ok(fresh) => state_clone.cache.put(cache::keys::DEVICE_REQUESTS, &fresh),
                Err(e) => {
                    tracing::warn!(error = %e, "Background device request refresh failed")
                }
            }
        });

        return Ok(Json(DeviceRequestsResponse {
            requests: cached,
            stale: true,
        }));
    }

    let requests = state.db.list_device_requests().await?;
    state.cache.put(cache::keys::DEVICE_REQUESTS, &requests);

    Ok(Json(DeviceRequestsResponse {
        requests,
        stale: false,
    }))
}

#[derive(Deserialize, Validate)]
pub struct CreateDeviceRequestBody {
    #[validate(length(min = 1, max = 100, message = "Model is required"))]
    pub model: String,
    #[validate(length(min = 1, max = 50, message = "Storage is required"))]
    pub storage: String,
    #[validate(length(max = 50))]
    pub ram: Option<String>,
    #[validate(length(max = 50))]
    pub color: Option<String>,
    #[validate(length(max = 50))]
    pub condition: Option<String>,
    pub max_price: Option<u32>,
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Post a device-wanted request.
async fn create_device_request(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateDeviceRequestBody>,
) -> Result<Json<DeviceRequest>> {
    validate_input(&request)?;
    require_approved(&state, &user).await?;

    let device_request = DeviceRequest {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.user_id,
        model: request.model.trim().to_string(),
        storage: request.storage.trim().to_string(),
        ram: clean_optional(request.ram),
        color: clean_optional(request.color),
        condition: clean_optional(request.condition),
        max_price: request.max_price,
        status: "active".to_string(),
        created_at: now_rfc3339(),
    };

    state.db.insert_device_request(&device_request).await?;
    refresh_device_request_cache(&state);

    Ok(Json(device_request))
}

/// Delete a device-wanted request. Owner only.
async fn delete_device_request(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(request_id): Path<String>,
) -> Result<Json<AckResponse>> {
    let existing = state
        .db
        .get_device_request(&request_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Request {} not found", request_id)))?;

    if existing.user_id != user.user_id {
        return Err(AppError::Forbidden(
            "Only the owner can delete a request".to_string(),
        ));
    }

    state.db.delete_device_request(&request_id).await?;
    refresh_device_request_cache(&state);

    Ok(Json(AckResponse { success: true }))
}

/// Overwrite the cached device-request list in the background.
fn refresh_device_request_cache(state: &Arc<AppState>) {
    let state = state.clone();
    tokio::spawn(async move {
        match state.db.list_device_requests().await {
            Ok(fresh) => state.cache.put(cache::keys::DEVICE_REQUESTS, &fresh),
            Err(e) => tracing::warn!(error = %e, "Device request cache refresh failed"),
        }
    });
}

// ─── Push Tokens ─────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct RegisterPushTokenRequest {
    #[validate(length(min = 1, max = 200))]
    pub device_id: String,
    #[validate(length(min = 1, max = 500))]
    pub token: String,
}

/// Upsert this device's push token.
async fn register_push_token(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<RegisterPushTokenRequest>,
) -> Result<Json<AckResponse>> {
    validate_input(&request)?;

    let token = PushToken {
        user_id: user.user_id,
        device_id: request.device_id,
        token: request.token,
        updated_at: now_rfc3339(),
    };

    state.db.upsert_push_token(&token).await?;

    Ok(Json(AckResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_round_trip() {
        let cursor = FeedCursor {
            created_at: "2024-06-01T10:30:00.000123Z".to_string(),
            post_id: "7e0cbd42-9a1f-4f7e-93c8-2f8a6d9f1b11".to_string(),
        };

        let encoded = encode_cursor(&cursor);
        let decoded = parse_cursor(Some(&encoded)).unwrap().unwrap();

        assert_eq!(decoded, cursor);
    }

    #[test]
    fn test_cursor_rejects_invalid_input() {
        let err = parse_cursor(Some("not-base64!!")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_cursor_rejects_bad_timestamp() {
        let payload = URL_SAFE_NO_PAD.encode("not-a-date|some-id");
        let err = parse_cursor(Some(&payload)).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_cursor_rejects_wrong_part_count() {
        let payload = URL_SAFE_NO_PAD.encode("2024-06-01T10:30:00.000123Z");
        let err = parse_cursor(Some(&payload)).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
