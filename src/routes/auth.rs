//! Authentication routes: sign-up, login, logout, password reset.

use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::Result;
use crate::middleware::auth::{create_jwt, SESSION_COOKIE};
use crate::models::Profile;
use crate::routes::validate_input;
use crate::services::accounts::NewDealer;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/password-reset", post(password_reset))
        .route("/auth/password-reset/confirm", post(password_reset_confirm))
}

const SESSION_DAYS: i64 = 30;

fn session_cookie(token: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(SESSION_DAYS))
        .build()
}

/// Profile fields exposed to the client after auth.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "mobile/src/lib/generated/")
)]
pub struct ProfileSummary {
    pub id: String,
    pub shop_name: String,
    pub city: String,
    pub email: String,
    pub approved: bool,
}

impl From<&Profile> for ProfileSummary {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id.clone(),
            shop_name: profile.shop_name.clone(),
            city: profile.city.clone(),
            email: profile.email.clone(),
            approved: profile.approved,
        }
    }
}

// ─── Sign-up ─────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 100, message = "Shop name is required"))]
    pub shop_name: String,
    #[validate(length(min = 1, max = 100, message = "City is required"))]
    pub city: String,
    #[validate(custom(function = validate_phone))]
    pub phone: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
}

fn validate_phone(phone: &str) -> std::result::Result<(), validator::ValidationError> {
    if phone.len() == 10 && phone.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("phone")
            .with_message("Phone number must be 10 digits".into()))
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "mobile/src/lib/generated/")
)]
pub struct AuthResponse {
    pub token: String,
    pub approved: bool,
    pub profile: ProfileSummary,
}

/// Register a new dealer. The account stays unusable for posting and
/// networking until an admin approves it.
async fn signup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<SignupRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    validate_input(&request)?;

    let profile = state
        .accounts
        .sign_up(NewDealer {
            shop_name: request.shop_name.trim().to_string(),
            city: request.city.trim().to_string(),
            phone: request.phone,
            email: request.email,
            password: request.password,
            bio: request.bio.map(|b| b.trim().to_string()).filter(|b| !b.is_empty()),
        })
        .await?;

    let token = create_jwt(&profile.id, profile.role, &state.config.jwt_signing_key)?;
    let jar = jar.add(session_cookie(&token));

    Ok((
        jar,
        Json(AuthResponse {
            token,
            approved: profile.approved,
            profile: ProfileSummary::from(&profile),
        }),
    ))
}

// ─── Login / Logout ──────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    validate_input(&request)?;

    let profile = state.accounts.login(&request.email, &request.password).await?;

    let token = create_jwt(&profile.id, profile.role, &state.config.jwt_signing_key)?;
    let jar = jar.add(session_cookie(&token));

    tracing::info!(user_id = %profile.id, "Dealer logged in");

    Ok((
        jar,
        Json(AuthResponse {
            token,
            approved: profile.approved,
            profile: ProfileSummary::from(&profile),
        }),
    ))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "mobile/src/lib/generated/")
)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

async fn logout(jar: CookieJar) -> (CookieJar, Json<StatusResponse>) {
    let jar = jar.remove(Cookie::from(SESSION_COOKIE));
    (
        jar,
        Json(StatusResponse {
            success: true,
            message: "Logged out".to_string(),
        }),
    )
}

// ─── Password Reset ──────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct PasswordResetRequest {
    #[validate(email)]
    pub email: String,
}

/// Issue a reset token. The response is identical whether or not the
/// email is registered.
async fn password_reset(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PasswordResetRequest>,
) -> Result<Json<StatusResponse>> {
    validate_input(&request)?;

    if let Some(token) = state.accounts.issue_reset_token(&request.email).await? {
        // Handed to the mail relay out-of-band; the raw token is only
        // logged at debug level for local development.
        tracing::debug!(reset_token = %token, "Password reset token issued");
    }

    Ok(Json(StatusResponse {
        success: true,
        message: "If that email is registered, a reset link has been sent".to_string(),
    }))
}

#[derive(Deserialize, Validate)]
pub struct PasswordResetConfirmRequest {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 8, max = 128, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

async fn password_reset_confirm(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PasswordResetConfirmRequest>,
) -> Result<Json<StatusResponse>> {
    validate_input(&request)?;

    state
        .accounts
        .confirm_reset(&request.token, &request.new_password)
        .await?;

    Ok(Json(StatusResponse {
        success: true,
        message: "Password updated. Please log in again".to_string(),
    }))
}
