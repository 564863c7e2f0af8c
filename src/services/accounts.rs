//! Account management: credentials, password reset, dealer rejection.
//!
//! Passwords are hashed with argon2 and stored in their own collection,
//! keyed by normalized email so uniqueness is structural. Reset tokens
//! are stored as SHA-256 digests; the raw token exists only in the
//! reset email.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::profile::{Credential, ResetToken};
use crate::models::{Profile, Role};
use crate::services::media::MediaService;
use crate::time_utils::{format_utc_rfc3339, now_rfc3339};
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// New dealer sign-up data, already validated by the handler.
#[derive(Debug)]
pub struct NewDealer {
    pub shop_name: String,
    pub city: String,
    pub phone: String,
    pub email: String,
    pub password: String,
    pub bio: Option<String>,
}

/// Service for credential and account lifecycle operations.
#[derive(Clone)]
pub struct AccountsService {
    db: FirestoreDb,
}

impl AccountsService {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hash failed: {}", e)))
    }

    fn verify_password(&self, stored_hash: &str, password: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            tracing::error!("Stored password hash is malformed");
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Register a new dealer: credential + unapproved profile.
    pub async fn sign_up(&self, new_dealer: NewDealer) -> Result<Profile, AppError> {
        let user_id = uuid::Uuid::new_v4().to_string();
        let email = new_dealer.email.trim().to_lowercase();
        let now = now_rfc3339();

        let credential = Credential {
            user_id: user_id.clone(),
            email: email.clone(),
            password_hash: self.hash_password(&new_dealer.password)?,
            created_at: now.clone(),
        };

        if !self.db.insert_credential(&credential).await? {
            return Err(AppError::Conflict(
                "This email is already registered".to_string(),
            ));
        }

        let profile = Profile {
            id: user_id,
            shop_name: new_dealer.shop_name,
            city: new_dealer.city,
            phone: new_dealer.phone,
            email: email.clone(),
            bio: new_dealer.bio,
            profile_image: None,
            approved: false,
            role: Role::Dealer,
            connection_count: 0,
            created_at: now,
        };

        if let Err(e) = self.db.upsert_profile(&profile).await {
            // Compensate so the email is not burned by a half-created account.
            if let Err(cleanup) = self.db.delete_credential(&email).await {
                tracing::error!(email = %email, error = %cleanup, "Failed to roll back credential");
            }
            return Err(e);
        }

        tracing::info!(user_id = %profile.id, "Dealer signed up (awaiting approval)");
        Ok(profile)
    }

    /// Verify credentials and return the profile.
    pub async fn login(&self, email: &str, password: &str) -> Result<Profile, AppError> {
        let email = email.trim().to_lowercase();

        let Some(credential) = self.db.get_credential(&email).await? else {
            return Err(AppError::Unauthorized);
        };

        if !self.verify_password(&credential.password_hash, password) {
            return Err(AppError::Unauthorized);
        }

        // A rejected dealer's credential is deleted with the profile, so
        // a missing profile here means inconsistent state, not bad input.
        self.db
            .get_profile(&credential.user_id)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Issue a password reset token if the email is registered.
    ///
    /// Returns the raw token for the mail relay; callers must respond
    /// identically whether or not the email exists.
    pub async fn issue_reset_token(&self, email: &str) -> Result<Option<String>, AppError> {
        let email = email.trim().to_lowercase();

        let Some(credential) = self.db.get_credential(&email).await? else {
            return Ok(None);
        };

        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        let raw_token = hex::encode(bytes);

        let record = ResetToken {
            user_id: credential.user_id,
            email,
            expires_at: format_utc_rfc3339(
                chrono::Utc::now() + chrono::Duration::hours(RESET_TOKEN_TTL_HOURS),
            ),
            created_at: now_rfc3339(),
        };

        self.db
            .insert_reset_token(&digest_token(&raw_token), &record)
            .await?;

        Ok(Some(raw_token))
    }

    /// Consume a reset token and set a new password.
    pub async fn confirm_reset(&self, raw_token: &str, new_password: &str) -> Result<(), AppError> {
        let digest = digest_token(raw_token);

        let Some(record) = self.db.get_reset_token(&digest).await? else {
            return Err(AppError::BadRequest(
                "Invalid or expired reset token".to_string(),
            ));
        };

        let expired = chrono::DateTime::parse_from_rfc3339(&record.expires_at)
            .map(|t| t < chrono::Utc::now())
            .unwrap_or(true);
        if expired {
            self.db.delete_reset_token(&digest).await?;
            return Err(AppError::BadRequest(
                "Invalid or expired reset token".to_string(),
            ));
        }

        let Some(mut credential) = self.db.get_credential(&record.email).await? else {
            self.db.delete_reset_token(&digest).await?;
            return Err(AppError::BadRequest(
                "Invalid or expired reset token".to_string(),
            ));
        };

        credential.password_hash = self.hash_password(new_password)?;
        self.db.upsert_credential(&credential).await?;
        self.db.delete_reset_token(&digest).await?;

        tracing::info!(user_id = %credential.user_id, "Password reset");
        Ok(())
    }

    /// Admin rejection: remove every trace of a dealer.
    ///
    /// 1. Best-effort delete of the dealer's hosted images (post media
    ///    and profile picture) — collected before the rows disappear.
    /// 2. Delete posts, edges, device requests, push tokens, profile.
    /// 3. Delete the credential.
    ///
    /// Returns the number of store documents deleted.
    pub async fn reject_dealer(
        &self,
        user_id: &str,
        media: &MediaService,
    ) -> Result<usize, AppError> {
        let profile = self
            .db
            .get_profile(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Dealer {} not found", user_id)))?;

        let mut image_urls: Vec<String> = self
            .db
            .get_posts_for_user(user_id)
            .await?
            .into_iter()
            .flat_map(|post| post.media_urls)
            .collect();
        if let Some(profile_image) = &profile.profile_image {
            image_urls.push(profile_image.clone());
        }

        media.delete_images(&image_urls).await;

        let deleted = self.db.delete_dealer_data(user_id).await?;
        self.db.delete_credential(&profile.email).await?;

        tracing::info!(user_id, deleted, "Dealer rejected and removed");
        Ok(deleted + 1)
    }
}

/// SHA-256 digest of a raw token, hex-encoded, used as the document ID.
fn digest_token(raw_token: &str) -> String {
    hex::encode(Sha256::digest(raw_token.as_bytes()))
}
