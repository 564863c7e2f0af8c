//! Dealer profile model for storage and API.

use serde::{Deserialize, Serialize};

/// Account role. Admins approve or reject dealer sign-ups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Dealer,
    Admin,
}

/// Dealer profile stored in Firestore.
///
/// The document ID is the same UUID as the authentication identity, so a
/// profile lookup never needs a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// User ID (also used as document ID)
    pub id: String,
    /// Shop / business name
    pub shop_name: String,
    /// City the shop operates in
    pub city: String,
    /// Contact phone (10 digits, national format)
    pub phone: String,
    /// Email address
    pub email: String,
    /// Free-form shop bio
    pub bio: Option<String>,
    /// Profile picture URL (image CDN)
    pub profile_image: Option<String>,
    /// Whether an admin has approved this dealer
    pub approved: bool,
    /// Account role
    pub role: Role,
    /// Denormalized count of accepted connections.
    /// Maintained transactionally with edge writes.
    #[serde(default)]
    pub connection_count: u32,
    /// When the profile was created (RFC3339)
    pub created_at: String,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Stored login credential, keyed by normalized email.
///
/// Kept in its own collection so profile reads never carry the
/// password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Owning user ID
    pub user_id: String,
    /// Normalized (lowercased) email, duplicated from the document ID
    pub email: String,
    /// Argon2 password hash (PHC string)
    pub password_hash: String,
    /// When the credential was created (RFC3339)
    pub created_at: String,
}

/// Single-use password reset token record.
///
/// The document ID is the SHA-256 digest of the raw token, so raw
/// tokens are never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetToken {
    /// Owning user ID
    pub user_id: String,
    /// Email the credential is keyed by
    pub email: String,
    /// Expiry (RFC3339)
    pub expires_at: String,
    /// When the token was issued (RFC3339)
    pub created_at: String,
}
