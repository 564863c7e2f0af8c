//! Push notification token model.

use serde::{Deserialize, Serialize};

/// A device push token, upserted per (user, device).
///
/// The document ID is `{user_id}_{device_id}` (device ID URL-encoded),
/// so re-registering the same device overwrites its previous token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushToken {
    pub user_id: String,
    pub device_id: String,
    /// Relay-issued token string
    pub token: String,
    /// Last upsert time (RFC3339)
    pub updated_at: String,
}
