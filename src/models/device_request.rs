//! "Device wanted" request model.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A dealer's public ask for a specific device spec they want to buy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "mobile/src/lib/generated/")
)]
pub struct DeviceRequest {
    /// Request ID (also used as document ID)
    pub id: String,
    /// Owning dealer's user ID
    pub user_id: String,
    /// Desired model, e.g. "Pixel 8"
    pub model: String,
    /// Storage variant, e.g. "256GB"
    pub storage: String,
    pub ram: Option<String>,
    pub color: Option<String>,
    /// Desired condition, e.g. "Like new"
    pub condition: Option<String>,
    /// Maximum price in whole rupees
    pub max_price: Option<u32>,
    /// Only "active" requests exist today; kept for future states
    pub status: String,
    /// When the request was posted (RFC3339)
    pub created_at: String,
}
