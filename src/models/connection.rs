//! Connection edge model and the viewer-relative state machine.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Persisted status of a connection edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStatus {
    Pending,
    Accepted,
}

/// A directed connection request that becomes an undirected connection
/// once accepted.
///
/// The document ID is `pair_key(sender, receiver)`, which makes the
/// at-most-one-edge-per-unordered-pair invariant structural: a second
/// send for the same pair is a create on an existing document and fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEdge {
    /// Normalized pair key (also used as document ID)
    pub id: String,
    /// User who sent the request
    pub sender_id: String,
    /// User who received the request
    pub receiver_id: String,
    pub status: EdgeStatus,
    /// When the request was sent (RFC3339)
    pub created_at: String,
}

impl ConnectionEdge {
    /// A fresh pending edge for `sender -> receiver`, stamped now.
    pub fn pending(sender_id: &str, receiver_id: &str) -> Self {
        Self {
            id: pair_key(sender_id, receiver_id),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            status: EdgeStatus::Pending,
            created_at: crate::time_utils::now_rfc3339(),
        }
    }
}

/// Relationship between the signed-in viewer and another profile.
///
/// `sent` and `pending` are the two sides of the same stored edge; which
/// one the viewer sees depends on whether they are the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "mobile/src/lib/generated/")
)]
pub enum ConnectionState {
    None,
    Sent,
    Pending,
    Connected,
}

/// Normalized document key for the unordered pair `(a, b)`.
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{}_{}", a, b)
    } else {
        format!("{}_{}", b, a)
    }
}

/// Resolve the viewer-relative state from the stored edge, if any.
pub fn resolve_state(edge: Option<&ConnectionEdge>, viewer_id: &str) -> ConnectionState {
    match edge {
        None => ConnectionState::None,
        Some(edge) => match edge.status {
            EdgeStatus::Accepted => ConnectionState::Connected,
            EdgeStatus::Pending => {
                if edge.sender_id == viewer_id {
                    ConnectionState::Sent
                } else {
                    ConnectionState::Pending
                }
            }
        },
    }
}
