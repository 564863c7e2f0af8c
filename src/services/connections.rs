//! Connection state resolver and transitions.
//!
//! Computes the relationship between the signed-in viewer and another
//! dealer, and mutates it through compare-and-swap store operations.
//! All races (double-send, accept-vs-cancel) resolve by rejecting the
//! losing operation, never last-write-wins.

use crate::db::firestore::EdgeTransition;
use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::connection::{resolve_state, ConnectionState, EdgeStatus};
use crate::models::{ConnectionEdge, Profile};

/// Service wrapping the `dealer_network` edge collection.
#[derive(Clone)]
pub struct ConnectionService {
    db: FirestoreDb,
}

/// An inbound pending request joined with the sender's profile summary.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "mobile/src/lib/generated/")
)]
pub struct IncomingRequest {
    pub edge_id: String,
    pub sender_id: String,
    pub sender_shop_name: String,
    pub sender_city: String,
    pub sender_profile_image: Option<String>,
    pub requested_at: String,
}

impl ConnectionService {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    /// Resolve the viewer-relative state for a pair of users.
    pub async fn status(&self, viewer_id: &str, other_id: &str) -> Result<ConnectionState, AppError> {
        let edge = self.db.get_edge(viewer_id, other_id).await?;
        Ok(resolve_state(edge.as_ref(), viewer_id))
    }

    /// Send a connection request: `none -> sent`.
    ///
    /// The edge document is keyed by the normalized pair, so a
    /// concurrent send from either side loses the create and gets back
    /// the state the winner produced.
    pub async fn send(&self, viewer_id: &str, other_id: &str) -> Result<ConnectionState, AppError> {
        if viewer_id == other_id {
            return Err(AppError::BadRequest(
                "Cannot send a connection request to yourself".to_string(),
            ));
        }

        let edge = ConnectionEdge::pending(viewer_id, other_id);
        if self.db.insert_edge(&edge).await? {
            tracing::info!(sender = viewer_id, receiver = other_id, "Connection request sent");
            return Ok(ConnectionState::Sent);
        }

        // Lost the create: report the state that actually exists.
        let current = self.status(viewer_id, other_id).await?;
        Err(AppError::Conflict(format!(
            "A connection already exists for this pair (state: {:?})",
            current
        )))
    }

    /// Accept an inbound pending request: `pending -> connected`.
    pub async fn accept(&self, viewer_id: &str, other_id: &str) -> Result<ConnectionState, AppError> {
        match self.db.accept_edge_atomic(viewer_id, other_id).await? {
            EdgeTransition::Applied => Ok(ConnectionState::Connected),
            EdgeTransition::Rejected(edge) => {
                let state = resolve_state(edge.as_ref(), viewer_id);
                Err(AppError::Conflict(format!(
                    "Request is no longer pending (state: {:?})",
                    state
                )))
            }
        }
    }

    /// Remove whatever edge exists between the viewer and the other
    /// user: cancel an outbound request, decline an inbound one, or
    /// disconnect an accepted connection. Removing an absent edge is a
    /// no-op that resolves to `none`.
    pub async fn remove(&self, viewer_id: &str, other_id: &str) -> Result<ConnectionState, AppError> {
        let edge = self.db.get_edge(viewer_id, other_id).await?;

        let Some(edge) = edge else {
            return Ok(ConnectionState::None);
        };

        let expected = edge.status;
        match self
            .db
            .remove_edge_atomic(viewer_id, other_id, expected)
            .await?
        {
            EdgeTransition::Applied => {
                let action = match (expected, edge.sender_id == viewer_id) {
                    (EdgeStatus::Pending, true) => "cancelled",
                    (EdgeStatus::Pending, false) => "declined",
                    (EdgeStatus::Accepted, _) => "disconnected",
                };
                tracing::info!(viewer = viewer_id, other = other_id, action, "Connection removed");
                Ok(ConnectionState::None)
            }
            EdgeTransition::Rejected(edge) => {
                let state = resolve_state(edge.as_ref(), viewer_id);
                Err(AppError::Conflict(format!(
                    "Edge changed concurrently (state: {:?})",
                    state
                )))
            }
        }
    }

    /// List inbound pending requests with sender summaries, newest
    /// first. Senders whose profiles were rejected meanwhile are
    /// dropped from the list.
    pub async fn incoming(&self, viewer_id: &str) -> Result<Vec<IncomingRequest>, AppError> {
        let edges: Vec<ConnectionEdge> = self.db.list_incoming_edges(viewer_id).await?;

        let sender_ids: Vec<String> = edges.iter().map(|e| e.sender_id.clone()).collect();
        let profiles = self.db.get_profiles_map(&sender_ids).await?;

        Ok(edges
            .into_iter()
            .filter_map(|edge| {
                let sender: &Profile = profiles.get(&edge.sender_id)?;
                Some(IncomingRequest {
                    edge_id: edge.id,
                    sender_id: sender.id.clone(),
                    sender_shop_name: sender.shop_name.clone(),
                    sender_city: sender.city.clone(),
                    sender_profile_image: sender.profile_image.clone(),
                    requested_at: edge.created_at,
                })
            })
            .collect())
    }
}
