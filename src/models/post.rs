//! Product listing model and the submission lifecycle.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Stored product listing in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "mobile/src/lib/generated/")
)]
pub struct Post {
    /// Post ID (also used as document ID)
    pub id: String,
    /// Owning dealer's user ID
    pub user_id: String,
    /// Product name, e.g. "iPhone 15 Pro"
    pub product_name: String,
    /// Optional free-form description
    pub description: Option<String>,
    /// Asking price in whole rupees
    pub price: Option<u32>,
    /// Hide the price in listings ("DM for price")
    #[serde(default)]
    pub hide_price: bool,
    /// Hosted image URLs, 1-4 entries, in display order
    pub media_urls: Vec<String>,
    /// When the post was created (RFC3339)
    pub created_at: String,
}

/// Draft of a post before it is committed to the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "mobile/src/lib/generated/")
)]
pub struct PostDraft {
    pub user_id: String,
    pub product_name: String,
    pub description: Option<String>,
    pub price: Option<u32>,
    pub hide_price: bool,
    pub media_urls: Vec<String>,
}

/// Lifecycle of an optimistic post submission.
///
/// A client shows a locally-constructed placeholder immediately and later
/// reconciles it against the stored record by `client_ref`. Each submission
/// is exactly one of these states; there is no shared mutable slot.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "mobile/src/lib/generated/")
)]
pub enum PostSubmission {
    /// Accepted for processing, images uploaded, insert not yet confirmed.
    Pending {
        client_ref: String,
        draft: PostDraft,
    },
    /// Stored; `post.id` is the authoritative identifier.
    Committed { client_ref: String, post: Post },
    /// Insert failed; uploaded images have been handed to cleanup.
    Failed { client_ref: String, error: String },
}

impl PostSubmission {
    /// The client reference this submission reconciles against.
    pub fn client_ref(&self) -> &str {
        match self {
            PostSubmission::Pending { client_ref, .. }
            | PostSubmission::Committed { client_ref, .. }
            | PostSubmission::Failed { client_ref, .. } => client_ref,
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, PostSubmission::Pending { .. })
    }
}
