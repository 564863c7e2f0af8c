//! Post lifecycle: optimistic submissions, edits, deletes.
//!
//! The mobile client uploads images straight to the CDN, shows a local
//! placeholder, then submits the draft here. Each submission moves
//! through the `PostSubmission` tagged union and is reconciled by the
//! client reference it supplied. When the store insert fails after a
//! successful upload, the uploaded images are deleted best-effort
//! instead of being left orphaned.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::post::PostDraft;
use crate::models::{Post, PostSubmission};
use crate::services::media::MediaService;
use crate::time_utils::now_rfc3339;
use dashmap::DashMap;
use std::sync::Arc;

/// Service for post mutations.
#[derive(Clone)]
pub struct PostService {
    db: FirestoreDb,
    media: MediaService,
    /// In-flight and recently-settled submissions, keyed by client ref.
    submissions: Arc<DashMap<String, PostSubmission>>,
}

impl PostService {
    pub fn new(db: FirestoreDb, media: MediaService) -> Self {
        Self {
            db,
            media,
            submissions: Arc::new(DashMap::new()),
        }
    }

    /// Create a post from a validated draft.
    ///
    /// `client_ref` is the client's temporary identifier for its
    /// optimistic placeholder; one is generated when absent.
    pub async fn create(
        &self,
        draft: PostDraft,
        client_ref: Option<String>,
    ) -> Result<Post, AppError> {
        let client_ref = client_ref.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        self.submissions.insert(
            client_ref.clone(),
            PostSubmission::Pending {
                client_ref: client_ref.clone(),
                draft: draft.clone(),
            },
        );

        let post = Post {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: draft.user_id,
            product_name: draft.product_name,
            description: draft.description,
            price: draft.price,
            hide_price: draft.hide_price,
            media_urls: draft.media_urls,
            created_at: now_rfc3339(),
        };

        match self.db.insert_post(&post).await {
            Ok(()) => {
                self.submissions.insert(
                    client_ref.clone(),
                    PostSubmission::Committed {
                        client_ref,
                        post: post.clone(),
                    },
                );
                tracing::info!(post_id = %post.id, user_id = %post.user_id, "Post created");
                Ok(post)
            }
            Err(e) => {
                self.submissions.insert(
                    client_ref.clone(),
                    PostSubmission::Failed {
                        client_ref,
                        error: "The listing could not be saved".to_string(),
                    },
                );

                // The images were already uploaded; don't leave them orphaned.
                let media = self.media.clone();
                let urls = post.media_urls.clone();
                tokio::spawn(async move {
                    media.delete_images(&urls).await;
                });

                Err(e)
            }
        }
    }

    /// Reconcile a submission by client ref. Settled entries are
    /// removed once read; the authoritative record is in the store.
    pub fn reconcile(&self, client_ref: &str) -> Option<PostSubmission> {
        let submission = self.submissions.get(client_ref)?.clone();
        if submission.is_settled() {
            self.submissions.remove(client_ref);
        }
        Some(submission)
    }

    /// Owner edit. Images dropped from the listing are deleted
    /// best-effort from the CDN.
    pub async fn update(
        &self,
        viewer_id: &str,
        post_id: &str,
        mut updated: Post,
    ) -> Result<Post, AppError> {
        let existing = self
            .db
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))?;

        if existing.user_id != viewer_id {
            return Err(AppError::Forbidden(
                "Only the owner can edit a post".to_string(),
            ));
        }

        // Identity and provenance are not editable.
        updated.id = existing.id.clone();
        updated.user_id = existing.user_id.clone();
        updated.created_at = existing.created_at.clone();

        self.db.upsert_post(&updated).await?;

        let removed: Vec<String> = existing
            .media_urls
            .iter()
            .filter(|url| !updated.media_urls.contains(*url))
            .cloned()
            .collect();
        if !removed.is_empty() {
            let media = self.media.clone();
            tokio::spawn(async move {
                media.delete_images(&removed).await;
            });
        }

        tracing::info!(post_id = %updated.id, "Post updated");
        Ok(updated)
    }

    /// Owner delete, with best-effort CDN cleanup of the post's images.
    pub async fn delete(&self, viewer_id: &str, post_id: &str) -> Result<(), AppError> {
        let existing = self
            .db
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))?;

        if existing.user_id != viewer_id {
            return Err(AppError::Forbidden(
                "Only the owner can delete a post".to_string(),
            ));
        }

        self.db.delete_post(post_id).await?;

        let media = self.media.clone();
        tokio::spawn(async move {
            media.delete_images(&existing.media_urls).await;
        });

        tracing::info!(post_id, "Post deleted");
        Ok(())
    }
}
