//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Profiles (dealer shops, approval state, connection counts)
//! - Posts (product listings)
//! - Connection edges (`dealer_network`, keyed by normalized pair)
//! - Device requests
//! - Push tokens
//! - Credentials and password reset tokens

use crate::db::collections;
use crate::error::AppError;
use crate::models::connection::{pair_key, ConnectionEdge, EdgeStatus};
use crate::models::profile::{Credential, ResetToken};
use crate::models::{DeviceRequest, Post, Profile, PushToken};
use futures_util::{stream, StreamExt};
use std::collections::HashMap;

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Cursor into the newest-first post feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostQueryCursor<'a> {
    /// `created_at` of the last post the client has seen (RFC3339)
    pub created_at: &'a str,
}

/// Outcome of a compare-and-swap connection transition.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeTransition {
    /// The transition was applied.
    Applied,
    /// The precondition no longer held; the edge as currently stored
    /// (if any) is returned so the caller can re-resolve state.
    Rejected(Option<ConnectionEdge>),
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Profile Operations ──────────────────────────────────────

    /// Get a profile by user ID.
    pub async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PROFILES)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a profile.
    pub async fn upsert_profile(&self, profile: &Profile) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PROFILES)
            .document_id(&profile.id)
            .object(profile)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a profile document.
    pub async fn delete_profile(&self, user_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::PROFILES)
            .document_id(user_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List dealers awaiting admin approval.
    pub async fn list_pending_dealers(&self) -> Result<Vec<Profile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PROFILES)
            .filter(|q| {
                q.for_all([
                    q.field("approved").eq(false),
                    q.field("role").eq("dealer"),
                ])
            })
            .order_by([(
                "created_at",
                firestore::FirestoreQueryDirection::Ascending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List all approved profiles, ordered by shop name.
    ///
    /// Used for the in-memory search snapshot; realistic data volumes
    /// are small enough for a full fetch.
    pub async fn list_approved_profiles(&self) -> Result<Vec<Profile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PROFILES)
            .filter(|q| q.for_all([q.field("approved").eq(true)]))
            .order_by([("shop_name", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch profiles for a set of user IDs, keyed by ID.
    ///
    /// Missing profiles (rejected dealers) are silently absent from
    /// the result.
    pub async fn get_profiles_map(
        &self,
        user_ids: &[String],
    ) -> Result<HashMap<String, Profile>, AppError> {
        let mut ids: Vec<String> = user_ids.to_vec();
        ids.sort();
        ids.dedup();

        let results: Vec<Result<Option<Profile>, AppError>> = stream::iter(ids)
            .map(|id| async move { self.get_profile(&id).await })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect()
            .await;

        let mut map = HashMap::new();
        for result in results {
            if let Some(profile) = result? {
                map.insert(profile.id.clone(), profile);
            }
        }
        Ok(map)
    }

    // ─── Post Operations ─────────────────────────────────────────

    /// Get a post by ID.
    pub async fn get_post(&self, post_id: &str) -> Result<Option<Post>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::POSTS)
            .obj()
            .one(post_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a post. Fails if the document already exists.
    pub async fn insert_post(&self, post: &Post) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::POSTS)
            .document_id(&post.id)
            .object(post)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Overwrite an existing post (owner edit).
    pub async fn upsert_post(&self, post: &Post) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::POSTS)
            .document_id(&post.id)
            .object(post)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a post document.
    pub async fn delete_post(&self, post_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::POSTS)
            .document_id(post_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get all posts for one dealer, newest first.
    pub async fn get_posts_for_user(&self, user_id: &str) -> Result<Vec<Post>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::POSTS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .order_by([(
                "created_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a page of the global feed, newest first.
    ///
    /// The cursor is the `created_at` of the last seen post; RFC3339
    /// strings are fixed-width so the lexicographic comparison matches
    /// chronological order.
    pub async fn get_feed_page(
        &self,
        cursor: Option<PostQueryCursor<'_>>,
        limit: u32,
    ) -> Result<Vec<Post>, AppError> {
        let query = self.get_client()?.fluent().select().from(collections::POSTS);

        let query = if let Some(cursor) = cursor {
            let after = cursor.created_at.to_string();
            query.filter(move |q| q.for_all([q.field("created_at").less_than(after.clone())]))
        } else {
            query
        };

        query
            .order_by([(
                "created_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get every post, newest first (search snapshot refresh).
    pub async fn list_all_posts(&self) -> Result<Vec<Post>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::POSTS)
            .order_by([(
                "created_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Connection Edge Operations ──────────────────────────────

    /// Get the edge between two users, if any.
    ///
    /// The document ID is the normalized pair key, so the "either
    /// direction" lookup is a single read.
    pub async fn get_edge(&self, a: &str, b: &str) -> Result<Option<ConnectionEdge>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::DEALER_NETWORK)
            .obj()
            .one(&pair_key(a, b))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a pending edge. Returns `false` (without writing) if an
    /// edge for the pair already exists — the double-send guard.
    pub async fn insert_edge(&self, edge: &ConnectionEdge) -> Result<bool, AppError> {
        let insert = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::DEALER_NETWORK)
            .document_id(&edge.id)
            .object(edge)
            .execute::<()>()
            .await;

        match insert {
            Ok(()) => Ok(true),
            Err(e) => {
                // Distinguish "document already exists" from real failures
                // without relying on the driver's error formatting.
                if self
                    .get_edge(&edge.sender_id, &edge.receiver_id)
                    .await?
                    .is_some()
                {
                    Ok(false)
                } else {
                    Err(AppError::Database(e.to_string()))
                }
            }
        }
    }

    /// Accept a pending inbound edge, atomically with both profiles'
    /// connection counts.
    ///
    /// The transaction re-reads the edge; if it is no longer pending
    /// toward `viewer_id` (cancelled, already accepted, or never
    /// existed) the transition is rejected and the current edge is
    /// returned instead — the second operation of a race loses.
    pub async fn accept_edge_atomic(
        &self,
        viewer_id: &str,
        other_id: &str,
    ) -> Result<EdgeTransition, AppError> {
        let client = self.get_client()?;
        let edge_id = pair_key(viewer_id, other_id);

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // Read the edge within the transaction window so the commit
        // detects concurrent writes to it.
        let edge = self.get_edge(viewer_id, other_id).await?;

        let edge = match edge {
            Some(e) if e.status == EdgeStatus::Pending && e.receiver_id == viewer_id => e,
            other => {
                let _ = transaction.rollback().await;
                return Ok(EdgeTransition::Rejected(other));
            }
        };

        let accepted = ConnectionEdge {
            status: EdgeStatus::Accepted,
            ..edge.clone()
        };

        client
            .fluent()
            .update()
            .in_col(collections::DEALER_NETWORK)
            .document_id(&edge_id)
            .object(&accepted)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add edge to transaction: {}", e)))?;

        // Bump both dealers' denormalized counts in the same commit.
        for user_id in [viewer_id, other_id] {
            let mut profile = self.get_profile(user_id).await?.ok_or_else(|| {
                AppError::Database(format!("Profile {} missing during accept", user_id))
            })?;
            profile.connection_count = profile.connection_count.saturating_add(1);

            client
                .fluent()
                .update()
                .in_col(collections::PROFILES)
                .document_id(user_id)
                .object(&profile)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add profile to transaction: {}", e))
                })?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(edge_id = %edge_id, "Connection accepted");
        Ok(EdgeTransition::Applied)
    }

    /// Remove the edge between two users, atomically decrementing both
    /// connection counts when the edge was accepted.
    ///
    /// `expected_status` is the compare-and-swap precondition. Removing
    /// an edge that is already absent is reported as `Applied` — the
    /// disconnect is idempotent.
    pub async fn remove_edge_atomic(
        &self,
        viewer_id: &str,
        other_id: &str,
        expected_status: EdgeStatus,
    ) -> Result<EdgeTransition, AppError> {
        let client = self.get_client()?;
        let edge_id = pair_key(viewer_id, other_id);

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let edge = self.get_edge(viewer_id, other_id).await?;

        let edge = match edge {
            None => {
                let _ = transaction.rollback().await;
                return Ok(EdgeTransition::Applied);
            }
            Some(e) if e.status == expected_status => e,
            other => {
                let _ = transaction.rollback().await;
                return Ok(EdgeTransition::Rejected(other));
            }
        };

        client
            .fluent()
            .delete()
            .from(collections::DEALER_NETWORK)
            .document_id(&edge_id)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add edge delete to transaction: {}", e))
            })?;

        if edge.status == EdgeStatus::Accepted {
            for user_id in [viewer_id, other_id] {
                let Some(mut profile) = self.get_profile(user_id).await? else {
                    // Counterparty already rejected by an admin; nothing to decrement.
                    continue;
                };
                profile.connection_count = profile.connection_count.saturating_sub(1);

                client
                    .fluent()
                    .update()
                    .in_col(collections::PROFILES)
                    .document_id(user_id)
                    .object(&profile)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!("Failed to add profile to transaction: {}", e))
                    })?;
            }
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(edge_id = %edge_id, "Connection edge removed");
        Ok(EdgeTransition::Applied)
    }

    /// List pending inbound requests for a user, newest first.
    pub async fn list_incoming_edges(
        &self,
        user_id: &str,
    ) -> Result<Vec<ConnectionEdge>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::DEALER_NETWORK)
            .filter(move |q| {
                q.for_all([
                    q.field("receiver_id").eq(user_id.clone()),
                    q.field("status").eq("pending"),
                ])
            })
            .order_by([(
                "created_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List every edge touching a user, in either direction.
    pub async fn list_edges_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<ConnectionEdge>, AppError> {
        let sender = user_id.to_string();
        let outbound: Vec<ConnectionEdge> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::DEALER_NETWORK)
            .filter(move |q| q.for_all([q.field("sender_id").eq(sender.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let receiver = user_id.to_string();
        let inbound: Vec<ConnectionEdge> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::DEALER_NETWORK)
            .filter(move |q| q.for_all([q.field("receiver_id").eq(receiver.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut edges = outbound;
        edges.extend(inbound);
        Ok(edges)
    }

    // ─── Device Request Operations ───────────────────────────────

    pub async fn get_device_request(
        &self,
        request_id: &str,
    ) -> Result<Option<DeviceRequest>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::DEVICE_REQUESTS)
            .obj()
            .one(request_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn insert_device_request(&self, request: &DeviceRequest) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::DEVICE_REQUESTS)
            .document_id(&request.id)
            .object(request)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn delete_device_request(&self, request_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::DEVICE_REQUESTS)
            .document_id(request_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List all active device requests, newest first.
    pub async fn list_device_requests(&self) -> Result<Vec<DeviceRequest>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::DEVICE_REQUESTS)
            .filter(|q| q.for_all([q.field("status").eq("active")]))
            .order_by([(
                "created_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List device requests owned by one user.
    pub async fn list_device_requests_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<DeviceRequest>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::DEVICE_REQUESTS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Push Token Operations ───────────────────────────────────

    /// Upsert a device token. Document ID combines user and device so
    /// re-registration overwrites.
    pub async fn upsert_push_token(&self, token: &PushToken) -> Result<(), AppError> {
        let safe_device = urlencoding::encode(&token.device_id);
        let doc_id = format!("{}_{}", token.user_id, safe_device);

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PUSH_TOKENS)
            .document_id(&doc_id)
            .object(token)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get all push tokens registered for a user.
    pub async fn get_push_tokens(&self, user_id: &str) -> Result<Vec<PushToken>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PUSH_TOKENS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Credential Operations ───────────────────────────────────

    fn credential_doc_id(email: &str) -> String {
        urlencoding::encode(&email.to_lowercase()).into_owned()
    }

    /// Get a credential by email.
    pub async fn get_credential(&self, email: &str) -> Result<Option<Credential>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CREDENTIALS)
            .obj()
            .one(&Self::credential_doc_id(email))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a credential. Returns `false` (without writing) when the
    /// email is already registered.
    pub async fn insert_credential(&self, credential: &Credential) -> Result<bool, AppError> {
        let insert = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::CREDENTIALS)
            .document_id(&Self::credential_doc_id(&credential.email))
            .object(credential)
            .execute::<()>()
            .await;

        match insert {
            Ok(()) => Ok(true),
            Err(e) => {
                if self.get_credential(&credential.email).await?.is_some() {
                    Ok(false)
                } else {
                    Err(AppError::Database(e.to_string()))
                }
            }
        }
    }

    /// Overwrite a credential (password change).
    pub async fn upsert_credential(&self, credential: &Credential) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::CREDENTIALS)
            .document_id(&Self::credential_doc_id(&credential.email))
            .object(credential)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn delete_credential(&self, email: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::CREDENTIALS)
            .document_id(&Self::credential_doc_id(email))
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Reset Token Operations ──────────────────────────────────

    pub async fn insert_reset_token(
        &self,
        token_digest: &str,
        token: &ResetToken,
    ) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::RESET_TOKENS)
            .document_id(token_digest)
            .object(token)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn get_reset_token(
        &self,
        token_digest: &str,
    ) -> Result<Option<ResetToken>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::RESET_TOKENS)
            .obj()
            .one(token_digest)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn delete_reset_token(&self, token_digest: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::RESET_TOKENS)
            .document_id(token_digest)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Helper Methods ──────────────────────────────────────────

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }

    // ─── Dealer Data Deletion (admin rejection) ──────────────────

    /// Delete ALL data for a dealer.
    ///
    /// Deletes from all collections:
    /// - `posts` (query by user_id)
    /// - `dealer_network` edges in either direction, decrementing the
    ///   counterparty's connection count for accepted edges
    /// - `device_requests` (query by user_id)
    /// - `push_tokens` (query by user_id)
    /// - `profiles/{user_id}`
    ///
    /// The credential is deleted separately by the caller, which holds
    /// the email. Image CDN cleanup also happens at the caller, which
    /// collects media URLs before the rows disappear.
    ///
    /// Returns the number of documents deleted.
    pub async fn delete_dealer_data(&self, user_id: &str) -> Result<usize, AppError> {
        let mut deleted_count = 0;

        // 1. Delete all posts
        let posts = self.get_posts_for_user(user_id).await?;
        let count = posts.len();
        self.batch_delete(&posts, collections::POSTS, |post: &Post| post.id.clone())
            .await?;
        deleted_count += count;
        tracing::debug!(user_id, count, "Deleted posts");

        // 2. Delete connection edges, fixing counterparty counts
        let edges = self.list_edges_for_user(user_id).await?;
        for edge in &edges {
            if edge.status != EdgeStatus::Accepted {
                continue;
            }
            let other = if edge.sender_id == user_id {
                &edge.receiver_id
            } else {
                &edge.sender_id
            };
            if let Some(mut profile) = self.get_profile(other).await? {
                profile.connection_count = profile.connection_count.saturating_sub(1);
                self.upsert_profile(&profile).await?;
            }
        }
        let count = edges.len();
        self.batch_delete(
            &edges,
            collections::DEALER_NETWORK,
            |edge: &ConnectionEdge| edge.id.clone(),
        )
        .await?;
        deleted_count += count;
        tracing::debug!(user_id, count, "Deleted connection edges");

        // 3. Delete device requests
        let requests = self.list_device_requests_for_user(user_id).await?;
        let count = requests.len();
        self.batch_delete(
            &requests,
            collections::DEVICE_REQUESTS,
            |request: &DeviceRequest| request.id.clone(),
        )
        .await?;
        deleted_count += count;
        tracing::debug!(user_id, count, "Deleted device requests");

        // 4. Delete push tokens
        let tokens = self.get_push_tokens(user_id).await?;
        let count = tokens.len();
        self.batch_delete(
            &tokens,
            collections::PUSH_TOKENS,
            |token: &PushToken| {
                format!("{}_{}", token.user_id, urlencoding::encode(&token.device_id))
            },
        )
        .await?;
        deleted_count += count;
        tracing::debug!(user_id, count, "Deleted push tokens");

        // 5. Delete the profile itself
        self.delete_profile(user_id).await?;
        deleted_count += 1;
        tracing::debug!(user_id, "Deleted profile");

        tracing::info!(user_id, deleted_count, "Dealer data deletion complete");

        Ok(deleted_count)
    }

    /// Flip the approval flag on a dealer profile.
    ///
    /// Fetch-modify-write, preserving all other fields.
    pub async fn approve_dealer(&self, user_id: &str) -> Result<Profile, AppError> {
        let mut profile = self
            .get_profile(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Dealer {} not found", user_id)))?;

        profile.approved = true;
        self.upsert_profile(&profile).await?;
        Ok(profile)
    }
}
