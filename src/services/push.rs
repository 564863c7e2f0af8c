//! Push notification relay client.
//!
//! Submits batches of `{to, title, body, data}` messages to the push
//! gateway. Delivery is fire-and-forget: the relay's response is
//! logged and nothing is retried.

use crate::config::Config;
use crate::db::FirestoreDb;
use serde::Serialize;

/// One message for the relay.
#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    pub to: String,
    pub sound: String,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

impl PushMessage {
    pub fn new(to: &str, title: &str, body: &str, data: serde_json::Value) -> Self {
        Self {
            to: to.to_string(),
            sound: "default".to_string(),
            title: title.to_string(),
            body: body.to_string(),
            data,
        }
    }
}

/// Push relay client.
#[derive(Clone)]
pub struct PushService {
    http: reqwest::Client,
    relay_url: String,
    /// Mock mode for tests: nothing hits the network.
    offline: bool,
}

impl PushService {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            relay_url: config.push_relay_url.clone(),
            offline: false,
        }
    }

    /// Create a mock client for testing (offline mode).
    pub fn new_mock() -> Self {
        Self {
            http: reqwest::Client::new(),
            relay_url: "http://localhost:9998/push".to_string(),
            offline: true,
        }
    }

    /// Submit a batch of messages. Never returns an error — push is a
    /// soft affordance and must not fail the action that triggered it.
    pub async fn send_messages(&self, messages: Vec<PushMessage>) {
        if messages.is_empty() {
            return;
        }

        if self.offline {
            tracing::debug!(count = messages.len(), "Mock mode: skipping push relay");
            return;
        }

        let result = self
            .http
            .post(&self.relay_url)
            .json(&messages)
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                if status.is_success() {
                    tracing::debug!(count = messages.len(), result = %body, "Push relay accepted");
                } else {
                    tracing::warn!(status = %status, result = %body, "Push relay rejected batch");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Push relay unreachable");
            }
        }
    }

    /// Notify every registered device of one user.
    pub async fn notify_user(
        &self,
        db: &FirestoreDb,
        user_id: &str,
        title: &str,
        body: &str,
        data: serde_json::Value,
    ) {
        let tokens = match db.get_push_tokens(user_id).await {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to load push tokens");
                return;
            }
        };

        if tokens.is_empty() {
            tracing::debug!(user_id, "No push tokens registered");
            return;
        }

        let messages = tokens
            .iter()
            .map(|t| PushMessage::new(&t.token, title, body, data.clone()))
            .collect();

        self.send_messages(messages).await;
    }
}
