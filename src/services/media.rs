//! Image CDN client for signed deletes.
//!
//! Uploads happen directly from the mobile client with an unsigned
//! preset; the server only ever deletes. Deletion requires a signed
//! request: an HMAC-SHA256 over `public_id=…&timestamp=…` keyed with
//! the API secret.
//!
//! Every delete here is best-effort cleanup after a post or dealer is
//! removed. Failures are logged and swallowed; an orphaned remote
//! image is preferable to a failed user action.

use crate::config::Config;
use crate::error::AppError;
use futures_util::{stream, StreamExt};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

const MAX_CONCURRENT_DELETES: usize = 8;

/// Image CDN client.
#[derive(Clone)]
pub struct MediaService {
    http: reqwest::Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    /// Mock mode for tests: signing still works, nothing hits the network.
    offline: bool,
}

impl MediaService {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.media_base_url.clone(),
            cloud_name: config.media_cloud_name.clone(),
            api_key: config.media_api_key.clone(),
            api_secret: config.media_api_secret.clone(),
            offline: false,
        }
    }

    /// Create a mock client for testing (offline mode).
    pub fn new_mock() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "http://localhost:9999".to_string(),
            cloud_name: "test-cloud".to_string(),
            api_key: "test_api_key".to_string(),
            api_secret: "test_api_secret".to_string(),
            offline: true,
        }
    }

    /// Sign a delete request for `public_id` at `timestamp`.
    pub fn sign_delete(&self, public_id: &str, timestamp: u64) -> String {
        let payload = format!("public_id={}&timestamp={}", public_id, timestamp);

        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Delete a single hosted image by its delivery URL.
    pub async fn delete_image(&self, url: &str) -> Result<(), AppError> {
        let Some(public_id) = extract_public_id(url) else {
            tracing::warn!(url, "Not a CDN delivery URL, skipping delete");
            return Ok(());
        };

        if self.offline {
            tracing::debug!(public_id = %public_id, "Mock mode: skipping CDN delete");
            return Ok(());
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
            .as_secs();
        let signature = self.sign_delete(&public_id, timestamp);

        let destroy_url = format!("{}/{}/image/destroy", self.base_url, self.cloud_name);
        let response = self
            .http
            .post(&destroy_url)
            .form(&[
                ("public_id", public_id.as_str()),
                ("api_key", self.api_key.as_str()),
                ("timestamp", &timestamp.to_string()),
                ("signature", &signature),
            ])
            .send()
            .await
            .map_err(|e| AppError::MediaApi(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(AppError::MediaApi(format!(
                "destroy returned {}: {}",
                status, body
            )));
        }

        tracing::debug!(public_id = %public_id, result = %body, "CDN delete result");
        Ok(())
    }

    /// Best-effort batch delete. Individual failures are logged, never
    /// propagated, and never retried.
    pub async fn delete_images(&self, urls: &[String]) {
        if urls.is_empty() {
            return;
        }

        stream::iter(urls.to_vec())
            .for_each_concurrent(MAX_CONCURRENT_DELETES, |url| async move {
                if let Err(e) = self.delete_image(&url).await {
                    tracing::warn!(url = %url, error = %e, "Failed to delete hosted image");
                }
            })
            .await;
    }
}

/// Extract the CDN public ID from a delivery URL.
///
/// `https://res.example.com/demo/image/upload/v1712345678/shop/phone.jpg`
/// yields `shop/phone`. Returns `None` for anything without a
/// `/v<digits>/` segment and a file extension.
pub fn extract_public_id(url: &str) -> Option<String> {
    let mut tail: Option<&str> = None;
    for (i, _) in url.match_indices("/v") {
        let rest = &url[i + 2..];
        if let Some(slash) = rest.find('/') {
            if slash > 0 && rest[..slash].bytes().all(|b| b.is_ascii_digit()) {
                tail = Some(&rest[slash + 1..]);
            }
        }
    }

    let tail = tail?;
    let dot = tail.rfind('.')?;
    let ext = &tail[dot + 1..];
    if dot == 0 || ext.is_empty() || !ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }

    Some(tail[..dot].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_public_id_from_delivery_url() {
        let url = "https://res.example.com/demo/image/upload/v1712345678/abcd1234.jpg";
        assert_eq!(extract_public_id(url), Some("abcd1234".to_string()));
    }

    #[test]
    fn public_id_keeps_folder_segments() {
        let url = "https://res.example.com/demo/image/upload/v1/shops/pune/front.webp";
        assert_eq!(extract_public_id(url), Some("shops/pune/front".to_string()));
    }

    #[test]
    fn rejects_urls_without_version_segment() {
        assert_eq!(extract_public_id("https://example.com/photo.jpg"), None);
        assert_eq!(extract_public_id("not a url"), None);
    }

    #[test]
    fn rejects_urls_without_extension() {
        assert_eq!(
            extract_public_id("https://res.example.com/demo/upload/v123/abcd"),
            None
        );
    }

    #[test]
    fn signature_is_deterministic_hex() {
        let service = MediaService::new_mock();

        let a = service.sign_delete("abcd1234", 1_712_345_678);
        let b = service.sign_delete("abcd1234", 1_712_345_678);

        assert_eq!(a, b);
        assert_eq!(a.len(), 64); // SHA-256 hex
        assert!(a.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn signature_binds_public_id_and_timestamp() {
        let service = MediaService::new_mock();

        let base = service.sign_delete("abcd1234", 1_712_345_678);
        assert_ne!(base, service.sign_delete("abcd1235", 1_712_345_678));
        assert_ne!(base, service.sign_delete("abcd1234", 1_712_345_679));
    }
}
