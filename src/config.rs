//! Application configuration loaded from environment variables.
//!
//! Secrets (JWT signing key, image CDN API secret) are read once at startup
//! and cached in memory for the lifetime of the process.

use std::env;
use std::path::PathBuf;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed for CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Directory for the local snapshot cache
    pub cache_dir: Option<PathBuf>,

    // --- Image CDN ---
    /// Base URL of the image CDN API
    pub media_base_url: String,
    /// CDN cloud / account name (part of the upload and destroy URLs)
    pub media_cloud_name: String,
    /// CDN API key (public)
    pub media_api_key: String,
    /// CDN API secret (used to sign delete requests)
    pub media_api_secret: String,

    // --- Push relay ---
    /// Push notification relay endpoint
    pub push_relay_url: String,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:8081".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            cache_dir: env::var("CACHE_DIR").ok().map(PathBuf::from),

            media_base_url: env::var("MEDIA_BASE_URL")
                .unwrap_or_else(|_| "https://api.cloudinary.com/v1_1".to_string()),
            media_cloud_name: env::var("MEDIA_CLOUD_NAME")
                .map_err(|_| ConfigError::Missing("MEDIA_CLOUD_NAME"))?,
            media_api_key: env::var("MEDIA_API_KEY")
                .map_err(|_| ConfigError::Missing("MEDIA_API_KEY"))?,
            media_api_secret: env::var("MEDIA_API_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("MEDIA_API_SECRET"))?,

            push_relay_url: env::var("PUSH_RELAY_URL")
                .unwrap_or_else(|_| "https://exp.host/--/api/v2/push/send".to_string()),

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
        })
    }

    /// Default config for tests. Never used in production.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:8081".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            cache_dir: None,
            media_base_url: "http://localhost:9999".to_string(),
            media_cloud_name: "test-cloud".to_string(),
            media_api_key: "test_api_key".to_string(),
            media_api_secret: "test_api_secret".to_string(),
            push_relay_url: "http://localhost:9998/push".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("MEDIA_CLOUD_NAME", "demo");
        env::set_var("MEDIA_API_KEY", "key123");
        env::set_var("MEDIA_API_SECRET", "secret123");
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.media_cloud_name, "demo");
        assert_eq!(config.media_api_key, "key123");
        assert_eq!(config.port, 8080);
    }
}
