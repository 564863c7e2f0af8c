//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const PROFILES: &str = "profiles";
    pub const POSTS: &str = "posts";
    /// Connection edges, keyed by normalized unordered pair
    pub const DEALER_NETWORK: &str = "dealer_network";
    pub const DEVICE_REQUESTS: &str = "device_requests";
    pub const PUSH_TOKENS: &str = "push_tokens";
    /// Login credentials, keyed by normalized email
    pub const CREDENTIALS: &str = "credentials";
    /// Password reset tokens, keyed by token digest
    pub const RESET_TOKENS: &str = "reset_tokens";
}
