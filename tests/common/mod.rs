use dealerhub::cache::CacheStore;
use dealerhub::config::Config;
use dealerhub::db::FirestoreDb;
use dealerhub::events::EventBus;
use dealerhub::middleware::auth::create_jwt;
use dealerhub::models::Role;
use dealerhub::routes::create_router;
use dealerhub::services::{
    AccountsService, ConnectionService, MediaService, PostService, PushService, SearchService,
};
use dealerhub::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db = test_db_offline();
    build_app(config, db)
}

/// Create a test app over the Firestore emulator.
#[allow(dead_code)]
pub async fn create_emulator_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db = test_db().await;
    build_app(config, db)
}

fn build_app(config: Config, db: FirestoreDb) -> (axum::Router, Arc<AppState>) {
    let media = MediaService::new_mock();

    let state = Arc::new(AppState {
        accounts: AccountsService::new(db.clone()),
        connections: ConnectionService::new(db.clone()),
        posts: PostService::new(db.clone(), media.clone()),
        media,
        push: PushService::new_mock(),
        search: SearchService::new(),
        cache: CacheStore::new_memory(),
        events: EventBus::new(),
        config,
        db,
    });

    (create_router(state.clone()), state)
}

/// Create a signed dealer JWT for tests.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, signing_key: &[u8]) -> String {
    create_jwt(user_id, Role::Dealer, signing_key).expect("JWT creation should succeed")
}

/// Create a signed admin JWT for tests.
#[allow(dead_code)]
pub fn create_admin_jwt(user_id: &str, signing_key: &[u8]) -> String {
    create_jwt(user_id, Role::Admin, signing_key).expect("JWT creation should succeed")
}
