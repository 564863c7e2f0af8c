//! DealerHub API Server
//!
//! Backend for the dealer marketplace: profiles, listings, search,
//! dealer-to-dealer connections, device requests, and admin approval.

use dealerhub::{
    cache::CacheStore,
    config::Config,
    db::FirestoreDb,
    events::{AppEvent, EventBus},
    services::{
        AccountsService, ConnectionService, MediaService, PostService, PushService, SearchService,
    },
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting DealerHub API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Local snapshot cache (stale views for requests screens)
    let cache = match &config.cache_dir {
        Some(dir) => CacheStore::new(dir.clone()).expect("Failed to create cache directory"),
        None => CacheStore::new_memory(),
    };

    // External collaborators
    let media = MediaService::new(&config);
    let push = PushService::new(&config);

    // Domain services
    let accounts = AccountsService::new(db.clone());
    let connections = ConnectionService::new(db.clone());
    let posts = PostService::new(db.clone(), media.clone());
    let search = SearchService::new();
    let events = EventBus::new();

    // Warm the search snapshot; queries lazily load it if this fails.
    if let Err(e) = search.refresh(&db).await {
        tracing::warn!(error = %e, "Initial search snapshot load failed");
    }

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        accounts,
        connections,
        posts,
        media,
        push,
        search,
        cache,
        events,
    });

    spawn_event_subscribers(state.clone());

    // Build router
    let app = dealerhub::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Subscribe the push dispatcher and the search snapshot refresher to
/// the event bus.
fn spawn_event_subscribers(state: Arc<AppState>) {
    let mut rx = state.events.subscribe();

    tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Event subscriber lagged; refreshing search snapshot");
                    if let Err(e) = state.search.refresh(&state.db).await {
                        tracing::warn!(error = %e, "Search snapshot refresh failed");
                    }
                    continue;
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            };

            handle_event(&state, event).await;
        }
    });
}

async fn handle_event(state: &AppState, event: AppEvent) {
    match event {
        // Listing churn invalidates the search snapshot.
        AppEvent::PostCreated { .. }
        | AppEvent::PostUpdated { .. }
        | AppEvent::PostDeleted { .. }
        | AppEvent::DealerRejected { .. } => {
            if let Err(e) = state.search.refresh(&state.db).await {
                tracing::warn!(error = %e, "Search snapshot refresh failed");
            }
        }

        AppEvent::ConnectionRequested {
            sender_id,
            receiver_id,
        } => {
            let sender_name = shop_name(state, &sender_id).await;
            state
                .push
                .notify_user(
                    &state.db,
                    &receiver_id,
                    "New connection request",
                    &format!("{} wants to connect with you", sender_name),
                    serde_json::json!({ "type": "connection_request", "sender_id": sender_id }),
                )
                .await;
        }

        AppEvent::ConnectionAccepted {
            accepter_id,
            sender_id,
        } => {
            let accepter_name = shop_name(state, &accepter_id).await;
            state
                .push
                .notify_user(
                    &state.db,
                    &sender_id,
                    "Request accepted",
                    &format!("{} accepted your connection request", accepter_name),
                    serde_json::json!({ "type": "connection_accepted", "user_id": accepter_id }),
                )
                .await;

            // Connection counts shown in shop results changed.
            if let Err(e) = state.search.refresh(&state.db).await {
                tracing::warn!(error = %e, "Search snapshot refresh failed");
            }
        }

        AppEvent::DealerApproved { user_id } => {
            state
                .push
                .notify_user(
                    &state.db,
                    &user_id,
                    "Account approved",
                    "Your shop is live. Start posting and connecting with dealers",
                    serde_json::json!({ "type": "dealer_approved" }),
                )
                .await;

            // A newly approved shop becomes searchable.
            if let Err(e) = state.search.refresh(&state.db).await {
                tracing::warn!(error = %e, "Search snapshot refresh failed");
            }
        }
    }
}

/// Best-effort shop name lookup for notification copy.
async fn shop_name(state: &AppState, user_id: &str) -> String {
    match state.db.get_profile(user_id).await {
        Ok(Some(profile)) => profile.shop_name,
        _ => "A dealer".to_string(),
    }
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dealerhub=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
