//! DealerHub: wholesale phone marketplace for device dealers
//!
//! This crate provides the backend API for dealer profiles, product
//! listings, search, dealer-to-dealer connections, device-wanted
//! requests, and admin approval of new sign-ups.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use cache::CacheStore;
use config::Config;
use db::FirestoreDb;
use events::EventBus;
use services::{
    AccountsService, ConnectionService, MediaService, PostService, PushService, SearchService,
};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub accounts: AccountsService,
    pub connections: ConnectionService,
    pub posts: PostService,
    pub media: MediaService,
    pub push: PushService,
    pub search: SearchService,
    pub cache: CacheStore,
    pub events: EventBus,
}
