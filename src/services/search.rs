//! In-memory search over listings and shop profiles.
//!
//! The snapshot holds every listing (joined with its shop's summary) and
//! every approved shop profile, and is only ever replaced by an explicit
//! full re-fetch — there is no incremental maintenance. Queries are pure
//! synchronous functions over the snapshot and never fail.
//!
//! Matching is an AND-of-substrings gate: a candidate is included only if
//! every query word appears somewhere in its concatenated searchable text.
//! Ranking is additive per word per field; ties keep snapshot order.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::Post;
use crate::time_utils::now_rfc3339;
use serde::Serialize;
use std::sync::{Arc, RwLock};

/// Per-field score weights for product search.
const WEIGHT_PRODUCT_NAME: u32 = 10;
const WEIGHT_DESCRIPTION: u32 = 5;
const WEIGHT_SHOP_NAME: u32 = 3;
const WEIGHT_CITY: u32 = 2;

/// Per-field score weights for shop search.
const WEIGHT_SHOP_PRIMARY: u32 = 10;
const WEIGHT_SHOP_CITY: u32 = 2;

/// A listing joined with its shop's display summary.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDoc {
    pub post: Post,
    pub shop_name: String,
    pub city: String,
    pub profile_image: Option<String>,
    /// Contact phone, so clients can build the WhatsApp deep link
    pub phone: String,
}

/// A searchable shop profile.
#[derive(Debug, Clone, Serialize)]
pub struct ShopDoc {
    pub id: String,
    pub shop_name: String,
    pub city: String,
    pub profile_image: Option<String>,
    pub phone: String,
    pub connection_count: u32,
}

/// A candidate that passed the gate, with its computed score.
#[derive(Debug, Clone, Serialize)]
pub struct Scored<T> {
    #[serde(flatten)]
    pub item: T,
    pub score: u32,
}

#[derive(Default)]
struct Snapshot {
    products: Vec<ProductDoc>,
    shops: Vec<ShopDoc>,
    refreshed_at: Option<String>,
}

/// Service holding the search snapshot.
#[derive(Clone, Default)]
pub struct SearchService {
    snapshot: Arc<RwLock<Snapshot>>,
}

impl SearchService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot with a full re-fetch from the store.
    pub async fn refresh(&self, db: &FirestoreDb) -> Result<(), AppError> {
        let posts = db.list_all_posts().await?;
        let profiles = db.list_approved_profiles().await?;

        let by_id: std::collections::HashMap<&str, _> =
            profiles.iter().map(|p| (p.id.as_str(), p)).collect();

        let products = posts
            .into_iter()
            .map(|post| {
                let shop = by_id.get(post.user_id.as_str());
                ProductDoc {
                    shop_name: shop.map(|p| p.shop_name.clone()).unwrap_or_default(),
                    city: shop.map(|p| p.city.clone()).unwrap_or_default(),
                    profile_image: shop.and_then(|p| p.profile_image.clone()),
                    phone: shop.map(|p| p.phone.clone()).unwrap_or_default(),
                    post,
                }
            })
            .collect::<Vec<_>>();

        let shops = profiles
            .iter()
            .map(|p| ShopDoc {
                id: p.id.clone(),
                shop_name: p.shop_name.clone(),
                city: p.city.clone(),
                profile_image: p.profile_image.clone(),
                phone: p.phone.clone(),
                connection_count: p.connection_count,
            })
            .collect::<Vec<_>>();

        tracing::info!(
            products = products.len(),
            shops = shops.len(),
            "Search snapshot refreshed"
        );

        self.install_snapshot(products, shops);
        Ok(())
    }

    /// Refresh only if the snapshot has never been loaded.
    pub async fn ensure_loaded(&self, db: &FirestoreDb) -> Result<(), AppError> {
        let loaded = {
            let snap = self.snapshot.read().expect("search snapshot lock");
            snap.refreshed_at.is_some()
        };
        if !loaded {
            self.refresh(db).await?;
        }
        Ok(())
    }

    /// Install a pre-built snapshot. Also used by tests and benches.
    pub fn install_snapshot(&self, products: Vec<ProductDoc>, shops: Vec<ShopDoc>) {
        let mut snap = self.snapshot.write().expect("search snapshot lock");
        *snap = Snapshot {
            products,
            shops,
            refreshed_at: Some(now_rfc3339()),
        };
    }

    /// Rank listings against a free-text query.
    pub fn search_products(&self, query: &str) -> Vec<Scored<ProductDoc>> {
        let words = tokenize(query);
        if words.is_empty() {
            return Vec::new();
        }

        let snap = self.snapshot.read().expect("search snapshot lock");
        let mut hits: Vec<Scored<ProductDoc>> = snap
            .products
            .iter()
            .filter_map(|doc| {
                score_product(&words, doc).map(|score| Scored {
                    item: doc.clone(),
                    score,
                })
            })
            .collect();

        // Stable sort: equal scores keep snapshot order.
        hits.sort_by(|a, b| b.score.cmp(&a.score));
        hits
    }

    /// Rank shop profiles against a free-text query.
    pub fn search_shops(&self, query: &str) -> Vec<Scored<ShopDoc>> {
        let words = tokenize(query);
        if words.is_empty() {
            return Vec::new();
        }

        let snap = self.snapshot.read().expect("search snapshot lock");
        let mut hits: Vec<Scored<ShopDoc>> = snap
            .shops
            .iter()
            .filter_map(|doc| {
                score_shop(&words, doc).map(|score| Scored {
                    item: doc.clone(),
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.cmp(&a.score));
        hits
    }
}

/// Lower-case and split a raw query into words. A blank query produces
/// no words, which callers treat as "no results" rather than "match all".
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Score a listing, or `None` if it fails the every-word gate.
pub fn score_product(words: &[String], doc: &ProductDoc) -> Option<u32> {
    let product_name = doc.post.product_name.to_lowercase();
    let description = doc
        .post
        .description
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    let shop_name = doc.shop_name.to_lowercase();
    let city = doc.city.to_lowercase();

    let all_text = format!("{} {} {} {}", product_name, description, shop_name, city);
    if !words.iter().all(|w| all_text.contains(w.as_str())) {
        return None;
    }

    let mut score = 0;
    for word in words {
        if product_name.contains(word.as_str()) {
            score += WEIGHT_PRODUCT_NAME;
        }
        if description.contains(word.as_str()) {
            score += WEIGHT_DESCRIPTION;
        }
        if shop_name.contains(word.as_str()) {
            score += WEIGHT_SHOP_NAME;
        }
        if city.contains(word.as_str()) {
            score += WEIGHT_CITY;
        }
    }

    (score > 0).then_some(score)
}

/// Score a shop profile, or `None` if it fails the every-word gate.
pub fn score_shop(words: &[String], doc: &ShopDoc) -> Option<u32> {
    let shop_name = doc.shop_name.to_lowercase();
    let city = doc.city.to_lowercase();

    let all_text = format!("{} {}", shop_name, city);
    if !words.iter().all(|w| all_text.contains(w.as_str())) {
        return None;
    }

    let mut score = 0;
    for word in words {
        if shop_name.contains(word.as_str()) {
            score += WEIGHT_SHOP_PRIMARY;
        }
        if city.contains(word.as_str()) {
            score += WEIGHT_SHOP_CITY;
        }
    }

    (score > 0).then_some(score)
}
