//! Search gate, scoring, and ordering properties.

use dealerhub::models::Post;
use dealerhub::services::search::{score_product, tokenize, ProductDoc, SearchService, ShopDoc};

fn product(name: &str, description: Option<&str>, shop: &str, city: &str) -> ProductDoc {
    ProductDoc {
        post: Post {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: "u1".to_string(),
            product_name: name.to_string(),
            description: description.map(str::to_string),
            price: Some(50000),
            hide_price: false,
            media_urls: vec!["https://res.example.com/demo/upload/v1/a.jpg".to_string()],
            created_at: "2024-06-01T00:00:00.000000Z".to_string(),
        },
        shop_name: shop.to_string(),
        city: city.to_string(),
        profile_image: None,
        phone: "9876543210".to_string(),
    }
}

fn shop(name: &str, city: &str) -> ShopDoc {
    ShopDoc {
        id: uuid::Uuid::new_v4().to_string(),
        shop_name: name.to_string(),
        city: city.to_string(),
        profile_image: None,
        phone: "9876543210".to_string(),
        connection_count: 3,
    }
}

#[test]
fn candidate_included_iff_every_word_matches() {
    // Listing: "iPhone 15 Pro" at "ABC Traders" in "Pune".
    let doc = product("iPhone 15 Pro", None, "ABC Traders", "Pune");

    assert!(score_product(&tokenize("iphone pune"), &doc).is_some());
    assert!(score_product(&tokenize("iphone delhi"), &doc).is_none());
}

#[test]
fn gate_is_case_insensitive() {
    let doc = product("iPhone 15 Pro", None, "ABC Traders", "Pune");

    assert!(score_product(&tokenize("IPHONE PUNE"), &doc).is_some());
    assert!(score_product(&tokenize("iPhOnE"), &doc).is_some());
}

#[test]
fn word_matching_across_fields_still_counts() {
    // "abc" only in the shop name, "iphone" only in the product name:
    // both words match somewhere, so the candidate passes the gate.
    let doc = product("iPhone 15 Pro", None, "ABC Traders", "Pune");
    let score = score_product(&tokenize("iphone abc"), &doc).unwrap();

    // iphone: name (+10); abc: shop (+3)
    assert_eq!(score, 13);
}

#[test]
fn field_weights_are_additive_per_word() {
    let doc = product(
        "iPhone 15 Pro",
        Some("pune stock, sealed iphone"),
        "Pune Phones",
        "Pune",
    );
    // "pune" hits description (+5), shop (+3), and city (+2).
    // "iphone" hits name (+10) and description (+5).
    let score = score_product(&tokenize("pune iphone"), &doc).unwrap();
    assert_eq!(score, 25);
}

#[test]
fn ordering_is_non_increasing_with_stable_ties() {
    let service = SearchService::new();
    service.install_snapshot(
        vec![
            product("Pixel 8 (first tie)", None, "A", "Pune"),
            product("Used phone", Some("pixel in box"), "B", "Pune"),
            product("Pixel 8 (second tie)", None, "C", "Pune"),
        ],
        Vec::new(),
    );

    let hits = service.search_products("pixel");

    assert_eq!(hits.len(), 3);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    // Equal-score candidates keep snapshot order.
    assert_eq!(hits[0].item.post.product_name, "Pixel 8 (first tie)");
    assert_eq!(hits[1].item.post.product_name, "Pixel 8 (second tie)");
    assert_eq!(hits[2].item.post.product_name, "Used phone");
}

#[test]
fn empty_query_is_distinct_from_zero_matches() {
    let service = SearchService::new();
    service.install_snapshot(
        vec![product("iPhone 15", None, "ABC", "Pune")],
        vec![shop("ABC Traders", "Pune")],
    );

    // Blank and whitespace-only queries yield nothing.
    assert!(service.search_products("").is_empty());
    assert!(service.search_products(" \t ").is_empty());
    assert!(service.search_shops("").is_empty());

    // A real query with no matches also yields nothing.
    assert!(service.search_products("nokia").is_empty());
}

#[test]
fn shops_rank_independently_of_products() {
    let service = SearchService::new();
    service.install_snapshot(
        vec![product("iPhone 15", None, "Pune Phones", "Pune")],
        vec![shop("Pune Phones", "Pune"), shop("ABC Traders", "Mumbai")],
    );

    let products = service.search_products("pune");
    let shops = service.search_shops("pune");

    assert_eq!(products.len(), 1);
    assert_eq!(shops.len(), 1);
    assert_eq!(shops[0].item.shop_name, "Pune Phones");
    // Shop search: name (+10) and city (+2).
    assert_eq!(shops[0].score, 12);
}

#[test]
fn multiple_occurrences_do_not_stack_within_a_field() {
    let doc = product("iPhone iphone IPHONE", None, "ABC", "Pune");
    // "contains" is boolean per field: still just +10.
    assert_eq!(score_product(&tokenize("iphone"), &doc), Some(10));
}
