use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dealerhub::models::Post;
use dealerhub::services::search::{ProductDoc, SearchService, ShopDoc};

const MODELS: &[&str] = &[
    "iPhone 15 Pro",
    "iPhone 14",
    "Galaxy S24 Ultra",
    "Pixel 8",
    "Pixel 8 Pro",
    "OnePlus 12",
    "Redmi Note 13",
    "Galaxy A55",
];

const CITIES: &[&str] = &["Pune", "Mumbai", "Delhi", "Bengaluru", "Hyderabad"];

fn build_snapshot(listings: usize, shops: usize) -> (Vec<ProductDoc>, Vec<ShopDoc>) {
    let products = (0..listings)
        .map(|i| ProductDoc {
            post: Post {
                id: format!("post-{}", i),
                user_id: format!("user-{}", i % shops.max(1)),
                product_name: format!("{} ({} owner)", MODELS[i % MODELS.len()], i),
                description: Some(format!(
                    "Sealed pack {} with bill, serial {:06}",
                    MODELS[(i + 3) % MODELS.len()],
                    i
                )),
                price: Some(20_000 + (i as u32 % 50) * 1_000),
                hide_price: i % 7 == 0,
                media_urls: vec![format!(
                    "https://res.example.com/demo/upload/v1/post-{}.jpg",
                    i
                )],
                created_at: "2024-06-01T00:00:00.000000Z".to_string(),
            },
            shop_name: format!("Shop {}", i % shops.max(1)),
            city: CITIES[i % CITIES.len()].to_string(),
            profile_image: None,
            phone: "9876543210".to_string(),
        })
        .collect();

    let shop_docs = (0..shops)
        .map(|i| ShopDoc {
            id: format!("user-{}", i),
            shop_name: format!("Shop {}", i),
            city: CITIES[i % CITIES.len()].to_string(),
            profile_image: None,
            phone: "9876543210".to_string(),
            connection_count: (i % 40) as u32,
        })
        .collect();

    (products, shop_docs)
}

fn benchmark_search_scoring(c: &mut Criterion) {
    let service = SearchService::new();
    let (products, shops) = build_snapshot(5_000, 400);
    service.install_snapshot(products, shops);

    let mut group = c.benchmark_group("search_scoring");

    group.bench_function("two_word_query_products", |b| {
        b.iter(|| service.search_products(black_box("iphone pune")))
    });

    group.bench_function("single_word_query_products", |b| {
        b.iter(|| service.search_products(black_box("pixel")))
    });

    group.bench_function("no_match_query_products", |b| {
        b.iter(|| service.search_products(black_box("nokia 3310 lilac")))
    });

    group.bench_function("shop_query", |b| {
        b.iter(|| service.search_shops(black_box("shop mumbai")))
    });

    group.finish();
}

criterion_group!(benches, benchmark_search_scoring);
criterion_main!(benches);
