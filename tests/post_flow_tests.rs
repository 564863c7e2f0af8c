//! Post lifecycle against the Firestore emulator: create, reconcile,
//! edit, delete, feed pagination.

use dealerhub::models::post::PostDraft;
use dealerhub::models::{Post, PostSubmission};
use dealerhub::services::{MediaService, PostService};

mod common;

fn draft(user_id: &str, name: &str) -> PostDraft {
    PostDraft {
        user_id: user_id.to_string(),
        product_name: name.to_string(),
        description: Some("Sealed, with bill".to_string()),
        price: Some(45000),
        hide_price: false,
        media_urls: vec!["https://res.example.com/demo/upload/v1/a.jpg".to_string()],
    }
}

#[tokio::test]
async fn create_commits_and_reconciles_by_client_ref() {
    require_emulator!();
    let db = common::test_db().await;
    let service = PostService::new(db.clone(), MediaService::new_mock());
    let user = format!("user-{}", uuid::Uuid::new_v4());

    let post = service
        .create(draft(&user, "Pixel 8"), Some("local-42".to_string()))
        .await
        .unwrap();

    match service.reconcile("local-42") {
        Some(PostSubmission::Committed { post: committed, .. }) => {
            assert_eq!(committed.id, post.id);
        }
        other => panic!("expected committed submission, got {:?}", other),
    }

    // Settled submissions are consumed on read.
    assert!(service.reconcile("local-42").is_none());

    let stored = db.get_post(&post.id).await.unwrap().unwrap();
    assert_eq!(stored.product_name, "Pixel 8");
}

#[tokio::test]
async fn only_the_owner_can_edit_or_delete() {
    require_emulator!();
    let db = common::test_db().await;
    let service = PostService::new(db.clone(), MediaService::new_mock());
    let owner = format!("user-{}", uuid::Uuid::new_v4());
    let stranger = format!("user-{}", uuid::Uuid::new_v4());

    let post = service.create(draft(&owner, "Galaxy S24"), None).await.unwrap();

    let edited = Post {
        product_name: "Galaxy S24 Ultra".to_string(),
        ..post.clone()
    };
    assert!(service.update(&stranger, &post.id, edited.clone()).await.is_err());
    assert!(service.delete(&stranger, &post.id).await.is_err());

    // The post is untouched after the stranger's attempts.
    let stored = db.get_post(&post.id).await.unwrap().unwrap();
    assert_eq!(stored.product_name, "Galaxy S24");

    let updated = service.update(&owner, &post.id, edited).await.unwrap();
    assert_eq!(updated.product_name, "Galaxy S24 Ultra");
    assert_eq!(updated.created_at, post.created_at, "provenance preserved");

    service.delete(&owner, &post.id).await.unwrap();
    assert!(db.get_post(&post.id).await.unwrap().is_none());
}

#[tokio::test]
async fn feed_pages_do_not_overlap() {
    require_emulator!();
    let db = common::test_db().await;
    let service = PostService::new(db.clone(), MediaService::new_mock());
    let user = format!("user-{}", uuid::Uuid::new_v4());

    for i in 0..5 {
        service
            .create(draft(&user, &format!("Listing {}", i)), None)
            .await
            .unwrap();
    }

    let first = db.get_feed_page(None, 3).await.unwrap();
    assert_eq!(first.len(), 3);

    let cursor_created_at = first.last().unwrap().created_at.clone();
    let second = db
        .get_feed_page(
            Some(dealerhub::db::firestore::PostQueryCursor {
                created_at: &cursor_created_at,
            }),
            3,
        )
        .await
        .unwrap();

    let first_ids: Vec<&str> = first.iter().map(|p| p.id.as_str()).collect();
    assert!(second.iter().all(|p| !first_ids.contains(&p.id.as_str())));

    // Newest first within and across pages.
    for pair in first.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at);
    }
    if let (Some(last), Some(next)) = (first.last(), second.first()) {
        assert!(last.created_at > next.created_at);
    }
}
