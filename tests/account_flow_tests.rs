//! Account lifecycle against the Firestore emulator: sign-up, login,
//! password reset, admin rejection cascade.

use dealerhub::services::accounts::{AccountsService, NewDealer};
use dealerhub::services::{ConnectionService, MediaService};

mod common;

fn new_dealer(email: &str) -> NewDealer {
    NewDealer {
        shop_name: "ABC Traders".to_string(),
        city: "Pune".to_string(),
        phone: "9876543210".to_string(),
        email: email.to_string(),
        password: "correct horse battery".to_string(),
        bio: None,
    }
}

fn unique_email() -> String {
    format!("dealer-{}@example.com", uuid::Uuid::new_v4())
}

#[tokio::test]
async fn signup_then_login_round_trip() {
    require_emulator!();
    let db = common::test_db().await;
    let accounts = AccountsService::new(db.clone());
    let email = unique_email();

    let profile = accounts.sign_up(new_dealer(&email)).await.unwrap();
    assert!(!profile.approved, "new dealers start unapproved");

    let logged_in = accounts
        .login(&email, "correct horse battery")
        .await
        .unwrap();
    assert_eq!(logged_in.id, profile.id);

    assert!(accounts.login(&email, "wrong password").await.is_err());
}

#[tokio::test]
async fn email_uniqueness_is_enforced() {
    require_emulator!();
    let db = common::test_db().await;
    let accounts = AccountsService::new(db.clone());
    let email = unique_email();

    accounts.sign_up(new_dealer(&email)).await.unwrap();
    let second = accounts.sign_up(new_dealer(&email)).await;

    assert!(second.is_err(), "same email twice must conflict");

    // Case-insensitive: the credential is keyed by normalized email.
    let upper = accounts.sign_up(new_dealer(&email.to_uppercase())).await;
    assert!(upper.is_err());
}

#[tokio::test]
async fn password_reset_is_single_use() {
    require_emulator!();
    let db = common::test_db().await;
    let accounts = AccountsService::new(db.clone());
    let email = unique_email();

    accounts.sign_up(new_dealer(&email)).await.unwrap();

    let token = accounts
        .issue_reset_token(&email)
        .await
        .unwrap()
        .expect("registered email should get a token");

    accounts
        .confirm_reset(&token, "a brand new password")
        .await
        .unwrap();

    // Old password dead, new one live, token consumed.
    assert!(accounts.login(&email, "correct horse battery").await.is_err());
    assert!(accounts.login(&email, "a brand new password").await.is_ok());
    assert!(accounts
        .confirm_reset(&token, "yet another password")
        .await
        .is_err());
}

#[tokio::test]
async fn reset_token_for_unknown_email_is_silent() {
    require_emulator!();
    let db = common::test_db().await;
    let accounts = AccountsService::new(db.clone());

    let token = accounts
        .issue_reset_token("nobody@example.com")
        .await
        .unwrap();
    assert!(token.is_none());
}

#[tokio::test]
async fn rejection_cascades_across_collections() {
    require_emulator!();
    let db = common::test_db().await;
    let accounts = AccountsService::new(db.clone());
    let connections = ConnectionService::new(db.clone());
    let media = MediaService::new_mock();

    let email = unique_email();
    let rejected = accounts.sign_up(new_dealer(&email)).await.unwrap();
    let other_email = unique_email();
    let other = accounts.sign_up(new_dealer(&other_email)).await.unwrap();

    // Give the doomed dealer a post, an accepted connection, and a token.
    let post = dealerhub::models::Post {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: rejected.id.clone(),
        product_name: "iPhone 13".to_string(),
        description: None,
        price: Some(30000),
        hide_price: false,
        media_urls: vec!["https://res.example.com/demo/upload/v1/doomed.jpg".to_string()],
        created_at: dealerhub::time_utils::now_rfc3339(),
    };
    db.insert_post(&post).await.unwrap();

    connections.send(&rejected.id, &other.id).await.unwrap();
    connections.accept(&other.id, &rejected.id).await.unwrap();

    db.upsert_push_token(&dealerhub::models::PushToken {
        user_id: rejected.id.clone(),
        device_id: "device-1".to_string(),
        token: "ExponentPushToken[xyz]".to_string(),
        updated_at: dealerhub::time_utils::now_rfc3339(),
    })
    .await
    .unwrap();

    let deleted = accounts.reject_dealer(&rejected.id, &media).await.unwrap();
    assert!(deleted >= 4, "post + edge + token + profile + credential");

    // Everything gone, and the survivor's count went back down.
    assert!(db.get_profile(&rejected.id).await.unwrap().is_none());
    assert!(db.get_post(&post.id).await.unwrap().is_none());
    assert!(db.get_credential(&email).await.unwrap().is_none());
    assert!(db
        .get_edge(&rejected.id, &other.id)
        .await
        .unwrap()
        .is_none());

    let survivor = db.get_profile(&other.id).await.unwrap().unwrap();
    assert_eq!(survivor.connection_count, 0);

    // Logging in as the rejected dealer now fails cleanly.
    assert!(accounts.login(&email, "correct horse battery").await.is_err());
}
