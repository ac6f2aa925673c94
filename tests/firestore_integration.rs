// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Start one with `gcloud emulators firestore start` and export
//! `FIRESTORE_EMULATOR_HOST` before `cargo test`.
//!
//! Every test works on fresh random identifiers, so runs do not interfere.

use chrono::Utc;
use social_reform::db::Store;
use social_reform::models::{
    Configuration, Post, PostAuthor, PostFilter, PostStatus, RefreshToken, SocialAccount,
    SocialPlatform, User,
};
use social_reform::services::IdentityResolver;
use social_reform::services::SocialIdentity;
use std::sync::Arc;

mod common;
use common::test_db;

/// Random suffix for test isolation.
fn unique() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..12].to_string()
}

fn test_user(tag: &str) -> User {
    User::new(
        format!("{}@example.com", tag),
        format!("u{}", tag),
        "Test User".to_string(),
    )
}

// ═══════════════════════════════════════════════════════════════════════════
// USER TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_create_and_find_user() {
    require_emulator!();

    let db = test_db().await;
    let tag = unique();
    let user = test_user(&tag);

    db.create_user(&user, None).await.unwrap();

    let by_id = db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(by_id.email, user.email);

    let by_email = db.find_user_by_email(&user.email).await.unwrap().unwrap();
    assert_eq!(by_email.id, user.id);

    let by_name = db.find_user_by_username(&user.username).await.unwrap().unwrap();
    assert_eq!(by_name.id, user.id);

    println!("✓ User created and indexed: {}", user.id);
}

#[tokio::test]
async fn test_duplicate_email_and_username_conflict() {
    require_emulator!();

    let db = test_db().await;
    let tag = unique();
    let first = test_user(&tag);
    db.create_user(&first, None).await.unwrap();

    let mut same_email = test_user(&unique());
    same_email.email = first.email.clone();
    let err = db.create_user(&same_email, None).await.unwrap_err();
    assert!(err.is_conflict(), "expected conflict, got {:?}", err);

    let mut same_name = test_user(&unique());
    same_name.username = first.username.clone();
    let err = db.create_user(&same_name, None).await.unwrap_err();
    assert!(err.is_conflict(), "expected conflict, got {:?}", err);

    assert!(db.get_user(&same_email.id).await.unwrap().is_none());
    assert!(db.get_user(&same_name.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_social_link_is_unique() {
    require_emulator!();

    let db = test_db().await;
    let platform_id = format!("tw-{}", unique());

    let first = test_user(&unique());
    let account = SocialAccount::new(&first.id, SocialPlatform::Twitter, &platform_id, "first", "t1");
    db.create_user(&first, Some(&account)).await.unwrap();

    let second = test_user(&unique());
    let clash = SocialAccount::new(&second.id, SocialPlatform::Twitter, &platform_id, "second", "t2");
    let err = db.create_user(&second, Some(&clash)).await.unwrap_err();
    assert!(err.is_conflict());

    let linked = db
        .find_user_by_social_link(SocialPlatform::Twitter, &platform_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(linked.id, first.id);
    assert!(db.get_user(&second.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_user_keeps_identity_fields() {
    require_emulator!();

    let db = test_db().await;
    let user = test_user(&unique());
    db.create_user(&user, None).await.unwrap();

    let mut changed = user.clone();
    changed.display_name = "Renamed".to_string();
    changed.bio = Some("bio".to_string());
    changed.email = "ignored@example.com".to_string();
    db.update_user(&changed).await.unwrap();

    let stored = db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.display_name, "Renamed");
    assert_eq!(stored.bio.as_deref(), Some("bio"));
    assert_eq!(stored.email, user.email);
}

// ═══════════════════════════════════════════════════════════════════════════
// SOCIAL LOGIN TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_resolvers_on_separate_handles_create_one_user() {
    require_emulator!();

    // Two resolvers do not share a lock map, like two server instances.
    let platform_id = format!("g-{}", unique());
    let identity = SocialIdentity {
        platform_id: platform_id.clone(),
        email: Some(format!("{}@example.com", unique())),
        display_name: "Racer".to_string(),
        avatar: None,
        platform_username: None,
    };

    let db_a: Arc<dyn Store> = Arc::new(test_db().await);
    let db_b: Arc<dyn Store> = Arc::new(test_db().await);
    let a = IdentityResolver::new(db_a.clone());
    let b = IdentityResolver::new(db_b);

    let (ra, rb) = tokio::join!(
        a.resolve(&identity, SocialPlatform::Google, "tok-a"),
        b.resolve(&identity, SocialPlatform::Google, "tok-b"),
    );
    let (ua, ub) = (ra.unwrap(), rb.unwrap());
    assert_eq!(ua.id, ub.id);

    let linked = db_a
        .find_user_by_social_link(SocialPlatform::Google, &platform_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(linked.id, ua.id);
}

// ═══════════════════════════════════════════════════════════════════════════
// TOKEN, POST AND CONFIGURATION TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_refresh_token_round_trip() {
    require_emulator!();

    let db = test_db().await;
    let now = Utc::now();
    let row = RefreshToken {
        token: unique(),
        user_id: "user-1".to_string(),
        expires_at: now + chrono::Duration::days(7),
        created_at: now,
    };
    db.create_refresh_token(&row).await.unwrap();

    let found = db.find_refresh_token(&row.token).await.unwrap().unwrap();
    assert_eq!(found.user_id, "user-1");

    assert!(db.delete_refresh_token(&row.token).await.unwrap());
    assert!(!db.delete_refresh_token(&row.token).await.unwrap());
    assert!(db.find_refresh_token(&row.token).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refresh_token_deletes_succeed_once() {
    require_emulator!();

    let db = test_db().await;
    let now = Utc::now();
    let row = RefreshToken {
        token: unique(),
        user_id: "user-2".to_string(),
        expires_at: now + chrono::Duration::days(7),
        created_at: now,
    };
    db.create_refresh_token(&row).await.unwrap();

    let (a, b) = tokio::join!(
        db.delete_refresh_token(&row.token),
        db.delete_refresh_token(&row.token),
    );
    let removed = [a.unwrap(), b.unwrap()];
    assert_eq!(removed.iter().filter(|r| **r).count(), 1);
}

#[tokio::test]
async fn test_list_posts_filters_by_user_and_platform() {
    require_emulator!();

    let db = test_db().await;
    let author = test_user(&unique());
    let now = Utc::now();

    for (i, platforms) in [
        vec![SocialPlatform::Twitter],
        vec![SocialPlatform::Facebook, SocialPlatform::Twitter],
        vec![SocialPlatform::Facebook],
    ]
    .into_iter()
    .enumerate()
    {
        let post = Post {
            id: unique(),
            user_id: author.id.clone(),
            title: format!("Post {}", i),
            content: "body".to_string(),
            media_urls: vec![],
            scheduled_at: None,
            published_at: None,
            status: PostStatus::Draft,
            platforms,
            hashtags: vec![],
            mentions: vec![],
            user: PostAuthor::from(&author),
            created_at: now + chrono::Duration::seconds(i as i64),
            updated_at: now,
        };
        db.create_post(&post).await.unwrap();
    }

    let filter = PostFilter {
        status: None,
        platform: Some(SocialPlatform::Facebook),
    };
    let (posts, total) = db.list_posts(&author.id, &filter, 0, 10).await.unwrap();
    assert_eq!(total, 2);
    assert_eq!(posts[0].title, "Post 2");
    assert_eq!(posts[1].title, "Post 1");

    let (page, total) = db
        .list_posts(&author.id, &PostFilter::default(), 1, 1)
        .await
        .unwrap();
    assert_eq!(total, 3);
    assert_eq!(page[0].title, "Post 1");
}

#[tokio::test]
async fn test_configuration_upsert_and_delete() {
    require_emulator!();

    let db = test_db().await;
    let now = Utc::now();
    let key = format!("TEST_{}", unique());
    let entry = Configuration {
        key: key.clone(),
        value: "1".to_string(),
        description: None,
        category: "tests".to_string(),
        is_secret: false,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    db.upsert_configuration(&entry).await.unwrap();
    db.upsert_configuration(&Configuration {
        value: "2".to_string(),
        ..entry.clone()
    })
    .await
    .unwrap();

    let stored = db.get_configuration(&key).await.unwrap().unwrap();
    assert_eq!(stored.value, "2");
    assert!(db
        .list_configurations()
        .await
        .unwrap()
        .iter()
        .any(|c| c.key == key));

    assert!(db.delete_configuration(&key).await.unwrap());
    assert!(db.get_configuration(&key).await.unwrap().is_none());
}
