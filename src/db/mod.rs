// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! Components receive an `Arc<dyn Store>` at startup. Production uses
//! Firestore; tests and local development use the in-memory store. Both
//! enforce the same unique constraints (email, username, one link per
//! `(platform, platform_user_id)` and per `(user_id, platform)`) and report a
//! violation as [`AppError::Conflict`].

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{
    Configuration, Post, PostFilter, RefreshToken, SocialAccount, SocialPlatform, User,
};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Unique index: email -> user id
    pub const USER_EMAILS: &str = "user_emails";
    /// Unique index: username -> user id
    pub const USERNAMES: &str = "usernames";
    /// Keyed by `{user_id}_{platform}`
    pub const SOCIAL_ACCOUNTS: &str = "social_accounts";
    /// Unique index: `{platform}_{platform_user_id}` -> user id
    pub const SOCIAL_LINKS: &str = "social_links";
    pub const REFRESH_TOKENS: &str = "refresh_tokens";
    pub const POSTS: &str = "posts";
    pub const CONFIGURATIONS: &str = "configurations";
}

/// Key of the `(platform, platform_user_id)` unique index.
pub fn social_link_key(platform: SocialPlatform, platform_user_id: &str) -> String {
    format!("{}_{}", platform, urlencoding::encode(platform_user_id))
}

/// Key of the `(user_id, platform)` social account row.
pub fn social_account_key(user_id: &str, platform: SocialPlatform) -> String {
    format!("{}_{}", user_id, platform)
}

/// Storage handle shared by all request handlers.
#[async_trait]
pub trait Store: Send + Sync {
    // ─── Users ───────────────────────────────────────────────────

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Find the user owning the link for `(platform, platform_user_id)`.
    async fn find_user_by_social_link(
        &self,
        platform: SocialPlatform,
        platform_user_id: &str,
    ) -> Result<Option<User>, AppError>;

    async fn username_exists(&self, username: &str) -> Result<bool, AppError> {
        Ok(self.find_user_by_username(username).await?.is_some())
    }

    /// Create a user, optionally with its first social account, atomically.
    async fn create_user(
        &self,
        user: &User,
        account: Option<&SocialAccount>,
    ) -> Result<(), AppError>;

    /// Update profile fields. Email and username are not changed.
    async fn update_user(&self, user: &User) -> Result<(), AppError>;

    async fn count_users(&self) -> Result<usize, AppError>;

    // ─── Social Accounts ─────────────────────────────────────────

    async fn find_social_account(
        &self,
        user_id: &str,
        platform: SocialPlatform,
    ) -> Result<Option<SocialAccount>, AppError>;

    async fn create_social_account(&self, account: &SocialAccount) -> Result<(), AppError>;

    async fn update_social_account(&self, account: &SocialAccount) -> Result<(), AppError>;

    async fn count_social_accounts(
        &self,
        platform: SocialPlatform,
        platform_user_id: &str,
    ) -> Result<usize, AppError>;

    // ─── Refresh Tokens ──────────────────────────────────────────

    async fn create_refresh_token(&self, token: &RefreshToken) -> Result<(), AppError>;

    async fn find_refresh_token(&self, digest: &str) -> Result<Option<RefreshToken>, AppError>;

    /// Returns whether a row was removed.
    async fn delete_refresh_token(&self, digest: &str) -> Result<bool, AppError>;

    // ─── Posts ───────────────────────────────────────────────────

    async fn create_post(&self, post: &Post) -> Result<(), AppError>;

    /// Page of a user's posts, newest first, plus the total match count.
    async fn list_posts(
        &self,
        user_id: &str,
        filter: &PostFilter,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Post>, usize), AppError>;

    // ─── Configurations ──────────────────────────────────────────

    async fn get_configuration(&self, key: &str) -> Result<Option<Configuration>, AppError>;

    async fn list_configurations(&self) -> Result<Vec<Configuration>, AppError>;

    async fn upsert_configuration(&self, entry: &Configuration) -> Result<(), AppError>;

    /// Returns whether a row was removed.
    async fn delete_configuration(&self, key: &str) -> Result<bool, AppError>;
}
