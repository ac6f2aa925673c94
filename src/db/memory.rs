// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store for tests and local development.
//!
//! Every table lives behind one `RwLock`, so each write (including the
//! unique-constraint checks that precede it) is atomic. Data is lost when the
//! last handle is dropped.

use crate::db::{social_account_key, social_link_key, Store};
use crate::error::AppError;
use crate::models::{
    Configuration, Post, PostFilter, RefreshToken, SocialAccount, SocialPlatform, User,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    /// email -> user id
    emails: HashMap<String, String>,
    /// username -> user id
    usernames: HashMap<String, String>,
    /// `{user_id}_{platform}` -> account
    social_accounts: HashMap<String, SocialAccount>,
    /// `{platform}_{platform_user_id}` -> user id
    social_links: HashMap<String, String>,
    /// digest -> token
    refresh_tokens: HashMap<String, RefreshToken>,
    posts: Vec<Post>,
    configurations: BTreeMap<String, Configuration>,
}

impl Tables {
    fn check_account_free(&self, account: &SocialAccount) -> Result<(), AppError> {
        let link = social_link_key(account.platform, &account.platform_user_id);
        if self.social_links.contains_key(&link) {
            return Err(AppError::Conflict(format!(
                "{} account {} is already linked",
                account.platform, account.platform_user_id
            )));
        }
        let key = social_account_key(&account.user_id, account.platform);
        if self.social_accounts.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "User already has a {} account",
                account.platform
            )));
        }
        Ok(())
    }

    fn insert_account(&mut self, account: &SocialAccount) {
        self.social_links.insert(
            social_link_key(account.platform, &account.platform_user_id),
            account.user_id.clone(),
        );
        self.social_accounts.insert(
            social_account_key(&account.user_id, account.platform),
            account.clone(),
        );
    }
}

/// In-memory store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    // ─── Users ───────────────────────────────────────────────────

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .emails
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .usernames
            .get(username)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn find_user_by_social_link(
        &self,
        platform: SocialPlatform,
        platform_user_id: &str,
    ) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .social_links
            .get(&social_link_key(platform, platform_user_id))
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn create_user(
        &self,
        user: &User,
        account: Option<&SocialAccount>,
    ) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;

        if tables.users.contains_key(&user.id) {
            return Err(AppError::Conflict(format!("User {} already exists", user.id)));
        }
        if tables.emails.contains_key(&user.email) {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }
        if tables.usernames.contains_key(&user.username) {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }
        if let Some(account) = account {
            tables.check_account_free(account)?;
        }

        tables.emails.insert(user.email.clone(), user.id.clone());
        tables
            .usernames
            .insert(user.username.clone(), user.id.clone());
        tables.users.insert(user.id.clone(), user.clone());
        if let Some(account) = account {
            tables.insert_account(account);
        }
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .users
            .get_mut(&user.id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.id)))?;

        let email = existing.email.clone();
        let username = existing.username.clone();
        *existing = user.clone();
        existing.email = email;
        existing.username = username;
        Ok(())
    }

    async fn count_users(&self) -> Result<usize, AppError> {
        Ok(self.tables.read().await.users.len())
    }

    // ─── Social Accounts ─────────────────────────────────────────

    async fn find_social_account(
        &self,
        user_id: &str,
        platform: SocialPlatform,
    ) -> Result<Option<SocialAccount>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .social_accounts
            .get(&social_account_key(user_id, platform))
            .cloned())
    }

    async fn create_social_account(&self, account: &SocialAccount) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        tables.check_account_free(account)?;
        tables.insert_account(account);
        Ok(())
    }

    async fn update_social_account(&self, account: &SocialAccount) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        let key = social_account_key(&account.user_id, account.platform);
        match tables.social_accounts.get_mut(&key) {
            Some(existing) => {
                *existing = account.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Social account {} not found", key))),
        }
    }

    async fn count_social_accounts(
        &self,
        platform: SocialPlatform,
        platform_user_id: &str,
    ) -> Result<usize, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .social_accounts
            .values()
            .filter(|a| a.platform == platform && a.platform_user_id == platform_user_id)
            .count())
    }

    // ─── Refresh Tokens ──────────────────────────────────────────

    async fn create_refresh_token(&self, token: &RefreshToken) -> Result<(), AppError> {
        self.tables
            .write()
            .await
            .refresh_tokens
            .insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn find_refresh_token(&self, digest: &str) -> Result<Option<RefreshToken>, AppError> {
        Ok(self.tables.read().await.refresh_tokens.get(digest).cloned())
    }

    async fn delete_refresh_token(&self, digest: &str) -> Result<bool, AppError> {
        Ok(self
            .tables
            .write()
            .await
            .refresh_tokens
            .remove(digest)
            .is_some())
    }

    // ─── Posts ───────────────────────────────────────────────────

    async fn create_post(&self, post: &Post) -> Result<(), AppError> {
        self.tables.write().await.posts.push(post.clone());
        Ok(())
    }

    async fn list_posts(
        &self,
        user_id: &str,
        filter: &PostFilter,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Post>, usize), AppError> {
        let tables = self.tables.read().await;
        let mut matching: Vec<&Post> = tables
            .posts
            .iter()
            .rev()
            .filter(|p| p.user_id == user_id && filter.matches(p))
            .collect();
        // Stable sort over reversed insertion order keeps ties newest first.
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len();
        let page = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok((page, total))
    }

    // ─── Configurations ──────────────────────────────────────────

    async fn get_configuration(&self, key: &str) -> Result<Option<Configuration>, AppError> {
        Ok(self.tables.read().await.configurations.get(key).cloned())
    }

    async fn list_configurations(&self) -> Result<Vec<Configuration>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .configurations
            .values()
            .cloned()
            .collect())
    }

    async fn upsert_configuration(&self, entry: &Configuration) -> Result<(), AppError> {
        self.tables
            .write()
            .await
            .configurations
            .insert(entry.key.clone(), entry.clone());
        Ok(())
    }

    async fn delete_configuration(&self, key: &str) -> Result<bool, AppError> {
        Ok(self
            .tables
            .write()
            .await
            .configurations
            .remove(key)
            .is_some())
    }
}
