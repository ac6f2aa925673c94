// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reconcile a verified social identity with local users.
//!
//! Resolution order:
//! 1. A user already linked to `(platform, platform_id)`.
//! 2. A user whose email matches the identity's email.
//! 3. A new user, with a username derived from the email local-part or the
//!    display name and made unique with a numeric suffix.
//!
//! Find-or-create runs under a per-identity async mutex so concurrent logins
//! in this process are serialized. Across processes the store's unique
//! constraints are the final authority: a conflicting create re-runs the
//! lookup, and if nothing turns up the username was taken and the next
//! suffix is tried.

use crate::db::{social_link_key, Store};
use crate::error::AppError;
use crate::models::{SocialAccount, SocialPlatform, User};
use crate::services::providers::SocialIdentity;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Maximum number of user creation attempts per resolve.
pub const MAX_CREATE_ATTEMPTS: usize = 5;

/// Maximum number of candidate usernames probed per creation attempt.
pub const MAX_USERNAME_PROBES: u32 = 100;

/// Per-identity locks, keyed by social link key.
pub type IdentityLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Lower-case alphanumeric username base.
///
/// Taken from the email local-part when there is an email, otherwise from the
/// display name. Returns `None` if nothing survives the stripping.
pub fn derive_username(identity: &SocialIdentity) -> Option<String> {
    let source = match identity.email.as_deref() {
        Some(email) => email.split('@').next().unwrap_or_default(),
        None => identity.display_name.as_str(),
    };

    let base: String = source
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();

    (!base.is_empty()).then_some(base)
}

fn candidate(base: &str, suffix: u32) -> String {
    if suffix == 0 {
        base.to_string()
    } else {
        format!("{}{}", base, suffix)
    }
}

/// Finds or creates the local user for a social identity.
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn Store>,
    locks: IdentityLocks,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Return the user owning `identity`, linking or creating as needed.
    ///
    /// `token` is the platform access token stored on the social account.
    pub async fn resolve(
        &self,
        identity: &SocialIdentity,
        platform: SocialPlatform,
        token: &str,
    ) -> Result<User, AppError> {
        let key = social_link_key(platform, &identity.platform_id);
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.resolve_locked(identity, platform, token).await
        };

        drop(lock);
        self.locks
            .remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);

        result
    }

    async fn resolve_locked(
        &self,
        identity: &SocialIdentity,
        platform: SocialPlatform,
        token: &str,
    ) -> Result<User, AppError> {
        if let Some(user) = self.find_existing(identity, platform).await? {
            return self.link_account(&user, identity, platform, token).await;
        }

        let base = derive_username(identity).ok_or_else(|| {
            AppError::UsernameGeneration(format!(
                "no usable username in {} identity {}",
                platform, identity.platform_id
            ))
        })?;

        let mut next_suffix = 0;
        for attempt in 1..=MAX_CREATE_ATTEMPTS {
            let (username, suffix) = self.free_username(&base, next_suffix).await?;
            let email = identity
                .email
                .clone()
                .unwrap_or_else(|| format!("{}@{}.local", username, platform));

            let mut user = User::new(email, username, identity.display_name.clone());
            user.avatar = identity.avatar.clone();
            user.verified = true;

            let account = SocialAccount::new(
                &user.id,
                platform,
                &identity.platform_id,
                identity.account_username(),
                token,
            );

            match self.store.create_user(&user, Some(&account)).await {
                Ok(()) => {
                    tracing::info!(
                        user_id = %user.id,
                        platform = %platform,
                        username = %user.username,
                        "Created user from social login"
                    );
                    return Ok(user);
                }
                Err(e) if e.is_conflict() => {
                    if let Some(existing) = self.find_existing(identity, platform).await? {
                        tracing::debug!(
                            user_id = %existing.id,
                            platform = %platform,
                            "Identity created concurrently, reusing"
                        );
                        return self
                            .link_account(&existing, identity, platform, token)
                            .await;
                    }
                    tracing::debug!(
                        attempt,
                        username = %user.username,
                        "Username taken during create, trying next suffix"
                    );
                    next_suffix = suffix + 1;
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::UsernameGeneration(format!(
            "{} create attempts exhausted for base '{}' ({} identity {})",
            MAX_CREATE_ATTEMPTS, base, platform, identity.platform_id
        )))
    }

    /// Platform link first, then email.
    async fn find_existing(
        &self,
        identity: &SocialIdentity,
        platform: SocialPlatform,
    ) -> Result<Option<User>, AppError> {
        if let Some(user) = self
            .store
            .find_user_by_social_link(platform, &identity.platform_id)
            .await?
        {
            return Ok(Some(user));
        }

        match identity.email.as_deref() {
            Some(email) => self.store.find_user_by_email(email).await,
            None => Ok(None),
        }
    }

    /// First unused `base`, `base1`, `base2`, ... starting at `from`.
    async fn free_username(&self, base: &str, from: u32) -> Result<(String, u32), AppError> {
        for suffix in from..from.saturating_add(MAX_USERNAME_PROBES) {
            let name = candidate(base, suffix);
            if !self.store.username_exists(&name).await? {
                return Ok((name, suffix));
            }
        }

        Err(AppError::UsernameGeneration(format!(
            "no free username for base '{}' after {} probes",
            base, MAX_USERNAME_PROBES
        )))
    }

    /// Upsert the `(user, platform)` social account with the fresh token
    /// and return the user the identity ends up linked to.
    ///
    /// If another login linked the platform id to a different user after
    /// `user` was matched by email, that link wins and its owner is returned.
    async fn link_account(
        &self,
        user: &User,
        identity: &SocialIdentity,
        platform: SocialPlatform,
        token: &str,
    ) -> Result<User, AppError> {
        if let Some(account) = self.store.find_social_account(&user.id, platform).await? {
            self.refresh_account(account, identity, token).await?;
            return Ok(user.clone());
        }

        let account = SocialAccount::new(
            &user.id,
            platform,
            &identity.platform_id,
            identity.account_username(),
            token,
        );
        match self.store.create_social_account(&account).await {
            Ok(()) => {
                tracing::info!(user_id = %user.id, platform = %platform, "Linked social account");
                Ok(user.clone())
            }
            Err(e) if e.is_conflict() => {
                if let Some(account) = self.store.find_social_account(&user.id, platform).await? {
                    self.refresh_account(account, identity, token).await?;
                    return Ok(user.clone());
                }
                self.reuse_link_owner(user, identity, platform, token).await
            }
            Err(e) => Err(e),
        }
    }

    async fn reuse_link_owner(
        &self,
        user: &User,
        identity: &SocialIdentity,
        platform: SocialPlatform,
        token: &str,
    ) -> Result<User, AppError> {
        let owner = self
            .store
            .find_user_by_social_link(platform, &identity.platform_id)
            .await?
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "{} identity {} conflicts with no linked owner",
                    platform,
                    identity.platform_id
                )
            })?;

        tracing::warn!(
            matched_user_id = %user.id,
            owner_id = %owner.id,
            platform = %platform,
            "Identity linked to another user concurrently, using the link owner"
        );

        if let Some(account) = self.store.find_social_account(&owner.id, platform).await? {
            self.refresh_account(account, identity, token).await?;
        }
        Ok(owner)
    }

    async fn refresh_account(
        &self,
        mut account: SocialAccount,
        identity: &SocialIdentity,
        token: &str,
    ) -> Result<(), AppError> {
        account.access_token = token.to_string();
        account.platform_username = identity.account_username().to_string();
        account.is_active = true;
        account.updated_at = Utc::now();
        self.store.update_social_account(&account).await
    }
}
