// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User, linked social account and refresh token records.

use crate::models::SocialPlatform;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// User record as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Random UUID (also used as document ID)
    pub id: String,
    /// Unique email (synthesized `<username>@<platform>.local` for email-less social signups)
    pub email: String,
    /// Unique handle
    pub username: String,
    pub display_name: String,
    pub avatar: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    /// Argon2 PHC string; empty for social-only users
    #[serde(default)]
    pub password_hash: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, username: String, display_name: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email,
            username,
            display_name,
            avatar: None,
            bio: None,
            password_hash: String::new(),
            verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Social-only accounts cannot log in with a password.
    pub fn has_password(&self) -> bool {
        !self.password_hash.is_empty()
    }
}

/// User as returned by the API. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub verified: bool,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            avatar: user.avatar.clone(),
            bio: user.bio.clone(),
            verified: user.verified,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser::from(&user)
    }
}

/// Link between a local user and one external platform identity.
///
/// At most one row per `(user_id, platform)`, and one row per
/// `(platform, platform_user_id)` across all users.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialAccount {
    pub id: String,
    pub user_id: String,
    pub platform: SocialPlatform,
    pub platform_user_id: String,
    pub platform_username: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SocialAccount {
    pub fn new(
        user_id: &str,
        platform: SocialPlatform,
        platform_user_id: &str,
        platform_username: &str,
        access_token: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            platform,
            platform_user_id: platform_user_id.to_string(),
            platform_username: platform_username.to_string(),
            access_token: access_token.to_string(),
            refresh_token: None,
            expires_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Persisted refresh token. Only the SHA-256 digest of the JWT is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    /// Hex SHA-256 of the refresh JWT (also used as document ID)
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
