// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session tokens.
//!
//! Access tokens are short-lived HS256 JWTs. Refresh tokens are signed with a
//! separate key and additionally persisted (as a SHA-256 digest) so they can
//! be revoked before they expire.

use crate::db::Store;
use crate::error::AppError;
use crate::models::RefreshToken;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Access token lifetime (15 minutes).
pub const ACCESS_TOKEN_TTL_SECS: i64 = 900;

/// Refresh token lifetime (7 days).
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Access token claims.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub user_id: String,
    pub iat: i64,
    pub exp: i64,
}

/// Refresh token claims. `jti` keeps tokens minted in the same second distinct.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RefreshClaims {
    pub user_id: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Token pair returned on login, registration and refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Hex SHA-256 of a refresh token, used as its storage key.
pub fn refresh_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Issues, verifies, rotates and revokes session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    store: Arc<dyn Store>,
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
}

impl TokenIssuer {
    pub fn new(store: Arc<dyn Store>, access_secret: &[u8], refresh_secret: &[u8]) -> Self {
        Self {
            store,
            access_encoding: EncodingKey::from_secret(access_secret),
            access_decoding: DecodingKey::from_secret(access_secret),
            refresh_encoding: EncodingKey::from_secret(refresh_secret),
            refresh_decoding: DecodingKey::from_secret(refresh_secret),
        }
    }

    /// Mint a token pair and persist the refresh token digest.
    pub async fn issue(&self, user_id: &str) -> Result<TokenPair, AppError> {
        let now = Utc::now();
        let iat = now.timestamp();

        let access = AccessClaims {
            user_id: user_id.to_string(),
            iat,
            exp: iat + ACCESS_TOKEN_TTL_SECS,
        };
        let refresh = RefreshClaims {
            user_id: user_id.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat,
            exp: iat + REFRESH_TOKEN_TTL_SECS,
        };

        let header = Header::new(Algorithm::HS256);
        let access_token = encode(&header, &access, &self.access_encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign access token: {}", e)))?;
        let refresh_token = encode(&header, &refresh, &self.refresh_encoding).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to sign refresh token: {}", e))
        })?;

        self.store
            .create_refresh_token(&RefreshToken {
                token: refresh_digest(&refresh_token),
                user_id: user_id.to_string(),
                expires_at: now + Duration::seconds(REFRESH_TOKEN_TTL_SECS),
                created_at: now,
            })
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: ACCESS_TOKEN_TTL_SECS,
        })
    }

    /// Validate an access token and return its user ID.
    pub fn verify_access(&self, token: &str) -> Result<String, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<AccessClaims>(token, &self.access_decoding, &validation)
            .map(|data| data.claims.user_id)
            .map_err(|_| AppError::InvalidToken)
    }

    /// Exchange a refresh token for a new pair. The old token is revoked.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        let claims = decode::<RefreshClaims>(refresh_token, &self.refresh_decoding, &validation)
            .map_err(|_| AppError::InvalidToken)?
            .claims;

        let digest = refresh_digest(refresh_token);
        let stored = self
            .store
            .find_refresh_token(&digest)
            .await?
            .ok_or(AppError::InvalidToken)?;

        if stored.user_id != claims.user_id || stored.is_expired(Utc::now()) {
            return Err(AppError::InvalidToken);
        }

        // Losing a concurrent rotation means the token was already used.
        if !self.store.delete_refresh_token(&digest).await? {
            return Err(AppError::InvalidToken);
        }

        tracing::debug!(user_id = %claims.user_id, "Refresh token rotated");
        self.issue(&claims.user_id).await
    }

    /// Delete a refresh token. Unknown tokens are ignored.
    pub async fn revoke(&self, refresh_token: &str) -> Result<(), AppError> {
        let removed = self
            .store
            .delete_refresh_token(&refresh_digest(refresh_token))
            .await?;
        tracing::debug!(removed, "Refresh token revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn issuer() -> (TokenIssuer, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (
            TokenIssuer::new(store.clone(), b"access-secret", b"refresh-secret"),
            store,
        )
    }

    #[tokio::test]
    async fn test_issue_and_verify() {
        let (issuer, store) = issuer();
        let pair = issuer.issue("user-1").await.unwrap();

        assert_eq!(pair.expires_in, 900);
        assert_eq!(issuer.verify_access(&pair.access_token).unwrap(), "user-1");

        let stored = store
            .find_refresh_token(&refresh_digest(&pair.refresh_token))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.user_id, "user-1");
        assert_ne!(stored.token, pair.refresh_token);
    }

    #[tokio::test]
    async fn test_keys_are_not_interchangeable() {
        let (issuer, _store) = issuer();
        let pair = issuer.issue("user-1").await.unwrap();

        assert!(issuer.verify_access(&pair.refresh_token).is_err());
        assert!(matches!(
            issuer.refresh(&pair.access_token).await,
            Err(AppError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_each_issue_creates_distinct_refresh_token() {
        let (issuer, _store) = issuer();
        let a = issuer.issue("user-1").await.unwrap();
        let b = issuer.issue("user-1").await.unwrap();
        assert_ne!(a.refresh_token, b.refresh_token);
    }

    #[tokio::test]
    async fn test_refresh_rotates() {
        let (issuer, _store) = issuer();
        let pair = issuer.issue("user-1").await.unwrap();

        let rotated = issuer.refresh(&pair.refresh_token).await.unwrap();
        assert_eq!(issuer.verify_access(&rotated.access_token).unwrap(), "user-1");

        // Old token is single-use.
        assert!(matches!(
            issuer.refresh(&pair.refresh_token).await,
            Err(AppError::InvalidToken)
        ));
        assert!(issuer.refresh(&rotated.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_revoked_token_cannot_refresh() {
        let (issuer, _store) = issuer();
        let pair = issuer.issue("user-1").await.unwrap();

        issuer.revoke(&pair.refresh_token).await.unwrap();
        issuer.revoke(&pair.refresh_token).await.unwrap();

        assert!(matches!(
            issuer.refresh(&pair.refresh_token).await,
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_access_token_rejected() {
        let (issuer, _store) = issuer();
        let past = Utc::now().timestamp() - 3600;
        let claims = AccessClaims {
            user_id: "user-1".to_string(),
            iat: past - ACCESS_TOKEN_TTL_SECS,
            exp: past,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"access-secret"),
        )
        .unwrap();

        assert!(matches!(
            issuer.verify_access(&token),
            Err(AppError::InvalidToken)
        ));
    }
}
