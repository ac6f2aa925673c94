// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Social login: verify the platform token, resolve the local user, mint
//! session tokens.

use crate::error::AppError;
use crate::models::{PublicUser, SocialPlatform};
use crate::services::identity::IdentityResolver;
use crate::services::social::SocialVerifier;
use crate::services::tokens::{TokenIssuer, TokenPair};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Successful login, registration or social login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AuthSession {
    pub user: PublicUser,
    pub tokens: TokenPair,
}

/// Verify → resolve → issue.
#[derive(Clone)]
pub struct LoginOrchestrator {
    verifier: SocialVerifier,
    resolver: IdentityResolver,
    tokens: TokenIssuer,
}

impl LoginOrchestrator {
    pub fn new(verifier: SocialVerifier, resolver: IdentityResolver, tokens: TokenIssuer) -> Self {
        Self {
            verifier,
            resolver,
            tokens,
        }
    }

    pub async fn login(
        &self,
        platform: SocialPlatform,
        access_token: &str,
    ) -> Result<AuthSession, AppError> {
        let identity = self
            .verifier
            .verify(platform, access_token)
            .await
            .map_err(|source| AppError::Provider { platform, source })?;

        let user = self.resolver.resolve(&identity, platform, access_token).await?;
        let tokens = self.tokens.issue(&user.id).await?;

        tracing::info!(user_id = %user.id, platform = %platform, "Social login succeeded");

        Ok(AuthSession {
            user: PublicUser::from(user),
            tokens,
        })
    }
}
