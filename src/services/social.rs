// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Social access-token verification.
//!
//! The verifier calls the provider's profile endpoint with the user's token,
//! normalizes the payload and, for providers that keep the email behind a
//! separate endpoint, performs the supplementary lookup.

use crate::models::SocialPlatform;
use crate::services::providers::{self, IncompleteData, ProviderRequest, SocialIdentity};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Ways a social token can fail verification.
#[derive(Debug, thiserror::Error)]
pub enum SocialError {
    /// Provider rejected the token or answered with an error payload.
    #[error("token rejected: {0}")]
    InvalidToken(String),

    /// Provider could not be reached.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("incomplete profile: {0}")]
    IncompleteData(#[from] IncompleteData),
}

/// Capability to GET a provider endpoint and return its JSON body.
#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    async fn get_json(
        &self,
        platform: SocialPlatform,
        request: &ProviderRequest,
    ) -> Result<Value, SocialError>;
}

/// [`ProfileFetcher`] backed by `reqwest`.
#[derive(Clone)]
pub struct HttpProfileFetcher {
    http: reqwest::Client,
}

impl HttpProfileFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl ProfileFetcher for HttpProfileFetcher {
    async fn get_json(
        &self,
        platform: SocialPlatform,
        request: &ProviderRequest,
    ) -> Result<Value, SocialError> {
        let mut builder = self.http.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        let response = builder.send().await.map_err(|e| {
            let e = e.without_url();
            tracing::warn!(platform = %platform, error = %e, "Provider request failed");
            SocialError::ProviderUnavailable(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(platform = %platform, status = status.as_u16(), "Provider rejected token");
            return Err(SocialError::InvalidToken(format!("HTTP {}", status)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SocialError::InvalidToken(format!("JSON parse error: {}", e.without_url())))?;

        if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
            tracing::warn!(platform = %platform, error = %error, "Provider returned error payload");
            return Err(SocialError::InvalidToken(error.to_string()));
        }

        Ok(body)
    }
}

/// Verifies a platform access token and returns the normalized identity.
#[derive(Clone)]
pub struct SocialVerifier {
    fetcher: Arc<dyn ProfileFetcher>,
    twitch_client_id: String,
}

impl SocialVerifier {
    pub fn new(fetcher: Arc<dyn ProfileFetcher>, twitch_client_id: String) -> Self {
        Self {
            fetcher,
            twitch_client_id,
        }
    }

    pub async fn verify(
        &self,
        platform: SocialPlatform,
        token: &str,
    ) -> Result<SocialIdentity, SocialError> {
        let provider = providers::spec(platform);
        let request = provider.profile_request(token, &self.twitch_client_id);
        let raw = self.fetcher.get_json(platform, &request).await?;

        let mut identity = provider.extract(&raw)?;

        if identity.email.is_none() {
            if let Some(request) = provider.email_request(token, &self.twitch_client_id) {
                match self.fetcher.get_json(platform, &request).await {
                    Ok(raw) => identity.email = providers::supplementary_email(&raw),
                    Err(e) => {
                        tracing::warn!(platform = %platform, error = %e, "Email lookup failed, continuing without email");
                    }
                }
            }
        }

        if !identity.is_complete() {
            tracing::warn!(platform = %platform, platform_id = %identity.platform_id, "Provider returned incomplete profile");
            return Err(IncompleteData::MissingHandle.into());
        }

        Ok(identity)
    }
}
