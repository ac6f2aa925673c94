// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration, password login, social login and session routes.

use crate::error::{AppError, Result};
use crate::models::platform::PlatformFeatures;
use crate::models::{PublicUser, SocialPlatform, User};
use crate::routes::extract::ValidatedJson;
use crate::routes::{Ack, ApiResponse};
use crate::services::password::{hash_password, verify_password};
use crate::services::providers;
use crate::services::{AuthSession, TokenPair};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Public authentication routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/platforms", get(platforms))
        .route("/api/auth/{platform}", post(social_login))
}

// ─── Password Accounts ───────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 3, max = 20))]
    pub username: String,
    #[validate(length(min = 1, max = 50))]
    pub display_name: String,
}

/// Create a password account and start a session.
async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> Result<Json<ApiResponse<AuthSession>>> {
    if state.store.find_user_by_email(&body.email).await?.is_some() {
        return Err(AppError::Conflict("Email already exists".to_string()));
    }
    if state.store.username_exists(&body.username).await? {
        return Err(AppError::Conflict("Username already exists".to_string()));
    }

    let mut user = User::new(body.email, body.username, body.display_name);
    user.password_hash = hash_password(&body.password)?;

    // Another request may have taken the email or username since the checks.
    match state.store.create_user(&user, None).await {
        Err(e) if e.is_conflict() => {
            return Err(AppError::Conflict(
                "User with this email or username already exists".to_string(),
            ))
        }
        result => result?,
    }

    let tokens = state.tokens.issue(&user.id).await?;
    tracing::info!(user_id = %user.id, "Registered new user");

    Ok(ApiResponse::ok(AuthSession {
        user: PublicUser::from(&user),
        tokens,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Password login. Unknown email and wrong password are indistinguishable.
async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<AuthSession>>> {
    let user = state
        .store
        .find_user_by_email(&body.email)
        .await?
        .filter(|user| user.has_password() && verify_password(&body.password, &user.password_hash))
        .ok_or(AppError::InvalidCredentials)?;

    let tokens = state.tokens.issue(&user.id).await?;
    tracing::info!(user_id = %user.id, "Password login");

    Ok(ApiResponse::ok(AuthSession {
        user: PublicUser::from(&user),
        tokens,
    }))
}

// ─── Social Login ────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SocialLoginRequest {
    #[validate(length(min = 1))]
    pub access_token: String,
}

/// Log in (or sign up) with a platform access token.
async fn social_login(
    State(state): State<Arc<AppState>>,
    Path(platform): Path<String>,
    ValidatedJson(body): ValidatedJson<SocialLoginRequest>,
) -> Result<Json<ApiResponse<AuthSession>>> {
    let platform: SocialPlatform = platform
        .parse()
        .map_err(|e: crate::models::platform::UnknownPlatform| {
            AppError::BadRequest(e.to_string())
        })?;

    let session = state.social_login.login(platform, &body.access_token).await?;
    Ok(ApiResponse::ok(session))
}

/// One entry of the supported platform list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformInfo {
    pub platform: SocialPlatform,
    pub name: &'static str,
    #[serde(flatten)]
    pub features: PlatformFeatures,
    pub endpoint: &'static str,
}

async fn platforms() -> Json<ApiResponse<Vec<PlatformInfo>>> {
    let list = SocialPlatform::ALL
        .into_iter()
        .map(|platform| PlatformInfo {
            platform,
            name: platform.display_name(),
            features: platform.features(),
            endpoint: providers::spec(platform).endpoint,
        })
        .collect();
    ApiResponse::ok(list)
}

// ─── Sessions ────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokensResponse {
    pub tokens: TokenPair,
}

/// Exchange a refresh token for a new pair. The old token stops working.
async fn refresh(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<RefreshRequest>,
) -> Result<Json<ApiResponse<TokensResponse>>> {
    let tokens = state.tokens.refresh(&body.refresh_token).await?;
    Ok(ApiResponse::ok(TokensResponse { tokens }))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<RefreshRequest>,
) -> Result<Json<Ack>> {
    state.tokens.revoke(&body.refresh_token).await?;
    Ok(Ack::ok())
}
