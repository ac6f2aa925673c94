// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile routes for the authenticated user.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{PublicUser, User};
use crate::routes::extract::ValidatedJson;
use crate::routes::ApiResponse;
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Profile routes (require authentication).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/users/profile", get(get_profile).put(update_profile))
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: PublicUser,
}

async fn load_user(state: &AppState, user_id: &str) -> Result<User> {
    state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<ProfileResponse>>> {
    let user = load_user(&state, &auth.user_id).await?;
    Ok(ApiResponse::ok(ProfileResponse {
        user: PublicUser::from(user),
    }))
}

/// Editable profile fields. Omitted fields are left alone.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50))]
    pub display_name: Option<String>,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
    #[validate(url)]
    pub avatar: Option<String>,
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<ProfileResponse>>> {
    let mut user = load_user(&state, &auth.user_id).await?;

    if let Some(display_name) = body.display_name {
        user.display_name = display_name;
    }
    if let Some(bio) = body.bio {
        user.bio = Some(bio);
    }
    if let Some(avatar) = body.avatar {
        user.avatar = Some(avatar);
    }
    user.updated_at = chrono::Utc::now();

    state.store.update_user(&user).await?;
    tracing::debug!(user_id = %user.id, "Updated profile");

    Ok(ApiResponse::ok(ProfileResponse {
        user: PublicUser::from(user),
    }))
}
