// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Post creation and listing for the authenticated user.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Post, PostAuthor, PostFilter, PostStatus, SocialPlatform};
use crate::routes::extract::ValidatedJson;
use crate::routes::ApiResponse;
use crate::AppState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::{Validate, ValidateUrl, ValidationError};

/// Post routes (require authentication).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/posts", get(list_posts).post(create_post))
}

// ─── Create ──────────────────────────────────────────────────

fn validation_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

fn validate_media_urls(urls: &[String]) -> std::result::Result<(), ValidationError> {
    if urls.iter().all(|url| url.validate_url()) {
        Ok(())
    } else {
        Err(validation_error("url", "Each media URL must be a valid URL"))
    }
}

fn validate_publishing_platforms(
    platforms: &[SocialPlatform],
) -> std::result::Result<(), ValidationError> {
    if platforms.iter().all(|p| p.supports_publishing()) {
        Ok(())
    } else {
        Err(validation_error(
            "publishing_platform",
            "Posts cannot be published to this platform",
        ))
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
    #[serde(default)]
    #[validate(custom(function = "validate_media_urls"))]
    pub media_urls: Vec<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    #[validate(
        length(min = 1, message = "At least one platform is required"),
        custom(function = "validate_publishing_platforms")
    )]
    pub platforms: Vec<SocialPlatform>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub mentions: Vec<String>,
}

async fn create_post(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<CreatePostRequest>,
) -> Result<Json<ApiResponse<Post>>> {
    let author = state
        .store
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let status = if body.scheduled_at.is_some() {
        PostStatus::Scheduled
    } else {
        PostStatus::Draft
    };
    let now = Utc::now();
    let post = Post {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: author.id.clone(),
        title: body.title,
        content: body.content,
        media_urls: body.media_urls,
        scheduled_at: body.scheduled_at,
        published_at: None,
        status,
        platforms: body.platforms,
        hashtags: body.hashtags,
        mentions: body.mentions,
        user: PostAuthor::from(&author),
        created_at: now,
        updated_at: now,
    };

    state.store.create_post(&post).await?;
    tracing::info!(user_id = %author.id, post_id = %post.id, status = post.status.as_str(), "Created post");

    Ok(ApiResponse::ok(post))
}

// ─── List ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    pub status: Option<PostStatus>,
    pub platform: Option<SocialPlatform>,
}

fn default_page() -> u32 {
    1
}
fn default_limit() -> u32 {
    10
}

const MAX_LIMIT: u32 = 100;

#[derive(Debug, Serialize, PartialEq, Eq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total: usize,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    fn new(page: u32, limit: u32, total: usize) -> Self {
        let total_pages = total.div_ceil(limit as usize) as u32;
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub success: bool,
    pub data: Vec<Post>,
    pub pagination: Pagination,
}

async fn list_posts(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    query: std::result::Result<Query<ListPostsQuery>, QueryRejection>,
) -> Result<Json<PostListResponse>> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let page = query.page.max(1);
    let limit = query.limit.clamp(1, MAX_LIMIT);
    let offset = (page as usize - 1) * limit as usize;
    let filter = PostFilter {
        status: query.status,
        platform: query.platform,
    };

    let (posts, total) = state
        .store
        .list_posts(&auth.user_id, &filter, offset, limit as usize)
        .await?;

    Ok(Json(PostListResponse {
        success: true,
        data: posts,
        pagination: Pagination::new(page, limit, total),
    }))
}
