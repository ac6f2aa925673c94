// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Runtime configuration CRUD.

use crate::error::{AppError, Result};
use crate::models::ConfigurationItem;
use crate::routes::extract::ValidatedJson;
use crate::routes::Ack;
use crate::services::SetOptions;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Configuration routes (require authentication).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/configurations",
            get(list_configurations)
                .post(create_configuration)
                .delete(delete_configuration),
        )
        .route(
            "/api/configurations/{key}",
            get(get_configuration)
                .put(update_configuration)
                .patch(toggle_configuration),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub category: Option<String>,
    #[serde(default)]
    pub include_secrets: bool,
}

#[derive(Debug, Serialize)]
pub struct CategoryListing {
    pub configurations: Vec<ConfigurationItem>,
}

#[derive(Debug, Serialize)]
pub struct CategoriesListing {
    pub categories: Vec<String>,
}

/// Entries of one category, or the list of categories when none is given.
async fn list_configurations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Response> {
    match query.category.filter(|c| !c.is_empty()) {
        Some(category) => {
            let configurations = state
                .configurations
                .get_by_category(&category, query.include_secrets)
                .await?;
            Ok(Json(CategoryListing { configurations }).into_response())
        }
        None => {
            let categories = state.configurations.categories().await?;
            Ok(Json(CategoriesListing { categories }).into_response())
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateConfigurationRequest {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_secret: Option<bool>,
}

async fn create_configuration(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<CreateConfigurationRequest>,
) -> Result<Json<Ack>> {
    if body.key.is_empty() || body.value.is_empty() {
        return Err(AppError::BadRequest(
            "Key and value are required".to_string(),
        ));
    }

    let options = SetOptions {
        description: body.description,
        category: body.category,
        is_secret: body.is_secret,
    };
    state
        .configurations
        .set(&body.key, &body.value, options)
        .await?;
    Ok(Ack::ok())
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub key: Option<String>,
}

async fn delete_configuration(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<Ack>> {
    let key = query
        .key
        .filter(|k| !k.is_empty())
        .ok_or_else(|| AppError::BadRequest("Key is required".to_string()))?;

    if !state.configurations.delete(&key).await? {
        return Err(AppError::NotFound("Configuration not found".to_string()));
    }
    Ok(Ack::ok())
}

#[derive(Debug, Serialize)]
pub struct ConfigurationValue {
    pub key: String,
    pub value: String,
}

/// Value of one active entry.
async fn get_configuration(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<ConfigurationValue>> {
    let value = state
        .configurations
        .get(&key)
        .await?
        .ok_or_else(|| AppError::NotFound("Configuration not found".to_string()))?;
    Ok(Json(ConfigurationValue { key, value }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConfigurationRequest {
    #[serde(default)]
    pub value: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_secret: Option<bool>,
}

async fn update_configuration(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateConfigurationRequest>,
) -> Result<Json<Ack>> {
    if body.value.is_empty() {
        return Err(AppError::BadRequest("Value is required".to_string()));
    }

    let options = SetOptions {
        description: body.description,
        category: body.category,
        is_secret: body.is_secret,
    };
    state.configurations.set(&key, &body.value, options).await?;
    Ok(Ack::ok())
}

/// Flip the active flag.
async fn toggle_configuration(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<Ack>> {
    if !state.configurations.toggle(&key).await? {
        return Err(AppError::NotFound("Configuration not found".to_string()));
    }
    Ok(Ack::ok())
}
