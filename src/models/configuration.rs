// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Runtime key/value configuration entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CATEGORY: &str = "general";

/// Mask shown in place of secret values.
pub const SECRET_MASK: &str = "***";

/// Configuration entry as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    /// Unique key (also used as document ID)
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub category: String,
    pub is_secret: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Configuration entry as listed by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationItem {
    pub key: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
    pub is_secret: bool,
    pub is_active: bool,
}

impl ConfigurationItem {
    /// Build the listed form, masking secrets unless explicitly included.
    pub fn from_entry(entry: &Configuration, include_secrets: bool) -> Self {
        let value = if entry.is_secret && !include_secrets {
            SECRET_MASK.to_string()
        } else {
            entry.value.clone()
        };
        Self {
            key: entry.key.clone(),
            value,
            description: entry.description.clone(),
            category: entry.category.clone(),
            is_secret: entry.is_secret,
            is_active: entry.is_active,
        }
    }
}
