// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Runtime key/value configuration backed by the store.
//!
//! Reads of single keys go through [`ConfigCache`]. The cache is best-effort:
//! every write made through [`ConfigurationService`] invalidates the affected
//! key, but writes from other processes are only seen once the entry expires.

use crate::db::Store;
use crate::error::AppError;
use crate::models::configuration::DEFAULT_CATEGORY;
use crate::models::{Configuration, ConfigurationItem};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use futures_util::future::try_join_all;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Cache entry lifetime.
pub const CACHE_TTL_SECS: i64 = 5 * 60;

#[derive(Debug, Clone)]
struct CachedValue {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Read-through cache of active configuration values.
#[derive(Clone)]
pub struct ConfigCache {
    entries: Arc<DashMap<String, CachedValue>>,
    ttl: Duration,
}

impl Default for ConfigCache {
    fn default() -> Self {
        Self::new(Duration::seconds(CACHE_TTL_SECS))
    }
}

impl ConfigCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let now = Utc::now();
        if let Some(entry) = self.entries.get(key) {
            if now < entry.expires_at {
                return Some(entry.value.clone());
            }
        }
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        None
    }

    pub fn insert(&self, key: &str, value: String) {
        self.entries.insert(
            key.to_string(),
            CachedValue {
                value,
                expires_at: Utc::now() + self.ttl,
            },
        );
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn invalidate_all(&self) {
        self.entries.clear();
    }
}

/// Optional metadata for [`ConfigurationService::set`].
///
/// Fields left `None` keep the stored value (or the default for new keys).
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_secret: Option<bool>,
}

struct DefaultEntry {
    key: &'static str,
    value: &'static str,
    description: &'static str,
    category: &'static str,
    is_secret: bool,
}

const fn entry(
    key: &'static str,
    value: &'static str,
    description: &'static str,
    category: &'static str,
    is_secret: bool,
) -> DefaultEntry {
    DefaultEntry {
        key,
        value,
        description,
        category,
        is_secret,
    }
}

const DEFAULT_FILE_TYPES: &str = "image/jpeg,image/png,image/gif,video/mp4,video/quicktime";
const DEFAULT_UPLOAD_MAX_SIZE: u64 = 50_000_000;
const DEFAULT_EMAIL_PORT: u16 = 587;

/// Seed table written by [`ConfigurationService::initialize_defaults`].
const DEFAULTS: &[DefaultEntry] = &[
    // authentication
    entry("JWT_SECRET", "change-me-in-production", "Secret key for JWT token generation", "authentication", true),
    entry("JWT_REFRESH_SECRET", "change-me-in-production", "Secret key for JWT refresh token generation", "authentication", true),
    entry("JWT_EXPIRES_IN", "15m", "JWT token expiration time", "authentication", false),
    entry("JWT_REFRESH_EXPIRES_IN", "7d", "JWT refresh token expiration time", "authentication", false),
    // upload
    entry("UPLOAD_MAX_SIZE", "50000000", "Maximum file upload size in bytes", "upload", false),
    entry("ALLOWED_FILE_TYPES", DEFAULT_FILE_TYPES, "Allowed file types for upload", "upload", false),
    // email
    entry("EMAIL_HOST", "", "Email service host", "email", false),
    entry("EMAIL_PORT", "587", "Email service port", "email", false),
    entry("EMAIL_USER", "", "Email service username", "email", false),
    entry("EMAIL_PASSWORD", "", "Email service password", "email", true),
    // social_media
    entry("YOUTUBE_CLIENT_ID", "", "YouTube API client ID", "social_media", false),
    entry("YOUTUBE_CLIENT_SECRET", "", "YouTube API client secret", "social_media", true),
    entry("INSTAGRAM_CLIENT_ID", "", "Instagram API client ID", "social_media", false),
    entry("INSTAGRAM_CLIENT_SECRET", "", "Instagram API client secret", "social_media", true),
    entry("TWITTER_CLIENT_ID", "", "Twitter API client ID", "social_media", false),
    entry("TWITTER_CLIENT_SECRET", "", "Twitter API client secret", "social_media", true),
    entry("TIKTOK_CLIENT_ID", "", "TikTok API client ID", "social_media", false),
    entry("TIKTOK_CLIENT_SECRET", "", "TikTok API client secret", "social_media", true),
    // firebase
    entry("FIREBASE_PROJECT_ID", "", "Firebase project ID", "firebase", false),
    entry("FIREBASE_PRIVATE_KEY", "", "Firebase private key", "firebase", true),
    entry("FIREBASE_CLIENT_EMAIL", "", "Firebase client email", "firebase", false),
    // app
    entry("APP_NAME", "Social Reform", "Application name", "app", false),
    entry("APP_VERSION", "1.0.0", "Application version", "app", false),
    entry("MAINTENANCE_MODE", "false", "Enable maintenance mode", "app", false),
];

/// Configuration store operations.
#[derive(Clone)]
pub struct ConfigurationService {
    store: Arc<dyn Store>,
    cache: ConfigCache,
}

impl ConfigurationService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            cache: ConfigCache::default(),
        }
    }

    pub fn cache(&self) -> &ConfigCache {
        &self.cache
    }

    /// Value of an active entry.
    pub async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        if let Some(value) = self.cache.get(key) {
            return Ok(Some(value));
        }

        let value = self
            .store
            .get_configuration(key)
            .await?
            .filter(|entry| entry.is_active)
            .map(|entry| entry.value);

        if let Some(value) = &value {
            self.cache.insert(key, value.clone());
        }
        Ok(value)
    }

    /// Value of an active, non-empty entry, else `fallback`.
    pub async fn get_or(&self, key: &str, fallback: &str) -> Result<String, AppError> {
        Ok(self
            .get(key)
            .await?
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| fallback.to_string()))
    }

    /// Active values for `keys`. Missing or inactive keys are omitted.
    pub async fn get_multiple(&self, keys: &[&str]) -> Result<HashMap<String, String>, AppError> {
        let entries =
            try_join_all(keys.iter().map(|key| self.store.get_configuration(key))).await?;

        Ok(entries
            .into_iter()
            .flatten()
            .filter(|entry| entry.is_active)
            .map(|entry| (entry.key, entry.value))
            .collect())
    }

    /// Active entries of one category, sorted by key. Secret values are
    /// masked unless `include_secrets` is set.
    pub async fn get_by_category(
        &self,
        category: &str,
        include_secrets: bool,
    ) -> Result<Vec<ConfigurationItem>, AppError> {
        let mut entries: Vec<Configuration> = self
            .store
            .list_configurations()
            .await?
            .into_iter()
            .filter(|entry| entry.is_active && entry.category == category)
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(entries
            .iter()
            .map(|entry| ConfigurationItem::from_entry(entry, include_secrets))
            .collect())
    }

    /// Create or update an entry.
    pub async fn set(&self, key: &str, value: &str, options: SetOptions) -> Result<(), AppError> {
        let now = Utc::now();
        let existing = self.store.get_configuration(key).await?;

        let entry = match existing {
            Some(existing) => Configuration {
                value: value.to_string(),
                description: options.description.or(existing.description),
                category: options.category.unwrap_or(existing.category),
                is_secret: options.is_secret.unwrap_or(existing.is_secret),
                updated_at: now,
                ..existing
            },
            None => Configuration {
                key: key.to_string(),
                value: value.to_string(),
                description: options.description,
                category: options
                    .category
                    .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
                is_secret: options.is_secret.unwrap_or(false),
                is_active: true,
                created_at: now,
                updated_at: now,
            },
        };

        self.store.upsert_configuration(&entry).await?;
        self.cache.invalidate(key);
        tracing::info!(key, category = %entry.category, "Configuration saved");
        Ok(())
    }

    /// Returns whether the entry existed.
    pub async fn delete(&self, key: &str) -> Result<bool, AppError> {
        let removed = self.store.delete_configuration(key).await?;
        self.cache.invalidate(key);
        if removed {
            tracing::info!(key, "Configuration deleted");
        }
        Ok(removed)
    }

    /// Flip the active flag. Returns whether the entry existed.
    pub async fn toggle(&self, key: &str) -> Result<bool, AppError> {
        let Some(mut entry) = self.store.get_configuration(key).await? else {
            return Ok(false);
        };

        entry.is_active = !entry.is_active;
        entry.updated_at = Utc::now();
        self.store.upsert_configuration(&entry).await?;
        self.cache.invalidate(key);

        tracing::info!(key, active = entry.is_active, "Configuration toggled");
        Ok(true)
    }

    /// Distinct categories with at least one active entry, sorted.
    pub async fn categories(&self) -> Result<Vec<String>, AppError> {
        let categories: BTreeSet<String> = self
            .store
            .list_configurations()
            .await?
            .into_iter()
            .filter(|entry| entry.is_active)
            .map(|entry| entry.category)
            .collect();
        Ok(categories.into_iter().collect())
    }

    /// Insert seed entries that are not already present.
    ///
    /// Returns the number of entries inserted.
    pub async fn initialize_defaults(&self) -> Result<usize, AppError> {
        let now = Utc::now();
        let mut inserted = 0;

        for default in DEFAULTS {
            if self.store.get_configuration(default.key).await?.is_some() {
                continue;
            }
            self.store
                .upsert_configuration(&Configuration {
                    key: default.key.to_string(),
                    value: default.value.to_string(),
                    description: Some(default.description.to_string()),
                    category: default.category.to_string(),
                    is_secret: default.is_secret,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                })
                .await?;
            inserted += 1;
        }

        self.cache.invalidate_all();
        tracing::info!(inserted, total = DEFAULTS.len(), "Configuration defaults initialized");
        Ok(inserted)
    }

    // ─── Typed Accessors ─────────────────────────────────────────

    pub async fn app_name(&self) -> Result<String, AppError> {
        self.get_or("APP_NAME", "Social Reform").await
    }

    pub async fn app_version(&self) -> Result<String, AppError> {
        self.get_or("APP_VERSION", "1.0.0").await
    }

    pub async fn is_maintenance_mode(&self) -> Result<bool, AppError> {
        Ok(self
            .get_or("MAINTENANCE_MODE", "false")
            .await?
            .eq_ignore_ascii_case("true"))
    }

    /// Maximum upload size in bytes.
    pub async fn upload_max_size(&self) -> Result<u64, AppError> {
        Ok(self
            .get_or("UPLOAD_MAX_SIZE", "")
            .await?
            .trim()
            .parse()
            .unwrap_or(DEFAULT_UPLOAD_MAX_SIZE))
    }

    pub async fn allowed_file_types(&self) -> Result<Vec<String>, AppError> {
        Ok(self
            .get_or("ALLOWED_FILE_TYPES", DEFAULT_FILE_TYPES)
            .await?
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect())
    }

    pub async fn email_port(&self) -> Result<u16, AppError> {
        Ok(self
            .get_or("EMAIL_PORT", "")
            .await?
            .trim()
            .parse()
            .unwrap_or(DEFAULT_EMAIL_PORT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::configuration::SECRET_MASK;

    fn service() -> (ConfigurationService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (ConfigurationService::new(store.clone()), store)
    }

    #[test]
    fn test_cache_expiry_and_invalidation() {
        let cache = ConfigCache::new(Duration::seconds(60));
        cache.insert("A", "1".to_string());
        cache.insert("B", "2".to_string());
        assert_eq!(cache.get("A").as_deref(), Some("1"));

        cache.invalidate("A");
        assert_eq!(cache.get("A"), None);
        assert_eq!(cache.get("B").as_deref(), Some("2"));

        cache.invalidate_all();
        assert_eq!(cache.get("B"), None);

        let expired = ConfigCache::new(Duration::seconds(-1));
        expired.insert("C", "3".to_string());
        assert_eq!(expired.get("C"), None);
    }

    #[tokio::test]
    async fn test_set_get_and_cache_invalidation() {
        let (service, store) = service();
        service.set("FEATURE_X", "on", SetOptions::default()).await.unwrap();
        assert_eq!(service.get("FEATURE_X").await.unwrap().as_deref(), Some("on"));

        // Writes behind the service's back are hidden by the cache.
        let mut entry = store.get_configuration("FEATURE_X").await.unwrap().unwrap();
        entry.value = "stale".to_string();
        store.upsert_configuration(&entry).await.unwrap();
        assert_eq!(service.get("FEATURE_X").await.unwrap().as_deref(), Some("on"));

        service.set("FEATURE_X", "off", SetOptions::default()).await.unwrap();
        assert_eq!(service.get("FEATURE_X").await.unwrap().as_deref(), Some("off"));

        let stored = store.get_configuration("FEATURE_X").await.unwrap().unwrap();
        assert_eq!(stored.category, DEFAULT_CATEGORY);
    }

    #[tokio::test]
    async fn test_set_keeps_metadata_when_not_given() {
        let (service, store) = service();
        service
            .set(
                "API_KEY",
                "one",
                SetOptions {
                    description: Some("Key".into()),
                    category: Some("social_media".into()),
                    is_secret: Some(true),
                },
            )
            .await
            .unwrap();
        service.set("API_KEY", "two", SetOptions::default()).await.unwrap();

        let stored = store.get_configuration("API_KEY").await.unwrap().unwrap();
        assert_eq!(stored.value, "two");
        assert!(stored.is_secret);
        assert_eq!(stored.category, "social_media");
        assert_eq!(stored.description.as_deref(), Some("Key"));
    }

    #[tokio::test]
    async fn test_toggle_hides_entry() {
        let (service, _store) = service();
        service.set("FLAG", "1", SetOptions::default()).await.unwrap();
        assert!(service.get("FLAG").await.unwrap().is_some());

        assert!(service.toggle("FLAG").await.unwrap());
        assert_eq!(service.get("FLAG").await.unwrap(), None);
        assert!(service.get_multiple(&["FLAG"]).await.unwrap().is_empty());

        assert!(service.toggle("FLAG").await.unwrap());
        assert_eq!(service.get("FLAG").await.unwrap().as_deref(), Some("1"));

        assert!(!service.toggle("MISSING").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete() {
        let (service, _store) = service();
        service.set("GONE", "x", SetOptions::default()).await.unwrap();
        service.get("GONE").await.unwrap();

        assert!(service.delete("GONE").await.unwrap());
        assert_eq!(service.get("GONE").await.unwrap(), None);
        assert!(!service.delete("GONE").await.unwrap());
    }

    #[tokio::test]
    async fn test_initialize_defaults_keeps_operator_edits() {
        let (service, _store) = service();
        service
            .set("APP_NAME", "Custom", SetOptions::default())
            .await
            .unwrap();

        let inserted = service.initialize_defaults().await.unwrap();
        assert_eq!(inserted, DEFAULTS.len() - 1);
        assert_eq!(service.app_name().await.unwrap(), "Custom");

        assert_eq!(service.initialize_defaults().await.unwrap(), 0);

        let categories = service.categories().await.unwrap();
        for expected in ["app", "authentication", "email", "firebase", "social_media", "upload"] {
            assert!(categories.contains(&expected.to_string()), "{}", expected);
        }
    }

    #[tokio::test]
    async fn test_get_by_category_masks_secrets() {
        let (service, _store) = service();
        service.initialize_defaults().await.unwrap();

        let masked = service.get_by_category("authentication", false).await.unwrap();
        let keys: Vec<_> = masked.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(
            keys,
            ["JWT_EXPIRES_IN", "JWT_REFRESH_EXPIRES_IN", "JWT_REFRESH_SECRET", "JWT_SECRET"]
        );
        let secret = masked.iter().find(|i| i.key == "JWT_SECRET").unwrap();
        assert_eq!(secret.value, SECRET_MASK);

        let revealed = service.get_by_category("authentication", true).await.unwrap();
        let secret = revealed.iter().find(|i| i.key == "JWT_SECRET").unwrap();
        assert_ne!(secret.value, SECRET_MASK);
    }

    #[tokio::test]
    async fn test_typed_accessors() {
        let (service, _store) = service();
        assert_eq!(service.app_version().await.unwrap(), "1.0.0");
        assert!(!service.is_maintenance_mode().await.unwrap());
        assert_eq!(service.upload_max_size().await.unwrap(), DEFAULT_UPLOAD_MAX_SIZE);
        assert_eq!(service.email_port().await.unwrap(), 587);

        service.set("MAINTENANCE_MODE", "TRUE", SetOptions::default()).await.unwrap();
        service.set("UPLOAD_MAX_SIZE", "not-a-number", SetOptions::default()).await.unwrap();
        service
            .set("ALLOWED_FILE_TYPES", "image/png, video/mp4,", SetOptions::default())
            .await
            .unwrap();

        assert!(service.is_maintenance_mode().await.unwrap());
        assert_eq!(service.upload_max_size().await.unwrap(), DEFAULT_UPLOAD_MAX_SIZE);
        assert_eq!(
            service.allowed_file_types().await.unwrap(),
            vec!["image/png".to_string(), "video/mp4".to_string()]
        );
    }

    #[tokio::test]
    async fn test_get_or_treats_empty_as_missing() {
        let (service, _store) = service();
        service.set("EMPTY", "", SetOptions::default()).await.unwrap();
        assert_eq!(service.get_or("EMPTY", "fallback").await.unwrap(), "fallback");
    }
}
