// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore implementation of [`Store`].
//!
//! Unique constraints are enforced with index documents (`user_emails`,
//! `usernames`, `social_links`) written in the same transaction as the row
//! they guard, each with an `Exists(false)` precondition. If any index entry
//! already exists the whole commit fails and nothing is written.

use crate::db::{collections, social_account_key, social_link_key, Store};
use crate::error::AppError;
use crate::models::{
    Configuration, Post, PostFilter, RefreshToken, SocialAccount, SocialPlatform, User,
};
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::{FirestoreTransaction, FirestoreWritePrecondition};
use serde::{Deserialize, Serialize};

/// Body of a unique index document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexEntry {
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    #[allow(dead_code)]
    id: String,
}

/// Document IDs may not contain `/`.
fn doc_id(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

/// Precondition failures surface differently depending on whether they are
/// caught by the emulator or production.
fn is_conflict(err: &FirestoreError) -> bool {
    match err {
        FirestoreError::DataConflictError(_) => true,
        other => {
            let msg = other.to_string();
            msg.contains("FailedPrecondition") || msg.contains("AlreadyExists")
        }
    }
}

/// A conditional write found no document to act on.
fn is_missing(err: &FirestoreError) -> bool {
    match err {
        FirestoreError::DataNotFoundError(_) => true,
        other => {
            let msg = other.to_string();
            msg.contains("NotFound") || msg.contains("FailedPrecondition")
        }
    }
}

fn map_commit_error(err: FirestoreError, conflict: &str) -> AppError {
    if is_conflict(&err) {
        AppError::Conflict(conflict.to_string())
    } else {
        AppError::Database(format!("Transaction commit failed: {}", err))
    }
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore emulator");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Offline client. Every operation returns [`AppError::Database`].
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    async fn begin(&self) -> Result<FirestoreTransaction<'_>, AppError> {
        self.get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))
    }

    /// Queue a create-only write: the commit fails if the document exists.
    fn create_in_transaction<T>(
        &self,
        transaction: &mut FirestoreTransaction<'_>,
        collection: &str,
        id: &str,
        object: &T,
    ) -> Result<(), AppError>
    where
        T: Serialize + Sync + Send + for<'de> Deserialize<'de>,
    {
        self.get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(id)
            .object(object)
            .add_to_transaction(transaction)
            .map_err(|e| {
                AppError::Database(format!(
                    "Failed to add {} write to transaction: {}",
                    collection, e
                ))
            })?;
        Ok(())
    }

    fn queue_social_account(
        &self,
        transaction: &mut FirestoreTransaction<'_>,
        account: &SocialAccount,
    ) -> Result<(), AppError> {
        self.create_in_transaction(
            transaction,
            collections::SOCIAL_LINKS,
            &social_link_key(account.platform, &account.platform_user_id),
            &IndexEntry {
                user_id: account.user_id.clone(),
            },
        )?;
        self.create_in_transaction(
            transaction,
            collections::SOCIAL_ACCOUNTS,
            &social_account_key(&account.user_id, account.platform),
            account,
        )
    }

    async fn get_index(&self, collection: &str, id: &str) -> Result<Option<IndexEntry>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn user_by_index(&self, collection: &str, id: &str) -> Result<Option<User>, AppError> {
        match self.get_index(collection, id).await? {
            Some(entry) => self.get_user(&entry.user_id).await,
            None => Ok(None),
        }
    }

    /// Delete a document only if it exists. Returns false when it was
    /// already gone, so concurrent deletes see exactly one success.
    async fn delete_doc(&self, collection: &str, id: &str) -> Result<bool, AppError> {
        let result = self
            .get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .execute()
            .await;

        match result {
            Ok(()) => Ok(true),
            Err(e) if is_missing(&e) => Ok(false),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }
}

#[async_trait]
impl Store for FirestoreDb {
    // ─── Users ───────────────────────────────────────────────────

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.user_by_index(collections::USER_EMAILS, &doc_id(email))
            .await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        self.user_by_index(collections::USERNAMES, &doc_id(username))
            .await
    }

    async fn find_user_by_social_link(
        &self,
        platform: SocialPlatform,
        platform_user_id: &str,
    ) -> Result<Option<User>, AppError> {
        self.user_by_index(
            collections::SOCIAL_LINKS,
            &social_link_key(platform, platform_user_id),
        )
        .await
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AppError> {
        Ok(self
            .get_index(collections::USERNAMES, &doc_id(username))
            .await?
            .is_some())
    }

    async fn create_user(
        &self,
        user: &User,
        account: Option<&SocialAccount>,
    ) -> Result<(), AppError> {
        let index = IndexEntry {
            user_id: user.id.clone(),
        };

        let mut transaction = self.begin().await?;
        self.create_in_transaction(&mut transaction, collections::USERS, &user.id, user)?;
        self.create_in_transaction(
            &mut transaction,
            collections::USER_EMAILS,
            &doc_id(&user.email),
            &index,
        )?;
        self.create_in_transaction(
            &mut transaction,
            collections::USERNAMES,
            &doc_id(&user.username),
            &index,
        )?;
        if let Some(account) = account {
            self.queue_social_account(&mut transaction, account)?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| map_commit_error(e, "User already exists"))?;

        tracing::debug!(user_id = %user.id, linked = account.is_some(), "User created");
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let existing = self
            .get_user(&user.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.id)))?;

        let mut updated = user.clone();
        updated.email = existing.email;
        updated.username = existing.username;

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&updated.id)
            .object(&updated)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn count_users(&self) -> Result<usize, AppError> {
        let ids: Vec<IdOnly> = self
            .get_client()?
            .fluent()
            .select()
            .fields(["id"])
            .from(collections::USERS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(ids.len())
    }

    // ─── Social Accounts ─────────────────────────────────────────

    async fn find_social_account(
        &self,
        user_id: &str,
        platform: SocialPlatform,
    ) -> Result<Option<SocialAccount>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SOCIAL_ACCOUNTS)
            .obj()
            .one(&social_account_key(user_id, platform))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn create_social_account(&self, account: &SocialAccount) -> Result<(), AppError> {
        let mut transaction = self.begin().await?;
        self.queue_social_account(&mut transaction, account)?;
        transaction
            .commit()
            .await
            .map_err(|e| map_commit_error(e, "Social account already linked"))?;
        Ok(())
    }

    async fn update_social_account(&self, account: &SocialAccount) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SOCIAL_ACCOUNTS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(social_account_key(&account.user_id, account.platform))
            .object(account)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn count_social_accounts(
        &self,
        platform: SocialPlatform,
        platform_user_id: &str,
    ) -> Result<usize, AppError> {
        let platform_user_id = platform_user_id.to_string();
        let accounts: Vec<SocialAccount> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::SOCIAL_ACCOUNTS)
            .filter(move |q| {
                q.for_all([
                    q.field("platform").eq(platform.as_str()),
                    q.field("platformUserId").eq(platform_user_id.clone()),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(accounts.len())
    }

    // ─── Refresh Tokens ──────────────────────────────────────────

    async fn create_refresh_token(&self, token: &RefreshToken) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::REFRESH_TOKENS)
            .document_id(&token.token)
            .object(token)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn find_refresh_token(&self, digest: &str) -> Result<Option<RefreshToken>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::REFRESH_TOKENS)
            .obj()
            .one(digest)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn delete_refresh_token(&self, digest: &str) -> Result<bool, AppError> {
        self.delete_doc(collections::REFRESH_TOKENS, digest).await
    }

    // ─── Posts ───────────────────────────────────────────────────

    async fn create_post(&self, post: &Post) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::POSTS)
            .document_id(&post.id)
            .object(post)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_posts(
        &self,
        user_id: &str,
        filter: &PostFilter,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Post>, usize), AppError> {
        let user_id = user_id.to_string();
        let filter = *filter;

        // Sorting and paging happen here so no composite index is needed.
        let mut posts: Vec<Post> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::POSTS)
            .filter(move |q| {
                q.for_all([
                    q.field("userId").eq(user_id.clone()),
                    filter
                        .status
                        .and_then(|s| q.field("status").eq(s.as_str())),
                    filter
                        .platform
                        .and_then(|p| q.field("platforms").array_contains(p.as_str())),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = posts.len();
        let page = posts.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }

    // ─── Configurations ──────────────────────────────────────────

    async fn get_configuration(&self, key: &str) -> Result<Option<Configuration>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CONFIGURATIONS)
            .obj()
            .one(&doc_id(key))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_configurations(&self) -> Result<Vec<Configuration>, AppError> {
        let mut entries: Vec<Configuration> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::CONFIGURATIONS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn upsert_configuration(&self, entry: &Configuration) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::CONFIGURATIONS)
            .document_id(doc_id(&entry.key))
            .object(entry)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_configuration(&self, key: &str) -> Result<bool, AppError> {
        self.delete_doc(collections::CONFIGURATIONS, &doc_id(key))
            .await
    }
}
