// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use social_reform::config::Config;
use social_reform::db::{FirestoreDb, MemoryStore, Store};
use social_reform::models::SocialPlatform;
use social_reform::routes::create_router;
use social_reform::services::providers::ProviderRequest;
use social_reform::services::{ProfileFetcher, SocialError};
use social_reform::AppState;
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Provider stand-in: answers with the profile registered for whichever
/// token appears in the request, and rejects everything else. Email
/// lookups are answered from a separate table.
#[derive(Default)]
pub struct StubFetcher {
    profiles: HashMap<String, Value>,
    emails: HashMap<String, Value>,
}

#[allow(dead_code)]
impl StubFetcher {
    pub fn with_profile(mut self, token: &str, profile: Value) -> Self {
        self.profiles.insert(token.to_string(), profile);
        self
    }

    pub fn with_email(mut self, token: &str, payload: Value) -> Self {
        self.emails.insert(token.to_string(), payload);
        self
    }
}

fn mentions(request: &ProviderRequest, token: &str) -> bool {
    request.url.contains(token) || request.headers.iter().any(|(_, v)| v.contains(token))
}

#[async_trait]
impl ProfileFetcher for StubFetcher {
    async fn get_json(
        &self,
        _platform: SocialPlatform,
        request: &ProviderRequest,
    ) -> Result<Value, SocialError> {
        let table = if request.url.contains("emailAddress") {
            &self.emails
        } else {
            &self.profiles
        };
        table
            .iter()
            .find(|(token, _)| mentions(request, token))
            .map(|(_, profile)| profile.clone())
            .ok_or_else(|| SocialError::InvalidToken("HTTP 401 Unauthorized".to_string()))
    }
}

/// Create a test app over an in-memory store with no known social tokens.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    create_test_app_with(StubFetcher::default())
}

/// Create a test app whose providers answer from `fetcher`.
#[allow(dead_code)]
pub fn create_test_app_with(fetcher: StubFetcher) -> (Router, Arc<AppState>) {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState::new(
        Config::test_default(),
        store,
        Arc::new(fetcher),
    ));
    (create_router(state.clone()), state)
}

/// Send one request and return the status and decoded JSON body
/// (`Value::Null` for an empty body).
#[allow(dead_code)]
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Register a password user and return the `data` part of the response.
#[allow(dead_code)]
pub async fn register(app: &Router, email: &str, username: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(serde_json::json!({
            "email": email,
            "password": "correct-horse",
            "username": username,
            "displayName": "Test User",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {}", body);
    body["data"].clone()
}

/// Register a throwaway user and return its access token.
#[allow(dead_code)]
pub async fn access_token(app: &Router, username: &str) -> String {
    let data = register(app, &format!("{}@example.com", username), username).await;
    data["tokens"]["accessToken"].as_str().unwrap().to_string()
}
