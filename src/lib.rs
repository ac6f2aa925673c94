// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Social Reform: backend API for managing social media accounts and posts.
//!
//! Users register with a password or log in with an access token from one of
//! the supported social platforms. Either way they get a local account and a
//! pair of session tokens.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::Store;
use services::{
    ConfigurationService, IdentityResolver, LoginOrchestrator, ProfileFetcher, SocialVerifier,
    TokenIssuer,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub tokens: TokenIssuer,
    pub social_login: LoginOrchestrator,
    pub configurations: ConfigurationService,
}

impl AppState {
    /// Wire up services over `store`, fetching provider profiles with `fetcher`.
    pub fn new(config: Config, store: Arc<dyn Store>, fetcher: Arc<dyn ProfileFetcher>) -> Self {
        let tokens = TokenIssuer::new(
            store.clone(),
            &config.jwt_secret,
            &config.jwt_refresh_secret,
        );
        let verifier = SocialVerifier::new(fetcher, config.twitch_client_id.clone());
        let resolver = IdentityResolver::new(store.clone());
        let social_login = LoginOrchestrator::new(verifier, resolver, tokens.clone());
        let configurations = ConfigurationService::new(store.clone());

        Self {
            config,
            store,
            tokens,
            social_login,
            configurations,
        }
    }
}
