// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod configuration;
pub mod identity;
pub mod password;
pub mod providers;
pub mod social;
pub mod social_login;
pub mod tokens;

pub use configuration::{ConfigCache, ConfigurationService, SetOptions};
pub use identity::IdentityResolver;
pub use providers::SocialIdentity;
pub use social::{HttpProfileFetcher, ProfileFetcher, SocialError, SocialVerifier};
pub use social_login::{AuthSession, LoginOrchestrator};
pub use tokens::{TokenIssuer, TokenPair};
