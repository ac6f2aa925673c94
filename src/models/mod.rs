// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod configuration;
pub mod platform;
pub mod post;
pub mod user;

pub use configuration::{Configuration, ConfigurationItem};
pub use platform::SocialPlatform;
pub use post::{Post, PostAuthor, PostFilter, PostStatus};
pub use user::{PublicUser, RefreshToken, SocialAccount, User};
