// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request middleware: bearer authentication, response headers and maintenance mode.

pub mod auth;
pub mod security;

pub use auth::{require_auth, AuthUser};
