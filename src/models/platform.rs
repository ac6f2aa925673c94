// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Supported social platforms.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// An external social network whose access tokens we accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum SocialPlatform {
    Facebook,
    Google,
    Tiktok,
    Twitter,
    Instagram,
    Linkedin,
    Youtube,
    Twitch,
}

/// What a platform's profile endpoint can give us.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformFeatures {
    pub has_email: bool,
    pub has_avatar: bool,
    pub has_username: bool,
    pub requires_special_permissions: bool,
}

impl SocialPlatform {
    pub const ALL: [SocialPlatform; 8] = [
        SocialPlatform::Facebook,
        SocialPlatform::Google,
        SocialPlatform::Tiktok,
        SocialPlatform::Twitter,
        SocialPlatform::Instagram,
        SocialPlatform::Linkedin,
        SocialPlatform::Youtube,
        SocialPlatform::Twitch,
    ];

    /// Wire name, also used in URLs and storage keys.
    pub fn as_str(self) -> &'static str {
        match self {
            SocialPlatform::Facebook => "facebook",
            SocialPlatform::Google => "google",
            SocialPlatform::Tiktok => "tiktok",
            SocialPlatform::Twitter => "twitter",
            SocialPlatform::Instagram => "instagram",
            SocialPlatform::Linkedin => "linkedin",
            SocialPlatform::Youtube => "youtube",
            SocialPlatform::Twitch => "twitch",
        }
    }

    /// Human-readable name.
    pub fn display_name(self) -> &'static str {
        match self {
            SocialPlatform::Facebook => "Facebook",
            SocialPlatform::Google => "Google",
            SocialPlatform::Tiktok => "TikTok",
            SocialPlatform::Twitter => "Twitter",
            SocialPlatform::Instagram => "Instagram",
            SocialPlatform::Linkedin => "LinkedIn",
            SocialPlatform::Youtube => "YouTube",
            SocialPlatform::Twitch => "Twitch",
        }
    }

    pub fn features(self) -> PlatformFeatures {
        let (has_email, has_avatar, has_username, requires_special_permissions) = match self {
            SocialPlatform::Facebook => (true, true, false, false),
            SocialPlatform::Google => (true, true, false, false),
            SocialPlatform::Tiktok => (false, true, true, true),
            SocialPlatform::Twitter => (false, true, true, true),
            SocialPlatform::Instagram => (false, false, true, false),
            SocialPlatform::Linkedin => (true, true, false, false),
            SocialPlatform::Youtube => (false, true, false, false),
            SocialPlatform::Twitch => (true, true, true, false),
        };
        PlatformFeatures {
            has_email,
            has_avatar,
            has_username,
            requires_special_permissions,
        }
    }

    /// Whether posts can be published to this platform.
    /// Google is a login provider only.
    pub fn supports_publishing(self) -> bool {
        !matches!(self, SocialPlatform::Google)
    }
}

impl fmt::Display for SocialPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unsupported platform: {0}")]
pub struct UnknownPlatform(pub String);

impl FromStr for SocialPlatform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SocialPlatform::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPlatform(s.to_string()))
    }
}
