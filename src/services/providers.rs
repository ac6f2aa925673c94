// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-platform profile endpoints and payload normalization.
//!
//! Each [`SocialPlatform`] maps to a [`ProviderSpec`] that knows where the
//! profile lives, how the access token is presented and how to pull the
//! identity fields out of the JSON the provider returns.

use crate::models::SocialPlatform;
use serde_json::Value;

/// Provider-agnostic profile extracted from a user-info response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialIdentity {
    pub platform_id: String,
    pub email: Option<String>,
    pub display_name: String,
    pub avatar: Option<String>,
    pub platform_username: Option<String>,
}

impl SocialIdentity {
    /// Handle stored on the social account row.
    pub fn account_username(&self) -> &str {
        self.platform_username
            .as_deref()
            .unwrap_or(&self.display_name)
    }

    /// At least one stable handle besides the platform id.
    pub fn is_complete(&self) -> bool {
        self.email.is_some() || self.platform_username.is_some()
    }
}

/// Why a payload could not be turned into a [`SocialIdentity`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IncompleteData {
    #[error("profile has no id")]
    MissingId,
    #[error("profile has neither email nor username")]
    MissingHandle,
}

/// Where the access token goes on the profile request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPlacement {
    /// `?access_token=...`
    Query,
    /// `Authorization: Bearer ...`
    Bearer,
    /// Bearer plus the application's `Client-ID` header.
    BearerWithClientId,
}

/// Static description of one provider's profile endpoint.
pub struct ProviderSpec {
    pub endpoint: &'static str,
    pub fields: &'static [&'static str],
    pub token_placement: TokenPlacement,
    /// Appended after the token parameter.
    pub extra_query: Option<&'static str>,
    /// Separate lookup used when the profile omits the email.
    pub email_endpoint: Option<&'static str>,
    extract: fn(&Value) -> SocialIdentity,
}

/// Fully built outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
}

// ─── Field Helpers ───────────────────────────────────────────────

/// Non-empty string (or number rendered as a string) at a JSON pointer.
fn text(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn identity(
    value: &Value,
    id: &str,
    email: Option<&str>,
    name: &str,
    avatar: Option<&str>,
    username: Option<&str>,
) -> SocialIdentity {
    SocialIdentity {
        platform_id: text(value, id).unwrap_or_default(),
        email: email.and_then(|p| text(value, p)),
        display_name: text(value, name).unwrap_or_default(),
        avatar: avatar.and_then(|p| text(value, p)),
        platform_username: username.and_then(|p| text(value, p)),
    }
}

// ─── Provider Table ──────────────────────────────────────────────

fn extract_facebook(v: &Value) -> SocialIdentity {
    identity(v, "/id", Some("/email"), "/name", Some("/picture/data/url"), None)
}

fn extract_google(v: &Value) -> SocialIdentity {
    identity(v, "/id", Some("/email"), "/name", Some("/picture"), None)
}

fn extract_tiktok(v: &Value) -> SocialIdentity {
    identity(
        v,
        "/data/user/open_id",
        None,
        "/data/user/display_name",
        Some("/data/user/avatar_url"),
        Some("/data/user/display_name"),
    )
}

fn extract_twitter(v: &Value) -> SocialIdentity {
    identity(
        v,
        "/data/id",
        None,
        "/data/name",
        Some("/data/profile_image_url"),
        Some("/data/username"),
    )
}

fn extract_instagram(v: &Value) -> SocialIdentity {
    identity(v, "/id", None, "/username", None, Some("/username"))
}

fn extract_linkedin(v: &Value) -> SocialIdentity {
    let first = text(v, "/firstName/localized/en_US").unwrap_or_default();
    let last = text(v, "/lastName/localized/en_US").unwrap_or_default();
    SocialIdentity {
        platform_id: text(v, "/id").unwrap_or_default(),
        email: None,
        display_name: format!("{} {}", first, last).trim().to_string(),
        avatar: text(v, "/profilePicture/displayImage"),
        platform_username: None,
    }
}

fn extract_youtube(v: &Value) -> SocialIdentity {
    identity(
        v,
        "/items/0/id",
        None,
        "/items/0/snippet/title",
        Some("/items/0/snippet/thumbnails/default/url"),
        None,
    )
}

fn extract_twitch(v: &Value) -> SocialIdentity {
    identity(
        v,
        "/data/0/id",
        Some("/data/0/email"),
        "/data/0/display_name",
        Some("/data/0/profile_image_url"),
        Some("/data/0/login"),
    )
}

static FACEBOOK: ProviderSpec = ProviderSpec {
    endpoint: "https://graph.facebook.com/me",
    fields: &["id", "email", "name", "picture"],
    token_placement: TokenPlacement::Query,
    extra_query: None,
    email_endpoint: None,
    extract: extract_facebook,
};

static GOOGLE: ProviderSpec = ProviderSpec {
    endpoint: "https://www.googleapis.com/oauth2/v2/userinfo",
    fields: &[],
    token_placement: TokenPlacement::Query,
    extra_query: None,
    email_endpoint: None,
    extract: extract_google,
};

static TIKTOK: ProviderSpec = ProviderSpec {
    endpoint: "https://open-api.tiktok.com/user/info",
    fields: &["open_id", "union_id", "avatar_url", "display_name"],
    token_placement: TokenPlacement::Query,
    extra_query: None,
    email_endpoint: None,
    extract: extract_tiktok,
};

static TWITTER: ProviderSpec = ProviderSpec {
    endpoint: "https://api.twitter.com/2/users/me",
    fields: &["id", "username", "name", "profile_image_url"],
    token_placement: TokenPlacement::Bearer,
    extra_query: None,
    email_endpoint: None,
    extract: extract_twitter,
};

static INSTAGRAM: ProviderSpec = ProviderSpec {
    endpoint: "https://graph.instagram.com/me",
    fields: &["id", "username", "account_type"],
    token_placement: TokenPlacement::Query,
    extra_query: None,
    email_endpoint: None,
    extract: extract_instagram,
};

static LINKEDIN: ProviderSpec = ProviderSpec {
    endpoint: "https://api.linkedin.com/v2/people/~",
    fields: &["id", "firstName", "lastName", "profilePicture"],
    token_placement: TokenPlacement::Bearer,
    extra_query: None,
    email_endpoint: Some(
        "https://api.linkedin.com/v2/emailAddress?q=members&projection=(elements*(handle~))",
    ),
    extract: extract_linkedin,
};

static YOUTUBE: ProviderSpec = ProviderSpec {
    endpoint: "https://www.googleapis.com/youtube/v3/channels",
    fields: &["id", "snippet"],
    token_placement: TokenPlacement::Query,
    extra_query: Some("mine=true&part=snippet"),
    email_endpoint: None,
    extract: extract_youtube,
};

static TWITCH: ProviderSpec = ProviderSpec {
    endpoint: "https://api.twitch.tv/helix/users",
    fields: &[],
    token_placement: TokenPlacement::BearerWithClientId,
    extra_query: None,
    email_endpoint: None,
    extract: extract_twitch,
};

/// Provider table lookup.
pub fn spec(platform: SocialPlatform) -> &'static ProviderSpec {
    match platform {
        SocialPlatform::Facebook => &FACEBOOK,
        SocialPlatform::Google => &GOOGLE,
        SocialPlatform::Tiktok => &TIKTOK,
        SocialPlatform::Twitter => &TWITTER,
        SocialPlatform::Instagram => &INSTAGRAM,
        SocialPlatform::Linkedin => &LINKEDIN,
        SocialPlatform::Youtube => &YOUTUBE,
        SocialPlatform::Twitch => &TWITCH,
    }
}

// ─── Requests ────────────────────────────────────────────────────

impl ProviderSpec {
    /// Build the profile request for `token`.
    pub fn profile_request(&self, token: &str, client_id: &str) -> ProviderRequest {
        let mut query = Vec::new();
        if !self.fields.is_empty() {
            query.push(format!("fields={}", self.fields.join(",")));
        }
        if self.token_placement == TokenPlacement::Query {
            query.push(format!("access_token={}", urlencoding::encode(token)));
        }
        if let Some(extra) = self.extra_query {
            query.push(extra.to_string());
        }

        let url = if query.is_empty() {
            self.endpoint.to_string()
        } else {
            format!("{}?{}", self.endpoint, query.join("&"))
        };

        ProviderRequest {
            url,
            headers: self.auth_headers(token, client_id),
        }
    }

    /// Build the supplementary email request, if this provider has one.
    pub fn email_request(&self, token: &str, client_id: &str) -> Option<ProviderRequest> {
        self.email_endpoint.map(|url| ProviderRequest {
            url: url.to_string(),
            headers: self.auth_headers(token, client_id),
        })
    }

    fn auth_headers(&self, token: &str, client_id: &str) -> Vec<(&'static str, String)> {
        let mut headers = vec![("Content-Type", "application/json".to_string())];
        match self.token_placement {
            TokenPlacement::Query => {}
            TokenPlacement::Bearer => {
                headers.push(("Authorization", format!("Bearer {}", token)));
            }
            TokenPlacement::BearerWithClientId => {
                headers.push(("Authorization", format!("Bearer {}", token)));
                headers.push(("Client-ID", client_id.to_string()));
            }
        }
        headers
    }

    /// Extract identity fields without the completeness check.
    ///
    /// Fails only when the platform id is missing.
    pub fn extract(&self, raw: &Value) -> Result<SocialIdentity, IncompleteData> {
        let identity = (self.extract)(raw);
        if identity.platform_id.is_empty() {
            return Err(IncompleteData::MissingId);
        }
        Ok(identity)
    }
}

/// Email from the LinkedIn-style `elements[0]["handle~"].emailAddress` payload.
pub fn supplementary_email(raw: &Value) -> Option<String> {
    text(raw, "/elements/0/handle~0/emailAddress")
}

/// Normalize a raw provider payload into a [`SocialIdentity`].
///
/// Fails when the id is empty, or when neither an email nor a username is
/// present.
pub fn normalize(platform: SocialPlatform, raw: &Value) -> Result<SocialIdentity, IncompleteData> {
    let identity = spec(platform).extract(raw)?;
    if !identity.is_complete() {
        return Err(IncompleteData::MissingHandle);
    }
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A complete payload for each platform.
    fn complete_payload(platform: SocialPlatform) -> Value {
        match platform {
            SocialPlatform::Facebook => json!({
                "id": "fb-1", "email": "fb@example.com", "name": "Fb User",
                "picture": {"data": {"url": "https://cdn/fb.png"}}
            }),
            SocialPlatform::Google => json!({
                "id": "1234567890", "email": "g@example.com", "name": "G User",
                "picture": "https://cdn/g.png"
            }),
            SocialPlatform::Tiktok => json!({
                "data": {"user": {"open_id": "tt-1", "display_name": "tiktoker",
                                  "avatar_url": "https://cdn/tt.png"}}
            }),
            SocialPlatform::Twitter => json!({
                "data": {"id": "42", "name": "Tw User", "username": "twuser",
                         "profile_image_url": "https://cdn/tw.png"}
            }),
            SocialPlatform::Instagram => json!({
                "id": "ig-1", "username": "insta", "account_type": "PERSONAL"
            }),
            SocialPlatform::Linkedin => json!({
                "id": "li-1",
                "firstName": {"localized": {"en_US": "Ada"}},
                "lastName": {"localized": {"en_US": "Lovelace"}},
                "email": "ignored@example.com"
            }),
            SocialPlatform::Youtube => json!({
                "items": [{"id": "yt-1", "snippet": {"title": "Channel",
                    "thumbnails": {"default": {"url": "https://cdn/yt.png"}}}}]
            }),
            SocialPlatform::Twitch => json!({
                "data": [{"id": "tw-1", "login": "streamer", "display_name": "Streamer",
                          "email": "s@example.com", "profile_image_url": "https://cdn/t.png"}]
            }),
        }
    }

    #[test]
    fn test_extract_yields_platform_id_for_every_platform() {
        for platform in SocialPlatform::ALL {
            let identity = spec(platform)
                .extract(&complete_payload(platform))
                .unwrap();
            assert!(!identity.platform_id.is_empty(), "{}", platform);
        }
    }

    #[test]
    fn test_normalize_complete_payloads() {
        // LinkedIn only becomes complete after the email lookup.
        for platform in SocialPlatform::ALL {
            let result = normalize(platform, &complete_payload(platform));
            if platform == SocialPlatform::Linkedin {
                assert_eq!(result, Err(IncompleteData::MissingHandle));
            } else {
                assert!(result.is_ok(), "{}", platform);
            }
        }
    }

    #[test]
    fn test_normalize_field_mapping() {
        let fb = normalize(SocialPlatform::Facebook, &complete_payload(SocialPlatform::Facebook))
            .unwrap();
        assert_eq!(fb.avatar.as_deref(), Some("https://cdn/fb.png"));
        assert_eq!(fb.email.as_deref(), Some("fb@example.com"));

        let tt = normalize(SocialPlatform::Tiktok, &complete_payload(SocialPlatform::Tiktok))
            .unwrap();
        assert_eq!(tt.platform_username.as_deref(), Some("tiktoker"));
        assert_eq!(tt.email, None);

        let twitch =
            normalize(SocialPlatform::Twitch, &complete_payload(SocialPlatform::Twitch)).unwrap();
        assert_eq!(twitch.platform_username.as_deref(), Some("streamer"));
        assert_eq!(twitch.display_name, "Streamer");

        let li = spec(SocialPlatform::Linkedin)
            .extract(&complete_payload(SocialPlatform::Linkedin))
            .unwrap();
        assert_eq!(li.display_name, "Ada Lovelace");
        assert_eq!(li.email, None);
    }

    #[test]
    fn test_numeric_id_is_stringified() {
        let identity = normalize(
            SocialPlatform::Google,
            &json!({"id": 987654321, "email": "n@example.com", "name": "N"}),
        )
        .unwrap();
        assert_eq!(identity.platform_id, "987654321");
    }

    #[test]
    fn test_normalize_rejects_missing_id() {
        let result = normalize(
            SocialPlatform::Facebook,
            &json!({"email": "x@example.com", "name": "X"}),
        );
        assert_eq!(result, Err(IncompleteData::MissingId));

        let result = normalize(SocialPlatform::Youtube, &json!({"items": []}));
        assert_eq!(result, Err(IncompleteData::MissingId));
    }

    #[test]
    fn test_normalize_rejects_missing_email_and_username() {
        let payloads = [
            (SocialPlatform::Facebook, json!({"id": "1", "name": "No Email"})),
            (SocialPlatform::Google, json!({"id": "1", "email": "", "name": "G"})),
            (SocialPlatform::Twitter, json!({"data": {"id": "1", "name": "T"}})),
            (SocialPlatform::Instagram, json!({"id": "1"})),
            (
                SocialPlatform::Youtube,
                json!({"items": [{"id": "1", "snippet": {"title": "C"}}]}),
            ),
            (SocialPlatform::Twitch, json!({"data": [{"id": "1"}]})),
        ];
        for (platform, payload) in payloads {
            assert_eq!(
                normalize(platform, &payload),
                Err(IncompleteData::MissingHandle),
                "{}",
                platform
            );
        }
    }

    #[test]
    fn test_profile_request_query_token() {
        let request = spec(SocialPlatform::Facebook).profile_request("a b", "");
        assert_eq!(
            request.url,
            "https://graph.facebook.com/me?fields=id,email,name,picture&access_token=a%20b"
        );
        assert!(request.headers.iter().all(|(name, _)| *name != "Authorization"));

        let google = spec(SocialPlatform::Google).profile_request("tok", "");
        assert_eq!(
            google.url,
            "https://www.googleapis.com/oauth2/v2/userinfo?access_token=tok"
        );
    }

    #[test]
    fn test_profile_request_youtube_extra_query() {
        let request = spec(SocialPlatform::Youtube).profile_request("tok", "");
        assert_eq!(
            request.url,
            "https://www.googleapis.com/youtube/v3/channels?fields=id,snippet&access_token=tok&mine=true&part=snippet"
        );
    }

    #[test]
    fn test_profile_request_bearer_and_client_id() {
        let twitter = spec(SocialPlatform::Twitter).profile_request("tok", "cid");
        assert!(!twitter.url.contains("access_token"));
        assert!(twitter
            .headers
            .contains(&("Authorization", "Bearer tok".to_string())));
        assert!(twitter.headers.iter().all(|(name, _)| *name != "Client-ID"));

        let twitch = spec(SocialPlatform::Twitch).profile_request("tok", "cid");
        assert_eq!(twitch.url, "https://api.twitch.tv/helix/users");
        assert!(twitch.headers.contains(&("Client-ID", "cid".to_string())));
    }

    #[test]
    fn test_only_linkedin_has_email_lookup() {
        for platform in SocialPlatform::ALL {
            assert_eq!(
                spec(platform).email_request("tok", "").is_some(),
                platform == SocialPlatform::Linkedin
            );
        }
    }

    #[test]
    fn test_supplementary_email() {
        let raw = json!({"elements": [{"handle~": {"emailAddress": "ada@example.com"}}]});
        assert_eq!(supplementary_email(&raw).as_deref(), Some("ada@example.com"));
        assert_eq!(supplementary_email(&json!({"elements": []})), None);
    }
}
