//! Access token payload decoding.
//!
//! The payload is read for display only. Signatures are not verified; the
//! backend is the only party that trusts these claims.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Claims carried in the access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User id
    pub sub: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, rename = "fullName")]
    pub full_name: String,
    /// Google profile image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl TokenClaims {
    /// Expiry as a timestamp, if the token carries one.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| at <= now)
    }
}

/// Signed-in user as shown in the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

impl UserInfo {
    /// Derives the user from an access token. `None` if it does not decode.
    pub fn from_token(token: &str) -> Option<Self> {
        let claims = decode_claims(token)?;
        Some(Self::from(claims))
    }
}

impl From<TokenClaims> for UserInfo {
    fn from(claims: TokenClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            name: claims.full_name,
            avatar_url: claims.avatar_url,
        }
    }
}

/// Decodes the payload segment of a JWT without verifying it.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    if parts.len() != 3 {
        return None;
    }
    // Some issuers pad the segments; the URL-safe engine rejects '='.
    let payload = parts[1].trim_end_matches('=');
    let decoded = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&decoded).ok()
}

/// Returns a masked version of a token for display (first 12 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.len() <= 16 {
        return "***".to_string();
    }
    let head: String = token.chars().take(12).collect();
    format!("{head}...")
}
