use std::fmt;

use base64::{engine::general_purpose::URL_SAFE, Engine};
use chrono::Utc;
use serde_json::Value;

/// Bearer token handed out by the Beem login endpoint.
///
/// The token is a JWT. Only its `exp` claim is read, the signature is not checked.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the token can still be used at this instant.
    pub fn is_valid(&self) -> bool {
        is_valid_at(&self.0, Utc::now().timestamp())
    }

    /// Expiration (Unix seconds) embedded in the token, if it can be read.
    pub fn expires_at(&self) -> Option<i64> {
        expiration(&self.0)
    }
}

// never print the secret itself
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&"<redacted>").finish()
    }
}

/// Check a raw token against `now` (Unix seconds).
///
/// Any malformed token counts as invalid.
pub fn is_valid_at(token: &str, now: i64) -> bool {
    expiration(token).is_some_and(|exp| exp > now)
}

fn expiration(token: &str) -> Option<i64> {
    if token.is_empty() {
        return None;
    }
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return None;
    }

    let mut payload = segments[1].to_string();
    while payload.len() % 4 != 0 {
        payload.push('=');
    }
    let decoded = URL_SAFE.decode(payload).ok()?;

    let claims: Value = serde_json::from_slice(&decoded).ok()?;
    let exp = claims.as_object()?.get("exp")?;
    exp.as_f64().map(|exp| exp as i64)
}
