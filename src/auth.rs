//! Session identity.
//!
//! Authentication happens upstream; this service only needs a stable key per
//! logged-in session to find that session's trainer.

use std::fmt;

use axum::http::{header, HeaderMap};
use vocab_review_algo::snapshot;

use crate::response::AppError;

const SESSION_COOKIE_NAME: &str = "session_id";
const MAX_KEY_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.len() > MAX_KEY_LEN {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem-safe directory name for this identity's progress files.
    pub fn storage_id(&self) -> String {
        snapshot::fingerprint(self.0.as_bytes())
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cookie first, then `Authorization: Bearer`.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = get_cookie(headers, SESSION_COOKIE_NAME) {
        return Some(token);
    }

    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())?;

    auth_header
        .strip_prefix("Bearer ")
        .map(|value| value.to_string())
}

pub fn session_key(headers: &HeaderMap) -> Result<SessionKey, AppError> {
    extract_token(headers)
        .and_then(SessionKey::new)
        .ok_or_else(|| AppError::unauthorized("未提供会话标识"))
}

fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}
