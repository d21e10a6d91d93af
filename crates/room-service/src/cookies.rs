//! Cookie parsing and issuance.
//!
//! All cookies issued by the service are HTTP-only with
//! `SameSite=Strict`, and carry the `Secure` flag in production.
//! Tokens live in cookies, never in response bodies, except where the
//! protocol explicitly returns them.

use axum::http::header::{HeaderMap, HeaderValue, COOKIE, SET_COOKIE};
use axum::response::Response;
use std::collections::HashMap;

/// Shared bearer-token cookie for legacy rooms.
pub const ROOM_TOKEN_COOKIE: &str = "room_token";

/// Anonymous guest identity cookie.
pub const GUEST_ID_COOKIE: &str = "guest_id";

/// Authenticated session cookie (issued by the external auth layer;
/// this service only reads it).
pub const SESSION_ID_COOKIE: &str = "session_id";

/// Room-scoped token cookie for secure rooms.
pub fn secure_token_cookie(room_id: &str) -> String {
    format!("secure_room_token_{room_id}")
}

/// Marker set after a successful legacy verification.
pub fn verified_cookie(room_id: &str) -> String {
    format!("room_verified_{room_id}")
}

/// Parsed request cookies.
#[derive(Debug, Clone, Default)]
pub struct CookieMap(HashMap<String, String>);

impl CookieMap {
    /// Parse the `Cookie` header(s) of a request.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut map = HashMap::new();
        for value in headers.get_all(COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            for pair in raw.split(';') {
                if let Some((name, value)) = pair.split_once('=') {
                    map.insert(name.trim().to_string(), value.trim().to_string());
                }
            }
        }
        CookieMap(map)
    }

    /// Build a cookie map directly (test harnesses).
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        CookieMap(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// An outbound `Set-Cookie` directive.
#[derive(Debug, Clone)]
pub struct SetCookie {
    name: String,
    value: String,
    max_age_seconds: Option<i64>,
    secure: bool,
}

impl SetCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, secure: bool) -> Self {
        SetCookie {
            name: name.into(),
            value: value.into(),
            max_age_seconds: None,
            secure,
        }
    }

    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age_seconds = Some(seconds);
        self
    }

    /// A directive that clears the cookie on the client.
    pub fn removal(name: impl Into<String>, secure: bool) -> Self {
        SetCookie {
            name: name.into(),
            value: String::new(),
            max_age_seconds: Some(0),
            secure,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Render the `Set-Cookie` header value.
    pub fn header_value(&self) -> String {
        let mut out = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Strict",
            self.name, self.value
        );
        if let Some(max_age) = self.max_age_seconds {
            out.push_str(&format!("; Max-Age={max_age}"));
        }
        if self.secure {
            out.push_str("; Secure");
        }
        out
    }
}

/// Append `Set-Cookie` headers to a response.
pub fn apply_cookies(response: &mut Response, cookies: &[SetCookie]) {
    for cookie in cookies {
        if let Ok(value) = HeaderValue::from_str(&cookie.header_value()) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
}
