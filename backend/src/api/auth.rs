//! HTTP Basic authentication for the relay endpoints.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, WWW_AUTHENTICATE},
        HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use subtle::ConstantTimeEq;

use super::types::ApiError;
use crate::config::BasicAuthSettings;

/// Expected credentials, shared by every request.
#[derive(Clone)]
pub struct BasicAuthState {
    expected: Arc<BasicAuthSettings>,
}

impl BasicAuthState {
    pub fn new(settings: BasicAuthSettings) -> Self {
        Self {
            expected: Arc::new(settings),
        }
    }

    /// Both halves are always compared so timing does not reveal which one failed.
    pub fn allows(&self, username: &str, password: &str) -> bool {
        let user_ok = secure_compare(username, &self.expected.username);
        let pass_ok = secure_compare(password, &self.expected.password);
        user_ok & pass_ok
    }
}

/// Constant-time comparison for equal-length inputs.
fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Decode `Authorization: Basic <base64(user:pass)>`.
pub fn parse_basic_auth(value: Option<&HeaderValue>) -> Option<(String, String)> {
    let encoded = value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .map(str::trim)
        .filter(|s| !s.is_empty())?;

    let decoded = STANDARD.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Middleware rejecting requests without valid Basic credentials.
///
/// Runs before any body extraction, so bad credentials always yield 401.
pub async fn require_basic_auth(
    State(auth): State<BasicAuthState>,
    req: Request,
    next: Next,
) -> Response {
    match parse_basic_auth(req.headers().get(AUTHORIZATION)) {
        Some((username, password)) if auth.allows(&username, &password) => next.run(req).await,
        _ => {
            tracing::warn!(path = %req.uri().path(), "rejected request with bad credentials");
            let mut response = ApiError::Authentication.into_response();
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Basic"));
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(user_pass: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Basic {}", STANDARD.encode(user_pass))).unwrap()
    }

    fn state() -> BasicAuthState {
        BasicAuthState::new(BasicAuthSettings {
            username: "admin".into(),
            password: "s3cret".into(),
        })
    }

    #[test]
    fn parse_valid_header() {
        assert_eq!(
            parse_basic_auth(Some(&header("admin:s3cret"))),
            Some(("admin".into(), "s3cret".into()))
        );
    }

    #[test]
    fn password_may_contain_colons() {
        assert_eq!(
            parse_basic_auth(Some(&header("admin:a:b"))),
            Some(("admin".into(), "a:b".into()))
        );
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert_eq!(parse_basic_auth(None), None);
        assert_eq!(
            parse_basic_auth(Some(&HeaderValue::from_static("Bearer abc"))),
            None
        );
        assert_eq!(
            parse_basic_auth(Some(&HeaderValue::from_static("Basic !!!"))),
            None
        );
        assert_eq!(parse_basic_auth(Some(&header("no-colon"))), None);
    }

    #[test]
    fn allows_only_exact_match() {
        let auth = state();
        assert!(auth.allows("admin", "s3cret"));
        assert!(!auth.allows("admin", "s3cre"));
        assert!(!auth.allows("Admin", "s3cret"));
        assert!(!auth.allows("", ""));
    }
}
