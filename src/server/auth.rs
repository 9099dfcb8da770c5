//! Bearer token check
//!
//! Authentication is optional: with no configured secret every request
//! passes. With a secret, the `Authorization` header must be exactly
//! `Bearer <secret>`.

use crate::error::{PluginError, Result};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

const BEARER_PREFIX: &str = "Bearer ";

/// Pure authorization predicate
pub fn is_authorized(expected: Option<&str>, authorization: Option<&str>) -> bool {
    let Some(secret) = expected else {
        return true;
    };

    authorization
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .map(|token| token == secret)
        .unwrap_or(false)
}

/// Check the request headers against the configured secret
pub fn authorize(expected: Option<&str>, headers: &HeaderMap) -> Result<()> {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if is_authorized(expected, authorization) {
        Ok(())
    } else {
        Err(PluginError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_no_secret_allows_everything() {
        assert!(is_authorized(None, None));
        assert!(is_authorized(None, Some("Bearer anything")));
        assert!(is_authorized(None, Some("garbage")));
    }

    #[test]
    fn test_secret_requires_exact_bearer() {
        let secret = Some("s3cret");
        assert!(is_authorized(secret, Some("Bearer s3cret")));
        assert!(!is_authorized(secret, None));
        assert!(!is_authorized(secret, Some("s3cret")));
        assert!(!is_authorized(secret, Some("Bearer s3cret ")));
        assert!(!is_authorized(secret, Some("bearer s3cret")));
        assert!(!is_authorized(secret, Some("Bearer wrong")));
        assert!(!is_authorized(secret, Some("Bearer ")));
    }

    #[test]
    fn test_authorize_headers() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            authorize(Some("k"), &headers),
            Err(PluginError::Unauthorized)
        ));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer k"));
        assert!(authorize(Some("k"), &headers).is_ok());
    }
}
