//! Shared-secret authentication.
//!
//! Callers of the test API present the configured secret in the `auth-token`
//! header. Anything else, including a missing header, is rejected before
//! the request body is read.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::AppState;

/// Header carrying the shared secret.
pub const AUTH_TOKEN_HEADER: &str = "auth-token";

/// Proof that the request carried the shared secret.
#[derive(Debug, Clone, Copy)]
pub struct AuthToken;

impl FromRequestParts<AppState> for AuthToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let supplied = parts
            .headers
            .get(AUTH_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok());

        match supplied {
            Some(token) if secrets_match(token, &state.config.auth_token) => Ok(AuthToken),
            _ => Err(AppError::Unauthorized),
        }
    }
}

/// Compare without short-circuiting on the first differing byte.
fn secrets_match(supplied: &str, expected: &str) -> bool {
    let (a, b) = (supplied.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_match_exactly() {
        assert!(secrets_match("s3cret", "s3cret"));
        assert!(!secrets_match("s3cret", "s3creT"));
        assert!(!secrets_match("s3cre", "s3cret"));
        assert!(!secrets_match("", "s3cret"));
    }
}
