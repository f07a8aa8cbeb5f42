/// Request authentication
///
/// Resolves the acting user of an HTTP request from its
/// `Authorization: Bearer <token>` header. The API server runs this in a
/// middleware layer and stores the result as an [`AuthContext`] request
/// extension, which handlers read with axum's `Extension` extractor.
///
/// # Example
///
/// ```
/// use axum::http::{header, HeaderMap, HeaderValue};
/// use taskboard_shared::auth::jwt::{create_token, Claims, TokenType};
/// use taskboard_shared::auth::middleware::resolve_request_user;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "board-secret-key-at-least-32-bytes!!";
/// let user_id = Uuid::new_v4();
/// let token = create_token(&Claims::new(user_id, TokenType::Access), secret)?;
///
/// let mut headers = HeaderMap::new();
/// headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token))?);
///
/// assert_eq!(resolve_request_user(&headers, secret)?, user_id);
/// # Ok(())
/// # }
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};

/// Identity of the user making a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,
}

impl AuthContext {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// Reasons a request could not be authenticated
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization` header
    #[error("Missing authorization header")]
    MissingCredentials,

    /// Header present but not a bearer token
    #[error("Expected Bearer token")]
    InvalidFormat,

    /// Token expired
    #[error("Token expired")]
    Expired,

    /// Token failed validation
    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::Expired,
            other => AuthError::InvalidToken(other.to_string()),
        }
    }
}

/// Extracts and validates the bearer access token, returning its user ID
///
/// # Errors
///
/// Returns an [`AuthError`] if the header is missing, is not a bearer token,
/// or carries an invalid, expired, or non-access token.
pub fn resolve_request_user(headers: &HeaderMap, secret: &str) -> Result<Uuid, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidFormat)?;

    let claims = validate_access_token(token, secret)?;
    Ok(claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, Claims, TokenType};
    use axum::http::HeaderValue;
    use chrono::Duration;

    const SECRET: &str = "middleware-test-secret-at-least-32-bytes";

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_resolves_access_token() {
        let user_id = Uuid::new_v4();
        let token = create_token(&Claims::new(user_id, TokenType::Access), SECRET).unwrap();

        let resolved = resolve_request_user(&headers_with(&format!("Bearer {}", token)), SECRET);
        assert_eq!(resolved.unwrap(), user_id);
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(
            resolve_request_user(&HeaderMap::new(), SECRET),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn test_non_bearer_scheme() {
        assert!(matches!(
            resolve_request_user(&headers_with("Basic dXNlcjpwYXNz"), SECRET),
            Err(AuthError::InvalidFormat)
        ));
        assert!(matches!(
            resolve_request_user(&headers_with("Bearer "), SECRET),
            Err(AuthError::InvalidFormat)
        ));
    }

    #[test]
    fn test_refresh_token_rejected() {
        let token = create_token(&Claims::new(Uuid::new_v4(), TokenType::Refresh), SECRET).unwrap();

        assert!(matches!(
            resolve_request_user(&headers_with(&format!("Bearer {}", token)), SECRET),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_expired_token() {
        let claims =
            Claims::with_expiration(Uuid::new_v4(), TokenType::Access, Duration::seconds(-120));
        let token = create_token(&claims, SECRET).unwrap();

        assert!(matches!(
            resolve_request_user(&headers_with(&format!("Bearer {}", token)), SECRET),
            Err(AuthError::Expired)
        ));
    }
}
