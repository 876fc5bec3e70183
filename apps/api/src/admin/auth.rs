use axum::http::{header::AUTHORIZATION, HeaderMap};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::errors::AppError;

/// Checks `Authorization: Bearer <token>` against the configured admin
/// token. A missing header is 401; a wrong token is 403.
pub fn require_admin(headers: &HeaderMap, admin_token: &str) -> Result<(), AppError> {
    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(AppError::Unauthorized)?;

    if admin_token.is_empty() || !bool::from(presented.as_bytes().ct_eq(admin_token.as_bytes())) {
        warn!("Rejected admin request with invalid token");
        return Err(AppError::Forbidden);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_accepts_matching_token() {
        assert!(require_admin(&headers("Bearer s3cret"), "s3cret").is_ok());
    }

    #[test]
    fn test_missing_or_malformed_header_is_unauthorized() {
        assert!(matches!(
            require_admin(&HeaderMap::new(), "s3cret"),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            require_admin(&headers("Basic s3cret"), "s3cret"),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_wrong_token_is_forbidden() {
        assert!(matches!(
            require_admin(&headers("Bearer s3cre"), "s3cret"),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            require_admin(&headers("Bearer "), ""),
            Err(AppError::Forbidden)
        ));
    }
}
