//! Credential extraction helpers.
//!
//! Services resolve the token to a user themselves; this module only knows
//! the header format.

use axum::http::{header::AUTHORIZATION, HeaderMap};

/// Extracts the bearer token from the `Authorization` header.
///
/// The scheme is matched case-insensitively. Returns `None` for missing,
/// non-UTF-8, non-bearer or empty values.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
