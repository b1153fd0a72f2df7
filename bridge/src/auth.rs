use axum::http::HeaderMap;
use sha2::{Digest, Sha256};

use crate::error::ApiError;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Guards the protected routes. An unconfigured secret fails closed.
pub fn require_api_key(configured: Option<&str>, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = configured else {
        return Err(ApiError::MissingApiKey);
    };

    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::Forbidden)?;

    if keys_match(expected, provided) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

// Digests have a fixed length, so the comparison never stops at the first byte.
fn keys_match(expected: &str, provided: &str) -> bool {
    let expected = Sha256::digest(expected.as_bytes());
    let provided = Sha256::digest(provided.as_bytes());
    expected
        .iter()
        .zip(provided.iter())
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
