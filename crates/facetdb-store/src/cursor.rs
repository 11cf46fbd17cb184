//! Opaque pagination cursors.
//!
//! A cursor is URL-safe base64 (no padding) over the JSON serialization of the
//! store-native continuation token. Nothing inside the token is interpreted
//! here; callers treat the resulting string as a black box.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Malformed or foreign pagination token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("Cursor is not valid base64: {0}")]
    Encoding(String),

    #[error("Cursor payload is invalid: {0}")]
    Payload(String),

    #[error("Cursor was issued for a different query: {0}")]
    ShapeMismatch(String),
}

/// Encodes a native continuation token as an external cursor string.
pub fn to_cursor<T: Serialize>(token: &T) -> Result<String, CursorError> {
    let json = serde_json::to_vec(token).map_err(|e| CursorError::Payload(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decodes a cursor string back into the exact native token it was built from.
pub fn from_cursor<T: DeserializeOwned>(cursor: &str) -> Result<T, CursorError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor.as_bytes())
        .map_err(|e| CursorError::Encoding(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| CursorError::Payload(e.to_string()))
}
