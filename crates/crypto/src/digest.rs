//! Content digests for signed request bodies

use sha2::{Digest, Sha256};

use crate::error::{CryptoError, Result};

/// Algorithm label used in the `content-digest` header
pub const DIGEST_ALGORITHM: &str = "sha-256";

/// Compute the SHA-256 digest of a request body
pub fn sha256(body: &[u8]) -> Vec<u8> {
    Sha256::digest(body).to_vec()
}

/// Render a body digest as a structured header value
///
/// `sha-256=:<base64>:`; the colon framing marks a byte-sequence item so
/// the value survives transport as text.
pub fn content_digest_header(body: &[u8]) -> String {
    format!("{}=:{}:", DIGEST_ALGORITHM, base64::encode(sha256(body)))
}

/// Parse a `content-digest` header value back into raw digest bytes
pub fn parse_content_digest(value: &str) -> Result<Vec<u8>> {
    let rest = value
        .strip_prefix(DIGEST_ALGORITHM)
        .and_then(|v| v.strip_prefix("=:"))
        .and_then(|v| v.strip_suffix(':'))
        .ok_or_else(|| {
            CryptoError::InvalidEncoding(format!("Malformed content-digest value: {}", value))
        })?;

    base64::decode(rest)
        .map_err(|e| CryptoError::InvalidEncoding(format!("Invalid digest base64: {}", e)))
}
