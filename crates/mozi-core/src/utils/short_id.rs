//! Deterministic short identifiers.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};

/// Default identifier length.
pub const DEFAULT_ID_LEN: usize = 8;

/// Length of an unpadded base64 SHA-256 digest.
pub const MAX_ID_LEN: usize = 43;

/// Derive a stable, URL-safe identifier from `input`.
///
/// The SHA-256 digest of the input is base64url encoded and truncated to
/// `len` characters. Requests above [`MAX_ID_LEN`] return the full encoding.
pub fn short_id(input: &str, len: usize) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut encoded = URL_SAFE_NO_PAD.encode(digest);
    encoded.truncate(len);
    encoded
}
