/// Refresh Token Fingerprints
///
/// The server never stores a refresh token, only its SHA-256 fingerprint.
/// A presented token is accepted only if its fingerprint equals the one
/// stored on the account, which makes an otherwise stateless JWT revocable.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of a refresh token
pub fn fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compare a presented token against a stored fingerprint in constant time.
pub fn fingerprint_matches(token: &str, stored: &str) -> bool {
    constant_time_eq(fingerprint(token).as_bytes(), stored.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
