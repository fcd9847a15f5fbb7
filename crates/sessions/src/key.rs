//! Storage keys derived from user identities.
//!
//! Phone numbers never appear in file names or logs; every store keys its
//! records by the SHA-256 hex digest of the identity instead.

use sha2::{Digest, Sha256};

/// Stable, non-reversible key for a user identity (a WhatsApp phone id).
pub fn user_key(user_id: &str) -> String {
    hex::encode(Sha256::digest(user_id.trim().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_stable_hex_digest() {
        let k = user_key("2348012345678");
        assert_eq!(k.len(), 64);
        assert!(k.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(k, user_key("2348012345678"));
    }

    #[test]
    fn surrounding_whitespace_does_not_change_key() {
        assert_eq!(user_key(" 2348012345678\n"), user_key("2348012345678"));
    }

    #[test]
    fn different_users_get_different_keys() {
        assert_ne!(user_key("2348012345678"), user_key("2348012345679"));
    }
}
