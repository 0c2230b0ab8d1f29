//! Hashing for Receipts and Verification Codes
//!
//! Provides the SHA-256 primitives shared by the scheme:
//! - Domain-tagged receipt derivation
//! - Salted commitment of a receipt into a verification code
//! - State compression for the entropy mixer

use sha2::{Sha256, Digest as _};

/// Hash output type (256 bits / 32 bytes)
pub type Digest = [u8; 32];

/// Digest length in bytes.
pub const DIGEST_LEN: usize = 32;

/// Incremental hasher for receipt material.
///
/// Wraps SHA-256 with helpers for the text encodings the scheme uses.
/// Order of updates is part of the format.
pub struct ReceiptHasher {
    hasher: Sha256,
}

impl ReceiptHasher {
    /// Create a new hasher starting with a one-byte domain tag.
    pub fn new(domain_tag: u8) -> Self {
        let mut hasher = Sha256::new();
        hasher.update([domain_tag]);
        Self { hasher }
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with UTF-8 text.
    #[inline]
    pub fn update_str(&mut self, text: &str) {
        self.hasher.update(text.as_bytes());
    }

    /// Finalize and return the digest.
    pub fn finalize(self) -> Digest {
        self.hasher.finalize().into()
    }
}

/// Compute a simple hash of arbitrary data.
pub fn hash_bytes(data: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Commit a receipt under a salt.
///
/// `SHA256(decimal(salt) || receipt)`. Issuance and verification must agree
/// on this encoding byte for byte.
#[inline]
pub fn salted_commitment(salt: u32, receipt: &str) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(salt.to_string().as_bytes());
    hasher.update(receipt.as_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_hasher_determinism() {
        let make_hash = || {
            let mut hasher = ReceiptHasher::new(b'0');
            hasher.update_bytes(&[7u8; 16]);
            hasher.update_str("05");
            hasher.update_str("01/01/2024");
            hasher.finalize()
        };

        assert_eq!(make_hash(), make_hash());
    }

    #[test]
    fn test_domain_tag_separates() {
        let hash = |tag| {
            let mut h = ReceiptHasher::new(tag);
            h.update_str("12345");
            h.finalize()
        };

        assert_ne!(hash(b'0'), hash(b'1'));
    }

    #[test]
    fn test_hash_order_matters() {
        let hash1 = {
            let mut h = ReceiptHasher::new(b'0');
            h.update_str("a");
            h.update_str("b");
            h.finalize()
        };

        let hash2 = {
            let mut h = ReceiptHasher::new(b'0');
            h.update_str("b");
            h.update_str("a");
            h.finalize()
        };

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_salted_commitment_matches_concatenation() {
        // Salt 42, receipt "abc" hashes the text "42abc"
        assert_eq!(salted_commitment(42, "abc"), hash_bytes(b"42abc"));
    }

    #[test]
    fn test_salt_changes_commitment() {
        let receipt = "0123456789abcdef";
        assert_ne!(salted_commitment(0, receipt), salted_commitment(1, receipt));
    }

    #[test]
    fn test_known_vector() {
        // SHA-256("abc")
        assert_eq!(
            hex::encode(hash_bytes(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
