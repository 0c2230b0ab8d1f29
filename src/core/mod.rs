//! Core primitives.
//!
//! Hashing and entropy. Everything above this module draws randomness from
//! an explicitly owned [`EntropyMixer`], never from a global generator.

pub mod hash;
pub mod rng;

// Re-export core types
pub use hash::{salted_commitment, Digest, ReceiptHasher, DIGEST_LEN};
pub use rng::EntropyMixer;
