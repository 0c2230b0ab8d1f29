//! Entropy Mixer
//!
//! Combines a fixed external seed with fresh system randomness.
//! Every step XORs the current state with fresh random bytes and compresses
//! the result with SHA-256, so output stays unpredictable even if the seed
//! file is later disclosed.

use std::fmt;
use std::path::Path;

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use tracing::debug;

use super::hash::{hash_bytes, DIGEST_LEN};
use crate::error::{ReceiptError, Result};

/// Stateful entropy mixer.
///
/// # Example
///
/// ```
/// use survey_receipts::core::rng::EntropyMixer;
///
/// let mut mixer = EntropyMixer::new(b"seed material".to_vec()).unwrap();
/// let a = mixer.next(16).unwrap();
/// let b = mixer.next(16).unwrap();
/// assert_ne!(a, b);
/// ```
pub struct EntropyMixer<R = OsRng> {
    state: Vec<u8>,
    fresh: R,
}

impl EntropyMixer<OsRng> {
    /// Create a mixer from seed material, mixing with the OS generator.
    pub fn new(seed: Vec<u8>) -> Result<Self> {
        Self::with_rng(seed, OsRng)
    }

    /// Read the whole seed file and use it as the initial state.
    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let seed = std::fs::read(path).map_err(|e| ReceiptError::SeedUnavailable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if seed.is_empty() {
            return Err(ReceiptError::SeedUnavailable {
                path: path.to_path_buf(),
                reason: "seed file is empty".to_string(),
            });
        }

        debug!(path = %path.display(), seed_len = seed.len(), "Loaded entropy seed");
        Self::new(seed)
    }
}

impl<R: RngCore + CryptoRng> EntropyMixer<R> {
    /// Create a mixer with an explicit source of fresh randomness.
    ///
    /// Tests inject a seeded generator here.
    pub fn with_rng(seed: Vec<u8>, fresh: R) -> Result<Self> {
        if seed.is_empty() {
            return Err(ReceiptError::SeedUnavailable {
                path: Default::default(),
                reason: "seed material is empty".to_string(),
            });
        }
        Ok(Self { state: seed, fresh })
    }

    /// Advance the state and return its first `k` bytes.
    pub fn next(&mut self, k: usize) -> Result<Vec<u8>> {
        if k > DIGEST_LEN {
            return Err(ReceiptError::InvalidLength {
                requested: k,
                max: DIGEST_LEN,
            });
        }
        self.mix();
        Ok(self.state[..k].to_vec())
    }

    fn mix(&mut self) {
        let block = self.state.len().max(DIGEST_LEN);
        let mut fresh = vec![0u8; block];
        self.fresh.fill_bytes(&mut fresh);

        // Seeds shorter than the block are zero-padded
        for (i, byte) in fresh.iter_mut().enumerate() {
            if let Some(s) = self.state.get(i) {
                *byte ^= s;
            }
        }

        self.state = hash_bytes(&fresh).to_vec();
    }
}

impl<R: RngCore + CryptoRng> RngCore for EntropyMixer<R> {
    fn next_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        self.fill_bytes(&mut buf);
        u32::from_le_bytes(buf)
    }

    fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        self.fill_bytes(&mut buf);
        u64::from_le_bytes(buf)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(DIGEST_LEN) {
            self.mix();
            chunk.copy_from_slice(&self.state[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl<R: RngCore + CryptoRng> CryptoRng for EntropyMixer<R> {}

// State is secret; never print it.
impl<R> fmt::Debug for EntropyMixer<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntropyMixer").finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================
