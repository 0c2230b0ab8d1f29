//! Receipt Generator
//!
//! Derives a receipt for one event value from one draw of mixer entropy.
//! Receipts are not a function of the event alone: two receipts for the same
//! hour differ, so a receipt cannot be guessed from a date or zipcode.

use std::fmt;
use std::str::FromStr;

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use super::event::{EventValue, ReceiptKind};
use super::{BYTE_LEN_RAND, RECEIPT_LEN};
use crate::core::hash::{ReceiptHasher, DIGEST_LEN};
use crate::core::rng::EntropyMixer;
use crate::error::{ReceiptError, Result};

/// A user-held receipt: lowercase hex, fixed length per deployment.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Receipt(String);

impl Receipt {
    /// Parse user input. Surrounding whitespace is dropped and hex digits
    /// are lowercased.
    pub fn parse(text: &str) -> Result<Self> {
        let normalized = text.trim().to_ascii_lowercase();
        if normalized.is_empty() || normalized.len() > DIGEST_LEN * 2 {
            return Err(ReceiptError::InvalidReceipt(format!(
                "expected 1..={} hex characters, got {}",
                DIGEST_LEN * 2,
                normalized.len()
            )));
        }
        if !normalized.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ReceiptError::InvalidReceipt("non-hex character".to_string()));
        }
        Ok(Self(normalized))
    }

    /// Receipt text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a parsed receipt.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for Receipt {
    type Err = ReceiptError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Receipt {
    type Error = ReceiptError;

    fn try_from(text: String) -> Result<Self> {
        Self::parse(&text)
    }
}

impl From<Receipt> for String {
    fn from(receipt: Receipt) -> Self {
        receipt.0
    }
}

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Receipts are secrets held by users; keep them out of debug output.
impl fmt::Debug for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Receipt(<{} chars>)", self.0.len())
    }
}

/// Receipt generator with tunable lengths.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReceiptGenerator {
    rand_len: usize,
    receipt_len: usize,
}

impl Default for ReceiptGenerator {
    fn default() -> Self {
        Self {
            rand_len: BYTE_LEN_RAND,
            receipt_len: RECEIPT_LEN,
        }
    }
}

impl ReceiptGenerator {
    /// Create a generator drawing `rand_len` entropy bytes and emitting
    /// `receipt_len` hex characters.
    pub fn new(rand_len: usize, receipt_len: usize) -> Result<Self> {
        if rand_len == 0 || rand_len > DIGEST_LEN {
            return Err(ReceiptError::InvalidLength {
                requested: rand_len,
                max: DIGEST_LEN,
            });
        }
        Ok(Self {
            rand_len,
            receipt_len: check_receipt_len(receipt_len)?,
        })
    }

    /// Receipt length in hex characters.
    pub fn receipt_len(&self) -> usize {
        self.receipt_len
    }

    /// Generate a receipt for `value`.
    pub fn generate<R: RngCore + CryptoRng>(
        &self,
        kind: ReceiptKind,
        value: &EventValue,
        mixer: &mut EntropyMixer<R>,
    ) -> Result<Receipt> {
        if value.kind() != kind {
            return Err(ReceiptError::KindMismatch {
                expected: kind,
                got: value.kind(),
            });
        }
        value.validate()?;

        let random = mixer.next(self.rand_len)?;

        let mut hasher = ReceiptHasher::new(kind.domain_tag());
        hasher.update_bytes(&random);
        value.encode_into(&mut hasher);
        let digest = hex::encode(hasher.finalize());

        Ok(Receipt(digest[..self.receipt_len].to_string()))
    }
}

/// Accept a receipt length in `1..=64` hex characters.
pub(crate) fn check_receipt_len(receipt_len: usize) -> Result<usize> {
    if receipt_len == 0 || receipt_len > DIGEST_LEN * 2 {
        return Err(ReceiptError::InvalidLength {
            requested: receipt_len,
            max: DIGEST_LEN * 2,
        });
    }
    Ok(receipt_len)
}

/// Generate a receipt with the default lengths.
pub fn generate_receipt<R: RngCore + CryptoRng>(
    kind: ReceiptKind,
    value: &EventValue,
    mixer: &mut EntropyMixer<R>,
) -> Result<Receipt> {
    ReceiptGenerator::default().generate(kind, value, mixer)
}
