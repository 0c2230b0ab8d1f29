//! Error types for receipt issuance and verification.

use std::path::PathBuf;

use crate::receipt::event::ReceiptKind;

/// Errors raised by the receipt scheme.
///
/// A verification miss is not an error; see
/// [`verify_receipt`](crate::receipt::verify::verify_receipt).
#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    /// Seed file missing, unreadable or empty.
    #[error("seed unavailable at {path}: {reason}")]
    SeedUnavailable {
        /// Path that was read.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// More entropy bytes requested than one mixer step produces.
    #[error("invalid length: requested {requested} bytes, at most {max} available")]
    InvalidLength {
        /// Bytes requested.
        requested: usize,
        /// Digest length.
        max: usize,
    },

    /// Malformed or out-of-domain event value.
    #[error("invalid event value: {0}")]
    InvalidEventValue(String),

    /// Submitted text is not a well-formed receipt.
    #[error("invalid receipt: {0}")]
    InvalidReceipt(String),

    /// Salt space must contain at least one salt.
    #[error("invalid salt size: {0}")]
    InvalidSaltSize(u32),

    /// Two values could not be ordered against each other.
    #[error("comparison error: {0}")]
    Comparison(String),

    /// Value kind does not match the table kind.
    #[error("kind mismatch: table holds {expected:?} values, got {got:?}")]
    KindMismatch {
        /// Table kind.
        expected: ReceiptKind,
        /// Offending value kind.
        got: ReceiptKind,
    },

    /// Two values committed to the same verification code.
    #[error("verification code collision while building table")]
    CodeCollision,
}

/// Result alias for the receipt scheme.
pub type Result<T> = std::result::Result<T, ReceiptError>;
