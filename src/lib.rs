//! # Survey Receipts
//!
//! Unlinkable proof-of-completion receipts for discrete events (a survey
//! taken in a given hour, or for a zipcode on a given day).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SURVEY RECEIPTS                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                               │
//! │  ├── hash.rs     - SHA-256 receipt and commitment hashing   │
//! │  └── rng.rs      - Entropy mixer (seed file + OS entropy)   │
//! │                                                              │
//! │  receipt/        - The scheme                               │
//! │  ├── event.rs    - Hour / zipcode event values              │
//! │  ├── generator.rs- Receipt derivation                       │
//! │  ├── table.rs    - Receipt and verification tables         │
//! │  ├── partition.rs- Value-range subtables                    │
//! │  ├── verify.rs   - Salt-search verification                 │
//! │  └── freshness.rs- Age of a verified event                  │
//! │                                                              │
//! │  store/          - Persistence                              │
//! │  ├── mod.rs      - Versioned bincode table blobs            │
//! │  └── handoff.rs  - Daily subtables and manifest             │
//! │                                                              │
//! │  config.rs       - Environment configuration                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Privacy Model
//!
//! - The receipt table stays with the issuer.
//! - Each verification code is `SHA256(salt || receipt)` with a salt that is
//!   discarded immediately, so the public table cannot be matched to
//!   receipts without searching the whole salt space.
//! - Rebuilding the verification table draws fresh salts; two published
//!   tables cannot be correlated.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod error;
pub mod receipt;
pub mod store;

// Re-export commonly used types
pub use config::IssuerConfig;
pub use core::rng::EntropyMixer;
pub use error::{ReceiptError, Result};
pub use receipt::{
    EventValue, Partition, Receipt, ReceiptKind, ReceiptTable, VerificationTable,
    BYTE_LEN_RAND, RECEIPT_LEN, SALT_SIZE,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
