//! Receipt Scheme
//!
//! Issues unlinkable receipts and verifies them later through salted codes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    RECEIPT SCHEME                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  event.rs      - Event values (hour, zipcode + day)         │
//! │  generator.rs  - Receipt derivation from mixer entropy      │
//! │  table.rs      - Receipt table and verification table       │
//! │  partition.rs  - Value-range subtables                      │
//! │  verify.rs     - Salt-search verification                   │
//! │  freshness.rs  - Age classification of verified events      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod event;
pub mod freshness;
pub mod generator;
pub mod partition;
pub mod table;
pub mod verify;

/// Number of potential salt values.
///
/// Trades issuer-side unlinkability against verifier cost (one hash per salt).
pub const SALT_SIZE: u32 = 10001;

/// Random bytes mixed into each receipt.
pub const BYTE_LEN_RAND: usize = 16;

/// Receipt length in hex characters (64 bits).
pub const RECEIPT_LEN: usize = 16;

// Re-export key types
pub use event::{EventValue, ReceiptKind};
pub use freshness::Freshness;
pub use generator::{generate_receipt, Receipt, ReceiptGenerator};
pub use partition::Partition;
pub use table::{
    build_hour_receipt_table, build_hour_receipt_table_with, build_verification_table,
    build_zipcode_receipt_table, build_zipcode_receipt_table_with, ReceiptTable, VerificationCode, VerificationTable,
};
pub use verify::{verify_receipt, verify_receipt_any, verify_receipt_cancellable, SearchOutcome};
