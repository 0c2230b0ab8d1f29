//! Salt-Search Verifier
//!
//! Recovers the event a receipt was issued for by trying every salt the
//! issuer could have drawn. Salts are never stored, so this search is the
//! only way back from a receipt to its code. Cost is one SHA-256 per salt.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use super::event::EventValue;
use super::generator::Receipt;
use super::table::{VerificationCode, VerificationTable};
use crate::core::hash::salted_commitment;

/// Outcome of a salt search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A salt produced a code in the table.
    Found(EventValue),
    /// The whole salt space was tried without a match.
    NotFound,
    /// The search was stopped before finishing.
    Cancelled,
}

impl SearchOutcome {
    /// Matched value, if any.
    pub fn found(self) -> Option<EventValue> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound | Self::Cancelled => None,
        }
    }
}

/// Verify a receipt against a table.
///
/// Returns the event value on a match, `None` when no salt in
/// `[0, table.salt_size())` produces a code in the table or the receipt is
/// not `table.receipt_len()` characters long.
pub fn verify_receipt(receipt: &Receipt, table: &VerificationTable) -> Option<EventValue> {
    search(receipt, table, None).found()
}

/// Verify with a cancellation flag checked before every salt.
///
/// A cancelled search has no side effects.
pub fn verify_receipt_cancellable(
    receipt: &Receipt,
    table: &VerificationTable,
    cancel: &AtomicBool,
) -> SearchOutcome {
    search(receipt, table, Some(cancel))
}

/// Try several tables in order; first match wins.
pub fn verify_receipt_any<'a, I>(receipt: &Receipt, tables: I) -> Option<EventValue>
where
    I: IntoIterator<Item = &'a VerificationTable>,
{
    tables
        .into_iter()
        .find_map(|table| verify_receipt(receipt, table))
}

fn search(receipt: &Receipt, table: &VerificationTable, cancel: Option<&AtomicBool>) -> SearchOutcome {
    if table.is_empty() {
        return SearchOutcome::NotFound;
    }
    // Salt and receipt are concatenated, so only the issued length can match
    if receipt.len() != table.receipt_len() {
        debug!(expected = table.receipt_len(), got = receipt.len(), "Receipt length mismatch");
        return SearchOutcome::NotFound;
    }

    for salt in 0..table.salt_size() {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            debug!(tried = salt, "Salt search cancelled");
            return SearchOutcome::Cancelled;
        }

        let code = VerificationCode::from_digest(salted_commitment(salt, receipt.as_str()));
        if let Some(value) = table.value(&code) {
            debug!(kind = ?value.kind(), "Receipt matched");
            return SearchOutcome::Found(value.clone());
        }
    }

    debug!(salt_size = table.salt_size(), entries = table.len(), "Receipt not found");
    SearchOutcome::NotFound
}
