//! Table Persistence
//!
//! Tables are stored as bincode blobs inside a small versioned envelope that
//! also records which table type the blob holds, so a verifier cannot load
//! the private receipt table by mistake (or the other way around).

pub mod handoff;

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::receipt::{ReceiptTable, VerificationTable};

/// Current on-disk format version.
pub const FORMAT_VERSION: u8 = 2;

/// File name of the full receipt table.
pub const RECEIPTS_FILE: &str = "receipts.bin";

/// File name of the full verification table.
pub const VERIFICATION_FILE: &str = "verification.bin";

/// File name of the hand-off manifest.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Which table a stored blob holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableRole {
    /// Issuer-private receipt table.
    Receipts,
    /// Public verification table.
    Verification,
}

#[derive(Serialize, Deserialize)]
struct Header {
    version: u8,
    role: TableRole,
}

#[derive(Serialize, Deserialize)]
struct StoredTable<T> {
    version: u8,
    role: TableRole,
    table: T,
}

/// Errors that can occur while storing or loading tables.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem error.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(String),

    /// Deserialization failed.
    #[error("decode failed: {0}")]
    Decode(String),

    /// Blob was written by another format version.
    #[error("format version mismatch: expected {expected}, got {got}")]
    VersionMismatch {
        /// Supported version.
        expected: u8,
        /// Version in the blob.
        got: u8,
    },

    /// Blob holds the other table type.
    #[error("wrong table role: expected {expected:?}, got {got:?}")]
    WrongRole {
        /// Role the caller asked for.
        expected: TableRole,
        /// Role in the blob.
        got: TableRole,
    },
}

/// Serialize a receipt table.
pub fn encode_receipt_table(table: &ReceiptTable) -> Result<Vec<u8>, StoreError> {
    encode(TableRole::Receipts, table)
}

/// Serialize a verification table.
pub fn encode_verification_table(table: &VerificationTable) -> Result<Vec<u8>, StoreError> {
    encode(TableRole::Verification, table)
}

/// Deserialize a receipt table.
pub fn decode_receipt_table(data: &[u8]) -> Result<ReceiptTable, StoreError> {
    decode(TableRole::Receipts, data)
}

/// Deserialize a verification table.
pub fn decode_verification_table(data: &[u8]) -> Result<VerificationTable, StoreError> {
    decode(TableRole::Verification, data)
}

/// Write a receipt table to `path`.
pub fn save_receipt_table(path: &Path, table: &ReceiptTable) -> Result<(), StoreError> {
    write_file(path, &encode_receipt_table(table)?)
}

/// Write a verification table to `path`.
pub fn save_verification_table(path: &Path, table: &VerificationTable) -> Result<(), StoreError> {
    write_file(path, &encode_verification_table(table)?)
}

/// Read a receipt table from `path`.
pub fn load_receipt_table(path: &Path) -> Result<ReceiptTable, StoreError> {
    decode_receipt_table(&read_file(path)?)
}

/// Read a verification table from `path`.
pub fn load_verification_table(path: &Path) -> Result<VerificationTable, StoreError> {
    decode_verification_table(&read_file(path)?)
}

fn encode<T: Serialize>(role: TableRole, table: &T) -> Result<Vec<u8>, StoreError> {
    let stored = StoredTable {
        version: FORMAT_VERSION,
        role,
        table,
    };
    bincode::serialize(&stored).map_err(|e| StoreError::Encode(e.to_string()))
}

fn decode<T: DeserializeOwned>(role: TableRole, data: &[u8]) -> Result<T, StoreError> {
    // Header first, so a wrong blob is reported as such rather than as garbage
    let header: Header =
        bincode::deserialize(data).map_err(|e| StoreError::Decode(e.to_string()))?;

    if header.version != FORMAT_VERSION {
        return Err(StoreError::VersionMismatch {
            expected: FORMAT_VERSION,
            got: header.version,
        });
    }
    if header.role != role {
        return Err(StoreError::WrongRole {
            expected: role,
            got: header.role,
        });
    }

    let stored: StoredTable<T> =
        bincode::deserialize(data).map_err(|e| StoreError::Decode(e.to_string()))?;
    Ok(stored.table)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, bytes).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = bytes.len(), "Wrote table");
    Ok(())
}

fn read_file(path: &Path) -> Result<Vec<u8>, StoreError> {
    fs::read(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}
