//! Daily hand-off.
//!
//! Splits the horizon into one receipt/verification subtable pair per day and
//! writes everything, plus a JSON manifest, to an output directory.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    save_receipt_table, save_verification_table, StoreError, TableRole, MANIFEST_FILE,
    RECEIPTS_FILE, VERIFICATION_FILE,
};
use crate::error::{ReceiptError, Result};
use crate::receipt::{Partition, ReceiptKind, ReceiptTable, VerificationTable};

/// Subtables for one day.
#[derive(Clone, Debug)]
pub struct DailyTables {
    /// Day covered.
    pub day: NaiveDate,
    /// Receipts issued for the day (private).
    pub receipts: ReceiptTable,
    /// Codes for the day (public).
    pub verification: VerificationTable,
}

/// One subtable pair per day for `num_days` days from `start_date`.
pub fn daily_subtables(
    receipts: &ReceiptTable,
    verification: &VerificationTable,
    start_date: NaiveDate,
    num_days: u32,
) -> Result<Vec<DailyTables>> {
    let mut daily = Vec::with_capacity(num_days as usize);

    for k in 0..num_days {
        let day = add_days(start_date, u64::from(k))?;
        let next = add_days(day, 1)?;

        daily.push(DailyTables {
            day,
            receipts: receipts.sub_table_by(&day, &next, |v| v.day())?,
            verification: verification.sub_table_by(&day, &next, |v| v.day())?,
        });
    }

    Ok(daily)
}

/// First day and number of days spanned by a table's values.
///
/// An hour horizon that does not start at midnight spills into one extra day.
pub fn covered_days(receipts: &ReceiptTable) -> Option<(NaiveDate, u32)> {
    let first = receipts.values().next()?.day();
    let last = receipts.values().last()?.day();
    let span = (last - first).num_days() + 1;
    Some((first, u32::try_from(span).ok()?))
}

fn add_days(day: NaiveDate, n: u64) -> Result<NaiveDate> {
    day.checked_add_days(Days::new(n))
        .ok_or_else(|| ReceiptError::InvalidEventValue(format!("{} + {} days out of range", day, n)))
}

/// One written file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Day for subtables, None for the full tables.
    pub day: Option<NaiveDate>,
    /// Table type.
    pub role: TableRole,
    /// File name relative to the output directory.
    pub file: String,
    /// Number of entries in the table.
    pub entries: usize,
}

/// Index of an issuance run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceManifest {
    /// When the files were written.
    pub written_at: DateTime<Utc>,
    /// Receipt kind.
    pub kind: ReceiptKind,
    /// Salt space size of every verification table.
    pub salt_size: u32,
    /// Receipt length in hex characters.
    pub receipt_len: usize,
    /// Written files.
    pub files: Vec<ManifestEntry>,
}

impl IssuanceManifest {
    /// Paths of all written files under `dir`.
    pub fn paths(&self, dir: &Path) -> Vec<PathBuf> {
        self.files.iter().map(|f| dir.join(&f.file)).collect()
    }

    /// Read a manifest written by [`write_issuance`].
    pub fn load(dir: &Path) -> std::result::Result<Self, StoreError> {
        let path = dir.join(MANIFEST_FILE);
        let text = fs::read_to_string(&path).map_err(|source| StoreError::Io { path, source })?;
        serde_json::from_str(&text).map_err(|e| StoreError::Decode(e.to_string()))
    }
}

/// File name of a daily receipt subtable.
pub fn daily_receipts_file(day: NaiveDate) -> String {
    format!("receipts-{}.bin", day.format("%Y-%m-%d"))
}

/// File name of a daily verification subtable.
pub fn daily_verification_file(day: NaiveDate) -> String {
    format!("verification-{}.bin", day.format("%Y-%m-%d"))
}

/// Write full tables, daily subtables and a manifest into `dir`.
pub fn write_issuance(
    dir: &Path,
    receipts: &ReceiptTable,
    verification: &VerificationTable,
    daily: &[DailyTables],
) -> std::result::Result<IssuanceManifest, StoreError> {
    fs::create_dir_all(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::with_capacity(2 + daily.len() * 2);

    save_receipt_table(&dir.join(RECEIPTS_FILE), receipts)?;
    files.push(ManifestEntry {
        day: None,
        role: TableRole::Receipts,
        file: RECEIPTS_FILE.to_string(),
        entries: receipts.len(),
    });

    save_verification_table(&dir.join(VERIFICATION_FILE), verification)?;
    files.push(ManifestEntry {
        day: None,
        role: TableRole::Verification,
        file: VERIFICATION_FILE.to_string(),
        entries: verification.len(),
    });

    for tables in daily {
        let receipts_file = daily_receipts_file(tables.day);
        save_receipt_table(&dir.join(&receipts_file), &tables.receipts)?;
        files.push(ManifestEntry {
            day: Some(tables.day),
            role: TableRole::Receipts,
            file: receipts_file,
            entries: tables.receipts.len(),
        });

        let verification_file = daily_verification_file(tables.day);
        save_verification_table(&dir.join(&verification_file), &tables.verification)?;
        files.push(ManifestEntry {
            day: Some(tables.day),
            role: TableRole::Verification,
            file: verification_file,
            entries: tables.verification.len(),
        });
    }

    let manifest = IssuanceManifest {
        written_at: Utc::now(),
        kind: verification.kind(),
        salt_size: verification.salt_size(),
        receipt_len: verification.receipt_len(),
        files,
    };

    let manifest_path = dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(&manifest).map_err(|e| StoreError::Encode(e.to_string()))?;
    fs::write(&manifest_path, json).map_err(|source| StoreError::Io {
        path: manifest_path,
        source,
    })?;

    info!(
        dir = %dir.display(),
        files = manifest.files.len(),
        days = daily.len(),
        "Wrote issuance"
    );
    Ok(manifest)
}
