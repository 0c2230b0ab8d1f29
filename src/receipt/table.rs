//! Receipt and Verification Tables
//!
//! The receipt table is issuer-private (value → receipt). The verification
//! table is public (value ↔ salted code). Both are owned per instance and
//! hold values of a single kind.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use rand::{CryptoRng, Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::event::{truncate_to_hour, EventValue, ReceiptKind};
use super::generator::{check_receipt_len, Receipt, ReceiptGenerator};
use super::RECEIPT_LEN;
use crate::core::hash::{salted_commitment, Digest};
use crate::core::rng::EntropyMixer;
use crate::error::{ReceiptError, Result};

/// Hours per planning day.
pub const HOURS_PER_DAY: u64 = 24;

// =============================================================================
// RECEIPT TABLE
// =============================================================================

/// Issuer-private mapping from event values to receipts.
///
/// Every receipt in a table has the same length.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ReceiptTableData", try_from = "ReceiptTableData")]
pub struct ReceiptTable {
    kind: ReceiptKind,
    receipt_len: usize,
    entries: BTreeMap<EventValue, Receipt>,
}

impl ReceiptTable {
    /// Create an empty table for default-length receipts.
    pub fn new(kind: ReceiptKind) -> Self {
        Self {
            kind,
            receipt_len: RECEIPT_LEN,
            entries: BTreeMap::new(),
        }
    }

    /// Create an empty table for receipts of `receipt_len` hex characters.
    pub fn with_receipt_len(kind: ReceiptKind, receipt_len: usize) -> Result<Self> {
        Ok(Self {
            kind,
            receipt_len: check_receipt_len(receipt_len)?,
            entries: BTreeMap::new(),
        })
    }

    /// Kind of every value in this table.
    pub fn kind(&self) -> ReceiptKind {
        self.kind
    }

    /// Length of every receipt in this table.
    pub fn receipt_len(&self) -> usize {
        self.receipt_len
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a pair. Replaces any previous receipt for the value.
    pub fn insert(&mut self, value: EventValue, receipt: Receipt) -> Result<()> {
        check_kind(self.kind, &value)?;
        if receipt.len() != self.receipt_len {
            return Err(ReceiptError::InvalidReceipt(format!(
                "expected {} characters, got {}",
                self.receipt_len,
                receipt.len()
            )));
        }
        self.entries.insert(value, receipt);
        Ok(())
    }

    /// Receipt issued for a value.
    pub fn get(&self, value: &EventValue) -> Option<&Receipt> {
        self.entries.get(value)
    }

    /// Pairs in value order.
    pub fn iter(&self) -> impl Iterator<Item = (&EventValue, &Receipt)> {
        self.entries.iter()
    }

    /// Values in order.
    pub fn values(&self) -> impl Iterator<Item = &EventValue> {
        self.entries.keys()
    }

    pub(crate) fn restricted_to(&self, keep: &BTreeSet<EventValue>) -> Self {
        Self {
            kind: self.kind,
            receipt_len: self.receipt_len,
            entries: self
                .entries
                .iter()
                .filter(|(v, _)| keep.contains(*v))
                .map(|(v, r)| (v.clone(), r.clone()))
                .collect(),
        }
    }
}

impl fmt::Debug for ReceiptTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiptTable")
            .field("kind", &self.kind)
            .field("receipt_len", &self.receipt_len)
            .field("len", &self.entries.len())
            .finish()
    }
}

/// Serialized form: entries are re-inserted (and checked) on load.
#[derive(Serialize, Deserialize)]
struct ReceiptTableData {
    kind: ReceiptKind,
    receipt_len: usize,
    entries: Vec<(EventValue, Receipt)>,
}

impl From<ReceiptTable> for ReceiptTableData {
    fn from(table: ReceiptTable) -> Self {
        Self {
            kind: table.kind,
            receipt_len: table.receipt_len,
            entries: table.entries.into_iter().collect(),
        }
    }
}

impl TryFrom<ReceiptTableData> for ReceiptTable {
    type Error = ReceiptError;

    fn try_from(data: ReceiptTableData) -> Result<Self> {
        let mut table = ReceiptTable::with_receipt_len(data.kind, data.receipt_len)?;
        for (value, receipt) in data.entries {
            if table.entries.contains_key(&value) {
                return Err(ReceiptError::InvalidEventValue(format!("duplicate value {}", value)));
            }
            table.insert(value, receipt)?;
        }
        Ok(table)
    }
}

/// Build a receipt table with one receipt per hour for `num_days` days.
///
/// `start` is truncated to the hour.
pub fn build_hour_receipt_table<R: RngCore + CryptoRng>(
    mixer: &mut EntropyMixer<R>,
    num_days: u32,
    start: DateTime<Utc>,
) -> Result<ReceiptTable> {
    build_hour_receipt_table_with(&ReceiptGenerator::default(), mixer, num_days, start)
}

/// [`build_hour_receipt_table`] with an explicit generator.
pub fn build_hour_receipt_table_with<R: RngCore + CryptoRng>(
    generator: &ReceiptGenerator,
    mixer: &mut EntropyMixer<R>,
    num_days: u32,
    start: DateTime<Utc>,
) -> Result<ReceiptTable> {
    let start = truncate_to_hour(start);
    let num_hours = u64::from(num_days) * HOURS_PER_DAY;
    let mut table = ReceiptTable::with_receipt_len(ReceiptKind::Hour, generator.receipt_len())?;

    for k in 0..num_hours {
        let at = start
            .checked_add_signed(Duration::hours(k as i64))
            .ok_or_else(|| {
                ReceiptError::InvalidEventValue(format!("hour {} after {} out of range", k, start))
            })?;
        let value = EventValue::Hour(at);
        let receipt = generator.generate(ReceiptKind::Hour, &value, mixer)?;
        table.insert(value, receipt)?;
    }

    info!(num_days, entries = table.len(), start = %start, "Built hour receipt table");
    Ok(table)
}

/// Build a receipt table with one receipt per (zipcode, day).
pub fn build_zipcode_receipt_table<R: RngCore + CryptoRng, S: AsRef<str>>(
    mixer: &mut EntropyMixer<R>,
    num_days: u32,
    zipcodes: &[S],
    start_date: NaiveDate,
) -> Result<ReceiptTable> {
    build_zipcode_receipt_table_with(&ReceiptGenerator::default(), mixer, num_days, zipcodes, start_date)
}

/// [`build_zipcode_receipt_table`] with an explicit generator.
pub fn build_zipcode_receipt_table_with<R: RngCore + CryptoRng, S: AsRef<str>>(
    generator: &ReceiptGenerator,
    mixer: &mut EntropyMixer<R>,
    num_days: u32,
    zipcodes: &[S],
    start_date: NaiveDate,
) -> Result<ReceiptTable> {
    let mut table = ReceiptTable::with_receipt_len(ReceiptKind::Zipcode, generator.receipt_len())?;

    for code in zipcodes {
        for k in 0..num_days {
            let day = start_date
                .checked_add_days(Days::new(u64::from(k)))
                .ok_or_else(|| {
                    ReceiptError::InvalidEventValue(format!("day {} after {} out of range", k, start_date))
                })?;
            let value = EventValue::zipcode(code.as_ref(), day)?;
            let receipt = generator.generate(ReceiptKind::Zipcode, &value, mixer)?;
            table.insert(value, receipt)?;
        }
    }

    info!(
        num_days,
        zipcodes = zipcodes.len(),
        entries = table.len(),
        start = %start_date,
        "Built zipcode receipt table"
    );
    Ok(table)
}

// =============================================================================
// VERIFICATION TABLE
// =============================================================================

/// Public commitment to one (receipt, salt) pair.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VerificationCode(Digest);

impl VerificationCode {
    /// Wrap a raw digest.
    pub fn from_digest(digest: Digest) -> Self {
        Self(digest)
    }

}

impl fmt::Display for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VerificationCode({})", self)
    }
}

/// Public bijection between event values and verification codes.
///
/// Carries the salt space size and receipt length it was built with so
/// verifiers search the same range and reject receipts of any other length.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "VerificationTableData", try_from = "VerificationTableData")]
pub struct VerificationTable {
    kind: ReceiptKind,
    salt_size: u32,
    receipt_len: usize,
    codes: BTreeMap<EventValue, VerificationCode>,
    values: BTreeMap<VerificationCode, EventValue>,
}

impl VerificationTable {
    /// Create an empty table for default-length receipts.
    pub fn new(kind: ReceiptKind, salt_size: u32) -> Result<Self> {
        Self::with_receipt_len(kind, salt_size, RECEIPT_LEN)
    }

    /// Create an empty table for receipts of `receipt_len` hex characters.
    pub fn with_receipt_len(kind: ReceiptKind, salt_size: u32, receipt_len: usize) -> Result<Self> {
        if salt_size == 0 {
            return Err(ReceiptError::InvalidSaltSize(salt_size));
        }
        Ok(Self {
            kind,
            salt_size,
            receipt_len: check_receipt_len(receipt_len)?,
            codes: BTreeMap::new(),
            values: BTreeMap::new(),
        })
    }

    /// Kind of every value in this table.
    pub fn kind(&self) -> ReceiptKind {
        self.kind
    }

    /// Number of salts a verifier must try.
    pub fn salt_size(&self) -> u32 {
        self.salt_size
    }

    /// Length of the receipts this table commits to.
    pub fn receipt_len(&self) -> usize {
        self.receipt_len
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// True if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Add a pair, keeping the table a bijection.
    pub fn insert(&mut self, value: EventValue, code: VerificationCode) -> Result<()> {
        check_kind(self.kind, &value)?;
        if let Some(existing) = self.values.get(&code) {
            if *existing != value {
                return Err(ReceiptError::CodeCollision);
            }
        }
        if let Some(old_code) = self.codes.insert(value.clone(), code) {
            self.values.remove(&old_code);
        }
        self.values.insert(code, value);
        Ok(())
    }

    /// Code committed for a value.
    pub fn code(&self, value: &EventValue) -> Option<&VerificationCode> {
        self.codes.get(value)
    }

    /// Value a code commits to.
    pub fn value(&self, code: &VerificationCode) -> Option<&EventValue> {
        self.values.get(code)
    }

    /// Pairs in value order.
    pub fn iter(&self) -> impl Iterator<Item = (&EventValue, &VerificationCode)> {
        self.codes.iter()
    }

    /// Values in order.
    pub fn values(&self) -> impl Iterator<Item = &EventValue> {
        self.codes.keys()
    }

    /// All codes.
    pub fn codes(&self) -> impl Iterator<Item = &VerificationCode> {
        self.values.keys()
    }

    pub(crate) fn restricted_to(&self, keep: &BTreeSet<EventValue>) -> Self {
        let codes: BTreeMap<EventValue, VerificationCode> = self
            .codes
            .iter()
            .filter(|(v, _)| keep.contains(*v))
            .map(|(v, c)| (v.clone(), *c))
            .collect();
        let values = codes.iter().map(|(v, c)| (*c, v.clone())).collect();

        Self {
            kind: self.kind,
            salt_size: self.salt_size,
            receipt_len: self.receipt_len,
            codes,
            values,
        }
    }
}

impl fmt::Debug for VerificationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationTable")
            .field("kind", &self.kind)
            .field("salt_size", &self.salt_size)
            .field("receipt_len", &self.receipt_len)
            .field("len", &self.codes.len())
            .finish()
    }
}

/// Serialized form: the reverse index is rebuilt (and checked) on load.
#[derive(Serialize, Deserialize)]
struct VerificationTableData {
    kind: ReceiptKind,
    salt_size: u32,
    receipt_len: usize,
    codes: Vec<(EventValue, VerificationCode)>,
}

impl From<VerificationTable> for VerificationTableData {
    fn from(table: VerificationTable) -> Self {
        Self {
            kind: table.kind,
            salt_size: table.salt_size,
            receipt_len: table.receipt_len,
            codes: table.codes.into_iter().collect(),
        }
    }
}

impl TryFrom<VerificationTableData> for VerificationTable {
    type Error = ReceiptError;

    fn try_from(data: VerificationTableData) -> Result<Self> {
        let mut table = VerificationTable::with_receipt_len(data.kind, data.salt_size, data.receipt_len)?;
        for (value, code) in data.codes {
            if table.codes.contains_key(&value) {
                return Err(ReceiptError::InvalidEventValue(format!("duplicate value {}", value)));
            }
            table.insert(value, code)?;
        }
        Ok(table)
    }
}

/// Commit every receipt under a fresh salt from `[0, salt_size)`.
///
/// Salts are dropped as soon as each code is computed. Running this twice on
/// the same receipt table yields unrelated code sets.
pub fn build_verification_table<R: Rng + CryptoRng>(
    receipts: &ReceiptTable,
    rng: &mut R,
    salt_size: u32,
) -> Result<VerificationTable> {
    let mut table = VerificationTable::with_receipt_len(receipts.kind(), salt_size, receipts.receipt_len())?;

    for (value, receipt) in receipts.iter() {
        let salt = rng.gen_range(0..salt_size);
        let code = VerificationCode(salted_commitment(salt, receipt.as_str()));
        table.insert(value.clone(), code)?;
    }

    debug!(entries = table.len(), salt_size, "Built verification table");
    Ok(table)
}

fn check_kind(kind: ReceiptKind, value: &EventValue) -> Result<()> {
    if value.kind() != kind {
        return Err(ReceiptError::KindMismatch {
            expected: kind,
            got: value.kind(),
        });
    }
    value.validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receipt::SALT_SIZE;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn mixer(seed: u64) -> EntropyMixer<StdRng> {
        EntropyMixer::with_rng(b"table seed".to_vec(), StdRng::seed_from_u64(seed)).unwrap()
    }

    fn jan1() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_hour_table_covers_every_hour() {
        let table = build_hour_receipt_table(&mut mixer(1), 1, jan1()).unwrap();
        assert_eq!(table.len(), 24);

        for h in 0..24 {
            let value = EventValue::hour(Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap());
            assert!(table.get(&value).is_some(), "missing hour {}", h);
        }
    }

    #[test]
    fn test_hour_table_truncates_start() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 3, 27, 5).unwrap();
        let table = build_hour_receipt_table(&mut mixer(2), 1, start).unwrap();
        let first = table.values().next().unwrap();
        assert_eq!(*first, EventValue::hour(Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap()));
    }

    #[test]
    fn test_zero_days_is_empty() {
        let receipts = build_hour_receipt_table(&mut mixer(3), 0, jan1()).unwrap();
        assert!(receipts.is_empty());

        let verification = build_verification_table(&receipts, &mut mixer(4), SALT_SIZE).unwrap();
        assert!(verification.is_empty());
    }

    #[test]
    fn test_zipcode_table_is_cartesian_product() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let table = build_zipcode_receipt_table(&mut mixer(5), 2, &["12345", "67890"], day).unwrap();
        assert_eq!(table.len(), 4);
        assert!(table.get(&EventValue::zipcode("67890", day.succ_opt().unwrap()).unwrap()).is_some());
    }

    #[test]
    fn test_bad_zipcode_aborts_build() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let result = build_zipcode_receipt_table(&mut mixer(6), 2, &["12345", ""], day);
        assert!(matches!(result, Err(ReceiptError::InvalidEventValue(_))));
    }

    #[test]
    fn test_verification_table_covers_receipt_table() {
        let receipts = build_hour_receipt_table(&mut mixer(7), 2, jan1()).unwrap();
        let verification = build_verification_table(&receipts, &mut mixer(8), SALT_SIZE).unwrap();

        assert_eq!(verification.len(), receipts.len());
        assert!(receipts.values().eq(verification.values()));
        assert_eq!(verification.codes().count(), verification.len());
    }

    #[test]
    fn test_rebuild_gives_disjoint_codes() {
        let receipts = build_hour_receipt_table(&mut mixer(9), 1, jan1()).unwrap();
        let mut rng = mixer(10);
        let a = build_verification_table(&receipts, &mut rng, u32::MAX).unwrap();
        let b = build_verification_table(&receipts, &mut rng, u32::MAX).unwrap();

        let codes_a: BTreeSet<_> = a.codes().collect();
        assert!(b.codes().all(|c| !codes_a.contains(c)));
    }

    #[test]
    fn test_zero_salt_size_rejected() {
        let receipts = build_hour_receipt_table(&mut mixer(11), 1, jan1()).unwrap();
        let result = build_verification_table(&receipts, &mut mixer(12), 0);
        assert!(matches!(result, Err(ReceiptError::InvalidSaltSize(0))));
    }

    #[test]
    fn test_insert_rejects_wrong_kind() {
        let mut table = ReceiptTable::new(ReceiptKind::Zipcode);
        let hour = EventValue::hour(jan1());
        let result = table.insert(hour, Receipt::parse("0123456789abcdef").unwrap());
        assert!(matches!(result, Err(ReceiptError::KindMismatch { .. })));
    }

    #[test]
    fn test_code_collision_detected() {
        let mut table = VerificationTable::new(ReceiptKind::Hour, SALT_SIZE).unwrap();
        let code = VerificationCode::from_digest([1; 32]);
        table.insert(EventValue::hour(jan1()), code).unwrap();

        let later = EventValue::hour(jan1() + Duration::hours(1));
        assert!(matches!(table.insert(later, code), Err(ReceiptError::CodeCollision)));
    }

    #[test]
    fn test_reinsert_replaces_reverse_entry() {
        let mut table = VerificationTable::new(ReceiptKind::Hour, SALT_SIZE).unwrap();
        let value = EventValue::hour(jan1());
        let old = VerificationCode::from_digest([1; 32]);
        let new = VerificationCode::from_digest([2; 32]);

        table.insert(value.clone(), old).unwrap();
        table.insert(value.clone(), new).unwrap();

        assert_eq!(table.len(), 1);
        assert!(table.value(&old).is_none());
        assert_eq!(table.value(&new), Some(&value));
    }

    #[test]
    fn test_code_displays_as_hex() {
        let code = VerificationCode::from_digest([0xab; 32]);
        assert_eq!(code.to_string(), "ab".repeat(32));
    }

    #[test]
    fn test_insert_rejects_wrong_receipt_length() {
        let mut table = ReceiptTable::new(ReceiptKind::Hour);
        let result = table.insert(EventValue::hour(jan1()), Receipt::parse("0123456789abcde").unwrap());
        assert!(matches!(result, Err(ReceiptError::InvalidReceipt(_))));
    }

    #[test]
    fn test_custom_generator_sets_table_lengths() {
        let generator = ReceiptGenerator::new(16, 24).unwrap();
        let receipts = build_hour_receipt_table_with(&generator, &mut mixer(14), 1, jan1()).unwrap();
        assert_eq!(receipts.receipt_len(), 24);
        assert!(receipts.iter().all(|(_, r)| r.len() == 24));

        let verification = build_verification_table(&receipts, &mut mixer(15), SALT_SIZE).unwrap();
        assert_eq!(verification.receipt_len(), 24);
    }

    #[test]
    fn test_decode_rejects_mixed_kind_receipt_table() {
        let data = ReceiptTableData {
            kind: ReceiptKind::Hour,
            receipt_len: RECEIPT_LEN,
            entries: vec![
                (EventValue::hour(jan1()), Receipt::parse("0123456789abcdef").unwrap()),
                (
                    EventValue::zipcode("12345", jan1().date_naive()).unwrap(),
                    Receipt::parse("fedcba9876543210").unwrap(),
                ),
            ],
        };
        let bytes = bincode::serialize(&data).unwrap();

        assert!(bincode::deserialize::<ReceiptTable>(&bytes).is_err());
        assert!(matches!(ReceiptTable::try_from(data), Err(ReceiptError::KindMismatch { .. })));
    }

    #[test]
    fn test_decode_rejects_duplicate_receipt_value() {
        let value = EventValue::hour(jan1());
        let data = ReceiptTableData {
            kind: ReceiptKind::Hour,
            receipt_len: RECEIPT_LEN,
            entries: vec![
                (value.clone(), Receipt::parse("0123456789abcdef").unwrap()),
                (value, Receipt::parse("fedcba9876543210").unwrap()),
            ],
        };
        assert!(matches!(ReceiptTable::try_from(data), Err(ReceiptError::InvalidEventValue(_))));
    }

    #[test]
    fn test_decode_rejects_duplicate_verification_value() {
        let value = EventValue::hour(jan1());
        let data = VerificationTableData {
            kind: ReceiptKind::Hour,
            salt_size: SALT_SIZE,
            receipt_len: RECEIPT_LEN,
            codes: vec![
                (value.clone(), VerificationCode::from_digest([1; 32])),
                (value, VerificationCode::from_digest([2; 32])),
            ],
        };
        let bytes = bincode::serialize(&data).unwrap();

        assert!(bincode::deserialize::<VerificationTable>(&bytes).is_err());
        assert!(matches!(
            VerificationTable::try_from(data),
            Err(ReceiptError::InvalidEventValue(_))
        ));
    }

    #[test]
    fn test_decode_rejects_colliding_verification_codes() {
        let code = VerificationCode::from_digest([7; 32]);
        let data = VerificationTableData {
            kind: ReceiptKind::Hour,
            salt_size: SALT_SIZE,
            receipt_len: RECEIPT_LEN,
            codes: vec![
                (EventValue::hour(jan1()), code),
                (EventValue::hour(jan1() + Duration::hours(1)), code),
            ],
        };
        assert!(matches!(VerificationTable::try_from(data), Err(ReceiptError::CodeCollision)));
    }

    #[test]
    fn test_decode_round_trips_valid_tables() {
        let receipts = build_hour_receipt_table(&mut mixer(16), 1, jan1()).unwrap();
        let verification = build_verification_table(&receipts, &mut mixer(17), SALT_SIZE).unwrap();

        let bytes = bincode::serialize(&receipts).unwrap();
        assert_eq!(bincode::deserialize::<ReceiptTable>(&bytes).unwrap(), receipts);

        let bytes = bincode::serialize(&verification).unwrap();
        assert_eq!(bincode::deserialize::<VerificationTable>(&bytes).unwrap(), verification);
    }

    #[test]
    fn test_debug_does_not_print_receipts() {
        let receipts = build_hour_receipt_table(&mut mixer(13), 1, jan1()).unwrap();
        let text = format!("{:?}", receipts);
        for (_, receipt) in receipts.iter() {
            assert!(!text.contains(receipt.as_str()));
        }
    }
}
