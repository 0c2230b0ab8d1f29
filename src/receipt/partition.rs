//! Table Partitioner
//!
//! Carves value-range subtables out of receipt and verification tables, e.g.
//! one day of codes for a verifier who should not see the whole horizon.
//! Subtables are owned copies; the source table is never touched.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt::Debug;

use super::event::{EventValue, ReceiptKind};
use super::table::{ReceiptTable, VerificationTable};
use crate::error::{ReceiptError, Result};

/// Range sub-selection over a table keyed by event values.
pub trait Partition: Sized {
    /// Kind of the values in the table.
    fn value_kind(&self) -> ReceiptKind;

    /// Every value in the table.
    fn event_values(&self) -> Vec<&EventValue>;

    /// Owned copy holding only the given values.
    fn keep_values(&self, keep: &BTreeSet<EventValue>) -> Self;

    /// Copy restricted to values `v` with `start <= v < end`.
    fn sub_table(&self, start: &EventValue, end: &EventValue) -> Result<Self> {
        let kind = self.value_kind();
        for bound in [start, end] {
            if bound.kind() != kind {
                return Err(ReceiptError::Comparison(format!(
                    "range bound {} is a {:?} value, table holds {:?} values",
                    bound,
                    bound.kind(),
                    kind
                )));
            }
        }
        // Same kind on both sides, so the storage order is the value order
        self.sub_table_by(start, end, |v| v.clone())
    }

    /// Copy restricted to values whose key `k` satisfies `start <= k < end`.
    fn sub_table_by<K, F>(&self, start: &K, end: &K, key: F) -> Result<Self>
    where
        K: PartialOrd + Debug,
        F: Fn(&EventValue) -> K,
    {
        if start.partial_cmp(end).is_none() {
            return Err(ReceiptError::Comparison(format!(
                "range bounds {:?} and {:?} are not comparable",
                start, end
            )));
        }

        let mut keep = BTreeSet::new();
        for value in self.event_values() {
            let k = key(value);
            let lower = k.partial_cmp(start).ok_or_else(|| not_comparable(&k, start))?;
            let upper = k.partial_cmp(end).ok_or_else(|| not_comparable(&k, end))?;
            if lower != Ordering::Less && upper == Ordering::Less {
                keep.insert(value.clone());
            }
        }

        Ok(self.keep_values(&keep))
    }
}

fn not_comparable<K: Debug>(key: &K, bound: &K) -> ReceiptError {
    ReceiptError::Comparison(format!("key {:?} is not comparable with bound {:?}", key, bound))
}

impl Partition for ReceiptTable {
    fn value_kind(&self) -> ReceiptKind {
        self.kind()
    }

    fn event_values(&self) -> Vec<&EventValue> {
        self.values().collect()
    }

    fn keep_values(&self, keep: &BTreeSet<EventValue>) -> Self {
        self.restricted_to(keep)
    }
}

impl Partition for VerificationTable {
    fn value_kind(&self) -> ReceiptKind {
        self.kind()
    }

    fn event_values(&self) -> Vec<&EventValue> {
        self.values().collect()
    }

    fn keep_values(&self, keep: &BTreeSet<EventValue>) -> Self {
        self.restricted_to(keep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::EntropyMixer;
    use crate::receipt::table::{build_hour_receipt_table, build_verification_table, build_zipcode_receipt_table};
    use crate::receipt::SALT_SIZE;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn mixer(seed: u64) -> EntropyMixer<StdRng> {
        EntropyMixer::with_rng(b"partition seed".to_vec(), StdRng::seed_from_u64(seed)).unwrap()
    }

    fn hour(d: u32, h: u32) -> EventValue {
        EventValue::hour(Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap())
    }

    #[test]
    fn test_half_open_range() {
        let table = build_hour_receipt_table(&mut mixer(1), 1, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()).unwrap();
        let sub = table.sub_table(&hour(1, 5), &hour(1, 8)).unwrap();

        let kept: Vec<_> = sub.values().cloned().collect();
        assert_eq!(kept, vec![hour(1, 5), hour(1, 6), hour(1, 7)]);
        for value in sub.values() {
            assert_eq!(sub.get(value), table.get(value));
        }
    }

    #[test]
    fn test_source_unchanged() {
        let table = build_hour_receipt_table(&mut mixer(2), 2, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()).unwrap();
        let before = table.clone();

        let sub = table.sub_table(&hour(1, 0), &hour(2, 0)).unwrap();
        assert_eq!(sub.len(), 24);
        assert_eq!(table, before);
        assert_eq!(table.len(), 48);
    }

    #[test]
    fn test_sub_table_by_day() {
        let day1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let day2 = day1.succ_opt().unwrap();
        let receipts = build_zipcode_receipt_table(&mut mixer(3), 2, &["12345", "67890"], day1).unwrap();
        let verification = build_verification_table(&receipts, &mut mixer(4), SALT_SIZE).unwrap();

        let sub = verification.sub_table_by(&day1, &day2, |v| v.day()).unwrap();
        assert_eq!(sub.len(), 2);
        assert!(sub.values().all(|v| v.day() == day1));
        assert_eq!(sub.salt_size(), verification.salt_size());
        assert_eq!(verification.len(), 4);
    }

    #[test]
    fn test_verification_subtable_keeps_bijection() {
        let receipts = build_hour_receipt_table(&mut mixer(5), 1, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()).unwrap();
        let verification = build_verification_table(&receipts, &mut mixer(6), SALT_SIZE).unwrap();

        let sub = verification.sub_table(&hour(1, 10), &hour(1, 12)).unwrap();
        assert_eq!(sub.len(), 2);
        for (value, code) in sub.iter() {
            assert_eq!(sub.value(code), Some(value));
        }
    }

    #[test]
    fn test_mixed_kind_bounds_rejected() {
        let table = build_hour_receipt_table(&mut mixer(7), 1, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()).unwrap();
        let zip = EventValue::zipcode("12345", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).unwrap();

        let result = table.sub_table(&hour(1, 0), &zip);
        assert!(matches!(result, Err(ReceiptError::Comparison(_))));
    }

    #[test]
    fn test_incomparable_key_rejected() {
        let table = build_hour_receipt_table(&mut mixer(8), 1, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()).unwrap();

        let result = table.sub_table_by(&0.0, &f64::NAN, |_| 1.0);
        assert!(matches!(result, Err(ReceiptError::Comparison(_))));

        let result = table.sub_table_by(&0.0, &10.0, |_| f64::NAN);
        assert!(matches!(result, Err(ReceiptError::Comparison(_))));
    }

    #[test]
    fn test_empty_range() {
        let table = build_hour_receipt_table(&mut mixer(9), 1, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()).unwrap();
        assert!(table.sub_table(&hour(1, 5), &hour(1, 5)).unwrap().is_empty());
        assert!(table.sub_table(&hour(1, 8), &hour(1, 5)).unwrap().is_empty());
    }
}
