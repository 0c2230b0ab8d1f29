//! Issuer configuration.
//!
//! Read from environment variables with defaults for every field.

use std::fmt::Display;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::core::hash::DIGEST_LEN;
use crate::error::Result;
use crate::receipt::{ReceiptGenerator, ReceiptKind, BYTE_LEN_RAND, RECEIPT_LEN, SALT_SIZE};

/// Default seed file location.
pub const DEFAULT_SEED_PATH: &str = "./verification/randomSeed.txt";

/// Default output directory for tables.
pub const DEFAULT_TABLE_DIR: &str = "./verification/tables";

/// Default planning horizon in days.
pub const DEFAULT_NUM_DAYS: u32 = 100;

/// Issuance and verification configuration.
#[derive(Clone, Debug)]
pub struct IssuerConfig {
    /// Seed file for the entropy mixer.
    pub seed_path: PathBuf,
    /// Directory tables are written to and read from.
    pub table_dir: PathBuf,
    /// Explicit verification table for the verifier. Defaults to the full
    /// table in `table_dir`.
    pub verification_table: Option<PathBuf>,
    /// Planning horizon in days.
    pub num_days: u32,
    /// Salt space size.
    pub salt_size: u32,
    /// Receipt length in hex characters.
    pub receipt_len: usize,
    /// Entropy bytes drawn per receipt.
    pub rand_len: usize,
    /// Receipt kind to issue.
    pub kind: ReceiptKind,
    /// Zipcodes for the zipcode kind.
    pub zipcodes: Vec<String>,
    /// First event of the horizon. None means now.
    pub start: Option<DateTime<Utc>>,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            seed_path: PathBuf::from(DEFAULT_SEED_PATH),
            table_dir: PathBuf::from(DEFAULT_TABLE_DIR),
            verification_table: None,
            num_days: DEFAULT_NUM_DAYS,
            salt_size: SALT_SIZE,
            receipt_len: RECEIPT_LEN,
            rand_len: BYTE_LEN_RAND,
            kind: ReceiptKind::Hour,
            zipcodes: Vec::new(),
            start: None,
        }
    }
}

impl IssuerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let kind = match lookup("RECEIPT_KIND") {
            Some(name) => ReceiptKind::from_name(&name).unwrap_or_else(|| {
                warn!(value = %name, "Unknown RECEIPT_KIND, using hour");
                defaults.kind
            }),
            None => defaults.kind,
        };

        let start = lookup("RECEIPT_START_DATE").and_then(|text| {
            match DateTime::parse_from_rfc3339(text.trim()) {
                Ok(at) => Some(at.with_timezone(&Utc)),
                Err(e) => {
                    warn!(value = %text, error = %e, "Invalid RECEIPT_START_DATE, using now");
                    None
                }
            }
        });

        Self {
            seed_path: lookup("RECEIPT_SEED_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.seed_path),
            table_dir: lookup("RECEIPT_TABLE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.table_dir),
            verification_table: lookup("RECEIPT_VERIFICATION_TABLE").map(PathBuf::from),
            num_days: parse_or("RECEIPT_NUM_DAYS", lookup("RECEIPT_NUM_DAYS"), defaults.num_days, 0..=u32::MAX),
            salt_size: parse_or("RECEIPT_SALT_SIZE", lookup("RECEIPT_SALT_SIZE"), defaults.salt_size, 1..=u32::MAX),
            receipt_len: parse_or("RECEIPT_LEN", lookup("RECEIPT_LEN"), defaults.receipt_len, 1..=DIGEST_LEN * 2),
            rand_len: parse_or("RECEIPT_RAND_LEN", lookup("RECEIPT_RAND_LEN"), defaults.rand_len, 1..=DIGEST_LEN),
            kind,
            zipcodes: lookup("RECEIPT_ZIPCODES")
                .map(|list| {
                    list.split(',')
                        .map(str::trim)
                        .filter(|z| !z.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            start,
        }
    }

    /// Receipt generator for the configured lengths.
    pub fn generator(&self) -> Result<ReceiptGenerator> {
        ReceiptGenerator::new(self.rand_len, self.receipt_len)
    }

    /// Verification table the verifier should load.
    pub fn verification_table_path(&self) -> PathBuf {
        self.verification_table
            .clone()
            .unwrap_or_else(|| self.table_dir.join(crate::store::VERIFICATION_FILE))
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T, range: RangeInclusive<T>) -> T
where
    T: FromStr + PartialOrd + Display + Copy,
{
    match value {
        None => default,
        Some(text) => match text.trim().parse::<T>() {
            Ok(n) if range.contains(&n) => n,
            _ => {
                warn!(key, value = %text, default = %default, "Invalid numeric setting, using default");
                default
            }
        },
    }
}
