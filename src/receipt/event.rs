//! Event Values
//!
//! The thing a receipt attests to: an hour, or a zipcode on a given day.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::core::hash::ReceiptHasher;
use crate::error::{ReceiptError, Result};

/// Longest zipcode accepted.
pub const MAX_ZIPCODE_LEN: usize = 16;

/// Receipt kinds. Each kind has its own hash domain tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReceiptKind {
    /// One receipt per hour.
    Hour,
    /// One receipt per (zipcode, day).
    Zipcode,
}

impl ReceiptKind {
    /// One-byte domain tag prepended to receipt hash input.
    pub fn domain_tag(self) -> u8 {
        match self {
            Self::Hour => b'0',
            Self::Zipcode => b'1',
        }
    }

    /// Parse a kind name (`hour` or `zipcode`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "hour" => Some(Self::Hour),
            "zipcode" | "zip" => Some(Self::Zipcode),
            _ => None,
        }
    }
}

/// An event a receipt attests to.
///
/// The derived `Ord` is a storage order only (variant first). Range queries
/// go through [`EventValue::try_cmp`], which refuses to order values of
/// different kinds.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventValue {
    /// A timestamp truncated to the hour.
    Hour(DateTime<Utc>),
    /// A postal code on a day. Ordered by day, then code.
    Zipcode {
        /// Day (midnight).
        day: NaiveDate,
        /// Postal code.
        code: String,
    },
}

impl EventValue {
    /// Hour value for the hour containing `at`.
    pub fn hour(at: DateTime<Utc>) -> Self {
        Self::Hour(truncate_to_hour(at))
    }

    /// Zipcode value for a day.
    pub fn zipcode(code: impl Into<String>, day: NaiveDate) -> Result<Self> {
        let value = Self::Zipcode {
            day,
            code: code.into(),
        };
        value.validate()?;
        Ok(value)
    }

    /// Zipcode value for the day containing `at`.
    pub fn zipcode_at(code: impl Into<String>, at: DateTime<Utc>) -> Result<Self> {
        Self::zipcode(code, at.date_naive())
    }

    /// Kind of this value.
    pub fn kind(&self) -> ReceiptKind {
        match self {
            Self::Hour(_) => ReceiptKind::Hour,
            Self::Zipcode { .. } => ReceiptKind::Zipcode,
        }
    }

    /// Calendar day (UTC) of this value.
    pub fn day(&self) -> NaiveDate {
        match self {
            Self::Hour(at) => at.date_naive(),
            Self::Zipcode { day, .. } => *day,
        }
    }

    /// Start of the event as a UTC instant.
    pub fn starts_at(&self) -> DateTime<Utc> {
        match self {
            Self::Hour(at) => *at,
            Self::Zipcode { day, .. } => day.and_time(chrono::NaiveTime::MIN).and_utc(),
        }
    }

    /// Check the value is in its domain.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Hour(at) => {
                if *at != truncate_to_hour(*at) {
                    return Err(ReceiptError::InvalidEventValue(format!(
                        "hour value {} is not on an hour boundary",
                        at.to_rfc3339()
                    )));
                }
            }
            Self::Zipcode { code, .. } => {
                if code.is_empty() || code.len() > MAX_ZIPCODE_LEN {
                    return Err(ReceiptError::InvalidEventValue(format!(
                        "zipcode must be 1..={} characters, got {}",
                        MAX_ZIPCODE_LEN,
                        code.len()
                    )));
                }
                if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
                    return Err(ReceiptError::InvalidEventValue(format!(
                        "zipcode {:?} contains invalid characters",
                        code
                    )));
                }
            }
        }
        Ok(())
    }

    /// Feed the canonical text encoding into a receipt hasher.
    ///
    /// Hour: `%H` then `%d/%m/%Y`. Zipcode: the code then `%d/%m/%Y`.
    pub fn encode_into(&self, hasher: &mut ReceiptHasher) {
        match self {
            Self::Hour(at) => {
                hasher.update_str(&at.format("%H").to_string());
                hasher.update_str(&at.format("%d/%m/%Y").to_string());
            }
            Self::Zipcode { day, code } => {
                hasher.update_str(code);
                hasher.update_str(&day.format("%d/%m/%Y").to_string());
            }
        }
    }

    /// Order two values of the same kind.
    pub fn try_cmp(&self, other: &Self) -> Result<Ordering> {
        match (self, other) {
            (Self::Hour(a), Self::Hour(b)) => Ok(a.cmp(b)),
            (Self::Zipcode { .. }, Self::Zipcode { .. }) => Ok(self.cmp(other)),
            _ => Err(ReceiptError::Comparison(format!(
                "cannot order {:?} value against {:?} value",
                self.kind(),
                other.kind()
            ))),
        }
    }
}

impl fmt::Display for EventValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hour(at) => write!(f, "{}", at.format("%Y-%m-%dT%H:%M:%SZ")),
            Self::Zipcode { day, code } => write!(f, "{} {}", code, day.format("%Y-%m-%d")),
        }
    }
}

/// Zero minutes, seconds and sub-seconds.
pub fn truncate_to_hour(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}
