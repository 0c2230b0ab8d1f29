//! Receipt age classification for display after a successful verification.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::event::EventValue;

/// How old a verified event is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Freshness {
    /// Event starts after now.
    Future,
    /// Less than a day old.
    Fresh,
    /// Less than a week old.
    Recent,
    /// A week or older.
    Stale,
}

impl Freshness {
    /// Classify `event` relative to `now`.
    pub fn classify(event: &EventValue, now: DateTime<Utc>) -> Self {
        let age = now.signed_duration_since(event.starts_at());
        if age < Duration::zero() {
            Self::Future
        } else if age < Duration::days(1) {
            Self::Fresh
        } else if age < Duration::days(7) {
            Self::Recent
        } else {
            Self::Stale
        }
    }
}
