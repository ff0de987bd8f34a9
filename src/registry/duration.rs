//! Share lifetimes offered to the user.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

const HOUR_SECS: u64 = 3600;
const DAY_SECS: u64 = 86_400;

/// Error for unrecognised lifetime labels
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown share duration '{0}' (expected one of 1h, 6h, 12h, 24h, 48h, 72h, 7d, 30d)")]
pub struct DurationParseError(pub String);

/// How long a share stays visible after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShareDuration {
    #[serde(rename = "1h")]
    Hours1,
    #[serde(rename = "6h")]
    Hours6,
    #[serde(rename = "12h")]
    Hours12,
    #[default]
    #[serde(rename = "24h")]
    Hours24,
    #[serde(rename = "48h")]
    Hours48,
    #[serde(rename = "72h")]
    Hours72,
    #[serde(rename = "7d")]
    Days7,
    #[serde(rename = "30d")]
    Days30,
}

impl ShareDuration {
    pub const ALL: [ShareDuration; 8] = [
        ShareDuration::Hours1,
        ShareDuration::Hours6,
        ShareDuration::Hours12,
        ShareDuration::Hours24,
        ShareDuration::Hours48,
        ShareDuration::Hours72,
        ShareDuration::Days7,
        ShareDuration::Days30,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ShareDuration::Hours1 => "1h",
            ShareDuration::Hours6 => "6h",
            ShareDuration::Hours12 => "12h",
            ShareDuration::Hours24 => "24h",
            ShareDuration::Hours48 => "48h",
            ShareDuration::Hours72 => "72h",
            ShareDuration::Days7 => "7d",
            ShareDuration::Days30 => "30d",
        }
    }

    /// `(expire_time, expire_unit_seconds)` as sent to the upload endpoint.
    pub fn expire_pair(&self) -> (u64, u64) {
        match self {
            ShareDuration::Hours1 => (1, HOUR_SECS),
            ShareDuration::Hours6 => (6, HOUR_SECS),
            ShareDuration::Hours12 => (12, HOUR_SECS),
            ShareDuration::Hours24 => (24, HOUR_SECS),
            ShareDuration::Hours48 => (48, HOUR_SECS),
            ShareDuration::Hours72 => (72, HOUR_SECS),
            ShareDuration::Days7 => (7, DAY_SECS),
            ShareDuration::Days30 => (30, DAY_SECS),
        }
    }

    pub fn as_seconds(&self) -> u64 {
        let (n, unit) = self.expire_pair();
        n * unit
    }

    pub fn as_chrono(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.as_seconds() as i64)
    }

    /// Long form for messages, e.g. "24 hours" or "7 days".
    pub fn describe(&self) -> String {
        let (n, unit) = self.expire_pair();
        let noun = if unit == DAY_SECS { "day" } else { "hour" };
        if n == 1 {
            format!("{} {}", n, noun)
        } else {
            format!("{} {}s", n, noun)
        }
    }
}

impl FromStr for ShareDuration {
    type Err = DurationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|d| d.label() == wanted)
            .ok_or_else(|| DurationParseError(s.to_string()))
    }
}

impl std::fmt::Display for ShareDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
