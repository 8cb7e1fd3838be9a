//! Anchor departure time shared by every route of one response

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

use crate::core::error::{Error, Result};

/// Naive (zone-less) formats accepted in addition to RFC 3339
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Reference departure instant, expressed as local wall-clock time the way the
/// duration oracle expects it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AnchorTime(NaiveDateTime);

impl AnchorTime {
    pub fn new(at: NaiveDateTime) -> Self {
        Self(at)
    }

    /// Current local wall-clock time
    pub fn now() -> Self {
        Self(Local::now().naive_local())
    }

    /// Parse an ISO-8601 timestamp.
    ///
    /// With an explicit offset the written local time is kept and the offset
    /// dropped. A bare date means midnight.
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Self(dt.naive_local()));
        }

        for format in NAIVE_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(Self(dt));
            }
        }

        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(Self)
            .ok_or_else(|| Error::InvalidAnchorTime(value.to_string()))
    }

    /// Resolve an optional caller value, falling back to now
    pub fn resolve(value: Option<&str>) -> Result<Self> {
        match value {
            Some(v) => Self::parse(v),
            None => Ok(Self::now()),
        }
    }

    /// Departure instant `offset_secs` after the anchor
    pub fn offset_by(&self, offset_secs: u64) -> NaiveDateTime {
        let secs = i64::try_from(offset_secs).unwrap_or(i64::MAX);
        Duration::try_seconds(secs)
            .and_then(|delta| self.0.checked_add_signed(delta))
            .unwrap_or(NaiveDateTime::MAX)
    }

    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl FromStr for AnchorTime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for AnchorTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%S"))
    }
}
