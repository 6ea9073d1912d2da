//! RFC 3339 timestamps that remember their original spelling
//!
//! Evidence files are rewritten in place, so a `start` of
//! `2024-05-01T10:00:00Z` must come back out as exactly that string rather than
//! chrono's canonical `2024-05-01T10:00:00+00:00`.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// A parsed instant plus the text it was parsed from
#[derive(Debug, Clone)]
pub struct Timestamp {
    raw: String,
    instant: DateTime<FixedOffset>,
}

impl Timestamp {
    /// Parse an RFC 3339 timestamp, keeping the raw text
    pub fn parse(raw: &str) -> Result<Self, chrono::ParseError> {
        let instant = DateTime::parse_from_rfc3339(raw.trim())?;
        Ok(Self {
            raw: raw.to_string(),
            instant,
        })
    }

    /// Current UTC time, second precision, `Z` suffix
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    pub fn from_utc(at: DateTime<Utc>) -> Self {
        let raw = at.to_rfc3339_opts(SecondsFormat::Secs, true);
        Self {
            raw,
            instant: at.fixed_offset(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn instant(&self) -> DateTime<FixedOffset> {
        self.instant
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    // Instant first; spelling only breaks ties so Ord agrees with Eq.
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant
            .cmp(&other.instant)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse(&raw)
            .map_err(|e| de::Error::custom(format!("invalid RFC 3339 timestamp {raw:?}: {e}")))
    }
}
