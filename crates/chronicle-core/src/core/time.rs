// crates/chronicle-core/src/core/time.rs
// ============================================================================
// Module: Chronicle Time Model
// Description: Canonical nanosecond-precision timestamps and clock capability.
// Purpose: Provide deterministic, replay-stable time values across Chronicle records.
// Dependencies: serde, thiserror, time
// ============================================================================

//! ## Overview
//! Chronicle embeds explicit timestamps in every envelope to keep replay and
//! hashing deterministic. The canonical wire form is RFC 3339 in UTC with
//! exactly nine fractional digits, so re-encoding a stored timestamp always
//! reproduces the hashed byte sequence. The core never reads wall-clock time
//! directly; deciders receive time through the [`Clock`] capability.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use thiserror::Error;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

// ============================================================================
// SECTION: Canonical Format
// ============================================================================

/// Canonical RFC 3339 layout with exactly nine fractional digits and a `Z`
/// suffix.
const CANONICAL_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]Z"
);

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Timestamp formatting and parsing errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum TimeError {
    /// Timestamp failed to format into the canonical layout.
    #[error("timestamp format failure: {0}")]
    Format(String),
    /// Timestamp string failed to parse from the canonical layout.
    #[error("timestamp parse failure: {0}")]
    Parse(String),
}

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Canonical UTC timestamp with nanosecond precision.
///
/// # Invariants
/// - Always UTC; construction from any offset normalizes to UTC.
/// - The canonical string form re-parses to an identical value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(OffsetDateTime);

impl Timestamp {
    /// Creates a timestamp from an [`OffsetDateTime`], normalizing to UTC.
    #[must_use]
    pub fn new(value: OffsetDateTime) -> Self {
        Self(value.to_offset(time::UtcOffset::UTC))
    }

    /// Creates a timestamp from unix nanoseconds.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::Parse`] when the value is outside the supported range.
    pub fn from_unix_nanos(nanos: i128) -> Result<Self, TimeError> {
        OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .map(Self::new)
            .map_err(|err| TimeError::Parse(err.to_string()))
    }

    /// Returns the timestamp as unix nanoseconds.
    #[must_use]
    pub fn unix_nanos(&self) -> i128 {
        self.0.unix_timestamp_nanos()
    }

    /// Returns the canonical RFC 3339 string with nine fractional digits.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::Format`] when the value cannot be formatted.
    pub fn canonical(&self) -> Result<String, TimeError> {
        self.0.format(CANONICAL_FORMAT).map_err(|err| TimeError::Format(err.to_string()))
    }

    /// Parses a timestamp from the canonical RFC 3339 layout.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::Parse`] when the input does not match the layout.
    pub fn parse_canonical(input: &str) -> Result<Self, TimeError> {
        PrimitiveDateTime::parse(input, CANONICAL_FORMAT)
            .map(|parsed| Self(parsed.assume_utc()))
            .map_err(|err| TimeError::Parse(err.to_string()))
    }

    /// Returns the underlying [`OffsetDateTime`].
    #[must_use]
    pub const fn inner(&self) -> OffsetDateTime {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.canonical() {
            Ok(formatted) => f.write_str(&formatted),
            Err(_) => f.write_str("<unformattable timestamp>"),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let canonical = self.canonical().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&canonical)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse_canonical(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SECTION: Clock Capability
// ============================================================================

/// Clock capability supplying timestamps to deciders and the pipeline.
pub trait Clock {
    /// Returns the current timestamp.
    fn now(&self) -> Timestamp;
}

/// Wall-clock implementation for hosts.
///
/// # Invariants
/// - Produced timestamps are UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(OffsetDateTime::now_utc())
    }
}

/// Fixed clock returning a constant timestamp, for deterministic tests.
///
/// # Invariants
/// - `now` always returns the configured value.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    /// Timestamp returned by every `now` call.
    pub timestamp: Timestamp,
}

impl FixedClock {
    /// Creates a fixed clock at the provided timestamp.
    #[must_use]
    pub const fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.timestamp
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only output and panic-based assertions are permitted."
    )]

    use super::Timestamp;

    #[test]
    fn canonical_round_trip_preserves_nanos() {
        let timestamp = Timestamp::from_unix_nanos(1_700_000_000_000_000_007).expect("timestamp");
        let canonical = timestamp.canonical().expect("canonical");
        let parsed = Timestamp::parse_canonical(&canonical).expect("parse");
        assert_eq!(timestamp, parsed);
        assert_eq!(timestamp.unix_nanos(), parsed.unix_nanos());
    }

    #[test]
    fn canonical_has_nine_fractional_digits() {
        let timestamp = Timestamp::from_unix_nanos(7).expect("timestamp");
        let canonical = timestamp.canonical().expect("canonical");
        assert_eq!(canonical, "1970-01-01T00:00:00.000000007Z");
    }

    #[test]
    fn parse_rejects_missing_fraction() {
        let err = Timestamp::parse_canonical("1970-01-01T00:00:00Z");
        assert!(err.is_err());
    }
}
