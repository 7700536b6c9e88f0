//! Comparable property values reported by data cells.
//!
//! Sorting and filtering never look at a resource directly; they ask each
//! cell for a [`ComparableValue`] and compare those. The set of value kinds
//! is closed so a comparison between two different kinds is a reportable
//! error instead of a crash.

#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CompareError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ComparableValue {
    /// Lexicographic order, substring matching.
    String(String),
    Int(i64),
    /// Ordered by Unix seconds.
    Time(DateTime<Utc>),
    /// Timestamp kept as its raw RFC 3339 string. Values that fail to parse
    /// fall back to plain string order so they still sort deterministically.
    Rfc3339(String),
}

impl ComparableValue {
    pub fn string(s: impl Into<String>) -> Self { Self::String(s.into()) }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Int(_) => "int",
            Self::Time(_) => "time",
            Self::Rfc3339(_) => "rfc3339",
        }
    }

    /// Total comparison between two values of the same kind.
    pub fn compare(&self, other: &ComparableValue) -> Result<Ordering, CompareError> {
        match (self, other) {
            (Self::String(a), Self::String(b)) => Ok(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) => Ok(a.cmp(b)),
            (Self::Time(a), Self::Time(b)) => Ok(a.timestamp().cmp(&b.timestamp())),
            (Self::Rfc3339(a), Self::Rfc3339(b)) => {
                match (DateTime::parse_from_rfc3339(a), DateTime::parse_from_rfc3339(b)) {
                    (Ok(ta), Ok(tb)) => Ok(ta.timestamp().cmp(&tb.timestamp())),
                    _ => Ok(a.cmp(b)),
                }
            }
            _ => Err(self.mismatch(other)),
        }
    }

    /// Filter predicate. Strings match by substring; every other kind
    /// matches by equality. Filter values arrive as strings, so a string
    /// needle against a non-string value matches against its rendered form.
    pub fn contains(&self, other: &ComparableValue) -> Result<bool, CompareError> {
        match (self, other) {
            (Self::String(a), Self::String(b)) => Ok(a.contains(b.as_str())),
            (Self::Int(_) | Self::Time(_) | Self::Rfc3339(_), Self::String(needle)) => {
                Ok(self.to_string().contains(needle.as_str()))
            }
            _ => self.compare(other).map(|o| o == Ordering::Equal),
        }
    }

    fn mismatch(&self, other: &ComparableValue) -> CompareError {
        CompareError::Mismatch { left: self.kind_name(), right: other.kind_name() }
    }
}

impl fmt::Display for ComparableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) | Self::Rfc3339(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Time(t) => f.write_str(&t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
        }
    }
}

impl From<&str> for ComparableValue {
    fn from(s: &str) -> Self { Self::String(s.to_string()) }
}

impl From<String> for ComparableValue {
    fn from(s: String) -> Self { Self::String(s) }
}

impl From<i64> for ComparableValue {
    fn from(i: i64) -> Self { Self::Int(i) }
}

impl From<DateTime<Utc>> for ComparableValue {
    fn from(t: DateTime<Utc>) -> Self { Self::Time(t) }
}
