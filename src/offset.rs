//! # Offset Model
//!
//! Value types describing how far consumption has progressed through an
//! addressable source. A [`Resumable`] pairs the source identity
//! ([`Addressable`]) with its position ([`Offset`]) and is the value handed from
//! the pipeline to the completion handler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Identity of a resumable source: a file name, a `topic/partition` key, etc.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Addressable(String);

impl Addressable {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Address a file by its name relative to the polled directory
    pub fn file(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Address a single partition of a topic
    pub fn partition(topic: &str, partition: i32) -> Self {
        Self(format!("{topic}/{partition}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Addressable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Addressable {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Addressable {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The concrete position carried by an [`Offset`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OffsetValue {
    /// Log offset or byte position
    Sequence(u64),
    /// Modification or event time
    Timestamp(DateTime<Utc>),
    /// Cursor token with no defined ordering
    Opaque(String),
}

impl fmt::Display for OffsetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OffsetValue::Sequence(n) => write!(f, "{n}"),
            OffsetValue::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            OffsetValue::Opaque(token) => f.write_str(token),
        }
    }
}

/// An immutable consumption position.
///
/// Sequence and timestamp offsets are totally ordered against offsets of the
/// same kind. Distinct opaque offsets, and offsets of different kinds, are
/// unordered: `partial_cmp` returns `None` for them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Offset(OffsetValue);

impl Offset {
    pub fn sequence(value: u64) -> Self {
        Self(OffsetValue::Sequence(value))
    }

    pub fn timestamp(value: DateTime<Utc>) -> Self {
        Self(OffsetValue::Timestamp(value))
    }

    pub fn opaque(token: impl Into<String>) -> Self {
        Self(OffsetValue::Opaque(token.into()))
    }

    pub fn value(&self) -> &OffsetValue {
        &self.0
    }

    /// Whether this offset can be compared against `other`
    pub fn is_ordered_with(&self, other: &Offset) -> bool {
        self.partial_cmp(other).is_some()
    }
}

impl PartialOrd for Offset {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (&self.0, &other.0) {
            (OffsetValue::Sequence(a), OffsetValue::Sequence(b)) => Some(a.cmp(b)),
            (OffsetValue::Timestamp(a), OffsetValue::Timestamp(b)) => Some(a.cmp(b)),
            _ if self == other => Some(Ordering::Equal),
            _ => None,
        }
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An [`Addressable`] together with the last offset reached for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resumable {
    addressable: Addressable,
    last_offset: Offset,
}

impl Resumable {
    pub fn new(addressable: impl Into<Addressable>, last_offset: Offset) -> Self {
        Self {
            addressable: addressable.into(),
            last_offset,
        }
    }

    pub fn addressable(&self) -> &Addressable {
        &self.addressable
    }

    pub fn last_offset(&self) -> &Offset {
        &self.last_offset
    }

    pub fn into_parts(self) -> (Addressable, Offset) {
        (self.addressable, self.last_offset)
    }

    /// Encode for attachment to unit-of-work metadata
    pub fn to_header(&self) -> serde_json::Value {
        // Serializing plain strings, numbers and RFC 3339 timestamps cannot fail
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Decode from unit-of-work metadata, `None` when the value is not a resumable
    pub fn from_header(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

impl fmt::Display for Resumable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.addressable, self.last_offset)
    }
}
