//! Opaque, per-channel monotonic position tokens.
//!
//! A [`Cursor`] lets the server change its internal layout (shard id,
//! extra bookkeeping) without client changes: clients only ever see the
//! encoded string, never the fields. `compare` is only meaningful for
//! two cursors drawn from the same channel's ring buffer — comparing
//! cursors from different channels is the caller's mistake to avoid,
//! not something this type can prevent.

use std::cmp::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The reserved cursor meaning "from the beginning of whatever is retained".
pub const ZERO: &str = "0";

/// An opaque monotonic position token. Serializes and deserializes as its
/// encoded string form everywhere — including when embedded in a
/// [`crate::message::HubMessage`] — so the wire never exposes the
/// internal `(sequence, created_at_ms)` layout (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub sequence: u64,
    pub created_at_ms: u64,
}

impl Serialize for Cursor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Cursor::decode(&s).ok_or_else(|| D::Error::custom(format!("invalid cursor: {s}")))
    }
}

impl Cursor {
    /// The sentinel cursor representing "no position yet" / "from the start".
    pub const ORIGIN: Cursor = Cursor {
        sequence: 0,
        created_at_ms: 0,
    };

    pub fn create(sequence: u64, created_at_ms: u64) -> Self {
        Self {
            sequence,
            created_at_ms,
        }
    }

    pub fn now(sequence: u64) -> Self {
        let created_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self::create(sequence, created_at_ms)
    }

    pub fn is_origin(&self) -> bool {
        self.sequence == 0
    }

    /// Lossless encode to the wire representation.
    pub fn encode(&self) -> String {
        if self.is_origin() {
            return ZERO.to_string();
        }
        format!("{:x}.{:x}", self.sequence, self.created_at_ms)
    }

    /// Lossless decode from the wire representation. Returns `None` on
    /// any malformed input — parsing is total, it never panics.
    pub fn decode(s: &str) -> Option<Cursor> {
        if s == ZERO {
            return Some(Cursor::ORIGIN);
        }
        let (seq_part, ts_part) = s.split_once('.')?;
        let sequence = u64::from_str_radix(seq_part, 16).ok()?;
        let created_at_ms = u64::from_str_radix(ts_part, 16).ok()?;
        if sequence == 0 {
            // sequence 0 is reserved for the origin sentinel; any other
            // encoding of it is malformed.
            return None;
        }
        Some(Cursor::create(sequence, created_at_ms))
    }

    /// Total order by `(sequence, created_at_ms)`. Only meaningful for
    /// cursors issued by the same channel's ring buffer.
    pub fn compare(&self, other: &Cursor) -> Ordering {
        (self.sequence, self.created_at_ms).cmp(&(other.sequence, other.created_at_ms))
    }

    pub fn is_expired(&self, horizon_ms: u64) -> bool {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        self.is_expired_at(now_ms, horizon_ms)
    }

    pub fn is_expired_at(&self, now_ms: u64, horizon_ms: u64) -> bool {
        if self.is_origin() {
            return false;
        }
        now_ms.saturating_sub(self.created_at_ms) > horizon_ms
    }
}

impl PartialOrd for Cursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl Ord for Cursor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let c = Cursor::create(42, 1_700_000_000_000);
        let encoded = c.encode();
        assert_eq!(Cursor::decode(&encoded), Some(c));
    }

    #[test]
    fn zero_round_trips_to_origin() {
        assert_eq!(Cursor::decode(ZERO), Some(Cursor::ORIGIN));
        assert_eq!(Cursor::ORIGIN.encode(), ZERO);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_eq!(Cursor::decode("not-a-cursor"), None);
        assert_eq!(Cursor::decode(""), None);
        assert_eq!(Cursor::decode("12.zz"), None);
    }

    #[test]
    fn compare_is_monotonic_under_increasing_sequence() {
        let a = Cursor::create(1, 100);
        let b = Cursor::create(2, 50); // earlier wall-clock, later sequence
        assert_eq!(a.compare(&b), Ordering::Less);
    }

    #[test]
    fn expiry_uses_horizon() {
        let c = Cursor::create(1, 1_000);
        assert!(!c.is_expired_at(1_500, 1_000));
        assert!(c.is_expired_at(5_000, 1_000));
    }

    #[test]
    fn origin_never_expires() {
        assert!(!Cursor::ORIGIN.is_expired_at(u64::MAX, 0));
    }
}
