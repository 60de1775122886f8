//! Bounded per-channel log with stable cursors and replay.
//!
//! One writer (`append`, via [`crate::hub::Hub::publish`]) and many
//! concurrent readers (`replay`) share a [`parking_lot::RwLock`]-guarded
//! deque — append takes the write lock only long enough to push/evict,
//! replay takes the read lock only long enough to clone the slice it
//! returns, so readers see a consistent snapshot of the buffer at the
//! instant they acquired the lock.

use std::collections::VecDeque;

use parking_lot::RwLock;

use crate::cursor::Cursor;
use crate::message::{HubMessage, MessageMetadata};

#[derive(Debug, Clone)]
pub struct ReplayResult {
    /// The cursor the caller should remember as "fully replayed through".
    /// `None` when the reply was truncated to "everything retained".
    pub from_cursor: Option<Cursor>,
    pub messages: Vec<HubMessage>,
    pub last_cursor: Option<Cursor>,
    pub has_more: bool,
    pub truncated: bool,
}

struct Inner {
    entries: VecDeque<HubMessage>,
    next_sequence: u64,
}

pub struct RingBuffer {
    capacity: usize,
    inner: RwLock<Inner>,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: RwLock::new(Inner {
                entries: VecDeque::with_capacity(capacity.max(1)),
                next_sequence: 1,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a new message, assigning it the next cursor, evicting the
    /// oldest entry if the buffer is full. O(1) amortised.
    pub fn append(
        &self,
        channel: String,
        event_type: String,
        payload: serde_json::Value,
        metadata: Option<MessageMetadata>,
    ) -> HubMessage {
        let mut inner = self.inner.write();
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        let cursor = Cursor::now(sequence);
        let message = HubMessage::new(channel, event_type, payload, cursor, metadata);

        if inner.entries.len() >= self.capacity {
            inner.entries.pop_front();
        }
        inner.entries.push_back(message.clone());
        message
    }

    pub fn latest(&self) -> Option<Cursor> {
        self.inner.read().entries.back().map(|m| m.cursor)
    }

    fn has_evicted(inner: &Inner) -> bool {
        (inner.next_sequence.saturating_sub(1)) as usize > inner.entries.len()
    }

    /// Replay entries strictly after `from_cursor`, or everything
    /// retained if `from_cursor` is `None` or refers to an evicted
    /// range. Callers are responsible for resolving cursor expiry
    /// (see [`crate::hub::Hub::subscribe`]) before calling this — an
    /// expired cursor should be passed in as `None`.
    pub fn replay(&self, from_cursor: Option<Cursor>, limit: Option<usize>) -> ReplayResult {
        let inner = self.inner.read();
        let evicted = Self::has_evicted(&inner);
        let oldest_retained = inner.entries.front().map(|m| m.cursor.sequence);

        let Some(cursor) = from_cursor else {
            let mut messages: Vec<_> = inner.entries.iter().cloned().collect();
            let has_more = match limit {
                Some(l) if messages.len() > l => {
                    messages.truncate(l);
                    true
                }
                _ => false,
            };
            let last_cursor = messages.last().map(|m| m.cursor);
            return ReplayResult {
                from_cursor: None,
                last_cursor,
                has_more,
                truncated: evicted,
                messages,
            };
        };

        let covers_evicted_range = match oldest_retained {
            Some(oldest) => cursor.sequence < oldest,
            None => evicted, // buffer drained to empty after eviction
        };

        if covers_evicted_range {
            let messages: Vec<_> = inner.entries.iter().cloned().collect();
            let last_cursor = messages.last().map(|m| m.cursor);
            return ReplayResult {
                from_cursor: None,
                last_cursor,
                has_more: false,
                truncated: true,
                messages,
            };
        }

        let latest_seq = inner.entries.back().map(|m| m.cursor.sequence).unwrap_or(0);
        if cursor.sequence >= latest_seq {
            // Open question (a): sinceCursor newer than latest() — no
            // missed messages, caller's subscription advances to latest.
            return ReplayResult {
                from_cursor: Some(cursor),
                last_cursor: inner.entries.back().map(|m| m.cursor),
                has_more: false,
                truncated: false,
                messages: Vec::new(),
            };
        }

        let mut matching: Vec<HubMessage> = inner
            .entries
            .iter()
            .filter(|m| m.cursor.sequence > cursor.sequence)
            .cloned()
            .collect();

        let has_more = match limit {
            Some(l) if matching.len() > l => {
                matching.truncate(l);
                true
            }
            _ => false,
        };

        let last_cursor = matching.last().map(|m| m.cursor).or(Some(cursor));
        ReplayResult {
            from_cursor: Some(cursor),
            last_cursor,
            has_more,
            truncated: false,
            messages: matching,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
