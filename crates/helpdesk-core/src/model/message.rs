//! Thread messages and their deterministic ordering.
//!
//! A thread is append-only: entries are never removed or reordered. The
//! exposed order is ascending `(timestamp_us, seq)`. Timestamps are
//! assigned by whichever party appends and can collide under concurrent
//! writers, so the store's write-sequence number is the secondary key —
//! never arrival order at a given console, which is not globally
//! consistent.

use serde::{Deserialize, Serialize};

/// One entry in a ticket's conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Display name of the speaker.
    pub author: String,
    /// Body content.
    pub text: String,
    /// Writer-assigned creation time, microseconds since Unix epoch.
    pub timestamp_us: u64,
    /// Store write-sequence number within the ticket; the tie-break for
    /// identical timestamps. Strictly increasing per thread.
    pub seq: u64,
}

impl Message {
    /// The deterministic thread sort key.
    #[must_use]
    pub const fn sort_key(&self) -> (u64, u64) {
        (self.timestamp_us, self.seq)
    }
}

/// Restore the canonical order after an append.
///
/// Stable sort, so entries with fully equal keys (impossible once the
/// store has assigned unique `seq` values) keep their relative order.
pub fn sort_thread(thread: &mut [Message]) {
    thread.sort_by_key(Message::sort_key);
}

/// Whether `thread` is already in canonical order.
#[must_use]
pub fn is_thread_ordered(thread: &[Message]) -> bool {
    thread.windows(2).all(|w| w[0].sort_key() <= w[1].sort_key())
}
