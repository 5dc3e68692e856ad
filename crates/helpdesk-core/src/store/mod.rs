//! The external persistent-store contract.
//!
//! The store is the single source of truth and sole owner of ticket
//! state. Every in-process copy is a read-through cache replaced by the
//! change feed, never authoritative. All mutation goes through this
//! trait: conditional (compare-and-swap) writes for assignment
//! transitions, plain appends for thread writes (appends are
//! commutative-safe, no CAS needed).
//!
//! # Module layout
//!
//! - [`TicketStore`] — the async contract (this module).
//! - [`memory`] — [`MemoryStore`], the in-process reference
//!   implementation used by tests and the simulation harness.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TicketError;
use crate::feed::{Subscription, TicketPredicate};
use crate::model::identity::Identity;
use crate::model::message::Message;
use crate::model::ticket::{TicketFields, TicketId};

/// A ticket snapshot plus its last-modified marker.
///
/// `revision` increases by exactly one on every committed write to the
/// ticket, which makes feed reconciliation idempotent: a consumer that
/// has already applied revision `n` ignores any event carrying `<= n`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDoc {
    pub fields: TicketFields,
    pub revision: u64,
}

impl TicketDoc {
    #[must_use]
    pub const fn id(&self) -> &TicketId {
        &self.fields.id
    }
}

/// Expected current assignment for a compare-and-swap write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentGuard {
    /// The assignee field must be empty.
    Unassigned,
    /// The ticket must currently be held by this staff id.
    HeldBy(String),
}

/// The new assignment state a successful conditional write establishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentChange {
    /// Bind the ticket to this staff id.
    Assign(String),
    /// Clear the assignee.
    Release,
    /// Mark resolved. The assignee stays bound; resolution freezes it.
    Resolve,
}

/// Async contract exposed by the external document store.
///
/// Implementations must execute `conditional_update` atomically with
/// respect to concurrent writers: when two consoles race a claim, at
/// most one guard match succeeds and the loser observes
/// [`TicketError::Conflict`].
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Create a ticket. The store assigns the id, seeds the thread with
    /// message 0 (the description), and the ticket starts Unassigned.
    async fn create_ticket(
        &self,
        title: &str,
        opened_by: &Identity,
        first_message: &str,
        attachments: Vec<String>,
    ) -> Result<TicketDoc, TicketError>;

    /// Read the current snapshot of one ticket. Idempotent; the only
    /// operation the layers above may retry on transient failure.
    async fn fetch(&self, id: &TicketId) -> Result<TicketDoc, TicketError>;

    /// Compare-and-swap assignment write backing claim/release/resolve.
    ///
    /// Succeeds only if the stored assignment matches `expected` and the
    /// ticket is not resolved; otherwise fails with `Conflict` without
    /// modifying anything.
    async fn conditional_update(
        &self,
        id: &TicketId,
        expected: &AssignmentGuard,
        change: &AssignmentChange,
    ) -> Result<TicketDoc, TicketError>;

    /// Append one message to the thread. Pure append — prior entries are
    /// never mutated or reordered. The store assigns the write-sequence
    /// number; `timestamp_us` is the writer's clock.
    async fn append_message(
        &self,
        id: &TicketId,
        author: &Identity,
        text: &str,
        timestamp_us: u64,
    ) -> Result<Message, TicketError>;

    /// Subscribe to the change feed scoped by `predicate`: an initial
    /// snapshot delivered as `Added` events, then incremental updates
    /// until the subscription is cancelled.
    async fn subscribe(&self, predicate: TicketPredicate) -> Result<Subscription, TicketError>;
}

/// Current wall-clock time in microseconds since the Unix epoch.
#[must_use]
pub fn now_us() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_micros()).unwrap_or(0)
}
