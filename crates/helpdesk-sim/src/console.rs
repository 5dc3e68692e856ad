//! A simulated staff console.
//!
//! Each console owns its own coordinator, thread writer, and list view
//! over a shared store, exactly the surfaces a real console session
//! holds. Every operation outcome is tallied so the oracle can account
//! for races after the fact.

use std::sync::Arc;

use helpdesk_core::{
    AssignmentCoordinator, CoreConfig, Identity, MemoryStore, Role, ThreadWriter,
    TicketDoc, TicketError, TicketId, TicketList,
};
use serde::{Deserialize, Serialize};

/// Per-console tally of operation outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleStats {
    pub claims_won: u64,
    pub claims_lost: u64,
    pub invalid_states: u64,
    pub releases: u64,
    pub resolves: u64,
    pub replies: u64,
    pub replies_denied: u64,
    pub unexpected_errors: u64,
}

impl ConsoleStats {
    /// Merge another console's tally into this one.
    pub fn absorb(&mut self, other: &Self) {
        self.claims_won += other.claims_won;
        self.claims_lost += other.claims_lost;
        self.invalid_states += other.invalid_states;
        self.releases += other.releases;
        self.resolves += other.resolves;
        self.replies += other.replies;
        self.replies_denied += other.replies_denied;
        self.unexpected_errors += other.unexpected_errors;
    }
}

/// One staff member's console session against the shared store.
pub struct StaffConsole {
    identity: Identity,
    coordinator: AssignmentCoordinator<MemoryStore>,
    writer: ThreadWriter<MemoryStore>,
    list: TicketList,
    stats: ConsoleStats,
}

impl StaffConsole {
    #[must_use]
    pub fn new(store: &Arc<MemoryStore>, index: usize, config: &CoreConfig) -> Self {
        let identity = Identity::new(
            format!("staff-{index}"),
            format!("Staff {index}"),
            Role::Staff,
        );
        Self {
            identity,
            coordinator: AssignmentCoordinator::new(Arc::clone(store), config.retry),
            writer: ThreadWriter::new(Arc::clone(store), config.thread, config.retry),
            list: TicketList::new(&config.preview),
            stats: ConsoleStats::default(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.identity.id
    }

    #[must_use]
    pub const fn stats(&self) -> &ConsoleStats {
        &self.stats
    }

    /// Race to claim `id`. Returns `true` iff this console won.
    pub async fn try_claim(&mut self, id: &TicketId) -> bool {
        match self.coordinator.claim(id, &self.identity).await {
            Ok(_) => {
                self.stats.claims_won += 1;
                true
            }
            Err(TicketError::Conflict { .. }) => {
                self.stats.claims_lost += 1;
                false
            }
            Err(TicketError::InvalidState { .. }) => {
                self.stats.invalid_states += 1;
                false
            }
            Err(err) => {
                tracing::warn!(console = %self.identity.id, ticket = %id, "claim error: {err}");
                self.stats.unexpected_errors += 1;
                false
            }
        }
    }

    /// Release a held ticket back to the pool.
    pub async fn release(&mut self, id: &TicketId) {
        match self.coordinator.release(id, &self.identity).await {
            Ok(_) => self.stats.releases += 1,
            Err(TicketError::Conflict { .. } | TicketError::InvalidState { .. }) => {
                self.stats.invalid_states += 1;
            }
            Err(err) => {
                tracing::warn!(console = %self.identity.id, ticket = %id, "release error: {err}");
                self.stats.unexpected_errors += 1;
            }
        }
    }

    /// Resolve a held ticket.
    pub async fn resolve(&mut self, id: &TicketId) {
        match self.coordinator.resolve(id, &self.identity).await {
            Ok(_) => self.stats.resolves += 1,
            Err(TicketError::Conflict { .. } | TicketError::InvalidState { .. }) => {
                self.stats.invalid_states += 1;
            }
            Err(err) => {
                tracing::warn!(console = %self.identity.id, ticket = %id, "resolve error: {err}");
                self.stats.unexpected_errors += 1;
            }
        }
    }

    /// Append a reply to a ticket's thread.
    pub async fn reply(&mut self, id: &TicketId, text: &str) {
        match self.writer.append(id, &self.identity, text).await {
            Ok(_) => self.stats.replies += 1,
            Err(TicketError::InvalidState { .. }) => self.stats.replies_denied += 1,
            Err(err) => {
                tracing::warn!(console = %self.identity.id, ticket = %id, "reply error: {err}");
                self.stats.unexpected_errors += 1;
            }
        }
    }

    /// Flip this console between preview and full listing.
    pub const fn toggle_view(&mut self) {
        self.list.toggle();
    }

    #[must_use]
    pub const fn list(&self) -> &TicketList {
        &self.list
    }

    /// The tickets this console currently renders from a live view.
    #[must_use]
    pub fn visible<'a>(&self, view: &'a [TicketDoc]) -> &'a [TicketDoc] {
        self.list.display(view)
    }
}
