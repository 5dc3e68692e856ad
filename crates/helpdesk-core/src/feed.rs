//! The change feed: an unbounded, cancellable sequence of incremental
//! ticket updates.
//!
//! The external store's real-time snapshot callback generalises here to a
//! pull-based subscription: the store pushes [`ChangeEvent`]s into a
//! per-subscriber channel, and the consumer drains them with
//! [`Subscription::recv`]. Unsubscribing is a [`CancellationToken`]
//! cancel — safe to call at any time, including between two `recv` calls
//! in the consuming loop, and nothing is delivered afterwards.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::model::ticket::TicketFields;
use crate::store::TicketDoc;

/// What changed for a single ticket, relative to this subscription's
/// predicate scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// The ticket entered the subscription's scope (including the initial
    /// snapshot, which is delivered as a run of `Added` events).
    Added,
    /// The ticket changed while in scope.
    Modified,
    /// The ticket left the subscription's scope or was removed upstream.
    Removed,
}

/// One incremental update delivered by the change feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// The ticket snapshot after the change (for `Removed`, the last
    /// snapshot observed before it left scope).
    pub doc: TicketDoc,
}

/// Server-side filter scoping which tickets a console observes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum TicketPredicate {
    /// Every ticket (admin console view).
    All,
    /// Tickets not yet resolved (work queue view).
    Unresolved,
    /// Tickets currently held by one staff identity ("mine" view).
    AssignedTo(String),
}

impl TicketPredicate {
    /// Whether `fields` falls inside this predicate's scope.
    #[must_use]
    pub fn matches(&self, fields: &TicketFields) -> bool {
        match self {
            Self::All => true,
            Self::Unresolved => !fields.resolved,
            Self::AssignedTo(staff_id) => fields.assignee_id.as_deref() == Some(staff_id),
        }
    }
}

/// Cloneable handle that can cancel a subscription from anywhere.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    token: CancellationToken,
}

impl SubscriptionHandle {
    /// Cancel the subscription. Idempotent.
    pub fn unsubscribe(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

/// A live subscription to the change feed.
///
/// Produced by `TicketStore::subscribe`. The store keeps feeding events
/// until the subscription is cancelled or the store itself goes away.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
    token: CancellationToken,
}

impl Subscription {
    /// Pair a fresh channel with a cancellation token. Store-internal;
    /// consumers obtain subscriptions from `TicketStore::subscribe`.
    #[must_use]
    pub(crate) fn new(
        rx: mpsc::UnboundedReceiver<ChangeEvent>,
        token: CancellationToken,
    ) -> Self {
        Self { rx, token }
    }

    /// Receive the next change event.
    ///
    /// Returns `None` once the subscription has been cancelled or the
    /// store dropped its sender. After cancellation nothing is delivered,
    /// even events that were already queued.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        if self.token.is_cancelled() {
            return None;
        }
        // Cancellation wins when both arms are ready, so a cancel racing
        // an already-queued event still delivers nothing.
        tokio::select! {
            biased;
            () = self.token.cancelled() => None,
            event = self.rx.recv() => event,
        }
    }

    /// Cancel this subscription in place. Queued events are discarded;
    /// the next `recv` returns `None`.
    pub fn unsubscribe(&mut self) {
        self.token.cancel();
        self.rx.close();
    }

    /// A cloneable cancel handle, e.g. for shutting the feed down from a
    /// task that doesn't own the receiver.
    #[must_use]
    pub fn handle(&self) -> SubscriptionHandle {
        SubscriptionHandle {
            token: self.token.clone(),
        }
    }
}
