//! The live ticket registry.
//!
//! [`TicketRegistry`] is the pure reconciliation state: it folds change
//! events into a consistent map keyed by ticket id, using the per-ticket
//! revision as the last-modified marker. Applying the same event twice,
//! or events out of order, converges on the same state — the feed is
//! allowed to duplicate and reorder.
//!
//! [`LiveRegistry`] wires a registry to a store subscription: a tokio
//! task drains the feed and publishes the ordered view through a watch
//! channel, so consumers always see the current order without touching
//! the reconciliation state.
//!
//! Exposed order: most-recent-thread-activity descending, recomputed on
//! every applied update. Ticket id breaks activity ties so every console
//! renders the same order.

use std::cmp::Reverse;
use std::collections::HashMap;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::TicketError;
use crate::feed::{ChangeEvent, ChangeKind, SubscriptionHandle, TicketPredicate};
use crate::model::ticket::TicketId;
use crate::store::{TicketDoc, TicketStore};

/// Reconciliation state for one console's view of the ticket collection.
#[derive(Debug, Default)]
pub struct TicketRegistry {
    entries: HashMap<TicketId, TicketDoc>,
    /// Tombstones: id → revision at removal. A stale `Modified` arriving
    /// after a `Removed` must not resurrect the ticket; a strictly newer
    /// one means it re-entered scope.
    removed: HashMap<TicketId, u64>,
}

impl TicketRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one feed event into the registry.
    ///
    /// Returns `true` iff the visible state changed. Malformed events
    /// (empty id, zero revision, structurally broken document) are
    /// logged and dropped rather than corrupting the view.
    pub fn apply(&mut self, event: &ChangeEvent) -> bool {
        let doc = &event.doc;
        if doc.revision == 0 || !doc.fields.is_well_formed() {
            tracing::warn!(
                ticket = %doc.fields.id,
                revision = doc.revision,
                kind = ?event.kind,
                "dropping malformed feed event"
            );
            return false;
        }
        let id = doc.id();

        match event.kind {
            ChangeKind::Added | ChangeKind::Modified => {
                if let Some(&removed_at) = self.removed.get(id) {
                    if doc.revision <= removed_at {
                        return false;
                    }
                    self.removed.remove(id);
                }
                match self.entries.get(id) {
                    Some(existing) if existing.revision >= doc.revision => false,
                    _ => {
                        self.entries.insert(id.clone(), doc.clone());
                        true
                    }
                }
            }
            ChangeKind::Removed => {
                if self.removed.get(id).is_some_and(|&at| at >= doc.revision) {
                    return false;
                }
                // A removal can race a newer modification; only drop the
                // entry if the removal is at least as recent.
                if self
                    .entries
                    .get(id)
                    .is_some_and(|existing| existing.revision > doc.revision)
                {
                    return false;
                }
                self.removed.insert(id.clone(), doc.revision);
                self.entries.remove(id).is_some()
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &TicketId) -> Option<&TicketDoc> {
        self.entries.get(id)
    }

    /// The full view, most recently active ticket first.
    #[must_use]
    pub fn ordered(&self) -> Vec<TicketDoc> {
        let mut docs: Vec<TicketDoc> = self.entries.values().cloned().collect();
        docs.sort_by_key(|doc| {
            (
                Reverse(doc.fields.last_activity_us()),
                doc.fields.id.clone(),
            )
        });
        docs
    }
}

/// A registry kept current by a background feed pump.
pub struct LiveRegistry {
    view_rx: watch::Receiver<Vec<TicketDoc>>,
    handle: SubscriptionHandle,
    pump: JoinHandle<Result<(), TicketError>>,
}

impl LiveRegistry {
    /// Subscribe to `store` and start the pump task.
    pub async fn spawn<S: TicketStore + ?Sized>(
        store: &S,
        predicate: TicketPredicate,
    ) -> Result<Self, TicketError> {
        let mut subscription = store.subscribe(predicate).await?;
        let handle = subscription.handle();
        let (view_tx, view_rx) = watch::channel(Vec::new());

        let pump = tokio::spawn(async move {
            let mut registry = TicketRegistry::new();
            let handle = subscription.handle();
            while let Some(event) = subscription.recv().await {
                if registry.apply(&event) {
                    // Receivers may all be gone; the pump still drains the
                    // feed until unsubscribed.
                    let _ = view_tx.send(registry.ordered());
                }
            }
            // recv returning None with the subscription still active
            // means the store dropped the feed, not an unsubscribe.
            if handle.is_active() {
                tracing::warn!("change feed closed while still subscribed");
                return Err(TicketError::FeedClosed {
                    detail: "store dropped the feed while the subscription was active"
                        .to_string(),
                });
            }
            tracing::debug!("registry feed ended");
            Ok(())
        });

        Ok(Self {
            view_rx,
            handle,
            pump,
        })
    }

    /// The current ordered view.
    #[must_use]
    pub fn view(&self) -> Vec<TicketDoc> {
        self.view_rx.borrow().clone()
    }

    /// A watch receiver over the ordered view, for consumers that want
    /// to await changes instead of polling.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Vec<TicketDoc>> {
        self.view_rx.clone()
    }

    /// Cancel handle for the underlying subscription.
    #[must_use]
    pub fn subscription(&self) -> SubscriptionHandle {
        self.handle.clone()
    }

    /// Unsubscribe and stop the pump. When this returns, no further view
    /// updates will be published.
    ///
    /// Reports [`TicketError::FeedClosed`] if the feed had already ended
    /// while the subscription was still active, and
    /// [`TicketError::Internal`] if the pump task itself failed.
    pub async fn shutdown(self) -> Result<(), TicketError> {
        self.handle.unsubscribe();
        match self.pump.await {
            Ok(outcome) => outcome,
            Err(err) => Err(TicketError::Internal {
                detail: format!("registry pump task failed: {err}"),
            }),
        }
    }
}
