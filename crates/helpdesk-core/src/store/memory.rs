//! In-process reference implementation of the store contract.
//!
//! `MemoryStore` gives the exact semantics the core relies on from a
//! production document store: atomic compare-and-swap on the assignment
//! fields, per-ticket write-sequence numbers, monotonically increasing
//! revisions, and a predicate-scoped change feed. Tests and the
//! simulation harness run many concurrent consoles against one shared
//! instance.
//!
//! Feed semantics relative to each subscriber's predicate:
//!
//! - ticket enters scope (creation, or a change makes it match) → `Added`
//! - ticket changes while in scope → `Modified`
//! - ticket leaves scope or is removed upstream → `Removed`
//!
//! All mutation and event fan-out happen under one mutex, so every
//! subscriber observes the same totally ordered event sequence.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::TicketError;
use crate::feed::{ChangeEvent, ChangeKind, Subscription, TicketPredicate};
use crate::model::identity::Identity;
use crate::model::message::{Message, sort_thread};
use crate::model::ticket::{TicketFields, TicketId};
use crate::store::{AssignmentChange, AssignmentGuard, TicketDoc, TicketStore, now_us};

use async_trait::async_trait;

struct StoredTicket {
    fields: TicketFields,
    revision: u64,
    /// Next write-sequence number for this ticket's thread.
    next_seq: u64,
}

impl StoredTicket {
    fn doc(&self) -> TicketDoc {
        TicketDoc {
            fields: self.fields.clone(),
            revision: self.revision,
        }
    }
}

struct FeedSubscriber {
    predicate: TicketPredicate,
    tx: mpsc::UnboundedSender<ChangeEvent>,
    token: CancellationToken,
}

struct Inner {
    tickets: HashMap<TicketId, StoredTicket>,
    subscribers: Vec<FeedSubscriber>,
    /// Fault injection: the next N fetches fail with a transient error.
    failing_fetches: u32,
}

/// Shared in-memory ticket store.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                tickets: HashMap::new(),
                subscribers: Vec::new(),
                failing_fetches: 0,
            }),
        }
    }

    /// Make the next `n` fetches fail with a transient error, for
    /// exercising the read-retry path.
    pub fn fail_next_fetches(&self, n: u32) {
        self.inner.lock().failing_fetches = n;
    }

    /// Administrative removal, outside the core contract. Emits `Removed`
    /// to every subscriber that had the ticket in scope.
    pub fn remove(&self, id: &TicketId) -> Option<TicketDoc> {
        let mut inner = self.inner.lock();
        let stored = inner.tickets.remove(id)?;
        let doc = stored.doc();
        Inner::publish(
            &mut inner.subscribers,
            Some(&stored.fields),
            None,
            &doc,
        );
        Some(doc)
    }

    /// Snapshot of every ticket, for ground-truth comparison in tests
    /// and the simulation oracle.
    #[must_use]
    pub fn dump(&self) -> Vec<TicketDoc> {
        let inner = self.inner.lock();
        inner.tickets.values().map(StoredTicket::doc).collect()
    }

    /// Number of live (non-cancelled) feed subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let inner = self.inner.lock();
        inner
            .subscribers
            .iter()
            .filter(|s| !s.token.is_cancelled())
            .count()
    }
}

impl Inner {
    /// Fan one committed write out to every live subscriber, classifying
    /// the event per subscriber against its predicate. `old` is the
    /// fields before the write (`None` for creation), `new` after it
    /// (`None` for upstream removal).
    fn publish(
        subscribers: &mut Vec<FeedSubscriber>,
        old: Option<&TicketFields>,
        new: Option<&TicketFields>,
        doc: &TicketDoc,
    ) {
        subscribers.retain(|sub| {
            if sub.token.is_cancelled() {
                return false;
            }
            let was_in_scope = old.is_some_and(|f| sub.predicate.matches(f));
            let in_scope = new.is_some_and(|f| sub.predicate.matches(f));
            let kind = match (was_in_scope, in_scope) {
                (false, true) => ChangeKind::Added,
                (true, true) => ChangeKind::Modified,
                (true, false) => ChangeKind::Removed,
                (false, false) => return true,
            };
            sub.tx
                .send(ChangeEvent {
                    kind,
                    doc: doc.clone(),
                })
                .is_ok()
        });
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn create_ticket(
        &self,
        title: &str,
        opened_by: &Identity,
        first_message: &str,
        attachments: Vec<String>,
    ) -> Result<TicketDoc, TicketError> {
        let id = TicketId::new(uuid::Uuid::new_v4().to_string());
        let created_at_us = now_us();
        let fields = TicketFields {
            id: id.clone(),
            title: title.to_string(),
            opened_by: opened_by.id.clone(),
            assignee_id: None,
            resolved: false,
            attachments,
            // Creation seeds message 0, the ticket description.
            thread: vec![Message {
                author: opened_by.display_name.clone(),
                text: first_message.to_string(),
                timestamp_us: created_at_us,
                seq: 0,
            }],
            created_at_us,
        };

        let mut inner = self.inner.lock();
        let stored = StoredTicket {
            fields,
            revision: 1,
            next_seq: 1,
        };
        let doc = stored.doc();
        Inner::publish(&mut inner.subscribers, None, Some(&stored.fields), &doc);
        inner.tickets.insert(id, stored);
        tracing::debug!(ticket = %doc.fields.id, "ticket created");
        Ok(doc)
    }

    async fn fetch(&self, id: &TicketId) -> Result<TicketDoc, TicketError> {
        let mut inner = self.inner.lock();
        if inner.failing_fetches > 0 {
            inner.failing_fetches -= 1;
            return Err(TicketError::Transient {
                detail: "injected fetch failure".to_string(),
            });
        }
        inner
            .tickets
            .get(id)
            .map(StoredTicket::doc)
            .ok_or_else(|| TicketError::NotFound {
                ticket_id: id.clone(),
            })
    }

    async fn conditional_update(
        &self,
        id: &TicketId,
        expected: &AssignmentGuard,
        change: &AssignmentChange,
    ) -> Result<TicketDoc, TicketError> {
        let mut inner = self.inner.lock();
        let Inner {
            tickets,
            subscribers,
            ..
        } = &mut *inner;
        let stored = tickets.get_mut(id).ok_or_else(|| TicketError::NotFound {
            ticket_id: id.clone(),
        })?;

        // Resolution freezes assignment: no conditional write touches a
        // resolved ticket, whatever the guard says.
        if stored.fields.resolved {
            return Err(TicketError::Conflict {
                ticket_id: id.clone(),
                reason: "ticket is resolved".to_string(),
            });
        }

        let guard_holds = match expected {
            AssignmentGuard::Unassigned => stored.fields.assignee_id.is_none(),
            AssignmentGuard::HeldBy(staff_id) => {
                stored.fields.assignee_id.as_deref() == Some(staff_id)
            }
        };
        if !guard_holds {
            return Err(TicketError::Conflict {
                ticket_id: id.clone(),
                reason: match &stored.fields.assignee_id {
                    Some(holder) => format!("assignee is {holder}, guard did not match"),
                    None => "ticket is unassigned, guard did not match".to_string(),
                },
            });
        }

        let old = stored.fields.clone();
        match change {
            AssignmentChange::Assign(staff_id) => {
                stored.fields.assignee_id = Some(staff_id.clone());
            }
            AssignmentChange::Release => {
                stored.fields.assignee_id = None;
            }
            AssignmentChange::Resolve => {
                stored.fields.resolved = true;
            }
        }
        stored.revision += 1;
        let doc = stored.doc();
        Inner::publish(subscribers, Some(&old), Some(&stored.fields), &doc);
        tracing::debug!(ticket = %id, revision = doc.revision, "assignment updated");
        Ok(doc)
    }

    async fn append_message(
        &self,
        id: &TicketId,
        author: &Identity,
        text: &str,
        timestamp_us: u64,
    ) -> Result<Message, TicketError> {
        let mut inner = self.inner.lock();
        let Inner {
            tickets,
            subscribers,
            ..
        } = &mut *inner;
        let stored = tickets.get_mut(id).ok_or_else(|| TicketError::NotFound {
            ticket_id: id.clone(),
        })?;

        let message = Message {
            author: author.display_name.clone(),
            text: text.to_string(),
            timestamp_us,
            seq: stored.next_seq,
        };
        stored.next_seq += 1;

        let old = stored.fields.clone();
        stored.fields.thread.push(message.clone());
        sort_thread(&mut stored.fields.thread);
        stored.revision += 1;
        let doc = stored.doc();
        Inner::publish(subscribers, Some(&old), Some(&stored.fields), &doc);
        Ok(message)
    }

    async fn subscribe(&self, predicate: TicketPredicate) -> Result<Subscription, TicketError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();

        let mut inner = self.inner.lock();
        // Initial snapshot as a run of Added events, delivered under the
        // same lock so no concurrent write can interleave or duplicate.
        for stored in inner.tickets.values() {
            if predicate.matches(&stored.fields) {
                let doc = stored.doc();
                let _ = tx.send(ChangeEvent {
                    kind: ChangeKind::Added,
                    doc,
                });
            }
        }
        inner.subscribers.push(FeedSubscriber {
            predicate,
            tx,
            token: token.clone(),
        });
        Ok(Subscription::new(rx, token))
    }
}
