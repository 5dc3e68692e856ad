//! Appending to a ticket's conversation thread.
//!
//! A pure append: prior entries are never mutated or reordered, and the
//! store assigns the write-sequence number that breaks timestamp ties.
//! The only policy decision at this layer is whether replies are still
//! accepted once the ticket is Resolved.

use std::sync::Arc;

use crate::config::{RetryConfig, ThreadPolicy};
use crate::error::TicketError;
use crate::model::identity::Identity;
use crate::model::message::Message;
use crate::model::ticket::{TicketId, TicketState};
use crate::retry::fetch_with_retry;
use crate::store::{TicketStore, now_us};

/// Appends messages on behalf of one console.
pub struct ThreadWriter<S: TicketStore + ?Sized> {
    store: Arc<S>,
    policy: ThreadPolicy,
    retry: RetryConfig,
}

impl<S: TicketStore + ?Sized> Clone for ThreadWriter<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: self.policy,
            retry: self.retry,
        }
    }
}

impl<S: TicketStore + ?Sized> ThreadWriter<S> {
    pub fn new(store: Arc<S>, policy: ThreadPolicy, retry: RetryConfig) -> Self {
        Self {
            store,
            policy,
            retry,
        }
    }

    /// Append a reply, stamping it with the writer's clock.
    pub async fn append(
        &self,
        id: &TicketId,
        author: &Identity,
        text: &str,
    ) -> Result<Message, TicketError> {
        self.append_at(id, author, text, now_us()).await
    }

    /// Append with an explicit writer timestamp. Timestamps only need to
    /// be the writer's honest clock; ordering ties are broken by the
    /// store's write sequence.
    pub async fn append_at(
        &self,
        id: &TicketId,
        author: &Identity,
        text: &str,
        timestamp_us: u64,
    ) -> Result<Message, TicketError> {
        let current = fetch_with_retry(self.store.as_ref(), id, &self.retry).await?;
        if current.fields.resolved && !self.policy.allow_post_resolution_reply {
            return Err(TicketError::InvalidState {
                ticket_id: id.clone(),
                action: "append",
                state: TicketState::Resolved,
            });
        }
        self.store
            .append_message(id, author, text, timestamp_us)
            .await
    }
}
