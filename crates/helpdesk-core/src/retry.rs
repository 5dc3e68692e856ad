//! Bounded exponential backoff for idempotent store reads.
//!
//! Only re-reads of current state are retried here. The conditional
//! write is issued exactly once per caller intent: blindly re-issuing a
//! compare-and-swap could double-apply under some store semantics, and a
//! losing claimant must be told explicitly rather than silently retried.

use crate::config::RetryConfig;
use crate::error::TicketError;
use crate::model::ticket::TicketId;
use crate::store::{TicketDoc, TicketStore};

/// Fetch with backoff on transient failures; all other outcomes return
/// immediately. Surfaces the last transient error once attempts are
/// exhausted.
pub(crate) async fn fetch_with_retry<S: TicketStore + ?Sized>(
    store: &S,
    id: &TicketId,
    retry: &RetryConfig,
) -> Result<TicketDoc, TicketError> {
    let max_attempts = retry.max_read_attempts.max(1);
    let mut attempt = 1u32;
    loop {
        match store.fetch(id).await {
            Err(TicketError::Transient { detail }) if attempt < max_attempts => {
                tracing::debug!(
                    ticket = %id,
                    attempt,
                    "transient fetch failure, backing off: {detail}"
                );
                tokio::time::sleep(retry.delay_for(attempt)).await;
                attempt += 1;
            }
            outcome => return outcome,
        }
    }
}
