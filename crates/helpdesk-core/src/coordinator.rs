//! Assignment coordination: claim, release, resolve.
//!
//! The coordinator enforces at-most-one-assignee under concurrent claim
//! attempts from multiple consoles. It never mutates local state — every
//! transition is a conditional write against the store, and the change
//! feed reconciles what the consoles see.
//!
//! The transition protocol is read-validate-CAS:
//!
//! 1. read current state (retried with bounded backoff on transient
//!    failures — reads are idempotent);
//! 2. validate the transition, so callers get the precise error class
//!    (`InvalidState` for a ticket already observed Resolved or not held
//!    by them, `Conflict` for a ticket someone else holds);
//! 3. issue the guarded write exactly once. If another console won the
//!    race between read and write, the guard fails and the caller gets
//!    `Conflict` — it must refresh and re-render, never silently retry.

use std::sync::Arc;

use crate::config::RetryConfig;
use crate::error::TicketError;
use crate::model::identity::Identity;
use crate::model::ticket::{TicketId, TicketState};
use crate::retry::fetch_with_retry;
use crate::store::{AssignmentChange, AssignmentGuard, TicketDoc, TicketStore};

/// Mediates claim/release/resolve for one console.
pub struct AssignmentCoordinator<S: TicketStore + ?Sized> {
    store: Arc<S>,
    retry: RetryConfig,
}

impl<S: TicketStore + ?Sized> Clone for AssignmentCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            retry: self.retry,
        }
    }
}

impl<S: TicketStore + ?Sized> AssignmentCoordinator<S> {
    pub fn new(store: Arc<S>, retry: RetryConfig) -> Self {
        Self { store, retry }
    }

    /// Take ownership of an Unassigned ticket for `staff`.
    ///
    /// At most one of N concurrent claims succeeds; every loser observes
    /// [`TicketError::Conflict`]. Claiming a Resolved ticket is
    /// [`TicketError::InvalidState`] — resolution freezes assignment.
    pub async fn claim(
        &self,
        id: &TicketId,
        staff: &Identity,
    ) -> Result<TicketDoc, TicketError> {
        let current = fetch_with_retry(self.store.as_ref(), id, &self.retry).await?;
        current.fields.check_claimable()?;

        let outcome = self
            .store
            .conditional_update(
                id,
                &AssignmentGuard::Unassigned,
                &AssignmentChange::Assign(staff.id.clone()),
            )
            .await;
        match &outcome {
            Ok(doc) => {
                tracing::info!(ticket = %id, staff = %staff.id, revision = doc.revision, "claimed");
            }
            Err(err) => {
                tracing::debug!(ticket = %id, staff = %staff.id, "claim failed: {err}");
            }
        }
        outcome
    }

    /// Return an Assigned ticket to the Unassigned pool.
    ///
    /// Valid only for the holder, or for an admin overriding another
    /// staff member's hold. Invalid once the ticket is Resolved.
    pub async fn release(
        &self,
        id: &TicketId,
        staff: &Identity,
    ) -> Result<TicketDoc, TicketError> {
        let current = fetch_with_retry(self.store.as_ref(), id, &self.retry).await?;
        let holder = Self::holder_for_transition(&current, id, "release")?;
        if holder != staff.id && !staff.is_admin() {
            return Err(TicketError::Conflict {
                ticket_id: id.clone(),
                reason: format!("held by {holder}, not {}", staff.id),
            });
        }

        let outcome = self
            .store
            .conditional_update(
                id,
                &AssignmentGuard::HeldBy(holder),
                &AssignmentChange::Release,
            )
            .await;
        if let Ok(doc) = &outcome {
            tracing::info!(ticket = %id, staff = %staff.id, revision = doc.revision, "released");
        }
        outcome
    }

    /// Mark an Assigned ticket Resolved. Terminal: nothing transitions
    /// out of Resolved. Valid only for the current holder.
    pub async fn resolve(
        &self,
        id: &TicketId,
        staff: &Identity,
    ) -> Result<TicketDoc, TicketError> {
        let current = fetch_with_retry(self.store.as_ref(), id, &self.retry).await?;
        let holder = Self::holder_for_transition(&current, id, "resolve")?;
        if holder != staff.id {
            return Err(TicketError::Conflict {
                ticket_id: id.clone(),
                reason: format!("held by {holder}, not {}", staff.id),
            });
        }

        let outcome = self
            .store
            .conditional_update(
                id,
                &AssignmentGuard::HeldBy(holder),
                &AssignmentChange::Resolve,
            )
            .await;
        if let Ok(doc) = &outcome {
            tracing::info!(ticket = %id, staff = %staff.id, revision = doc.revision, "resolved");
        }
        outcome
    }

    /// Common validation for release/resolve: the ticket must be
    /// Assigned. Returns the current holder's id.
    fn holder_for_transition(
        current: &TicketDoc,
        id: &TicketId,
        action: &'static str,
    ) -> Result<String, TicketError> {
        match current.fields.state() {
            TicketState::Assigned => Ok(current
                .fields
                .assignee_id
                .clone()
                .unwrap_or_default()),
            state @ (TicketState::Unassigned | TicketState::Resolved) => {
                Err(TicketError::InvalidState {
                    ticket_id: id.clone(),
                    action,
                    state,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AssignmentCoordinator;
    use crate::config::RetryConfig;
    use crate::error::TicketError;
    use crate::model::identity::{Identity, Role};
    use crate::model::ticket::TicketState;
    use crate::store::{MemoryStore, TicketStore};
    use std::sync::Arc;

    fn setup() -> (Arc<MemoryStore>, AssignmentCoordinator<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let coordinator = AssignmentCoordinator::new(Arc::clone(&store), RetryConfig::default());
        (store, coordinator)
    }

    fn staff(id: &str) -> Identity {
        Identity::new(id, id.to_uppercase(), Role::Staff)
    }

    fn admin() -> Identity {
        Identity::new("adm", "Ada", Role::Admin)
    }

    async fn new_ticket(store: &MemoryStore) -> crate::store::TicketDoc {
        let user = Identity::new("u-1", "Uma", Role::User);
        store
            .create_ticket("Printer broken", &user, "It just stopped", vec![])
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn claim_release_claim_roundtrip() {
        let (store, coordinator) = setup();
        let doc = new_ticket(&store).await;
        let a = staff("s-a");
        let b = staff("s-b");

        let claimed = coordinator.claim(doc.id(), &a).await.unwrap();
        assert_eq!(claimed.fields.state(), TicketState::Assigned);
        assert_eq!(claimed.fields.assignee_id.as_deref(), Some("s-a"));

        let released = coordinator.release(doc.id(), &a).await.unwrap();
        assert_eq!(released.fields.state(), TicketState::Unassigned);

        // Now anyone can claim again.
        let reclaimed = coordinator.claim(doc.id(), &b).await.unwrap();
        assert_eq!(reclaimed.fields.assignee_id.as_deref(), Some("s-b"));
    }

    #[tokio::test]
    async fn second_claim_is_a_conflict() {
        let (store, coordinator) = setup();
        let doc = new_ticket(&store).await;

        coordinator.claim(doc.id(), &staff("s-a")).await.unwrap();
        let err = coordinator.claim(doc.id(), &staff("s-b")).await.unwrap_err();
        assert!(matches!(err, TicketError::Conflict { .. }));
    }

    #[tokio::test]
    async fn resolve_freezes_assignment() {
        let (store, coordinator) = setup();
        let doc = new_ticket(&store).await;
        let a = staff("s-a");

        coordinator.claim(doc.id(), &a).await.unwrap();
        let resolved = coordinator.resolve(doc.id(), &a).await.unwrap();
        assert_eq!(resolved.fields.state(), TicketState::Resolved);

        // claim and release on a resolved ticket are invalid-state, not
        // conflicts: there is no race to lose, the state forbids it.
        assert!(matches!(
            coordinator.claim(doc.id(), &staff("s-c")).await.unwrap_err(),
            TicketError::InvalidState {
                state: TicketState::Resolved,
                ..
            }
        ));
        assert!(matches!(
            coordinator.release(doc.id(), &a).await.unwrap_err(),
            TicketError::InvalidState {
                state: TicketState::Resolved,
                ..
            }
        ));
        assert!(matches!(
            coordinator.resolve(doc.id(), &a).await.unwrap_err(),
            TicketError::InvalidState {
                state: TicketState::Resolved,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn release_and_resolve_from_unassigned_are_invalid_state() {
        let (store, coordinator) = setup();
        let doc = new_ticket(&store).await;
        let a = staff("s-a");

        assert!(matches!(
            coordinator.release(doc.id(), &a).await.unwrap_err(),
            TicketError::InvalidState {
                action: "release",
                state: TicketState::Unassigned,
                ..
            }
        ));
        assert!(matches!(
            coordinator.resolve(doc.id(), &a).await.unwrap_err(),
            TicketError::InvalidState {
                action: "resolve",
                state: TicketState::Unassigned,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn only_the_holder_or_admin_releases() {
        let (store, coordinator) = setup();
        let doc = new_ticket(&store).await;

        coordinator.claim(doc.id(), &staff("s-a")).await.unwrap();
        let err = coordinator
            .release(doc.id(), &staff("s-b"))
            .await
            .unwrap_err();
        assert!(matches!(err, TicketError::Conflict { .. }));

        // Admin override releases another staff member's hold.
        let released = coordinator.release(doc.id(), &admin()).await.unwrap();
        assert!(!released.fields.is_assigned());
    }

    #[tokio::test]
    async fn only_the_holder_resolves() {
        let (store, coordinator) = setup();
        let doc = new_ticket(&store).await;

        coordinator.claim(doc.id(), &staff("s-a")).await.unwrap();
        let err = coordinator
            .resolve(doc.id(), &staff("s-b"))
            .await
            .unwrap_err();
        assert!(matches!(err, TicketError::Conflict { .. }));
    }

    #[tokio::test]
    async fn unknown_ticket_is_not_found() {
        let (_store, coordinator) = setup();
        let err = coordinator
            .claim(&crate::model::ticket::TicketId::new("missing"), &staff("s-a"))
            .await
            .unwrap_err();
        assert!(matches!(err, TicketError::NotFound { .. }));
    }

    #[tokio::test]
    async fn transient_reads_recover_before_the_write() {
        let (store, coordinator) = setup();
        let doc = new_ticket(&store).await;

        store.fail_next_fetches(2);
        let claimed = coordinator.claim(doc.id(), &staff("s-a")).await.unwrap();
        assert!(claimed.fields.is_assigned());
    }
}
