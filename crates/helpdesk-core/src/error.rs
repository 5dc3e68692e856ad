//! Error taxonomy for ticket lifecycle and store operations.
//!
//! Four conditions cover the per-ticket operations:
//!
//! - [`TicketError::Conflict`] — lost a compare-and-swap race; recoverable,
//!   the caller refreshes its view.
//! - [`TicketError::InvalidState`] — transition attempted from a state that
//!   disallows it; surfaced, never retried.
//! - [`TicketError::Transient`] — store unavailability after read-retry
//!   exhaustion.
//! - [`TicketError::NotFound`] — the referenced ticket is gone; the caller
//!   drops it from its local view.
//!
//! Two more cover the live-view machinery: [`TicketError::FeedClosed`]
//! when the change feed ends while a subscription is still active
//! (re-subscribe to recover), and [`TicketError::Internal`] when a
//! background task fails outright.
//!
//! No failure here is fatal to the process; every error is scoped to the
//! single ticket and operation involved.

use std::fmt;

use crate::model::ticket::{TicketId, TicketState};

/// Machine-readable error codes for console-side decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    TicketNotFound,
    AssignmentConflict,
    InvalidStateTransition,
    StoreUnavailable,
    FeedClosed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::TicketNotFound => "E2001",
            Self::AssignmentConflict => "E2002",
            Self::InvalidStateTransition => "E2003",
            Self::StoreUnavailable => "E5001",
            Self::FeedClosed => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::TicketNotFound => "Ticket not found",
            Self::AssignmentConflict => "Assignment conflict",
            Self::InvalidStateTransition => "Invalid state transition",
            Self::StoreUnavailable => "Store unavailable",
            Self::FeedClosed => "Change feed closed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint surfaced to operators and UIs.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::TicketNotFound => Some("Drop the ticket from the local view and refresh."),
            Self::AssignmentConflict => {
                Some("Another console holds this ticket. Refresh the list and pick another.")
            }
            Self::InvalidStateTransition => {
                Some("Follow valid transitions: unassigned -> assigned -> resolved.")
            }
            Self::StoreUnavailable => Some("Check store connectivity and retry the operation."),
            Self::FeedClosed => Some("Re-subscribe to restore the live view."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors returned by coordinator, thread, registry, and store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TicketError {
    /// Lost a race for claim/release/resolve: the guarded write found a
    /// different assignment than expected.
    #[error("conflict on ticket {ticket_id}: {reason}")]
    Conflict { ticket_id: TicketId, reason: String },

    /// Transition attempted from a state that disallows it.
    #[error("cannot {action} ticket {ticket_id}: ticket is {state}")]
    InvalidState {
        ticket_id: TicketId,
        action: &'static str,
        state: TicketState,
    },

    /// Store or network unavailability, surfaced after bounded read retries.
    #[error("store unavailable: {detail}")]
    Transient { detail: String },

    /// The operation referenced a ticket id no longer present in the store.
    #[error("ticket {ticket_id} not found")]
    NotFound { ticket_id: TicketId },

    /// The change feed ended while the subscription was still active.
    #[error("change feed closed: {detail}")]
    FeedClosed { detail: String },

    /// A background task failed in a way no caller can act on.
    #[error("internal error: {detail}")]
    Internal { detail: String },
}

impl TicketError {
    /// Map to the stable machine-readable code.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Conflict { .. } => ErrorCode::AssignmentConflict,
            Self::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            Self::Transient { .. } => ErrorCode::StoreUnavailable,
            Self::NotFound { .. } => ErrorCode::TicketNotFound,
            Self::FeedClosed { .. } => ErrorCode::FeedClosed,
            Self::Internal { .. } => ErrorCode::InternalUnexpected,
        }
    }

    /// Whether the caller can recover by refreshing its view and retrying
    /// a different action (as opposed to a programming/UI error).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Conflict { .. }
                | Self::Transient { .. }
                | Self::NotFound { .. }
                | Self::FeedClosed { .. }
        )
    }
}
