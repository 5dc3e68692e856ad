//! The ticket aggregate and its lifecycle states.
//!
//! A ticket is created Unassigned, moves to Assigned when exactly one
//! staff claim succeeds, and ends Resolved (terminal). Assignment is
//! stored as a single optional field, so "assigned iff an assignee is
//! bound" holds by construction rather than by a flag kept in sync.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::TicketError;
use crate::model::message::{Message, is_thread_ordered};

/// Opaque store-assigned ticket identifier. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(String);

impl TicketId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The three lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketState {
    Unassigned,
    Assigned,
    Resolved,
}

impl TicketState {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Unassigned => "unassigned",
            Self::Assigned => "assigned",
            Self::Resolved => "resolved",
        }
    }

    /// Whether the state admits any further assignment change.
    ///
    /// Resolution freezes assignment: nothing leaves Resolved.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved)
    }
}

impl fmt::Display for TicketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a state from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStateError {
    pub got: String,
}

impl fmt::Display for ParseStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid ticket state '{}': expected one of unassigned, assigned, resolved",
            self.got
        )
    }
}

impl std::error::Error for ParseStateError {}

impl FromStr for TicketState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unassigned" => Ok(Self::Unassigned),
            "assigned" => Ok(Self::Assigned),
            "resolved" => Ok(Self::Resolved),
            _ => Err(ParseStateError { got: s.to_string() }),
        }
    }
}

/// All persisted fields for a ticket (the document-level aggregate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketFields {
    pub id: TicketId,
    /// Short text, set at creation, immutable thereafter.
    pub title: String,
    /// Identity id of the end user who raised the ticket.
    pub opened_by: String,
    /// Present iff the ticket is assigned.
    pub assignee_id: Option<String>,
    /// Monotonic: once true, assignment is frozen.
    pub resolved: bool,
    /// Opaque media references, set at creation, immutable.
    pub attachments: Vec<String>,
    /// Append-only conversation. Never empty after creation: entry 0 is
    /// the ticket description.
    pub thread: Vec<Message>,
    pub created_at_us: u64,
}

impl TicketFields {
    /// Derive the lifecycle state from the persisted fields.
    #[must_use]
    pub const fn state(&self) -> TicketState {
        if self.resolved {
            TicketState::Resolved
        } else if self.assignee_id.is_some() {
            TicketState::Assigned
        } else {
            TicketState::Unassigned
        }
    }

    #[must_use]
    pub const fn is_assigned(&self) -> bool {
        self.assignee_id.is_some()
    }

    /// Timestamp of the most recent thread entry, used for registry
    /// ordering. Falls back to creation time for a (hypothetically)
    /// threadless document.
    #[must_use]
    pub fn last_activity_us(&self) -> u64 {
        self.thread
            .iter()
            .map(|m| m.timestamp_us)
            .max()
            .unwrap_or(self.created_at_us)
    }

    /// Structural sanity check for documents arriving over the feed.
    ///
    /// A well-formed ticket has a non-empty id, a non-empty thread
    /// (creation seeds message 0), and a canonically ordered thread.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.id.is_empty() && !self.thread.is_empty() && is_thread_ordered(&self.thread)
    }

    /// Validate a claim attempt against the current state.
    ///
    /// Claiming an Assigned ticket is a lost race (`Conflict`); claiming a
    /// Resolved ticket is a terminal-state error (`InvalidState`), since
    /// resolution freezes assignment.
    pub fn check_claimable(&self) -> Result<(), TicketError> {
        match self.state() {
            TicketState::Unassigned => Ok(()),
            TicketState::Assigned => Err(TicketError::Conflict {
                ticket_id: self.id.clone(),
                reason: format!(
                    "already assigned to {}",
                    self.assignee_id.as_deref().unwrap_or("?")
                ),
            }),
            TicketState::Resolved => Err(TicketError::InvalidState {
                ticket_id: self.id.clone(),
                action: "claim",
                state: TicketState::Resolved,
            }),
        }
    }
}
