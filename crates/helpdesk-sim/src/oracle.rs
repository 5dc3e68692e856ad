//! Invariant checks over a finished run.
//!
//! The oracle only looks at artifacts: race outcomes, the store's final
//! snapshot, and the registry's final view. It never touches the store
//! itself, so a check can be re-run on a captured result.

use helpdesk_core::{TicketDoc, TicketId, model::message::is_thread_ordered};

use crate::run::{RaceOutcome, SimResult};

/// Result of an invariant check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleResult {
    /// `true` iff no violations were found.
    pub passed: bool,
    pub violations: Vec<InvariantViolation>,
}

impl OracleResult {
    #[must_use]
    fn pass() -> Self {
        Self {
            passed: true,
            violations: Vec::new(),
        }
    }

    #[must_use]
    fn fail(violations: Vec<InvariantViolation>) -> Self {
        Self {
            passed: false,
            violations,
        }
    }

    /// Merge another result into this one (failures accumulate).
    #[must_use]
    fn merge(mut self, other: Self) -> Self {
        if !other.passed {
            self.passed = false;
            self.violations.extend(other.violations);
        }
        self
    }
}

/// Diagnostic for a single failed invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// More than one console's claim succeeded in a single race.
    MultipleWinners {
        ticket: TicketId,
        winners: Vec<String>,
    },

    /// A resolved ticket lost its assignee, breaking the resolved-by
    /// record.
    ResolvedWithoutAssignee { ticket: TicketId },

    /// A thread is not ordered by (timestamp, write-sequence).
    ThreadOutOfOrder { ticket: TicketId },

    /// The registry's final view disagrees with the store.
    ViewDivergence {
        /// In the store but missing from the view.
        missing: Vec<TicketId>,
        /// In the view but gone from the store.
        extra: Vec<TicketId>,
        /// Present in both but at an older revision in the view.
        stale: Vec<TicketId>,
    },

    /// The view is not ordered by last activity descending (ticket id
    /// breaking ties).
    ViewOutOfOrder { position: usize },

    /// A preview render was not the first-N prefix of the view.
    PreviewWindow {
        expected: Vec<TicketId>,
        rendered: Vec<TicketId>,
    },
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MultipleWinners { ticket, winners } => {
                write!(f, "ticket {ticket}: multiple claim winners {winners:?}")
            }
            Self::ResolvedWithoutAssignee { ticket } => {
                write!(f, "ticket {ticket}: resolved but no assignee recorded")
            }
            Self::ThreadOutOfOrder { ticket } => {
                write!(f, "ticket {ticket}: thread out of order")
            }
            Self::ViewDivergence {
                missing,
                extra,
                stale,
            } => write!(
                f,
                "view divergence: missing={missing:?} extra={extra:?} stale={stale:?}"
            ),
            Self::ViewOutOfOrder { position } => {
                write!(f, "view order violated at position {position}")
            }
            Self::PreviewWindow { expected, rendered } => {
                write!(
                    f,
                    "preview window mismatch: expected {expected:?}, rendered {rendered:?}"
                )
            }
        }
    }
}

/// Judges a finished simulation run against the core's promises.
pub struct RunOracle;

impl RunOracle {
    /// Run every check in one shot.
    #[must_use]
    pub fn check_all(result: &SimResult) -> OracleResult {
        Self::check_single_winner(&result.races)
            .merge(Self::check_resolution_record(&result.store_docs))
            .merge(Self::check_thread_order(&result.store_docs))
            .merge(Self::check_view_convergence(
                &result.view,
                &result.store_docs,
            ))
            .merge(Self::check_view_order(&result.view))
            .merge(Self::check_preview_window(result))
    }

    /// At most one winner per claim race.
    #[must_use]
    pub fn check_single_winner(races: &[RaceOutcome]) -> OracleResult {
        let violations: Vec<InvariantViolation> = races
            .iter()
            .filter(|race| race.winners.len() > 1)
            .map(|race| InvariantViolation::MultipleWinners {
                ticket: race.ticket.clone(),
                winners: race.winners.clone(),
            })
            .collect();
        if violations.is_empty() {
            OracleResult::pass()
        } else {
            OracleResult::fail(violations)
        }
    }

    /// Resolution keeps the resolving assignee bound for the record.
    #[must_use]
    pub fn check_resolution_record(docs: &[TicketDoc]) -> OracleResult {
        let violations: Vec<InvariantViolation> = docs
            .iter()
            .filter(|doc| doc.fields.resolved && doc.fields.assignee_id.is_none())
            .map(|doc| InvariantViolation::ResolvedWithoutAssignee {
                ticket: doc.id().clone(),
            })
            .collect();
        if violations.is_empty() {
            OracleResult::pass()
        } else {
            OracleResult::fail(violations)
        }
    }

    /// Every thread ordered by (timestamp, write-sequence).
    #[must_use]
    pub fn check_thread_order(docs: &[TicketDoc]) -> OracleResult {
        let violations: Vec<InvariantViolation> = docs
            .iter()
            .filter(|doc| !is_thread_ordered(&doc.fields.thread))
            .map(|doc| InvariantViolation::ThreadOutOfOrder {
                ticket: doc.id().clone(),
            })
            .collect();
        if violations.is_empty() {
            OracleResult::pass()
        } else {
            OracleResult::fail(violations)
        }
    }

    /// The settled view holds exactly the store's tickets at the store's
    /// revisions.
    #[must_use]
    pub fn check_view_convergence(view: &[TicketDoc], store_docs: &[TicketDoc]) -> OracleResult {
        let mut missing = Vec::new();
        let mut stale = Vec::new();
        for truth in store_docs {
            match view.iter().find(|doc| doc.id() == truth.id()) {
                None => missing.push(truth.id().clone()),
                Some(doc) if doc.revision < truth.revision => stale.push(truth.id().clone()),
                Some(_) => {}
            }
        }
        let extra: Vec<TicketId> = view
            .iter()
            .filter(|doc| !store_docs.iter().any(|truth| truth.id() == doc.id()))
            .map(|doc| doc.id().clone())
            .collect();

        if missing.is_empty() && extra.is_empty() && stale.is_empty() {
            OracleResult::pass()
        } else {
            OracleResult::fail(vec![InvariantViolation::ViewDivergence {
                missing,
                extra,
                stale,
            }])
        }
    }

    /// The view ordered by last activity descending, id ascending on
    /// ties.
    #[must_use]
    pub fn check_view_order(view: &[TicketDoc]) -> OracleResult {
        let violations: Vec<InvariantViolation> = view
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| {
                let (a, b) = (&pair[0], &pair[1]);
                let (a_key, b_key) = (a.fields.last_activity_us(), b.fields.last_activity_us());
                a_key < b_key || (a_key == b_key && a.fields.id > b.fields.id)
            })
            .map(|(i, _)| InvariantViolation::ViewOutOfOrder { position: i + 1 })
            .collect();
        if violations.is_empty() {
            OracleResult::pass()
        } else {
            OracleResult::fail(violations)
        }
    }

    /// A preview render is the first-N prefix of the view; a full render
    /// is the whole view.
    #[must_use]
    pub fn check_preview_window(result: &SimResult) -> OracleResult {
        let view_ids: Vec<TicketId> = result.view.iter().map(|doc| doc.id().clone()).collect();
        let expected: Vec<TicketId> = if result.rendered_preview {
            view_ids.iter().take(5).cloned().collect()
        } else {
            view_ids
        };
        if result.rendered == expected {
            OracleResult::pass()
        } else {
            OracleResult::fail(vec![InvariantViolation::PreviewWindow {
                expected,
                rendered: result.rendered.clone(),
            }])
        }
    }
}
