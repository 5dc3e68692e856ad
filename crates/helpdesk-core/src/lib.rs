//! helpdesk-core library.
//!
//! Ticket lifecycle and assignment for a multi-console help desk:
//! conditional claim/release/resolve with at-most-one assignee,
//! append-only conversation threads, and a live registry that
//! reconciles a change feed into a consistent, ordered view.
//!
//! # Conventions
//!
//! - **Errors**: domain failures are [`error::TicketError`]; use
//!   `anyhow::Result` at outer edges where appropriate.
//! - **Logging**: use `tracing` macros (`info!`, `warn!`, `error!`,
//!   `debug!`, `trace!`).

pub mod config;
pub mod coordinator;
pub mod error;
pub mod feed;
pub mod intake;
pub mod model;
pub mod registry;
mod retry;
pub mod store;
pub mod thread;
pub mod validate;
pub mod view;

pub use config::{CoreConfig, PreviewConfig, RetryConfig, ThreadPolicy, load_config};
pub use coordinator::AssignmentCoordinator;
pub use error::{ErrorCode, TicketError};
pub use feed::{ChangeEvent, ChangeKind, Subscription, SubscriptionHandle, TicketPredicate};
pub use intake::{ContactDetails, IntakeError, NewTicket, TicketIntake};
pub use model::{Identity, Message, Role, TicketFields, TicketId, TicketState};
pub use registry::{LiveRegistry, TicketRegistry};
pub use store::{
    AssignmentChange, AssignmentGuard, MemoryStore, TicketDoc, TicketStore, now_us,
};
pub use thread::ThreadWriter;
pub use view::TicketList;
