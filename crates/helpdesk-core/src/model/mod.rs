//! Data model: tickets, thread messages, and identities.

pub mod identity;
pub mod message;
pub mod ticket;

pub use identity::{Identity, Role};
pub use message::Message;
pub use ticket::{TicketFields, TicketId, TicketState};
