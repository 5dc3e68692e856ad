//! Ticket intake: the validated front door for opening tickets.
//!
//! Every submission passes through here before the store write. The
//! title and the requester's contact details are checked first, and a
//! rejected field aborts the submission with nothing persisted. Staff
//! operations (claim, reply, resolve) go through the coordinator and
//! thread writer instead; intake is the end-user surface.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::TicketError;
use crate::model::identity::Identity;
use crate::store::{TicketDoc, TicketStore};
use crate::validate::{
    ValidationError, validate_display_name, validate_email, validate_phone, validate_title,
};

/// How to reach the person opening the ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub email: String,
    /// Optional callback number.
    pub phone: Option<String>,
}

/// A ticket submission, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTicket {
    pub title: String,
    /// Becomes the first message of the thread.
    pub description: String,
    pub attachments: Vec<String>,
}

/// Why a submission did not produce a ticket.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    /// A field failed validation; the store was never written.
    #[error(transparent)]
    Rejected(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] TicketError),
}

/// Validated ticket creation over a store.
pub struct TicketIntake<S: TicketStore + ?Sized> {
    store: Arc<S>,
}

impl<S: TicketStore + ?Sized> Clone for TicketIntake<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: TicketStore + ?Sized> TicketIntake<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Open a ticket for `opened_by`. Every field is validated before
    /// the store write; the first rejected field aborts the submission.
    pub async fn open(
        &self,
        opened_by: &Identity,
        contact: &ContactDetails,
        ticket: &NewTicket,
    ) -> Result<TicketDoc, IntakeError> {
        validate_title(&ticket.title)?;
        validate_display_name(&opened_by.display_name)?;
        validate_email(&contact.email)?;
        if let Some(phone) = &contact.phone {
            validate_phone(phone)?;
        }

        let doc = self
            .store
            .create_ticket(
                &ticket.title,
                opened_by,
                &ticket.description,
                ticket.attachments.clone(),
            )
            .await?;
        tracing::info!(ticket = %doc.fields.id, opened_by = %opened_by.id, "ticket opened");
        Ok(doc)
    }
}
