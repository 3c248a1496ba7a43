//! Contact form inbox.

use std::sync::Arc;

use tracing::{info, instrument};
use whitelabel_core::{ContactId, ContactStatus};

use crate::db::ContactRepository;
use crate::models::{Contact, ContactInput};
use crate::services::ServiceError;

#[derive(Clone)]
pub struct ContactInbox {
    repo: Arc<dyn ContactRepository>,
}

impl ContactInbox {
    #[must_use]
    pub fn new(repo: Arc<dyn ContactRepository>) -> Self {
        Self { repo }
    }

    /// Validate and store a submission with status `NEW`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` when a required field is missing.
    #[instrument(skip(self, input))]
    pub async fn submit(&self, input: &ContactInput) -> Result<Contact, ServiceError> {
        let contact = input.validate().map_err(ServiceError::Validation)?;
        let contact = self.repo.create_contact(&contact).await?;
        info!(contact_id = %contact.id, "Contact message received");
        Ok(contact)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Persistence` if storage fails.
    pub async fn list(&self) -> Result<Vec<Contact>, ServiceError> {
        Ok(self.repo.list_contacts().await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown id.
    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        id: ContactId,
        status: ContactStatus,
    ) -> Result<Contact, ServiceError> {
        Ok(self.repo.set_contact_status(id, status).await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown id.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ContactId) -> Result<(), ServiceError> {
        self.repo.delete_contact(id).await?;
        info!(contact_id = %id, "Contact message deleted");
        Ok(())
    }
}
