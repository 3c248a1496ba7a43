//! Contact message repository.

use async_trait::async_trait;
use whitelabel_core::{ContactId, ContactStatus};

use super::{PgStore, RepositoryError};
use crate::models::{Contact, NewContact};

#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn create_contact(&self, contact: &NewContact) -> Result<Contact, RepositoryError>;

    /// All messages, newest first.
    async fn list_contacts(&self) -> Result<Vec<Contact>, RepositoryError>;

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    async fn set_contact_status(
        &self,
        id: ContactId,
        status: ContactStatus,
    ) -> Result<Contact, RepositoryError>;

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    async fn delete_contact(&self, id: ContactId) -> Result<(), RepositoryError>;
}

const CONTACT_COLUMNS: &str = "id, name, email, subject, message, status, created_at";

#[async_trait]
impl ContactRepository for PgStore {
    async fn create_contact(&self, contact: &NewContact) -> Result<Contact, RepositoryError> {
        let contact = sqlx::query_as::<_, Contact>(&format!(
            r"
            INSERT INTO contacts (id, name, email, subject, message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CONTACT_COLUMNS}
            "
        ))
        .bind(ContactId::new())
        .bind(&contact.name)
        .bind(&contact.email)
        .bind(contact.subject.as_deref())
        .bind(&contact.message)
        .fetch_one(self.pool())
        .await?;

        Ok(contact)
    }

    async fn list_contacts(&self) -> Result<Vec<Contact>, RepositoryError> {
        let contacts = sqlx::query_as::<_, Contact>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool())
        .await?;

        Ok(contacts)
    }

    async fn set_contact_status(
        &self,
        id: ContactId,
        status: ContactStatus,
    ) -> Result<Contact, RepositoryError> {
        sqlx::query_as::<_, Contact>(&format!(
            "UPDATE contacts SET status = $2 WHERE id = $1 RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool())
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    async fn delete_contact(&self, id: ContactId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
