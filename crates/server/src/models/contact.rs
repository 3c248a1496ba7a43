//! Contact form messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use whitelabel_core::cart::FieldErrors;
use whitelabel_core::{ContactId, ContactStatus, Email};

/// A message left through the storefront contact form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub email: Email,
    pub subject: Option<String>,
    pub message: String,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
}

/// Contact form submission as posted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub subject: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// A submission that passed [`ContactInput::validate`], trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub name: String,
    pub email: Email,
    pub subject: Option<String>,
    pub message: String,
}

impl ContactInput {
    pub const MAX_MESSAGE_LENGTH: usize = 5000;

    /// Name, email and message are required; a blank subject is dropped.
    ///
    /// # Errors
    ///
    /// Returns every problem found, keyed by field name.
    pub fn validate(&self) -> Result<NewContact, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.add("name", "Name is required");
        }
        let email = Email::parse(&self.email)
            .map_err(|e| errors.add("email", e.to_string()))
            .ok();
        let message = self.message.trim();
        if message.is_empty() {
            errors.add("message", "Message is required");
        } else if message.chars().count() > Self::MAX_MESSAGE_LENGTH {
            errors.add(
                "message",
                format!("Message must be at most {} characters", Self::MAX_MESSAGE_LENGTH),
            );
        }

        let Some(email) = email.filter(|_| errors.is_empty()) else {
            return Err(errors);
        };
        Ok(NewContact {
            name: name.to_string(),
            email,
            subject: self
                .subject
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string),
            message: message.to_string(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> ContactInput {
        ContactInput {
            name: " Sam Rivera ".to_string(),
            email: "sam@example.com".to_string(),
            subject: Some("   ".to_string()),
            message: "Do you ship to Canada?".to_string(),
        }
    }

    #[test]
    fn test_valid_submission_is_trimmed() {
        let contact = input().validate().unwrap();
        assert_eq!(contact.name, "Sam Rivera");
        assert_eq!(contact.email.as_str(), "sam@example.com");
        assert!(contact.subject.is_none());
    }

    #[test]
    fn test_required_fields() {
        let errors = ContactInput::default().validate().unwrap_err();
        let fields: Vec<&str> = errors.fields().collect();
        assert_eq!(fields, vec!["email", "message", "name"]);
    }

    #[test]
    fn test_overlong_message() {
        let long = ContactInput {
            message: "x".repeat(ContactInput::MAX_MESSAGE_LENGTH + 1),
            ..input()
        };
        assert!(long.validate().unwrap_err().get("message").is_some());
    }
}
