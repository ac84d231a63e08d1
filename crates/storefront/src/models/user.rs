//! User domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cartwheel_core::{Email, UserId};

/// A storefront customer account.
///
/// The password hash is stored separately and never leaves the repository.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Name shown in the account area.
    pub display_name: Option<String>,
    /// Contact phone number.
    pub phone: Option<String>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Partial profile update.
///
/// `None` leaves a field unchanged; `Some("")` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub phone: Option<String>,
}

impl ProfileUpdate {
    /// Apply the update on top of the current values.
    #[must_use]
    pub fn merge(&self, user: &User) -> (Option<String>, Option<String>) {
        let pick = |update: Option<&String>, current: &Option<String>| match update {
            Some(value) => super::non_blank(Some(value.as_str())),
            None => current.clone(),
        };
        (
            pick(self.display_name.as_ref(), &user.display_name),
            pick(self.phone.as_ref(), &user.phone),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: UserId::new(1),
            email: Email::parse("shopper@example.com").unwrap(),
            display_name: Some("Sam".to_string()),
            phone: Some("555-0100".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_merge_keeps_omitted_fields() {
        let update = ProfileUpdate {
            display_name: Some("  Samantha ".to_string()),
            phone: None,
        };
        let (name, phone) = update.merge(&user());
        assert_eq!(name.as_deref(), Some("Samantha"));
        assert_eq!(phone.as_deref(), Some("555-0100"));
    }

    #[test]
    fn test_merge_empty_string_clears() {
        let update = ProfileUpdate {
            display_name: None,
            phone: Some(String::new()),
        };
        let (name, phone) = update.merge(&user());
        assert_eq!(name.as_deref(), Some("Sam"));
        assert_eq!(phone, None);
    }
}
