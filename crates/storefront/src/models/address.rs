//! Address domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cartwheel_core::{AddressId, UserId};

use super::{ValidationError, non_blank};

/// Longest accepted value for any single address field.
const MAX_FIELD_LENGTH: usize = 200;

/// A saved shipping address.
#[derive(Debug, Clone, Serialize)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: String,
    pub country_code: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Address {
    /// Snapshot used on orders, detached from the saved address.
    #[must_use]
    pub fn to_shipping(&self) -> ShippingAddress {
        ShippingAddress {
            full_name: self.full_name.clone(),
            phone: self.phone.clone(),
            line1: self.line1.clone(),
            line2: self.line2.clone(),
            city: self.city.clone(),
            region: self.region.clone(),
            postal_code: self.postal_code.clone(),
            country_code: self.country_code.clone(),
        }
    }
}

/// Address fields as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInput {
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: String,
    pub country_code: String,
    #[serde(default)]
    pub is_default: bool,
}

/// A validated, normalized address ready to persist or snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: String,
    pub country_code: String,
}

impl AddressInput {
    /// Validate and normalize the input.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` naming the first offending field.
    pub fn validate(&self) -> Result<ShippingAddress, ValidationError> {
        let country_code = self.country_code.trim().to_ascii_uppercase();
        if country_code.len() != 2 || !country_code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::new(
                "country_code must be a two-letter ISO code",
            ));
        }

        Ok(ShippingAddress {
            full_name: required("full_name", &self.full_name)?,
            phone: required("phone", &self.phone)?,
            line1: required("line1", &self.line1)?,
            line2: optional("line2", self.line2.as_deref())?,
            city: required("city", &self.city)?,
            region: optional("region", self.region.as_deref())?,
            postal_code: required("postal_code", &self.postal_code)?,
            country_code,
        })
    }
}

fn required(field: &str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::new(format!("{field} is required")));
    }
    check_length(field, value)?;
    Ok(value.to_string())
}

fn optional(field: &str, value: Option<&str>) -> Result<Option<String>, ValidationError> {
    let value = non_blank(value);
    if let Some(v) = &value {
        check_length(field, v)?;
    }
    Ok(value)
}

fn check_length(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.chars().count() > MAX_FIELD_LENGTH {
        return Err(ValidationError::new(format!(
            "{field} must be at most {MAX_FIELD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> AddressInput {
        AddressInput {
            full_name: " Ada Lovelace ".to_string(),
            phone: "555-0100".to_string(),
            line1: "12 Analytical Way".to_string(),
            line2: Some("   ".to_string()),
            city: "London".to_string(),
            region: None,
            postal_code: "N1 9GU".to_string(),
            country_code: "gb".to_string(),
            is_default: false,
        }
    }

    #[test]
    fn test_validate_normalizes() {
        let address = input().validate().unwrap();
        assert_eq!(address.full_name, "Ada Lovelace");
        assert_eq!(address.line2, None);
        assert_eq!(address.country_code, "GB");
    }

    #[test]
    fn test_validate_requires_fields() {
        let mut bad = input();
        bad.city = "  ".to_string();
        assert_eq!(
            bad.validate().unwrap_err(),
            ValidationError::new("city is required")
        );
    }

    #[test]
    fn test_validate_country_code() {
        let mut bad = input();
        bad.country_code = "GBR".to_string();
        assert!(bad.validate().is_err());
        bad.country_code = "1A".to_string();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_validate_field_length() {
        let mut bad = input();
        bad.line1 = "x".repeat(MAX_FIELD_LENGTH + 1);
        assert!(bad.validate().is_err());
    }
}
