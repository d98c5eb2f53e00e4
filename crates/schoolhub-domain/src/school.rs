//! Field rules for school directory submissions.

use std::collections::BTreeMap;

use crate::email::is_valid_email;

/// Field name → human readable message. Ordered so responses are stable.
pub type FieldErrors = BTreeMap<&'static str, String>;

/// Text fields of a submission exactly as received; any of them may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchoolFields {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub contact: Option<String>,
    pub email: Option<String>,
}

/// A submission whose fields all passed [`SchoolFields::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSchool {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub contact: String,
    pub email: String,
}

impl SchoolFields {
    /// Assign a form field by name. `email_id` is accepted as an alias of `email`.
    ///
    /// Returns `false` for names that are not school fields.
    pub fn set(&mut self, field: &str, value: String) -> bool {
        let slot = match field {
            "name" => &mut self.name,
            "address" => &mut self.address,
            "city" => &mut self.city,
            "state" => &mut self.state,
            "contact" => &mut self.contact,
            "email" | "email_id" => &mut self.email,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    /// Apply presence and format rules.
    ///
    /// Blank values count as missing. `email` must have the `local@domain.tld` shape
    /// and `contact` must be exactly ten ASCII digits.
    pub fn validate(self) -> Result<ValidSchool, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = required(&mut errors, "name", "Name", self.name);
        let address = required(&mut errors, "address", "Address", self.address);
        let city = required(&mut errors, "city", "City", self.city);
        let state = required(&mut errors, "state", "State", self.state);
        let contact = required(&mut errors, "contact", "Contact", self.contact);
        let email = required(&mut errors, "email", "Email", self.email);

        if let Some(email) = email.as_deref() {
            if !is_valid_email(email) {
                errors.insert("email", "Invalid email address".to_owned());
            }
        }
        if let Some(contact) = contact.as_deref() {
            if !is_contact_number(contact) {
                errors.insert("contact", "Contact must be a 10-digit number".to_owned());
            }
        }

        match (name, address, city, state, contact, email) {
            (Some(name), Some(address), Some(city), Some(state), Some(contact), Some(email))
                if errors.is_empty() =>
            {
                Ok(ValidSchool {
                    name,
                    address,
                    city,
                    state,
                    contact,
                    email,
                })
            }
            _ => Err(errors),
        }
    }
}

fn required(
    errors: &mut FieldErrors,
    key: &'static str,
    label: &str,
    value: Option<String>,
) -> Option<String> {
    match value.map(|v| v.trim().to_owned()) {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            errors.insert(key, format!("{label} is required"));
            None
        }
    }
}

fn is_contact_number(contact: &str) -> bool {
    contact.len() == 10 && contact.bytes().all(|b| b.is_ascii_digit())
}
