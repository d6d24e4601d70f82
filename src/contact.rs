// quote-desk: contact details and their validation

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

const NAME_PATTERN: &str = r"^[A-Za-z\s]+$";
const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[A-Za-z]{2,}$";
const PHONE_PATTERN: &str = r"^[0-9]{10}$";

/// Free-text contact details typed into the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactField {
    Name,
    Email,
    Phone,
    Message,
}

impl ContactField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactField::Name => "name",
            ContactField::Email => "email",
            ContactField::Phone => "phone",
            ContactField::Message => "message",
        }
    }
}

impl fmt::Display for ContactField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContactField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(ContactField::Name),
            "email" => Ok(ContactField::Email),
            "phone" => Ok(ContactField::Phone),
            "message" => Ok(ContactField::Message),
            other => Err(format!("unknown contact field: {}", other)),
        }
    }
}

/// Field → message for every field that failed. Empty means valid.
pub type ErrorMap = BTreeMap<ContactField, String>;

impl ContactForm {
    /// Returns a copy of the form with one field replaced.
    pub fn with_field(&self, field: ContactField, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        let value = value.into();
        match field {
            ContactField::Name => next.name = value,
            ContactField::Email => next.email = value,
            ContactField::Phone => next.phone = value,
            ContactField::Message => next.message = value,
        }
        next
    }
}

/// Compiled field rules.
#[derive(Debug, Clone)]
pub struct ContactValidator {
    name: Regex,
    email: Regex,
    phone: Regex,
}

impl ContactValidator {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            name: Regex::new(NAME_PATTERN)?,
            email: Regex::new(EMAIL_PATTERN)?,
            phone: Regex::new(PHONE_PATTERN)?,
        })
    }

    /// Checks name, email and phone. `message` is optional and never checked.
    pub fn validate(&self, form: &ContactForm) -> ErrorMap {
        let mut errors = ErrorMap::new();

        if form.name.trim().is_empty() {
            errors.insert(ContactField::Name, "Name is required.".to_string());
        } else if !self.name.is_match(&form.name) {
            errors.insert(
                ContactField::Name,
                "Only letters and spaces are allowed.".to_string(),
            );
        }

        if form.email.trim().is_empty() {
            errors.insert(ContactField::Email, "Email is required.".to_string());
        } else if !self.email.is_match(&form.email) {
            errors.insert(
                ContactField::Email,
                "Enter a valid email (e.g., akhila@gmail.com).".to_string(),
            );
        }

        if form.phone.trim().is_empty() {
            errors.insert(ContactField::Phone, "Phone number is required.".to_string());
        } else if !self.phone.is_match(&form.phone) {
            errors.insert(
                ContactField::Phone,
                "Enter a valid 10-digit number.".to_string(),
            );
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> ContactForm {
        ContactForm {
            name: "Akhila Rao".to_string(),
            email: "akhila@gmail.com".to_string(),
            phone: "9876543210".to_string(),
            message: String::new(),
        }
    }

    fn validator() -> ContactValidator {
        ContactValidator::new().unwrap()
    }

    #[test]
    fn valid_form_has_no_errors() {
        assert!(validator().validate(&valid_form()).is_empty());
    }

    #[test]
    fn name_with_digits_is_rejected() {
        let form = valid_form().with_field(ContactField::Name, "Akhila123");
        let errors = validator().validate(&form);
        assert_eq!(
            errors.get(&ContactField::Name).map(String::as_str),
            Some("Only letters and spaces are allowed.")
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn email_without_suffix_is_rejected() {
        let form = valid_form().with_field(ContactField::Email, "akhila@gmail");
        let errors = validator().validate(&form);
        assert!(errors.contains_key(&ContactField::Email));
        assert!(!errors.contains_key(&ContactField::Name));
    }

    #[test]
    fn email_with_one_letter_suffix_is_rejected() {
        let form = valid_form().with_field(ContactField::Email, "akhila@gmail.c");
        assert!(validator().validate(&form).contains_key(&ContactField::Email));
    }

    #[test]
    fn short_phone_is_rejected() {
        let form = valid_form().with_field(ContactField::Phone, "98765");
        let errors = validator().validate(&form);
        assert_eq!(
            errors.get(&ContactField::Phone).map(String::as_str),
            Some("Enter a valid 10-digit number.")
        );
    }

    #[test]
    fn non_ascii_digits_are_rejected() {
        let form = valid_form().with_field(ContactField::Phone, "९८७६५४३२१०");
        let errors = validator().validate(&form);
        assert_eq!(
            errors.get(&ContactField::Phone).map(String::as_str),
            Some("Enter a valid 10-digit number.")
        );
    }

    #[test]
    fn blank_fields_report_required() {
        let errors = validator().validate(&ContactForm::default());
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[&ContactField::Name], "Name is required.");
        assert_eq!(errors[&ContactField::Email], "Email is required.");
        assert_eq!(errors[&ContactField::Phone], "Phone number is required.");

        let spaces = valid_form().with_field(ContactField::Name, "   ");
        assert_eq!(
            validator().validate(&spaces)[&ContactField::Name],
            "Name is required."
        );
    }

    #[test]
    fn with_field_leaves_original_untouched() {
        let form = valid_form();
        let changed = form.with_field(ContactField::Message, "Call after 5pm");
        assert_eq!(form.message, "");
        assert_eq!(changed.message, "Call after 5pm");
    }

    #[test]
    fn field_names_parse() {
        assert_eq!("phone".parse::<ContactField>(), Ok(ContactField::Phone));
        assert!("fax".parse::<ContactField>().is_err());
    }
}
