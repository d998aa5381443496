/// Input validators for account and book fields
///
/// Every validator trims its input and returns the cleaned value.

use regex::Regex;
use lazy_static::lazy_static;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_USERNAME_LENGTH: usize = 50;
const MIN_USERNAME_LENGTH: usize = 3;
const MAX_NAME_LENGTH: usize = 100;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    static ref USERNAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_.-]+$").unwrap();
}

/// Validates email address
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    // local part limit (RFC 5321)
    if let Some(at_pos) = trimmed.find('@') {
        if at_pos > 64 {
            return Err(ValidationError::SuspiciousContent("email".to_string()));
        }
    }

    Ok(trimmed.to_string())
}

/// Validates username: 3 to 50 of `[A-Za-z0-9_.-]`
pub fn is_valid_username(username: &str) -> Result<String, ValidationError> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("username".to_string()));
    }

    if trimmed.len() < MIN_USERNAME_LENGTH {
        return Err(ValidationError::TooShort("username".to_string(), MIN_USERNAME_LENGTH));
    }

    if trimmed.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong("username".to_string(), MAX_USERNAME_LENGTH));
    }

    if !USERNAME_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("username".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a personal name field (`first_name`, `last_name`)
pub fn is_valid_name(field: &str, name: &str) -> Result<String, ValidationError> {
    is_valid_text(field, name, MAX_NAME_LENGTH)
}

/// Non-empty free text of at most `max` characters without control characters
pub fn is_valid_text(field: &str, value: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field.to_string()));
    }

    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong(field.to_string(), max));
    }

    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::SuspiciousContent(field.to_string()));
    }

    Ok(trimmed.to_string())
}
