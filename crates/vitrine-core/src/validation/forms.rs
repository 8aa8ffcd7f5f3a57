//! Form validation for credentials, posts, and profiles.
//!
//! Derive-based rules live on the form structs (`#[derive(Validate)]`); this module
//! turns the first failure into a [`ValidationError`] whose `Display` is shown to the user.

use chrono::{Datelike, NaiveDate};
use validator::{Validate, ValidateEmail};

use crate::constants::PASSWORD_MIN_LENGTH;
use crate::error::ValidationError;

fn convert_field_error(field: &str, err: &validator::ValidationError) -> ValidationError {
    let value_len = err
        .params
        .get("value")
        .and_then(|v| v.as_str())
        .map(|s| s.chars().count() as u64);
    let min = err.params.get("min").and_then(|v| v.as_u64());
    let max = err.params.get("max").and_then(|v| v.as_u64());

    if err.code == "length" {
        match (value_len, min, max) {
            (Some(0), _, _) => {
                return ValidationError::RequiredField {
                    field: field.to_string(),
                }
            }
            (Some(len), _, Some(max)) if len > max => {
                return ValidationError::TooLong {
                    field: field.to_string(),
                    max,
                }
            }
            (_, Some(min), _) => {
                return ValidationError::TooShort {
                    field: field.to_string(),
                    min,
                }
            }
            _ => {}
        }
    }

    ValidationError::InvalidField {
        field: field.to_string(),
        message: err
            .message
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_else(|| err.code.to_string()),
    }
}

/// Run derive-based validation, reporting the first failing field in `field_order`.
///
/// Fields failing validation but absent from `field_order` are reported after the
/// listed ones.
pub fn validate_form<T: Validate>(form: &T, field_order: &[&str]) -> Result<(), ValidationError> {
    let errors = match form.validate() {
        Ok(()) => return Ok(()),
        Err(errors) => errors,
    };
    let field_errors = errors.field_errors();

    for field in field_order {
        if let Some(first) = field_errors.get(*field).and_then(|errs| errs.first()) {
            return Err(convert_field_error(field, first));
        }
    }

    let mut remaining: Vec<_> = field_errors
        .iter()
        .map(|(field, errs)| (field.to_string(), *errs))
        .collect();
    remaining.sort_by(|a, b| a.0.cmp(&b.0));
    match remaining
        .into_iter()
        .find_map(|(field, errs)| errs.first().map(|e| convert_field_error(&field, e)))
    {
        Some(err) => Err(err),
        None => Err(ValidationError::InvalidField {
            field: "form".to_string(),
            message: "invalid input".to_string(),
        }),
    }
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(ValidationError::RequiredField {
            field: "email".to_string(),
        });
    }
    if !email.validate_email() {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

/// Email must be well formed and the password at least six characters.
pub fn validate_credentials(email: &str, password: &str) -> Result<(), ValidationError> {
    validate_email(email)?;
    if password.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "password".to_string(),
        });
    }
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: PASSWORD_MIN_LENGTH as u64,
        });
    }
    Ok(())
}

/// Parse a `YYYY-MM-DD` birth date.
pub fn parse_birth_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "birth_date".to_string(),
        });
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate {
        field: "birth_date".to_string(),
    })
}

/// Full years between `birth_date` and `today`. Zero for dates in the future.
pub fn calculate_age(birth_date: NaiveDate, today: NaiveDate) -> u32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age.max(0) as u32
}
