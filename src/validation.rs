//! Request field validation helpers.
//!
//! Serde already enforces the structural shape of request bodies; these
//! helpers cover the value-level rules (non-blank fields, email format)
//! and produce the per-field error map the API returns on 400.

use crate::error::AppError;

/// Reject blank or whitespace-only values.
pub fn require_nonblank(field: &str, value: &str, message: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(field, message));
    }
    Ok(())
}

/// Basic email shape check: one `@` with a non-empty local part and a
/// dotted domain. Deliverability is the mail system's problem.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !email.contains(char::is_whitespace)
}

pub fn require_email(email: &str) -> Result<(), AppError> {
    if !is_valid_email(email) {
        return Err(AppError::validation("email", "invalid email address"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("test@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.co"));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("plainaddress"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("test@"));
        assert!(!is_valid_email("test@localhost"));
        assert!(!is_valid_email("test@.com"));
        assert!(!is_valid_email("te st@example.com"));
    }

    #[test]
    fn test_require_nonblank() {
        assert!(require_nonblank("name", "Jan", "name cannot be blank").is_ok());
        assert!(require_nonblank("name", "   ", "name cannot be blank").is_err());
        assert!(require_nonblank("name", "", "name cannot be blank").is_err());
    }
}
