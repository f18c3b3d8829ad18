//! Input normalization shared by the services.

use crate::error::AppError;
use regex::Regex;
use std::sync::OnceLock;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("invalid email regex"))
}

/// Trim and lowercase; `None` when nothing is left.
pub fn normalize_email(raw: Option<&str>) -> Option<String> {
    raw.map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty())
}

/// Normalized, well-formed email or a 400 naming `field`.
pub fn required_email(raw: Option<&str>, field: &str) -> Result<String, AppError> {
    let email = normalize_email(raw).ok_or_else(|| AppError::BadRequest(format!("{} is required", field)))?;
    if !email_pattern().is_match(&email) {
        return Err(AppError::BadRequest(format!("{} must be a valid email", field)));
    }
    Ok(email)
}

/// Trimmed text, `None` if absent or blank.
pub fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

pub fn required_text(raw: Option<&str>, message: &str) -> Result<String, AppError> {
    non_empty(raw).ok_or_else(|| AppError::BadRequest(message.to_string()))
}

/// Display name for a user who gave none: the local part of the email.
pub fn default_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email(Some("  Alice@Example.COM ")), Some("alice@example.com".into()));
        assert_eq!(normalize_email(Some("   ")), None);
        assert_eq!(normalize_email(None), None);
    }

    #[test]
    fn required_email_checks_shape() {
        assert_eq!(required_email(Some("a@b.co"), "email").unwrap(), "a@b.co");
        assert_eq!(
            required_email(None, "email").unwrap_err().to_string(),
            "email is required"
        );
        assert_eq!(
            required_email(Some("not-an-email"), "driverEmail").unwrap_err().to_string(),
            "driverEmail must be a valid email"
        );
    }

    #[test]
    fn default_name_is_local_part() {
        assert_eq!(default_name("sam@example.com"), "sam");
    }

    #[test]
    fn blank_text_is_missing() {
        assert_eq!(non_empty(Some("  x ")), Some("x".into()));
        assert!(required_text(Some(" "), "Missing required fields").is_err());
    }
}
