//! Account field validation shared by registration, password changes and
//! seller onboarding.

use crate::error::{CoreError, Result};

const RESERVED_USERNAMES: &[&str] = &[
    "admin", "root", "system", "api", "support", "moderator", "repomart",
];

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;
pub const MAX_DISPLAY_NAME_LEN: usize = 64;

pub fn validate_username(username: &str) -> Result<()> {
    let username = username.trim();

    if username.len() < 3 {
        return Err(CoreError::validation(
            "Username must be at least 3 characters",
        ));
    }

    if username.len() > 32 {
        return Err(CoreError::validation(
            "Username cannot exceed 32 characters",
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(CoreError::validation(
            "Username can only contain letters, numbers, underscores, and hyphens",
        ));
    }

    if RESERVED_USERNAMES.contains(&username.to_ascii_lowercase().as_str()) {
        return Err(CoreError::validation("This username is reserved"));
    }

    Ok(())
}

/// Lower-cased, trimmed address. Rejects anything without exactly one `@`
/// and a dotted domain.
pub fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let invalid = || CoreError::validation("Invalid email address");

    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    if !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || domain.contains("..")
    {
        return Err(invalid());
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> Result<()> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LEN {
        return Err(CoreError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if length > MAX_PASSWORD_LEN {
        return Err(CoreError::validation(format!(
            "Password cannot exceed {MAX_PASSWORD_LEN} characters"
        )));
    }
    if !password.chars().any(char::is_alphabetic)
        || !password.chars().any(|c| c.is_ascii_digit())
    {
        return Err(CoreError::validation(
            "Password must contain at least one letter and one digit",
        ));
    }
    Ok(())
}

/// Falls back to the username when absent or blank.
pub fn normalize_display_name(
    display_name: Option<&str>,
    username: &str,
) -> Result<String> {
    let name = display_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(username.trim());
    if name.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(CoreError::validation(format!(
            "Display name cannot exceed {MAX_DISPLAY_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert!(validate_username("alice_01").is_ok());
        assert!(validate_username("bob-smith").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"x".repeat(33)).is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("émile").is_err());
        assert!(validate_username("Admin").is_err());
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(
            normalize_email("  Alice@Example.COM ").unwrap(),
            "alice@example.com"
        );
        for bad in ["alice", "@example.com", "a@b", "a@@b.com", "a@b.", "a@.b", "a b@c.com"] {
            assert!(normalize_email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("hunter22").is_ok());
        assert!(validate_password("short1").is_err());
        assert!(validate_password("lettersonly").is_err());
        assert!(validate_password("1234567890").is_err());
        assert!(validate_password(&format!("a1{}", "x".repeat(127))).is_err());
    }

    #[test]
    fn display_name_defaults_to_username() {
        assert_eq!(normalize_display_name(None, "alice").unwrap(), "alice");
        assert_eq!(normalize_display_name(Some("  "), "alice").unwrap(), "alice");
        assert_eq!(
            normalize_display_name(Some(" Alice A. "), "alice").unwrap(),
            "Alice A."
        );
        assert!(normalize_display_name(Some(&"n".repeat(65)), "alice").is_err());
    }
}
