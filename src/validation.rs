//! Username validation shared by self-service registration and the CLI.
//!
//! Usernames become part of sled key paths (`accounts:{name}`,
//! `attendance:{name}:{date}`), so the accepted charset is deliberately
//! narrow: ASCII letters, digits, underscore, hyphen, and dot. Colons and
//! whitespace would corrupt key prefixes and are rejected outright.

use std::collections::HashSet;

/// Username validation errors with user-facing messages.
#[derive(Debug, thiserror::Error)]
pub enum UsernameError {
    #[error("username is too short (minimum {min} characters)")]
    TooShort { min: usize },

    #[error("username is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("username cannot start or end with whitespace")]
    InvalidWhitespace,

    #[error("username may only contain letters, digits, '_', '-' and '.'")]
    InvalidCharacters,

    #[error("username is a reserved system name")]
    Reserved,
}

pub const MIN_USERNAME_LEN: usize = 2;
pub const MAX_USERNAME_LEN: usize = 30;

fn reserved_names() -> HashSet<&'static str> {
    [
        // System/admin terms
        "admin", "administrator", "root", "system", "operator", "guest",
        "anonymous", "everyone", "nobody", "server", "gowork",
        // Role names, to keep dashboards unambiguous
        "employee", "manager", "moderator",
        // Platform-specific reserved device names
        "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5",
        "com6", "com7", "com8", "com9", "lpt1", "lpt2", "lpt3", "lpt4",
        "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
    ]
    .iter()
    .copied()
    .collect()
}

/// Validate a username, returning the accepted form (original case, used
/// for display; storage lowercases for key lookup).
pub fn validate_username(username: &str) -> Result<String, UsernameError> {
    let trimmed = username.trim();

    if trimmed != username {
        return Err(UsernameError::InvalidWhitespace);
    }
    if trimmed.len() < MIN_USERNAME_LEN {
        return Err(UsernameError::TooShort {
            min: MIN_USERNAME_LEN,
        });
    }
    if trimmed.len() > MAX_USERNAME_LEN {
        return Err(UsernameError::TooLong {
            max: MAX_USERNAME_LEN,
        });
    }

    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(UsernameError::InvalidCharacters);
    }
    // Leading dots hide files on Unix and ".." invites path confusion.
    if trimmed.starts_with('.') || trimmed.contains("..") {
        return Err(UsernameError::InvalidCharacters);
    }

    if reserved_names().contains(trimmed.to_ascii_lowercase().as_str()) {
        return Err(UsernameError::Reserved);
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_usernames() {
        assert!(validate_username("maria").is_ok());
        assert!(validate_username("jane_doe").is_ok());
        assert!(validate_username("alex-99").is_ok());
        assert!(validate_username("j.smith").is_ok());
        assert_eq!(validate_username("Maria").unwrap(), "Maria");
    }

    #[test]
    fn rejects_key_breaking_characters() {
        assert!(validate_username("a:b").is_err());
        assert!(validate_username("jane doe").is_err());
        assert!(validate_username("user/name").is_err());
        assert!(validate_username("emoji🙂").is_err());
        assert!(validate_username(" padded").is_err());
    }

    #[test]
    fn rejects_dot_tricks() {
        assert!(validate_username(".hidden").is_err());
        assert!(validate_username("a..b").is_err());
    }

    #[test]
    fn rejects_reserved_and_bad_lengths() {
        assert!(matches!(
            validate_username("admin"),
            Err(UsernameError::Reserved)
        ));
        assert!(matches!(
            validate_username("Manager"),
            Err(UsernameError::Reserved)
        ));
        assert!(matches!(
            validate_username("x"),
            Err(UsernameError::TooShort { .. })
        ));
        let long = "a".repeat(31);
        assert!(matches!(
            validate_username(&long),
            Err(UsernameError::TooLong { .. })
        ));
    }
}
