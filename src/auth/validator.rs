//! Authentication validator
//!
//! Checks USER and PASS arguments against the configured `Credentials`.

use super::credentials::{ANONYMOUS_USERS, Credentials};
use crate::error::AuthError;

const MAX_CREDENTIAL_LENGTH: usize = 128;

/// Performs basic input sanitation to check for malicious or malformed usernames/passwords.
fn is_valid_input(input: &str) -> bool {
    !input.trim().is_empty()
        && input.len() <= MAX_CREDENTIAL_LENGTH
        && !input.contains(['\r', '\n', '\0'])
}

/// Validates that the given username may log in.
pub fn validate_user(username: &str, credentials: &Credentials) -> Result<(), AuthError> {
    if !is_valid_input(username) {
        return Err(AuthError::MalformedInput("Invalid username format".into()));
    }

    let known = match credentials {
        Credentials::Anonymous => ANONYMOUS_USERS
            .iter()
            .any(|anonymous| anonymous.eq_ignore_ascii_case(username)),
        Credentials::User { username: expected, .. } => expected == username,
    };
    if known {
        Ok(())
    } else {
        Err(AuthError::UserNotFound(username.to_string()))
    }
}

/// Validates the password for a previously accepted username.
///
/// Anonymous users may send any password, conventionally an e-mail address.
pub fn validate_password(
    username: &str,
    password: &str,
    credentials: &Credentials,
) -> Result<(), AuthError> {
    match credentials {
        Credentials::Anonymous => Ok(()),
        Credentials::User {
            username: expected_user,
            password: expected_password,
        } => {
            if !is_valid_input(password) {
                return Err(AuthError::MalformedInput("Invalid password format".into()));
            }
            if expected_user != username {
                return Err(AuthError::UserNotFound(username.to_string()));
            }
            if expected_password == password {
                Ok(())
            } else {
                Err(AuthError::InvalidPassword(username.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Credentials {
        Credentials::User {
            username: "alice".into(),
            password: "alice123".into(),
        }
    }

    #[test]
    fn test_anonymous_logins() {
        assert!(validate_user("anonymous", &Credentials::Anonymous).is_ok());
        assert!(validate_user("FTP", &Credentials::Anonymous).is_ok());
        assert!(validate_user("alice", &Credentials::Anonymous).is_err());
        assert!(validate_password("anonymous", "me@example.com", &Credentials::Anonymous).is_ok());
    }

    #[test]
    fn test_configured_user() {
        let credentials = user();
        assert!(validate_user("alice", &credentials).is_ok());
        assert!(matches!(
            validate_user("anonymous", &credentials),
            Err(AuthError::UserNotFound(_))
        ));
        assert!(validate_password("alice", "alice123", &credentials).is_ok());
        assert!(matches!(
            validate_password("alice", "wrong", &credentials),
            Err(AuthError::InvalidPassword(_))
        ));
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            validate_user("  ", &user()),
            Err(AuthError::MalformedInput(_))
        ));
        assert!(matches!(
            validate_password("alice", "a\r\nb", &user()),
            Err(AuthError::MalformedInput(_))
        ));
    }
}
