//! Credential configuration
//!
//! The server serves a single tenant: either anonymous access or exactly one
//! configured user.

use log::warn;

use crate::error::ServerError;

/// User names accepted when anonymous access is enabled.
pub const ANONYMOUS_USERS: [&str; 2] = ["anonymous", "ftp"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Anonymous,
    User { username: String, password: String },
}

impl Credentials {
    /// Anonymous access is enabled exactly when no username is configured.
    pub fn from_options(
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self, ServerError> {
        match (username, password) {
            (None, None) => Ok(Credentials::Anonymous),
            (None, Some(_)) => {
                warn!("Password configured without a username; enabling anonymous access");
                Ok(Credentials::Anonymous)
            }
            (Some(username), _) if username.trim().is_empty() => Err(ServerError::Credentials(
                "username must not be blank".to_string(),
            )),
            (Some(_), None) => Err(ServerError::Credentials(
                "a password is required when a username is configured".to_string(),
            )),
            (Some(_), Some(password)) if password.is_empty() => Err(ServerError::Credentials(
                "password must not be empty".to_string(),
            )),
            (Some(username), Some(password)) => Ok(Credentials::User {
                username: username.to_string(),
                password: password.to_string(),
            }),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Credentials::Anonymous)
    }
}
