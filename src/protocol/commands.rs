//! Module `commands`
//!
//! Parses raw control-connection lines into requests and defines the status a
//! command leaves the connection in.

/// A parsed command line: an upper-cased verb and its optional raw argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpRequest {
    verb: String,
    argument: Option<String>,
}

impl FtpRequest {
    pub fn new(verb: &str, argument: Option<&str>) -> Self {
        Self {
            verb: verb.to_ascii_uppercase(),
            argument: argument.map(str::to_string),
        }
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    pub fn has_argument(&self) -> bool {
        self.argument.is_some()
    }
}

/// Represents the outcome status of executing a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    Failure(String),
    CloseConnection,
}

/// Parses a raw command string received from a client.
///
/// The verb is everything up to the first whitespace. A blank argument counts as missing.
pub fn parse_command(raw: &str) -> FtpRequest {
    let trimmed = raw.trim_end_matches(['\r', '\n']).trim_start();
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let verb = parts.next().unwrap_or("");
    let argument = parts.next().map(str::trim).filter(|arg| !arg.is_empty());
    FtpRequest::new(verb, argument)
}
