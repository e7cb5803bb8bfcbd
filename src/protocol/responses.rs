//! FTP Response handling
//!
//! Defines FTP response codes and formatting.

/// Standard FTP response codes
pub const FILE_STATUS_OKAY: u16 = 150;
pub const OK: u16 = 200;
pub const SYSTEM_STATUS: u16 = 211;
pub const FILE_STATUS: u16 = 213;
pub const HELP_MESSAGE: u16 = 214;
pub const SYSTEM_TYPE: u16 = 215;
pub const READY: u16 = 220;
pub const CLOSING_CONTROL_CONNECTION: u16 = 221;
pub const DATA_CONNECTION_OPEN: u16 = 225;
pub const CLOSING_DATA_CONNECTION: u16 = 226;
pub const ENTERING_PASSIVE_MODE: u16 = 227;
pub const ENTERING_EXTENDED_PASSIVE_MODE: u16 = 229;
pub const LOGIN_SUCCESS: u16 = 230;
pub const FILE_ACTION_OKAY: u16 = 250;
pub const PATHNAME_CREATED: u16 = 257;
pub const PASSWORD_REQUIRED: u16 = 331;
pub const SERVICE_NOT_AVAILABLE: u16 = 421;
pub const CANT_OPEN_DATA_CONNECTION: u16 = 425;
pub const TRANSFER_ABORTED: u16 = 426;
pub const LOCAL_ERROR: u16 = 451;
pub const SYNTAX_ERROR_COMMAND: u16 = 500;
pub const SYNTAX_ERROR_ARGUMENTS: u16 = 501;
pub const COMMAND_NOT_IMPLEMENTED: u16 = 502;
pub const BAD_SEQUENCE: u16 = 503;
pub const NOT_IMPLEMENTED_FOR_PARAMETER: u16 = 504;
pub const AUTH_FAILED: u16 = 530;
pub const ACTION_NOT_TAKEN: u16 = 550;

/// A single reply on the control connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub message: String,
}

impl Reply {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Wire form. Messages spanning several lines use the `code-` continuation form.
    pub fn to_wire(&self) -> String {
        let lines: Vec<&str> = self.message.lines().collect();
        match lines.split_last() {
            Some((last, first)) if !first.is_empty() => {
                let mut wire = format!("{}-{}\r\n", self.code, first[0]);
                for line in &first[1..] {
                    wire.push_str(line);
                    wire.push_str("\r\n");
                }
                wire.push_str(&format_response(self.code, last));
                wire
            }
            _ => format_response(self.code, &self.message),
        }
    }
}

/// Format an FTP response message
pub fn format_response(code: u16, message: &str) -> String {
    format!("{} {}\r\n", code, message)
}

/// Generic text for a reply code, used when no specific message applies.
pub fn default_message(code: u16) -> &'static str {
    match code {
        FILE_STATUS_OKAY => "File status okay; about to open data connection.",
        CLOSING_DATA_CONNECTION => "Closing data connection.",
        SERVICE_NOT_AVAILABLE => "Service not available, closing control connection.",
        CANT_OPEN_DATA_CONNECTION => "Can't open data connection.",
        TRANSFER_ABORTED => "Connection closed; transfer aborted.",
        LOCAL_ERROR => "Requested action aborted: local error in processing.",
        SYNTAX_ERROR_COMMAND => "Syntax error, command unrecognized.",
        SYNTAX_ERROR_ARGUMENTS => "Syntax error in parameters or arguments.",
        COMMAND_NOT_IMPLEMENTED => "Command not implemented.",
        BAD_SEQUENCE => "Bad sequence of commands.",
        AUTH_FAILED => "Not logged in.",
        ACTION_NOT_TAKEN => "Requested action not taken.",
        _ => "",
    }
}
