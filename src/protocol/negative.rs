//! Negative completion replies
//!
//! A `NegativeCompletion` carries everything needed to render a failure reply: the
//! reply code, an optional sub-identifier selecting a message template, a free-text
//! message and the entry the command was working on.

use std::fmt;

use crate::protocol::responses::{self, Reply};
use crate::storage::EntryHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegativeCompletion {
    code: u16,
    sub_id: Option<&'static str>,
    basic_message: Option<String>,
    entry: Option<EntryHandle>,
}

impl NegativeCompletion {
    pub fn new(
        code: u16,
        sub_id: Option<&'static str>,
        basic_message: Option<String>,
        entry: Option<EntryHandle>,
    ) -> Self {
        Self {
            code,
            sub_id,
            basic_message,
            entry,
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn sub_id(&self) -> Option<&'static str> {
        self.sub_id
    }

    pub fn basic_message(&self) -> Option<&str> {
        self.basic_message.as_deref()
    }

    pub fn entry(&self) -> Option<&EntryHandle> {
        self.entry.as_ref()
    }

    /// Renders the reply, filling `{path}` and `{message}` into the matching template.
    pub fn to_reply(&self) -> Reply {
        let message = self.basic_message.as_deref().unwrap_or("");
        let path = self
            .entry
            .as_ref()
            .map(EntryHandle::absolute_path)
            .unwrap_or_else(|| message.to_string());

        let text = match template(self.code, self.sub_id) {
            Some(template) => template.replace("{path}", &path).replace("{message}", message),
            None if !message.is_empty() => message.to_string(),
            None => responses::default_message(self.code).to_string(),
        };
        Reply::new(self.code, text)
    }
}

fn template(code: u16, sub_id: Option<&str>) -> Option<&'static str> {
    let template = match (code, sub_id?) {
        (responses::SYNTAX_ERROR_ARGUMENTS, "STOR") => "Syntax error in parameters or arguments.",
        (responses::ACTION_NOT_TAKEN, "STOR.invalid") => "{message}: Not a valid file name.",
        (responses::ACTION_NOT_TAKEN, "STOR.permission") => "{path}: Permission denied.",
        (responses::CANT_OPEN_DATA_CONNECTION, "STOR") => "Can't open data connection.",
        (responses::SERVICE_NOT_AVAILABLE, "STOR") => {
            "Service shutting down, upload of {path} abandoned."
        }
        (responses::TRANSFER_ABORTED, "STOR") => "Data connection closed, upload of {path} aborted.",
        (responses::LOCAL_ERROR, "STOR") => "{path}: Local error in processing.",
        _ => return None,
    };
    Some(template)
}

impl fmt::Display for NegativeCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reply = self.to_reply();
        write!(f, "{} {}", reply.code, reply.message)
    }
}

impl std::error::Error for NegativeCompletion {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DirectoryTree, VirtualPath};
    use std::sync::Arc;

    fn entry(raw: &str) -> EntryHandle {
        EntryHandle::new(VirtualPath::parse(raw), Arc::new(DirectoryTree::new()))
    }

    #[test]
    fn test_template_uses_entry_path() {
        let negative = NegativeCompletion::new(550, Some("STOR.permission"), None, Some(entry("/A/f.txt")));
        assert_eq!(negative.to_reply(), Reply::new(550, "/A/f.txt: Permission denied."));
    }

    #[test]
    fn test_template_uses_basic_message() {
        let negative = NegativeCompletion::new(550, Some("STOR.invalid"), Some("..".to_string()), None);
        assert_eq!(negative.to_reply().message, "..: Not a valid file name.");
    }

    #[test]
    fn test_unknown_sub_id_falls_back() {
        let negative = NegativeCompletion::new(451, Some("OTHER"), Some("disk on fire".to_string()), None);
        assert_eq!(negative.to_reply().message, "disk on fire");

        let bare = NegativeCompletion::new(503, None, None, None);
        assert_eq!(bare.to_reply().message, "Bad sequence of commands.");
    }

    #[test]
    fn test_display_shows_code_and_text() {
        let negative = NegativeCompletion::new(425, Some("STOR"), None, None);
        assert_eq!(negative.to_string(), "425 Can't open data connection.");
    }
}
