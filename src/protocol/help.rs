//! HELP replies

use crate::protocol::responses::{HELP_MESSAGE, Reply};

const VERBS_PER_LINE: usize = 8;

fn syntax(verb: &str) -> Option<&'static str> {
    let syntax = match verb {
        "ABOR" => "Syntax: ABOR",
        "CDUP" | "XCUP" => "Syntax: CDUP",
        "CWD" | "XCWD" => "Syntax: CWD <sp> <pathname>",
        "EPRT" => "Syntax: EPRT <sp> |<net-prt>|<net-addr>|<tcp-port>|",
        "EPSV" => "Syntax: EPSV",
        "FEAT" => "Syntax: FEAT",
        "HELP" => "Syntax: HELP [<sp> <string>]",
        "LIST" => "Syntax: LIST [<sp> <pathname>]",
        "MDTM" => "Syntax: MDTM <sp> <pathname>",
        "MLSD" => "Syntax: MLSD [<sp> <pathname>]",
        "MKD" | "XMKD" => "Syntax: MKD <sp> <pathname>",
        "MODE" => "Syntax: MODE <sp> <mode-code>",
        "NLST" => "Syntax: NLST [<sp> <pathname>]",
        "NOOP" => "Syntax: NOOP",
        "OPTS" => "Syntax: OPTS <sp> <command> [<sp> <options>]",
        "PASS" => "Syntax: PASS <sp> <password>",
        "PASV" => "Syntax: PASV",
        "PORT" => "Syntax: PORT <sp> <host-port>",
        "PWD" | "XPWD" => "Syntax: PWD",
        "QUIT" => "Syntax: QUIT",
        "RMD" | "XRMD" => "Syntax: RMD <sp> <pathname>",
        "SIZE" => "Syntax: SIZE <sp> <pathname>",
        "STAT" => "Syntax: STAT",
        "STOR" => "Syntax: STOR <sp> <pathname>",
        "STRU" => "Syntax: STRU <sp> <structure-code>",
        "SYST" => "Syntax: SYST",
        "TYPE" => "Syntax: TYPE <sp> <type-code>",
        "USER" => "Syntax: USER <sp> <username>",
        _ => return None,
    };
    Some(syntax)
}

/// Help texts for the verbs a command table actually serves.
#[derive(Debug, Clone)]
pub struct HelpIndex {
    verbs: Vec<&'static str>,
    summary: String,
}

impl HelpIndex {
    pub fn new(verbs: impl IntoIterator<Item = &'static str>) -> Self {
        let mut verbs: Vec<&'static str> = verbs.into_iter().collect();
        verbs.sort_unstable();
        verbs.dedup();

        let mut summary = String::from("The following commands are supported.\n");
        for line in verbs.chunks(VERBS_PER_LINE) {
            summary.push_str(&line.join(" "));
            summary.push('\n');
        }
        summary.push_str("End of help.");

        Self { verbs, summary }
    }

    pub fn verbs(&self) -> &[&'static str] {
        &self.verbs
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Syntax line for a supported verb, if one is documented.
    pub fn syntax_for(&self, verb: &str) -> Option<&'static str> {
        let verb = verb.to_ascii_uppercase();
        if !self.verbs.iter().any(|supported| *supported == verb) {
            return None;
        }
        syntax(&verb)
    }

    /// The 214 reply for `HELP` with an optional verb argument.
    pub fn reply_for(&self, argument: Option<&str>) -> Reply {
        match argument.and_then(|verb| self.syntax_for(verb.trim())) {
            Some(syntax) => Reply::new(HELP_MESSAGE, syntax),
            None => Reply::new(HELP_MESSAGE, self.summary.as_str()),
        }
    }
}
