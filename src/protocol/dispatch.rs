//! Command dispatch table
//!
//! Built once per server and shared by every connection. Maps each verb the server
//! understands to a `Handler`. Verbs handled by the transport engine are marked as
//! such so they still show up in HELP.

use log::debug;
use std::collections::HashMap;
use std::io;

use crate::protocol::commands::FtpRequest;
use crate::protocol::handlers;
use crate::protocol::help::HelpIndex;
use crate::protocol::session::FtpSession;
use crate::transfer::StoreCommand;

const DELETE_NOT_SUPPORTED: &str = "Deletion of file system entries is not supported.";

/// Commands implemented by the control connection itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCommand {
    User,
    Pass,
    Quit,
    Noop,
    Syst,
    Type,
    Mode,
    Stru,
    Feat,
    Opts,
    Abor,
    Stat,
    Pasv,
    Epsv,
    Port,
    Eprt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Transport(TransportCommand),
    MakeDirectory,
    RemoveDirectory,
    List,
    NameList,
    MachineList,
    ChangeDirectory,
    ChangeToParent,
    PrintDirectory,
    Size,
    ModificationTime,
    Store,
    Help,
    /// Answered with 502 and the given text.
    Reject(&'static str),
}

impl Handler {
    /// Whether the handler may run before USER/PASS succeeded.
    pub fn allowed_before_login(&self) -> bool {
        matches!(
            self,
            Handler::Transport(
                TransportCommand::User
                    | TransportCommand::Pass
                    | TransportCommand::Quit
                    | TransportCommand::Noop
                    | TransportCommand::Syst
                    | TransportCommand::Feat
            ) | Handler::Help
        )
    }
}

pub struct CommandTable {
    handlers: HashMap<&'static str, Handler>,
    help: HelpIndex,
    store: StoreCommand,
}

impl CommandTable {
    pub fn new(store: StoreCommand) -> Self {
        use TransportCommand::*;

        let mut handlers = HashMap::new();
        for (verb, command) in [
            ("USER", User),
            ("PASS", Pass),
            ("QUIT", Quit),
            ("NOOP", Noop),
            ("SYST", Syst),
            ("TYPE", Type),
            ("MODE", Mode),
            ("STRU", Stru),
            ("FEAT", Feat),
            ("OPTS", Opts),
            ("ABOR", Abor),
            ("STAT", Stat),
            ("PASV", Pasv),
            ("EPSV", Epsv),
            ("PORT", Port),
            ("EPRT", Eprt),
        ] {
            handlers.insert(verb, Handler::Transport(command));
        }

        for (verb, handler) in [
            ("MKD", Handler::MakeDirectory),
            ("XMKD", Handler::MakeDirectory),
            ("RMD", Handler::RemoveDirectory),
            ("XRMD", Handler::RemoveDirectory),
            ("LIST", Handler::List),
            ("NLST", Handler::NameList),
            ("MLSD", Handler::MachineList),
            ("CWD", Handler::ChangeDirectory),
            ("XCWD", Handler::ChangeDirectory),
            ("CDUP", Handler::ChangeToParent),
            ("XCUP", Handler::ChangeToParent),
            ("PWD", Handler::PrintDirectory),
            ("XPWD", Handler::PrintDirectory),
            ("SIZE", Handler::Size),
            ("MDTM", Handler::ModificationTime),
            ("STOR", Handler::Store),
            ("HELP", Handler::Help),
            ("RETR", Handler::Reject("Operation (RETR) not supported.")),
            ("DELE", Handler::Reject(DELETE_NOT_SUPPORTED)),
            ("RNFR", Handler::Reject("Operation (RNFR) not supported.")),
            ("RNTO", Handler::Reject("Operation (RNTO) not supported.")),
            ("REST", Handler::Reject("Operation (REST) not supported.")),
            ("APPE", Handler::Reject("Operation (APPE) not supported.")),
            ("STOU", Handler::Reject("Operation (STOU) not supported.")),
            ("MFMT", Handler::Reject("Operation (MFMT) not supported.")),
        ] {
            handlers.insert(verb, handler);
        }

        let help = HelpIndex::new(
            handlers
                .iter()
                .filter(|(_, handler)| !matches!(handler, Handler::Reject(_)))
                .map(|(verb, _)| *verb),
        );
        debug!("Command table ready with {} verbs", handlers.len());

        Self {
            handlers,
            help,
            store,
        }
    }

    pub fn lookup(&self, verb: &str) -> Option<Handler> {
        self.handlers.get(verb.to_ascii_uppercase().as_str()).copied()
    }

    /// Registered verbs that are actually served, sorted.
    pub fn supported_verbs(&self) -> &[&'static str] {
        self.help.verbs()
    }

    pub fn help(&self) -> &HelpIndex {
        &self.help
    }

    /// Runs a non-transport handler against `session`.
    ///
    /// The error case only reports that the control connection could not be written.
    pub async fn execute<S: FtpSession>(
        &self,
        handler: Handler,
        session: &mut S,
        request: &FtpRequest,
    ) -> io::Result<()> {
        let argument = request.argument();
        match handler {
            Handler::MakeDirectory => handlers::make_directory(session, argument).await,
            Handler::RemoveDirectory => handlers::remove_directory(session, argument).await,
            Handler::List => handlers::list(session, argument, handlers::ListFormat::Long).await,
            Handler::NameList => handlers::list(session, argument, handlers::ListFormat::Names).await,
            Handler::MachineList => {
                handlers::list(session, argument, handlers::ListFormat::Machine).await
            }
            Handler::ChangeDirectory => handlers::change_directory(session, argument).await,
            Handler::ChangeToParent => handlers::change_to_parent(session).await,
            Handler::PrintDirectory => handlers::print_directory(session).await,
            Handler::Size => handlers::size(session, argument).await,
            Handler::ModificationTime => handlers::modification_time(session, argument).await,
            Handler::Store => self.store.execute(session, argument).await,
            Handler::Help => handlers::help(session, &self.help, argument).await,
            Handler::Reject(message) => handlers::reject(session, message).await,
            Handler::Transport(command) => {
                debug!("{:?} must be handled by the control connection", command);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SessionFactorySlot;
    use crate::transfer::StoreSettings;

    fn table() -> CommandTable {
        CommandTable::new(StoreCommand::new(
            SessionFactorySlot::new(),
            StoreSettings::default(),
        ))
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let table = table();
        assert_eq!(table.lookup("stor"), Some(Handler::Store));
        assert_eq!(table.lookup("XMKD"), Some(Handler::MakeDirectory));
        assert_eq!(table.lookup("mlsd"), Some(Handler::MachineList));
        assert_eq!(
            table.lookup("EPRT"),
            Some(Handler::Transport(TransportCommand::Eprt))
        );
        assert_eq!(table.lookup("BOGUS"), None);
    }

    #[test]
    fn test_rejected_verbs() {
        let table = table();
        assert_eq!(
            table.lookup("RETR"),
            Some(Handler::Reject("Operation (RETR) not supported."))
        );
        assert_eq!(table.lookup("DELE"), Some(Handler::Reject(DELETE_NOT_SUPPORTED)));
    }

    #[test]
    fn test_supported_verbs_exclude_rejected_ones() {
        let table = table();
        let verbs = table.supported_verbs();
        assert!(verbs.contains(&"STOR"));
        assert!(verbs.contains(&"PASV"));
        assert!(verbs.contains(&"MLSD"));
        assert!(verbs.contains(&"EPRT"));
        assert_eq!(
            table.help().syntax_for("mlsd"),
            Some("Syntax: MLSD [<sp> <pathname>]")
        );
        assert!(!verbs.contains(&"RETR"));
        assert!(!verbs.contains(&"RNFR"));
        assert!(verbs.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_login_gate() {
        assert!(Handler::Transport(TransportCommand::User).allowed_before_login());
        assert!(Handler::Help.allowed_before_login());
        assert!(!Handler::Store.allowed_before_login());
        assert!(!Handler::Transport(TransportCommand::Pasv).allowed_before_login());
    }
}
