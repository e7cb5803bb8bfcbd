//! FTP Protocol implementation
//!
//! Handles command parsing, dispatch, namespace commands and reply generation.

pub mod commands;
pub mod dispatch;
pub mod handlers;
pub mod help;
pub mod negative;
pub mod responses;
pub mod session;

pub use commands::{CommandStatus, FtpRequest, parse_command};
pub use dispatch::{CommandTable, Handler, TransportCommand};
pub use negative::NegativeCompletion;
pub use responses::Reply;
pub use session::FtpSession;
