//! Namespace command handlers
//!
//! Every handler resets the session's transient state, does its work against the
//! navigation view, and writes exactly one final reply.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::io;
use tokio::io::AsyncWriteExt;

use crate::protocol::help::HelpIndex;
use crate::protocol::responses::{self, Reply};
use crate::protocol::session::FtpSession;
use crate::storage::EntryHandle;

/// Output flavour of a directory listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    /// `ls -l` style lines (LIST).
    Long,
    /// Bare names (NLST).
    Names,
    /// RFC 3659 facts (MLSD).
    Machine,
}

fn syntax_error() -> Reply {
    Reply::new(
        responses::SYNTAX_ERROR_ARGUMENTS,
        responses::default_message(responses::SYNTAX_ERROR_ARGUMENTS),
    )
}

fn no_such_directory(argument: &str) -> Reply {
    Reply::new(
        responses::ACTION_NOT_TAKEN,
        format!("{}: No such directory.", argument),
    )
}

pub async fn make_directory<S: FtpSession>(session: &mut S, argument: Option<&str>) -> io::Result<()> {
    session.reset_state();
    let Some(argument) = argument else {
        return session.write_reply(syntax_error()).await;
    };

    let entry = session.view().lookup(argument);
    if !entry.create_directory() {
        debug!("MKD {}: directory already exists", entry.absolute_path());
    }
    session
        .write_reply(Reply::new(
            responses::PATHNAME_CREATED,
            format!("\"{}\" directory created.", entry.absolute_path()),
        ))
        .await
}

pub async fn remove_directory<S: FtpSession>(session: &mut S, argument: Option<&str>) -> io::Result<()> {
    session.reset_state();
    let Some(argument) = argument else {
        return session.write_reply(syntax_error()).await;
    };

    let entry = session.view().lookup(argument);
    let reply = if entry.delete() {
        Reply::new(responses::FILE_ACTION_OKAY, "Directory removed.")
    } else if entry.path().is_root() {
        Reply::new(responses::ACTION_NOT_TAKEN, "The root directory cannot be removed.")
    } else {
        no_such_directory(argument)
    };
    session.write_reply(reply).await
}

pub async fn change_directory<S: FtpSession>(session: &mut S, argument: Option<&str>) -> io::Result<()> {
    session.reset_state();
    let Some(argument) = argument else {
        return session.write_reply(syntax_error()).await;
    };

    let reply = if session.view_mut().change_directory(argument) {
        Reply::new(
            responses::FILE_ACTION_OKAY,
            format!("Directory changed to {}", session.view().current_path()),
        )
    } else {
        no_such_directory(argument)
    };
    session.write_reply(reply).await
}

pub async fn change_to_parent<S: FtpSession>(session: &mut S) -> io::Result<()> {
    session.reset_state();
    session.view_mut().change_directory("..");
    let reply = Reply::new(
        responses::FILE_ACTION_OKAY,
        format!("Directory changed to {}", session.view().current_path()),
    );
    session.write_reply(reply).await
}

pub async fn print_directory<S: FtpSession>(session: &mut S) -> io::Result<()> {
    session.reset_state();
    let reply = Reply::new(
        responses::PATHNAME_CREATED,
        format!("\"{}\" is current directory.", session.view().current_path()),
    );
    session.write_reply(reply).await
}

pub async fn size<S: FtpSession>(session: &mut S, argument: Option<&str>) -> io::Result<()> {
    session.reset_state();
    let Some(argument) = argument else {
        return session.write_reply(syntax_error()).await;
    };

    let entry = session.view().lookup(argument);
    let reply = if entry.exists() {
        Reply::new(responses::FILE_STATUS, entry.size().to_string())
    } else {
        no_such_directory(argument)
    };
    session.write_reply(reply).await
}

pub async fn modification_time<S: FtpSession>(
    session: &mut S,
    argument: Option<&str>,
) -> io::Result<()> {
    session.reset_state();
    let Some(argument) = argument else {
        return session.write_reply(syntax_error()).await;
    };

    let entry = session.view().lookup(argument);
    let reply = if entry.exists() {
        let modified: DateTime<Utc> = entry.last_modified().into();
        Reply::new(
            responses::FILE_STATUS,
            modified.format("%Y%m%d%H%M%S").to_string(),
        )
    } else {
        no_such_directory(argument)
    };
    session.write_reply(reply).await
}

pub async fn help<S: FtpSession>(
    session: &mut S,
    index: &HelpIndex,
    argument: Option<&str>,
) -> io::Result<()> {
    session.reset_state();
    session.write_reply(index.reply_for(argument)).await
}

pub async fn reject<S: FtpSession>(session: &mut S, message: &'static str) -> io::Result<()> {
    session.reset_state();
    session
        .write_reply(Reply::new(responses::COMMAND_NOT_IMPLEMENTED, message))
        .await
}

/// LIST, NLST and MLSD. Option arguments such as `-la` are skipped.
pub async fn list<S: FtpSession>(
    session: &mut S,
    argument: Option<&str>,
    format: ListFormat,
) -> io::Result<()> {
    session.reset_state();
    let target = argument.and_then(listing_target);
    let result = send_listing(session, target, format).await;
    session.close_data_connection();
    result
}

async fn send_listing<S: FtpSession>(
    session: &mut S,
    target: Option<&str>,
    format: ListFormat,
) -> io::Result<()> {
    if !session.is_data_connection_negotiated() {
        return session
            .write_reply(Reply::new(
                responses::BAD_SEQUENCE,
                "PORT or PASV must be issued first.",
            ))
            .await;
    }

    let directory = match target {
        Some(target) => session.view().lookup(target),
        None => session.view().current(),
    };
    if !directory.exists() {
        return session
            .write_reply(no_such_directory(&directory.absolute_path()))
            .await;
    }

    let mut children = directory.list_children();
    children.sort_by(|a, b| a.name().cmp(b.name()));
    let listing: String = children
        .iter()
        .map(|entry| format_entry(entry, format))
        .collect();

    session
        .write_reply(Reply::new(
            responses::FILE_STATUS_OKAY,
            "Here comes the directory listing.",
        ))
        .await?;

    let mut stream = match session.open_data_connection().await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Could not open data connection for listing: {}", e);
            return session
                .write_reply(Reply::new(
                    responses::CANT_OPEN_DATA_CONNECTION,
                    responses::default_message(responses::CANT_OPEN_DATA_CONNECTION),
                ))
                .await;
        }
    };

    let sent = async {
        stream.write_all(listing.as_bytes()).await?;
        stream.shutdown().await
    }
    .await;

    let reply = match sent {
        Ok(()) => Reply::new(responses::CLOSING_DATA_CONNECTION, "Directory send OK."),
        Err(e) => {
            warn!("Listing transfer failed: {}", e);
            Reply::new(
                responses::TRANSFER_ABORTED,
                responses::default_message(responses::TRANSFER_ABORTED),
            )
        }
    };
    drop(stream);
    session.write_reply(reply).await
}

fn listing_target(argument: &str) -> Option<&str> {
    let mut rest = argument.trim_start();
    while rest.starts_with('-') {
        rest = match rest.split_once(char::is_whitespace) {
            Some((_, remainder)) => remainder.trim_start(),
            None => "",
        };
    }
    (!rest.is_empty()).then_some(rest)
}

fn format_entry(entry: &EntryHandle, format: ListFormat) -> String {
    match format {
        ListFormat::Names => format!("{}\r\n", entry.name()),
        ListFormat::Machine => {
            let modified: DateTime<Utc> = entry.last_modified().into();
            let kind = if entry.is_directory() { "dir" } else { "file" };
            format!(
                "type={};size={};modify={}; {}\r\n",
                kind,
                entry.size(),
                modified.format("%Y%m%d%H%M%S"),
                entry.name()
            )
        }
        ListFormat::Long => {
            let modified: DateTime<Utc> = entry.last_modified().into();
            let kind = if entry.is_directory() { 'd' } else { '-' };
            format!(
                "{}rwxrwxrwx {:>3} ftp ftp {:>12} {} {}\r\n",
                kind,
                entry.link_count(),
                entry.size(),
                modified.format("%b %e %H:%M"),
                entry.name()
            )
        }
    }
}
