//! Transport-level commands
//!
//! Login, connection housekeeping and data channel negotiation. These never touch
//! the namespace and are answered by the control connection itself.

use log::{info, warn};
use std::io;
use std::net::{IpAddr, SocketAddr};
use tokio::io::AsyncWrite;

use crate::auth::{self, Credentials};
use crate::client::Client;
use crate::error::{FtpServerError, TransferError, error_to_ftp_code};
use crate::protocol::responses::{self, Reply};
use crate::protocol::{CommandStatus, FtpRequest, FtpSession, TransportCommand};
use crate::server::ServerConfig;
use crate::transfer::{
    DataChannel, format_passive_address, parse_eprt_argument, parse_port_argument,
};

/// Executes `command` and writes its reply.
pub async fn execute<W>(
    command: TransportCommand,
    client: &mut Client<W>,
    request: &FtpRequest,
    credentials: &Credentials,
    config: &ServerConfig,
) -> io::Result<CommandStatus>
where
    W: AsyncWrite + Unpin + Send,
{
    let argument = request.argument();
    let (reply, status) = match command {
        TransportCommand::User => handle_user(client, argument, credentials),
        TransportCommand::Pass => handle_pass(client, argument, credentials),
        TransportCommand::Quit => {
            client.logout();
            (
                Reply::new(responses::CLOSING_CONTROL_CONNECTION, "Goodbye."),
                CommandStatus::CloseConnection,
            )
        }
        TransportCommand::Noop => ok(Reply::new(responses::OK, "NOOP okay.")),
        TransportCommand::Syst => ok(Reply::new(responses::SYSTEM_TYPE, "UNIX Type: L8")),
        TransportCommand::Type => handle_type(argument),
        TransportCommand::Mode => only_accept(argument, "S", "Mode set to S."),
        TransportCommand::Stru => only_accept(argument, "F", "Structure set to F."),
        TransportCommand::Feat => ok(Reply::new(
            responses::SYSTEM_STATUS,
            "Extensions supported:\n EPRT\n EPSV\n MDTM\n MLSD\n SIZE\n UTF8\nEnd",
        )),
        TransportCommand::Opts => handle_opts(argument),
        TransportCommand::Abor => {
            client.close_data_connection();
            ok(Reply::new(responses::DATA_CONNECTION_OPEN, "ABOR command successful."))
        }
        TransportCommand::Stat => ok(Reply::new(
            responses::SYSTEM_STATUS,
            format!(
                "FTP server status:\nConnected from {}\nLogged in as {}\nEnd of status.",
                client.client_addr(),
                client.username().unwrap_or("-")
            ),
        )),
        TransportCommand::Pasv => handle_pasv(client, config).await,
        TransportCommand::Epsv => handle_epsv(client, config).await,
        TransportCommand::Port => handle_active(client, argument, "PORT", parse_port_argument),
        TransportCommand::Eprt => handle_active(client, argument, "EPRT", parse_eprt_argument),
    };

    client.reset_state();
    client.write_reply(reply).await?;
    Ok(status)
}

fn ok(reply: Reply) -> (Reply, CommandStatus) {
    (reply, CommandStatus::Success)
}

fn failure(code: u16, message: impl Into<String>) -> (Reply, CommandStatus) {
    let message = message.into();
    (Reply::new(code, message.clone()), CommandStatus::Failure(message))
}

fn handle_user<W>(
    client: &mut Client<W>,
    argument: Option<&str>,
    credentials: &Credentials,
) -> (Reply, CommandStatus) {
    let Some(username) = argument else {
        return failure(responses::SYNTAX_ERROR_ARGUMENTS, "Username required.");
    };

    client.logout();
    match auth::validate_user(username, credentials) {
        Ok(()) => {
            client.set_username(Some(username.to_string()));
            ok(Reply::new(
                responses::PASSWORD_REQUIRED,
                format!("User name okay, need password for {}.", username),
            ))
        }
        Err(e) => {
            warn!("USER rejected for {}: {}", client.client_addr(), e);
            failure(responses::AUTH_FAILED, "Invalid username.")
        }
    }
}

fn handle_pass<W>(
    client: &mut Client<W>,
    argument: Option<&str>,
    credentials: &Credentials,
) -> (Reply, CommandStatus) {
    if client.is_logged_in() {
        return ok(Reply::new(responses::LOGIN_SUCCESS, "Already logged in."));
    }
    let Some(username) = client.username().map(str::to_string) else {
        return failure(responses::BAD_SEQUENCE, "Login with USER first.");
    };

    match auth::validate_password(&username, argument.unwrap_or(""), credentials) {
        Ok(()) => {
            client.set_logged_in(true);
            info!("{} logged in as {}", client.client_addr(), username);
            ok(Reply::new(responses::LOGIN_SUCCESS, "User logged in, proceed."))
        }
        Err(e) => {
            warn!("PASS rejected for {}: {}", client.client_addr(), e);
            client.logout();
            let code = error_to_ftp_code(&FtpServerError::from(e));
            failure(code, "Authentication failed.")
        }
    }
}

fn handle_type(argument: Option<&str>) -> (Reply, CommandStatus) {
    match argument.map(|a| a.to_ascii_uppercase()) {
        Some(kind) if kind == "I" || kind == "L 8" => {
            ok(Reply::new(responses::OK, "Type set to I."))
        }
        Some(kind) if kind == "A" || kind == "A N" => {
            ok(Reply::new(responses::OK, "Type set to A."))
        }
        Some(_) => failure(
            responses::NOT_IMPLEMENTED_FOR_PARAMETER,
            "Type not implemented for that parameter.",
        ),
        None => failure(responses::SYNTAX_ERROR_ARGUMENTS, "Type required."),
    }
}

fn only_accept(argument: Option<&str>, accepted: &str, message: &str) -> (Reply, CommandStatus) {
    match argument {
        Some(value) if value.eq_ignore_ascii_case(accepted) => ok(Reply::new(responses::OK, message)),
        Some(_) => failure(
            responses::NOT_IMPLEMENTED_FOR_PARAMETER,
            "Command not implemented for that parameter.",
        ),
        None => failure(
            responses::SYNTAX_ERROR_ARGUMENTS,
            responses::default_message(responses::SYNTAX_ERROR_ARGUMENTS),
        ),
    }
}

fn handle_opts(argument: Option<&str>) -> (Reply, CommandStatus) {
    match argument.map(|a| a.to_ascii_uppercase()) {
        Some(option) if option.starts_with("UTF8") => {
            ok(Reply::new(responses::OK, "Always in UTF8 mode."))
        }
        Some(_) => failure(responses::NOT_IMPLEMENTED_FOR_PARAMETER, "Option not supported."),
        None => failure(
            responses::SYNTAX_ERROR_ARGUMENTS,
            responses::default_message(responses::SYNTAX_ERROR_ARGUMENTS),
        ),
    }
}

async fn bind_passive<W>(
    client: &mut Client<W>,
    config: &ServerConfig,
) -> Result<SocketAddr, TransferError> {
    let bind_ip: IpAddr = client.local_addr().ip();
    let channel = DataChannel::passive(
        bind_ip,
        config.data_port_range(),
        client.client_addr().ip(),
    )
    .await?;
    let local_addr = channel
        .local_addr()
        .ok_or(TransferError::DataChannelNotInitialized)?;
    client.set_data_channel(channel);
    Ok(local_addr)
}

async fn handle_pasv<W>(client: &mut Client<W>, config: &ServerConfig) -> (Reply, CommandStatus) {
    if !client.local_addr().is_ipv4() {
        return failure(
            responses::CANT_OPEN_DATA_CONNECTION,
            "PASV requires IPv4, use EPSV.",
        );
    }
    match bind_passive(client, config).await {
        Ok(addr) => match format_passive_address(addr) {
            Some(address) => ok(Reply::new(
                responses::ENTERING_PASSIVE_MODE,
                format!("Entering Passive Mode {}.", address),
            )),
            None => failure(responses::CANT_OPEN_DATA_CONNECTION, "PASV requires IPv4."),
        },
        Err(e) => {
            warn!("PASV failed for {}: {}", client.client_addr(), e);
            failure(
                responses::CANT_OPEN_DATA_CONNECTION,
                responses::default_message(responses::CANT_OPEN_DATA_CONNECTION),
            )
        }
    }
}

async fn handle_epsv<W>(client: &mut Client<W>, config: &ServerConfig) -> (Reply, CommandStatus) {
    match bind_passive(client, config).await {
        Ok(addr) => ok(Reply::new(
            responses::ENTERING_EXTENDED_PASSIVE_MODE,
            format!("Entering Extended Passive Mode (|||{}|).", addr.port()),
        )),
        Err(e) => {
            warn!("EPSV failed for {}: {}", client.client_addr(), e);
            failure(
                responses::CANT_OPEN_DATA_CONNECTION,
                responses::default_message(responses::CANT_OPEN_DATA_CONNECTION),
            )
        }
    }
}

/// PORT and EPRT. Both end in the same active channel once the target is parsed.
fn handle_active<W>(
    client: &mut Client<W>,
    argument: Option<&str>,
    verb: &str,
    parse: fn(&str) -> Result<SocketAddr, TransferError>,
) -> (Reply, CommandStatus) {
    let channel = argument
        .ok_or_else(|| TransferError::InvalidPortCommand("missing argument".into()))
        .and_then(parse)
        .and_then(|target| DataChannel::active(target, client.client_addr()));

    match channel {
        Ok(channel) => {
            client.set_data_channel(channel);
            ok(Reply::new(responses::OK, format!("{} command successful.", verb)))
        }
        Err(e) => {
            warn!("{} rejected for {}: {}", verb, client.client_addr(), e);
            let code = error_to_ftp_code(&FtpServerError::from(e));
            failure(code, format!("Illegal {} command.", verb))
        }
    }
}
