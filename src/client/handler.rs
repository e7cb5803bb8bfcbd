use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::watch;

use crate::auth::Credentials;
use crate::client::{Client, transport};
use crate::error::FtpServerError;
use crate::middleware::logging::{log_command, log_connection};
use crate::navigate::NavigationView;
use crate::protocol::responses::{self, Reply};
use crate::protocol::{CommandStatus, CommandTable, FtpSession, Handler, parse_command};
use crate::server::ServerConfig;
use crate::storage::DirectoryTree;

/// Everything a connection task shares with the server.
#[derive(Clone)]
pub struct ConnectionContext {
    pub config: Arc<ServerConfig>,
    pub credentials: Arc<Credentials>,
    pub table: Arc<CommandTable>,
    pub tree: Arc<DirectoryTree>,
    pub active_clients: Arc<AtomicUsize>,
    pub shutdown: watch::Receiver<bool>,
}

/// Decrements the active client count when the connection ends.
struct ClientSlot(Arc<AtomicUsize>);

impl Drop for ClientSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Handles FTP client session using Tokio async runtime.
///
/// - Greets the client, or turns it away with 421 when the server is full.
/// - Reads command lines, gates everything but login commands on authentication.
/// - Dispatches transport commands itself and everything else through the command table.
/// - Closes with 421 once the server shuts down.
pub async fn handle_client(
    cmd_stream: TcpStream,
    client_addr: SocketAddr,
    ctx: ConnectionContext,
) -> Result<(), FtpServerError> {
    log_connection(&client_addr.to_string());
    let _slot = ClientSlot(Arc::clone(&ctx.active_clients));
    let connected = ctx.active_clients.fetch_add(1, Ordering::SeqCst) + 1;

    let local_addr = cmd_stream.local_addr()?;
    let (read_half, write_half) = cmd_stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut shutdown = ctx.shutdown.clone();
    let mut client = Client::new(
        client_addr,
        local_addr,
        write_half,
        NavigationView::new(Arc::clone(&ctx.tree)),
        ctx.config.connection_timeout(),
        ctx.shutdown.clone(),
    );

    if connected > ctx.config.max_clients {
        warn!("Rejecting {}: {} clients connected", client_addr, connected - 1);
        client
            .write_reply(Reply::new(
                responses::SERVICE_NOT_AVAILABLE,
                "Too many connections. Try again later.",
            ))
            .await?;
        return Ok(());
    }

    client
        .write_reply(Reply::new(responses::READY, "Service ready for new user."))
        .await?;
    info!("Client {} connected ({}/{} clients)", client_addr, connected, ctx.config.max_clients);

    let mut line = String::new();
    loop {
        if *shutdown.borrow() {
            client
                .write_reply(Reply::new(
                    responses::SERVICE_NOT_AVAILABLE,
                    "Service shutting down, closing control connection.",
                ))
                .await?;
            break;
        }

        line.clear();
        let read = tokio::select! {
            read = reader.read_line(&mut line) => read,
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
        };

        match read {
            Ok(0) => {
                info!("Connection closed by client {}", client_addr);
                break;
            }
            Ok(_) => {
                // Enforce command length limit
                if line.len() > ctx.config.max_command_length {
                    client
                        .write_reply(Reply::new(responses::SYNTAX_ERROR_COMMAND, "Command too long."))
                        .await?;
                    continue;
                }

                let request = parse_command(&line);
                if request.verb().is_empty() {
                    continue;
                }
                log_command(&client_addr.to_string(), &line);
                client.set_current_command(request.verb());

                match ctx.table.lookup(request.verb()) {
                    None => {
                        client.reset_state();
                        client
                            .write_reply(Reply::new(
                                responses::SYNTAX_ERROR_COMMAND,
                                responses::default_message(responses::SYNTAX_ERROR_COMMAND),
                            ))
                            .await?;
                    }
                    Some(handler) if !client.is_logged_in() && !handler.allowed_before_login() => {
                        client.reset_state();
                        client
                            .write_reply(Reply::new(
                                responses::AUTH_FAILED,
                                "Please login with USER and PASS.",
                            ))
                            .await?;
                    }
                    Some(Handler::Transport(command)) => {
                        let status = transport::execute(
                            command,
                            &mut client,
                            &request,
                            &ctx.credentials,
                            &ctx.config,
                        )
                        .await?;
                        match status {
                            CommandStatus::CloseConnection => {
                                info!("Client {} requested to quit", client_addr);
                                break;
                            }
                            CommandStatus::Failure(reason) => {
                                debug!("{} failed for {}: {}", request.verb(), client_addr, reason)
                            }
                            CommandStatus::Success => {}
                        }
                    }
                    Some(handler) => {
                        ctx.table.execute(handler, &mut client, &request).await?;
                    }
                }
            }
            Err(e) => {
                error!("Failed to read from {}: {}", client_addr, e);
                break;
            }
        }
    }

    client.close_data_connection();
    info!("Client {} disconnected", client_addr);
    Ok(())
}
