use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::auth::Credentials;
use crate::client::{ConnectionContext, handle_client};
use crate::error::{ServerError, handle_error};
use crate::pipeline::SessionFactorySlot;
use crate::protocol::CommandTable;
use crate::server::config::ServerConfig;
use crate::storage::DirectoryTree;
use crate::transfer::StoreCommand;

/// Embedded FTP server.
///
/// The owning component constructs it with an empty `SessionFactorySlot`, starts
/// it, and fills the slot whenever its pipeline is ready. Uploads that arrive before
/// then wait for the slot to be filled.
pub struct FtpServer {
    config: Arc<ServerConfig>,
    credentials: Arc<Credentials>,
    table: Arc<CommandTable>,
    tree: Arc<DirectoryTree>,
    slot: SessionFactorySlot,
    shutdown: Option<watch::Sender<bool>>,
    accept_task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl FtpServer {
    /// Anonymous access is enabled when `username` is `None`; otherwise both
    /// `username` and `password` are required.
    pub fn new(
        slot: SessionFactorySlot,
        username: Option<&str>,
        password: Option<&str>,
        bind_address: &str,
        port: u16,
    ) -> Result<Self, ServerError> {
        let config = ServerConfig {
            bind_address: bind_address.to_string(),
            control_port: port,
            username: username.map(str::to_string),
            password: password.map(str::to_string),
            ..ServerConfig::default()
        };
        Self::from_config(config, slot)
    }

    pub fn from_config(config: ServerConfig, slot: SessionFactorySlot) -> Result<Self, ServerError> {
        let credentials = Credentials::from_options(config.username.as_deref(), config.password.as_deref())?;
        config.validate()?;

        let table = CommandTable::new(StoreCommand::new(slot.clone(), config.store_settings()));
        Ok(Self {
            config: Arc::new(config),
            credentials: Arc::new(credentials),
            table: Arc::new(table),
            tree: Arc::new(DirectoryTree::new()),
            slot,
            shutdown: None,
            accept_task: None,
            local_addr: None,
        })
    }

    /// Binds the control port and starts accepting connections.
    ///
    /// Returns the bound address, which differs from the configured one when port 0
    /// was requested.
    pub async fn start(&mut self) -> Result<SocketAddr, ServerError> {
        if !self.is_stopped() {
            return Err(ServerError::AlreadyStarted);
        }

        let control_socket = self.config.control_socket();
        let listener = TcpListener::bind(&control_socket)
            .await
            .map_err(|e| ServerError::Bind(control_socket.clone(), e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Bind(control_socket.clone(), e))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let ctx = ConnectionContext {
            config: Arc::clone(&self.config),
            credentials: Arc::clone(&self.credentials),
            table: Arc::clone(&self.table),
            tree: Arc::clone(&self.tree),
            active_clients: Arc::new(AtomicUsize::new(0)),
            shutdown: shutdown_rx,
        };

        info!(
            "Starting FTP server on {} (max {} clients, {} access)",
            local_addr,
            self.config.max_clients,
            if self.credentials.is_anonymous() { "anonymous" } else { "single-user" }
        );
        self.accept_task = Some(tokio::spawn(accept_loop(listener, ctx)));
        self.shutdown = Some(shutdown_tx);
        self.local_addr = Some(local_addr);
        Ok(local_addr)
    }

    /// Stops accepting connections, signals every connection to close and clears
    /// the directory tree.
    pub async fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(task) = self.accept_task.take() {
            if let Err(e) = task.await {
                error!("Accept loop ended abnormally: {}", e);
            }
        }
        self.tree.clear();
        self.local_addr = None;
        info!("FTP server stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.accept_task
            .as_ref()
            .is_none_or(|task| task.is_finished())
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn tree(&self) -> &Arc<DirectoryTree> {
        &self.tree
    }

    pub fn session_factory_slot(&self) -> &SessionFactorySlot {
        &self.slot
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl Drop for FtpServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
    }
}

async fn accept_loop(listener: TcpListener, ctx: ConnectionContext) {
    let mut shutdown = ctx.shutdown.clone();
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let ctx = ctx.clone();
                    // Spawn a task for each client so accept loop doesn't block
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, addr, ctx).await {
                            handle_error(&e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            },
            _ = shutdown.changed() => {
                info!("No longer accepting connections");
                break;
            }
        }
    }
}
