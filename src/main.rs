//! listen-ftp - Entry Point
//!
//! Runs the embedded server with an in-memory pipeline standing in for the owning
//! component. The pipeline is attached only after the server is listening.

use log::{error, info};
use std::process;
use std::sync::Arc;

use listen_ftp::utils::setup_logging;
use listen_ftp::{FtpServer, MemorySessionFactory, ServerConfig, SessionFactorySlot};

#[tokio::main]
async fn main() {
    setup_logging();

    info!("Launching FTP server...");

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    let slot = SessionFactorySlot::new();
    let mut server = match FtpServer::from_config(config, slot.clone()) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to create server: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = server.start().await {
        error!("Server startup failed: {}", e);
        process::exit(1);
    }

    let pipeline = Arc::new(MemorySessionFactory::new());
    slot.set(pipeline.clone());
    info!("Pipeline attached; uploads will now be committed");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }

    server.stop().await;
    info!(
        "{} upload(s) committed during this run",
        pipeline.committed().len()
    );
}
