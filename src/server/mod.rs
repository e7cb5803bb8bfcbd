//! Server core functionality
//!
//! Lifecycle of the embedded server and its configuration.

pub mod config;
pub mod core;

pub use config::ServerConfig;
pub use core::FtpServer;
