//! Error types
//!
//! Defines domain-specific error types for each module of the FTP server.

use std::fmt;
use std::io;
use std::net::SocketAddr;

use crate::pipeline::UnitId;

/// Authentication module errors
#[derive(Debug)]
pub enum AuthError {
    InvalidPassword(String),
    UserNotFound(String),
    MalformedInput(String),
    NotLoggedIn,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidPassword(u) => write!(f, "Invalid password for user: {}", u),
            AuthError::UserNotFound(u) => write!(f, "User not found: {}", u),
            AuthError::MalformedInput(s) => write!(f, "Malformed input: {}", s),
            AuthError::NotLoggedIn => write!(f, "User not logged in"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Virtual namespace errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The entry handle has no meaning for this operation (no file content, owners or renames).
    Unsupported(&'static str),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unsupported(op) => write!(f, "Unsupported operation: {}", op),
        }
    }
}

impl std::error::Error for StorageError {}

/// Transfer module errors
#[derive(Debug)]
pub enum TransferError {
    DataChannelNotInitialized,
    PortBindingFailed(SocketAddr, io::Error),
    NoAvailablePort,
    ConnectionTimeout(SocketAddr),
    InvalidPortCommand(String),
    IpMismatch { expected: String, provided: String },
    InvalidPortRange(u16),
    TransferFailed(io::Error),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::DataChannelNotInitialized => write!(f, "Data channel not initialized"),
            TransferError::PortBindingFailed(addr, e) => {
                write!(f, "Failed to bind to {}: {}", addr, e)
            }
            TransferError::NoAvailablePort => write!(f, "No available port for data connection"),
            TransferError::ConnectionTimeout(addr) => {
                write!(f, "Timeout waiting for data connection on {}", addr)
            }
            TransferError::InvalidPortCommand(msg) => write!(f, "Invalid PORT command: {}", msg),
            TransferError::IpMismatch { expected, provided } => {
                write!(f, "IP mismatch: expected {}, got {}", expected, provided)
            }
            TransferError::InvalidPortRange(port) => {
                write!(f, "Invalid port {}: must be between 1024 and 65535", port)
            }
            TransferError::TransferFailed(e) => write!(f, "Transfer failed: {}", e),
        }
    }
}

impl std::error::Error for TransferError {}

impl From<TransferError> for io::Error {
    fn from(error: TransferError) -> Self {
        match error {
            TransferError::PortBindingFailed(_, e) | TransferError::TransferFailed(e) => e,
            TransferError::ConnectionTimeout(addr) => io::Error::new(
                io::ErrorKind::TimedOut,
                format!("Timeout waiting for data connection on {}", addr),
            ),
            other => io::Error::new(io::ErrorKind::NotConnected, other.to_string()),
        }
    }
}

/// Downstream pipeline errors raised by work sessions
#[derive(Debug)]
pub enum PipelineError {
    UnknownUnit(UnitId),
    Write(io::Error),
    CommitFailed(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::UnknownUnit(id) => write!(f, "Unknown unit of work: {}", id),
            PipelineError::Write(e) => write!(f, "Failed to write unit content: {}", e),
            PipelineError::CommitFailed(msg) => write!(f, "Commit failed: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<io::Error> for PipelineError {
    fn from(error: io::Error) -> Self {
        PipelineError::Write(error)
    }
}

/// Startup and configuration errors surfaced to the owning component
#[derive(Debug)]
pub enum ServerError {
    Credentials(String),
    Bind(String, io::Error),
    Config(config::ConfigError),
    AlreadyStarted,
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Credentials(msg) => write!(f, "Invalid credentials: {}", msg),
            ServerError::Bind(addr, e) => write!(f, "Failed to bind to {}: {}", addr, e),
            ServerError::Config(e) => write!(f, "Configuration error: {}", e),
            ServerError::AlreadyStarted => write!(f, "Server already started"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<config::ConfigError> for ServerError {
    fn from(error: config::ConfigError) -> Self {
        ServerError::Config(error)
    }
}

/// General FTP server error that encompasses all error types
#[derive(Debug)]
pub enum FtpServerError {
    Auth(AuthError),
    Storage(StorageError),
    Transfer(TransferError),
    Pipeline(PipelineError),
    Server(ServerError),
    IoError(io::Error),
}

impl fmt::Display for FtpServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FtpServerError::Auth(e) => write!(f, "Authentication error: {}", e),
            FtpServerError::Storage(e) => write!(f, "Storage error: {}", e),
            FtpServerError::Transfer(e) => write!(f, "Transfer error: {}", e),
            FtpServerError::Pipeline(e) => write!(f, "Pipeline error: {}", e),
            FtpServerError::Server(e) => write!(f, "Server error: {}", e),
            FtpServerError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for FtpServerError {}

impl From<AuthError> for FtpServerError {
    fn from(error: AuthError) -> Self {
        FtpServerError::Auth(error)
    }
}

impl From<StorageError> for FtpServerError {
    fn from(error: StorageError) -> Self {
        FtpServerError::Storage(error)
    }
}

impl From<TransferError> for FtpServerError {
    fn from(error: TransferError) -> Self {
        FtpServerError::Transfer(error)
    }
}

impl From<PipelineError> for FtpServerError {
    fn from(error: PipelineError) -> Self {
        FtpServerError::Pipeline(error)
    }
}

impl From<ServerError> for FtpServerError {
    fn from(error: ServerError) -> Self {
        FtpServerError::Server(error)
    }
}

impl From<io::Error> for FtpServerError {
    fn from(error: io::Error) -> Self {
        FtpServerError::IoError(error)
    }
}
