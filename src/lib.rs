//! Embedded single-tenant FTP server.
//!
//! Uploads received with STOR are committed as units of work to a downstream
//! pipeline. Clients see an in-memory directory namespace in which they can create,
//! list, enter and remove directories; nothing is written to disk.

pub mod auth;
pub mod client;
pub mod error;
pub mod middleware;
pub mod navigate;
pub mod pipeline;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod transfer;
pub mod utils;

pub use pipeline::{MemorySessionFactory, SessionFactorySlot, WorkSession, WorkSessionFactory};
pub use server::{FtpServer, ServerConfig};
