//! Client management system
//!
//! Per-connection state and the control connection loop.

pub mod handler;
pub mod state;
pub mod transport;

pub use handler::{ConnectionContext, handle_client};
pub use state::Client;
