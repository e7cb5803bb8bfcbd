//! Session seam
//!
//! Command handlers never see sockets directly. Everything they need from a
//! connection goes through `FtpSession`, which the transport engine implements for a
//! live control connection and tests implement with in-memory streams.

use std::future::Future;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;

use crate::navigate::NavigationView;
use crate::protocol::responses::Reply;

pub trait FtpSession: Send {
    /// Stream type of an opened data connection.
    type DataStream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Clears per-command transient state. Called once by every handler that runs.
    fn reset_state(&mut self);

    fn view(&self) -> &NavigationView;

    fn view_mut(&mut self) -> &mut NavigationView;

    /// True once PASV, EPSV or PORT has prepared a data connection.
    fn is_data_connection_negotiated(&self) -> bool;

    fn open_data_connection(&mut self) -> impl Future<Output = io::Result<Self::DataStream>> + Send;

    /// Releases the negotiated data connection. Idempotent.
    fn close_data_connection(&mut self);

    /// Appends `reply` to the outgoing control buffer without writing anything.
    fn queue_reply(&mut self, reply: Reply);

    /// Writes every queued reply and flushes the control connection.
    ///
    /// Cancel-safe: bytes not yet accepted by the connection stay queued in order and
    /// go out with the next flush.
    fn flush_replies(&mut self) -> impl Future<Output = io::Result<()>> + Send;

    /// Queues one reply and flushes it.
    fn write_reply(&mut self, reply: Reply) -> impl Future<Output = io::Result<()>> + Send {
        self.queue_reply(reply);
        self.flush_replies()
    }

    /// Flips to `true` when the server begins shutting down.
    fn shutdown_signal(&self) -> watch::Receiver<bool>;
}
