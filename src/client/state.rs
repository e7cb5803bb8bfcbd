//! Module `client`
//!
//! Per-connection state: authentication progress, the navigation view, the
//! negotiated data channel and the control connection's write half. `Client` is the
//! transport's implementation of `FtpSession`.

use log::debug;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;

use crate::navigate::NavigationView;
use crate::protocol::{FtpSession, Reply};
use crate::transfer::DataChannel;

/// Represents the state of a connected FTP client.
pub struct Client<W> {
    client_addr: SocketAddr,
    local_addr: SocketAddr,
    username: Option<String>,
    is_logged_in: bool,
    /// Verb currently being executed, cleared by `reset_state`.
    current_command: Option<String>,
    view: NavigationView,
    data_channel: DataChannel,
    data_timeout: Duration,
    writer: W,
    /// Reply bytes not yet accepted by `writer`.
    outgoing: Vec<u8>,
    shutdown: watch::Receiver<bool>,
}

impl<W> Client<W> {
    pub fn new(
        client_addr: SocketAddr,
        local_addr: SocketAddr,
        writer: W,
        view: NavigationView,
        data_timeout: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            client_addr,
            local_addr,
            username: None,
            is_logged_in: false,
            current_command: None,
            view,
            data_channel: DataChannel::Idle,
            data_timeout,
            writer,
            outgoing: Vec::new(),
            shutdown,
        }
    }

    /// Forgets the login and any negotiated data channel.
    pub fn logout(&mut self) {
        self.username = None;
        self.is_logged_in = false;
        self.data_channel.close();
    }

    // --------------------
    // Getter methods
    // --------------------

    pub fn is_logged_in(&self) -> bool {
        self.is_logged_in
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn client_addr(&self) -> SocketAddr {
        self.client_addr
    }

    /// Server side address of the control connection.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn current_command(&self) -> Option<&str> {
        self.current_command.as_deref()
    }

    pub fn data_channel(&self) -> &DataChannel {
        &self.data_channel
    }

    #[cfg(test)]
    pub(crate) fn writer(&self) -> &W {
        &self.writer
    }

    // --------------------
    // Setter methods
    // --------------------

    pub fn set_logged_in(&mut self, logged_in: bool) {
        self.is_logged_in = logged_in;
    }

    pub fn set_username(&mut self, username: Option<String>) {
        self.username = username;
    }

    pub fn set_current_command(&mut self, verb: &str) {
        self.current_command = Some(verb.to_string());
    }

    /// Replaces any previously negotiated channel.
    pub fn set_data_channel(&mut self, channel: DataChannel) {
        if self.data_channel.is_negotiated() {
            debug!("Replacing data channel for {}", self.client_addr);
        }
        self.data_channel = channel;
    }
}

impl<W> FtpSession for Client<W>
where
    W: AsyncWrite + Unpin + Send,
{
    type DataStream = TcpStream;

    fn reset_state(&mut self) {
        self.current_command = None;
    }

    fn view(&self) -> &NavigationView {
        &self.view
    }

    fn view_mut(&mut self) -> &mut NavigationView {
        &mut self.view
    }

    fn is_data_connection_negotiated(&self) -> bool {
        self.data_channel.is_negotiated()
    }

    async fn open_data_connection(&mut self) -> io::Result<TcpStream> {
        let wait = self.data_timeout;
        Ok(self.data_channel.open(wait).await?)
    }

    fn close_data_connection(&mut self) {
        self.data_channel.close();
    }

    fn queue_reply(&mut self, reply: Reply) {
        debug!("Sending response to client {}: {} {}", self.client_addr, reply.code, reply.message);
        self.outgoing.extend_from_slice(reply.to_wire().as_bytes());
    }

    async fn flush_replies(&mut self) -> io::Result<()> {
        while !self.outgoing.is_empty() {
            let written = self.writer.write(&self.outgoing).await?;
            if written == 0 {
                return Err(io::ErrorKind::WriteZero.into());
            }
            self.outgoing.drain(..written);
        }
        self.writer.flush().await
    }

    fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DirectoryTree;
    use std::sync::Arc;
    use tokio::io::AsyncReadExt;

    fn client_with<W>(writer: W) -> Client<W> {
        let (_tx, rx) = watch::channel(false);
        Client::new(
            "127.0.0.1:40000".parse().unwrap(),
            "127.0.0.1:21".parse().unwrap(),
            writer,
            NavigationView::new(Arc::new(DirectoryTree::new())),
            Duration::from_millis(50),
            rx,
        )
    }

    fn client() -> Client<Vec<u8>> {
        client_with(Vec::new())
    }

    #[tokio::test]
    async fn test_write_reply_uses_wire_format() {
        let mut client = client();
        client.write_reply(Reply::new(220, "ready")).await.unwrap();
        assert_eq!(client.writer, b"220 ready\r\n");
    }

    #[tokio::test]
    async fn test_interrupted_flush_keeps_replies_intact() {
        let (writer, mut reader) = tokio::io::duplex(8);
        let mut client = client_with(writer);

        client.queue_reply(Reply::new(150, "About to open data connection."));
        let flushed =
            tokio::time::timeout(Duration::from_millis(20), client.flush_replies()).await;
        assert!(flushed.is_err());

        let received = tokio::spawn(async move {
            let mut received = String::new();
            reader.read_to_string(&mut received).await.unwrap();
            received
        });
        client
            .write_reply(Reply::new(226, "Transfer complete."))
            .await
            .unwrap();
        drop(client);

        assert_eq!(
            received.await.unwrap(),
            "150 About to open data connection.\r\n226 Transfer complete.\r\n"
        );
    }

    #[test]
    fn test_reset_state_clears_current_command() {
        let mut client = client();
        client.set_current_command("STOR");
        assert_eq!(client.current_command(), Some("STOR"));
        client.reset_state();
        assert_eq!(client.current_command(), None);
    }

    #[tokio::test]
    async fn test_open_without_negotiation_fails() {
        let mut client = client();
        assert!(!client.is_data_connection_negotiated());
        assert!(client.open_data_connection().await.is_err());
    }

    #[test]
    fn test_logout_clears_login() {
        let mut client = client();
        client.set_username(Some("user".into()));
        client.set_logged_in(true);
        client.logout();
        assert!(!client.is_logged_in());
        assert_eq!(client.username(), None);
    }
}
