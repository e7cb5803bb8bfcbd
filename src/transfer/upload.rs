//! STOR upload pipeline
//!
//! Receives one upload over the data connection and hands it to the downstream
//! pipeline as a single unit of work. The unit only becomes visible downstream when
//! the whole stream arrived and the work session committed; any failure rolls it back.
//!
//! Every outcome produces exactly one final reply, after which transient session
//! state is reset and the data connection is closed.

use log::{debug, error, info, warn};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

use crate::error::PipelineError;
use crate::pipeline::{
    RELATIONSHIP_SUCCESS, SessionFactorySlot, UnitId, WorkSession, WorkSessionFactory, attributes,
};
use crate::protocol::negative::NegativeCompletion;
use crate::protocol::responses::{self, Reply};
use crate::protocol::session::FtpSession;
use crate::storage::EntryHandle;

const SUB_ID: &str = "STOR";

/// Tunables of the upload pipeline.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Bytes read from the data connection per chunk.
    pub buffer_size: usize,
    /// Delay between checks of an empty factory slot.
    pub poll_interval: Duration,
    /// Upper bound on waiting for the 150 reply to flush.
    pub reply_flush_timeout: Duration,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            buffer_size: 8192,
            poll_interval: Duration::from_millis(10),
            reply_flush_timeout: Duration::from_secs(10),
        }
    }
}

/// Stages an upload passes through, used for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadState {
    Validating,
    Announced,
    DataOpen,
    AwaitingFactory,
    Streaming,
    Finalizing,
}

/// Why streaming into the unit stopped early.
#[derive(Debug)]
enum StreamFailure {
    Connection(io::Error),
    Pipeline(PipelineError),
}

#[derive(Debug, Clone)]
pub struct StoreCommand {
    slot: SessionFactorySlot,
    settings: StoreSettings,
}

impl StoreCommand {
    pub fn new(slot: SessionFactorySlot, settings: StoreSettings) -> Self {
        Self { slot, settings }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Runs STOR for `argument` and writes the final reply.
    ///
    /// The error case only reports that the control connection could not be written.
    pub async fn execute<S: FtpSession>(&self, session: &mut S, argument: Option<&str>) -> io::Result<()> {
        let reply = match self.execute_command(session, argument).await {
            Ok(reply) => reply,
            Err(negative) => {
                debug!("STOR failed: {}", negative);
                negative.to_reply()
            }
        };
        let written = session.write_reply(reply).await;
        session.reset_state();
        session.close_data_connection();
        written
    }

    async fn execute_command<S: FtpSession>(
        &self,
        session: &mut S,
        argument: Option<&str>,
    ) -> Result<Reply, NegativeCompletion> {
        trace_state(UploadState::Validating, argument.unwrap_or(""));
        let file_name = argument.ok_or_else(|| {
            NegativeCompletion::new(responses::SYNTAX_ERROR_ARGUMENTS, Some(SUB_ID), None, None)
        })?;
        check_data_connection(session)?;
        let entry = resolve_entry(session, file_name)?;
        check_write_permission(&entry)?;

        self.send_file_status_okay(session, &entry).await;
        trace_state(UploadState::Announced, &entry.absolute_path());

        let stream = session.open_data_connection().await.map_err(|e| {
            debug!("Could not open data connection for {}: {}", entry.absolute_path(), e);
            negative(responses::CANT_OPEN_DATA_CONNECTION, &entry)
        })?;
        trace_state(UploadState::DataOpen, &entry.absolute_path());

        self.transfer_data(session, stream, &entry).await
    }

    async fn send_file_status_okay<S: FtpSession>(&self, session: &mut S, entry: &EntryHandle) {
        let reply = Reply::new(
            responses::FILE_STATUS_OKAY,
            format!(
                "File status okay; about to open data connection for {}.",
                entry.absolute_path()
            ),
        );
        session.queue_reply(reply);
        match timeout(self.settings.reply_flush_timeout, session.flush_replies()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to send 150 for {}: {}", entry.absolute_path(), e),
            Err(_) => warn!(
                "150 for {} not flushed within {:?}, continuing",
                entry.absolute_path(),
                self.settings.reply_flush_timeout
            ),
        }
    }

    async fn transfer_data<S: FtpSession>(
        &self,
        session: &mut S,
        mut stream: S::DataStream,
        entry: &EntryHandle,
    ) -> Result<Reply, NegativeCompletion> {
        trace_state(UploadState::AwaitingFactory, &entry.absolute_path());
        let factory = self.acquire_factory(session).await.ok_or_else(|| {
            negative(responses::SERVICE_NOT_AVAILABLE, entry)
        })?;

        let mut work = factory.create_session();
        let unit = work.create();

        trace_state(UploadState::Streaming, &entry.absolute_path());
        let received = match self.stream_into(&mut stream, work.as_mut(), unit).await {
            Ok(received) => received,
            Err(failure) => {
                work.rollback();
                return Err(failure_reply(failure, entry));
            }
        };
        drop(stream);

        trace_state(UploadState::Finalizing, &entry.absolute_path());
        if let Err(e) = finish_unit(work.as_mut(), unit, entry) {
            error!("Could not finalize upload of {}: {}", entry.absolute_path(), e);
            work.rollback();
            return Err(negative(responses::LOCAL_ERROR, entry));
        }
        work.commit().map_err(|e| {
            error!("Commit of {} failed: {}", entry.absolute_path(), e);
            negative(responses::LOCAL_ERROR, entry)
        })?;

        info!("File received {} ({} bytes)", entry.absolute_path(), received);
        Ok(Reply::new(
            responses::CLOSING_DATA_CONNECTION,
            format!("Transfer complete ({} bytes).", received),
        ))
    }

    async fn acquire_factory<S: FtpSession>(
        &self,
        session: &S,
    ) -> Option<Arc<dyn WorkSessionFactory>> {
        let mut shutdown = session.shutdown_signal();
        self.slot
            .acquire(self.settings.poll_interval, &mut shutdown)
            .await
    }

    async fn stream_into<R: AsyncRead + Unpin>(
        &self,
        stream: &mut R,
        work: &mut dyn WorkSession,
        unit: UnitId,
    ) -> Result<u64, StreamFailure> {
        let mut buffer = vec![0u8; self.settings.buffer_size.max(1)];
        let mut received = 0u64;
        loop {
            let read = stream
                .read(&mut buffer)
                .await
                .map_err(StreamFailure::Connection)?;
            if read == 0 {
                return Ok(received);
            }
            work.write(unit, &buffer[..read])
                .map_err(StreamFailure::Pipeline)?;
            received += read as u64;
        }
    }
}

fn negative(code: u16, entry: &EntryHandle) -> NegativeCompletion {
    NegativeCompletion::new(code, Some(SUB_ID), None, Some(entry.clone()))
}

fn trace_state(state: UploadState, target: &str) {
    debug!("STOR {}: {:?}", target, state);
}

fn check_data_connection<S: FtpSession>(session: &S) -> Result<(), NegativeCompletion> {
    if session.is_data_connection_negotiated() {
        return Ok(());
    }
    Err(NegativeCompletion::new(
        responses::BAD_SEQUENCE,
        None,
        Some("PORT or PASV must be issued first.".to_string()),
        None,
    ))
}

/// Resolves the upload target. The root and names carrying control characters
/// cannot name an upload.
fn resolve_entry<S: FtpSession>(session: &S, file_name: &str) -> Result<EntryHandle, NegativeCompletion> {
    let entry = session.view().lookup(file_name);
    if entry.path().is_root() || file_name.chars().any(char::is_control) {
        return Err(NegativeCompletion::new(
            responses::ACTION_NOT_TAKEN,
            Some("STOR.invalid"),
            Some(file_name.to_string()),
            None,
        ));
    }
    Ok(entry)
}

fn check_write_permission(entry: &EntryHandle) -> Result<(), NegativeCompletion> {
    if entry.is_writable() {
        return Ok(());
    }
    Err(NegativeCompletion::new(
        responses::ACTION_NOT_TAKEN,
        Some("STOR.permission"),
        Some(entry.absolute_path()),
        Some(entry.clone()),
    ))
}

fn failure_reply(failure: StreamFailure, entry: &EntryHandle) -> NegativeCompletion {
    match failure {
        StreamFailure::Connection(e) if is_connection_loss(&e) => {
            debug!("Data connection lost during upload of {}: {}", entry.absolute_path(), e);
            negative(responses::TRANSFER_ABORTED, entry)
        }
        StreamFailure::Connection(e) => {
            debug!("I/O error during upload of {}: {}", entry.absolute_path(), e);
            negative(responses::LOCAL_ERROR, entry)
        }
        StreamFailure::Pipeline(e) => {
            error!("Pipeline rejected upload of {}: {}", entry.absolute_path(), e);
            negative(responses::LOCAL_ERROR, entry)
        }
    }
}

fn is_connection_loss(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::NotConnected
    )
}

/// Path of the containing directory with a trailing separator, e.g. `/A/`.
fn containing_path(entry: &EntryHandle) -> String {
    match entry.path().parent() {
        Some(parent) if !parent.is_root() => format!("{}/", parent),
        _ => "/".to_string(),
    }
}

fn finish_unit(work: &mut dyn WorkSession, unit: UnitId, entry: &EntryHandle) -> Result<(), PipelineError> {
    work.put_attribute(unit, attributes::FILENAME, entry.name())?;
    work.put_attribute(unit, attributes::PATH, &containing_path(entry))?;
    work.transfer(unit, RELATIONSHIP_SUCCESS)
}
