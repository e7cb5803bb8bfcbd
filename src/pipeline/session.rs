//! Work-session traits

use crate::error::PipelineError;

/// Identifier of a unit of work inside one work session.
pub type UnitId = u64;

/// Route every fully received upload is transferred to.
pub const RELATIONSHIP_SUCCESS: &str = "success";

/// Attribute keys attached to every committed upload.
pub mod attributes {
    /// Name of the stored entry, e.g. `f.txt`.
    pub const FILENAME: &str = "filename";
    /// Containing path with a trailing separator, e.g. `/A/`.
    pub const PATH: &str = "path";
}

/// Produces independent work sessions. Shared across all connections.
pub trait WorkSessionFactory: Send + Sync {
    fn create_session(&self) -> Box<dyn WorkSession>;
}

/// A transactional container for units of work.
///
/// Nothing written to a session is visible downstream until `commit` succeeds.
pub trait WorkSession: Send {
    /// Creates an empty unit of work.
    fn create(&mut self) -> UnitId;

    /// Appends content to a unit.
    fn write(&mut self, unit: UnitId, bytes: &[u8]) -> Result<(), PipelineError>;

    fn put_attribute(&mut self, unit: UnitId, key: &str, value: &str) -> Result<(), PipelineError>;

    /// Routes a unit to a named relationship.
    fn transfer(&mut self, unit: UnitId, relationship: &str) -> Result<(), PipelineError>;

    fn commit(self: Box<Self>) -> Result<(), PipelineError>;

    /// Discards every unit created in this session.
    fn rollback(self: Box<Self>);
}
