//! Downstream pipeline contract
//!
//! Uploads are committed as units of work through a narrow "create session, write
//! bytes, commit or roll back" contract. The owning component supplies the factory
//! through a `SessionFactorySlot`, possibly long after the server started listening.

pub mod memory;
pub mod session;
pub mod slot;

pub use memory::{FlowUnit, MemorySessionFactory};
pub use session::{RELATIONSHIP_SUCCESS, UnitId, WorkSession, WorkSessionFactory, attributes};
pub use slot::SessionFactorySlot;
