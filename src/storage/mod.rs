//! In-memory namespace
//!
//! Path model, the shared directory tree and the entry handles built on top of it.
//! Nothing here touches the real file system.

pub mod entry;
pub mod path;
pub mod tree;

pub use entry::EntryHandle;
pub use path::VirtualPath;
pub use tree::DirectoryTree;
