//! Entry handles
//!
//! An `EntryHandle` binds one `VirtualPath` to the shared `DirectoryTree`. The protocol
//! layer uses it for metadata queries and directory mutations. Every addressable entry
//! is a directory; there are no files, owners or stored timestamps, and operations that
//! would need them report `StorageError::Unsupported` instead of pretending to succeed.

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::StorageError;
use crate::storage::path::VirtualPath;
use crate::storage::tree::DirectoryTree;

#[derive(Clone)]
pub struct EntryHandle {
    path: VirtualPath,
    tree: Arc<DirectoryTree>,
}

impl EntryHandle {
    pub fn new(path: VirtualPath, tree: Arc<DirectoryTree>) -> Self {
        Self { path, tree }
    }

    pub fn path(&self) -> &VirtualPath {
        &self.path
    }

    /// Canonical absolute path, `/` for the root.
    pub fn absolute_path(&self) -> String {
        self.path.to_string()
    }

    /// Last path segment, `/` for the root.
    pub fn name(&self) -> &str {
        self.path.file_name()
    }

    // --------------------
    // Queries
    // --------------------

    pub fn exists(&self) -> bool {
        self.tree.exists(&self.path)
    }

    pub fn is_directory(&self) -> bool {
        true
    }

    pub fn is_file(&self) -> bool {
        false
    }

    pub fn is_hidden(&self) -> bool {
        false
    }

    pub fn is_readable(&self) -> bool {
        true
    }

    pub fn is_writable(&self) -> bool {
        true
    }

    /// Always true; the tree itself refuses to delete the root.
    pub fn is_removable(&self) -> bool {
        true
    }

    pub fn link_count(&self) -> u32 {
        1
    }

    pub fn size(&self) -> u64 {
        0
    }

    /// No timestamps are stored, so every entry reports the current time.
    pub fn last_modified(&self) -> SystemTime {
        SystemTime::now()
    }

    // --------------------
    // Mutations
    // --------------------

    pub fn create_directory(&self) -> bool {
        self.tree.create(&self.path)
    }

    pub fn delete(&self) -> bool {
        self.tree.delete(&self.path)
    }

    pub fn list_children(&self) -> Vec<EntryHandle> {
        self.tree.list_children(&self.path)
    }

    // --------------------
    // Unsupported
    // --------------------

    pub fn owner_name(&self) -> Result<String, StorageError> {
        Err(StorageError::Unsupported("EntryHandle::owner_name"))
    }

    pub fn group_name(&self) -> Result<String, StorageError> {
        Err(StorageError::Unsupported("EntryHandle::group_name"))
    }

    pub fn set_last_modified(&self, _time: SystemTime) -> Result<(), StorageError> {
        Err(StorageError::Unsupported("EntryHandle::set_last_modified"))
    }

    pub fn move_to(&self, _destination: &EntryHandle) -> Result<(), StorageError> {
        Err(StorageError::Unsupported("EntryHandle::move_to"))
    }

    /// Uploaded bytes go to the pipeline, never into the namespace.
    pub fn create_output_stream(&self, _offset: u64) -> Result<(), StorageError> {
        Err(StorageError::Unsupported("EntryHandle::create_output_stream"))
    }

    pub fn create_input_stream(&self, _offset: u64) -> Result<(), StorageError> {
        Err(StorageError::Unsupported("EntryHandle::create_input_stream"))
    }
}

impl PartialEq for EntryHandle {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for EntryHandle {}

impl fmt::Debug for EntryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryHandle").field("path", &self.path).finish()
    }
}
