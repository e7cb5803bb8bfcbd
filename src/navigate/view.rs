//! Navigation view implementation

use log::debug;
use std::sync::Arc;

use crate::storage::{DirectoryTree, EntryHandle, VirtualPath};

/// Per-connection cursor over the shared directory tree.
///
/// Starts at the root. Only the owning connection moves it, so it needs no locking of
/// its own; every lookup goes through the tree's lock.
#[derive(Debug, Clone)]
pub struct NavigationView {
    current: VirtualPath,
    tree: Arc<DirectoryTree>,
}

impl NavigationView {
    pub fn new(tree: Arc<DirectoryTree>) -> Self {
        Self {
            current: VirtualPath::root(),
            tree,
        }
    }

    pub fn home(&self) -> EntryHandle {
        EntryHandle::new(VirtualPath::root(), Arc::clone(&self.tree))
    }

    pub fn current(&self) -> EntryHandle {
        EntryHandle::new(self.current.clone(), Arc::clone(&self.tree))
    }

    pub fn current_path(&self) -> &VirtualPath {
        &self.current
    }

    /// Moves to `target` if it resolves to an existing directory.
    ///
    /// Returns false and leaves the current directory untouched otherwise.
    pub fn change_directory(&mut self, target: &str) -> bool {
        let resolved = self.current.resolve(target);
        if self.tree.exists(&resolved) {
            debug!("cwd {} -> {}", self.current, resolved);
            self.current = resolved;
            true
        } else {
            false
        }
    }

    /// Handle for `name` relative to the current directory, whether or not it exists.
    pub fn lookup(&self, name: &str) -> EntryHandle {
        EntryHandle::new(self.current.resolve(name), Arc::clone(&self.tree))
    }
}
