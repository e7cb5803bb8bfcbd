//! Shared in-memory directory tree
//!
//! The namespace is a flat set of existing paths rather than linked nodes. Parent and
//! child relationships are computed from path segments, so deletion is a filter over
//! the set. Every operation takes the same lock, so no caller ever observes a
//! half-applied mutation.

use log::debug;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::storage::entry::EntryHandle;
use crate::storage::path::VirtualPath;

/// Registry of every directory that currently exists. Always contains the root.
#[derive(Debug)]
pub struct DirectoryTree {
    paths: Mutex<HashSet<VirtualPath>>,
}

impl Default for DirectoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryTree {
    pub fn new() -> Self {
        let mut paths = HashSet::new();
        paths.insert(VirtualPath::root());
        Self {
            paths: Mutex::new(paths),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<VirtualPath>> {
        // A panic while holding the lock cannot leave the set half-updated.
        self.paths.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds `path`. Returns false if it already exists. Parents are not created.
    pub fn create(&self, path: &VirtualPath) -> bool {
        let created = self.lock().insert(path.clone());
        debug!("mkdir {} -> {}", path, created);
        created
    }

    pub fn exists(&self, path: &VirtualPath) -> bool {
        self.lock().contains(path)
    }

    /// Removes `path` and all of its descendants.
    ///
    /// Returns false for the root or for a path that does not exist.
    pub fn delete(&self, path: &VirtualPath) -> bool {
        if path.is_root() {
            return false;
        }
        let mut paths = self.lock();
        if !paths.contains(path) {
            return false;
        }
        let before = paths.len();
        paths.retain(|existing| !path.is_ancestor_of(existing));
        debug!("rmdir {} removed {} entries", path, before - paths.len());
        true
    }

    /// Direct children of `parent`. Empty when `parent` has none or does not exist.
    pub fn list_children(self: &Arc<Self>, parent: &VirtualPath) -> Vec<EntryHandle> {
        let child_depth = parent.segment_count() + 1;
        let paths = self.lock();
        if !paths.contains(parent) {
            return Vec::new();
        }
        paths
            .iter()
            .filter(|existing| {
                existing.segment_count() == child_depth
                    && existing.parent().as_ref() == Some(parent)
            })
            .map(|existing| EntryHandle::new(existing.clone(), Arc::clone(self)))
            .collect()
    }

    /// Number of existing paths, root included.
    pub fn size(&self) -> usize {
        self.lock().len()
    }

    /// Drops everything but the root.
    pub fn clear(&self) {
        let mut paths = self.lock();
        paths.clear();
        paths.insert(VirtualPath::root());
    }
}
