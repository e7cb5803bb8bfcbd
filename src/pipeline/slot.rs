//! Work-session factory slot
//!
//! The server starts accepting connections before its owner can hand over a
//! factory. The slot is a single-assignment cell: the owner sets it once, and the
//! upload handler polls it with a short sleep between attempts. There is no signal
//! back to the waiters, so readers only ever do an atomic load.

use log::{debug, warn};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::watch;

use crate::pipeline::WorkSessionFactory;

#[derive(Clone, Default)]
pub struct SessionFactorySlot {
    factory: Arc<OnceLock<Arc<dyn WorkSessionFactory>>>,
}

impl SessionFactorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `factory` if the slot is still empty. Returns false if it was already set.
    pub fn set(&self, factory: Arc<dyn WorkSessionFactory>) -> bool {
        let stored = self.factory.set(factory).is_ok();
        if !stored {
            debug!("Work-session factory already set; keeping the first one");
        }
        stored
    }

    pub fn get(&self) -> Option<Arc<dyn WorkSessionFactory>> {
        self.factory.get().cloned()
    }

    pub fn is_set(&self) -> bool {
        self.factory.get().is_some()
    }

    /// Waits until a factory is available, re-checking every `poll_interval`.
    ///
    /// The wait itself is unbounded. It only gives up, returning `None`, when the
    /// server signals shutdown or is dropped.
    pub async fn acquire(
        &self,
        poll_interval: Duration,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Option<Arc<dyn WorkSessionFactory>> {
        let mut announced = false;
        loop {
            if let Some(factory) = self.get() {
                return Some(factory);
            }
            if *shutdown.borrow() {
                warn!("Shutdown requested while waiting for a work-session factory");
                return None;
            }
            if !announced {
                debug!("Work-session factory not available yet, polling every {:?}", poll_interval);
                announced = true;
            }
            tokio::select! {
                _ = tokio::time::sleep(poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for SessionFactorySlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFactorySlot")
            .field("is_set", &self.is_set())
            .finish()
    }
}
