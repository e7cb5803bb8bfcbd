//! In-memory pipeline
//!
//! Keeps committed units in process memory. Used by the demo binary and by tests as
//! the owning component's stand-in.

use log::{debug, info};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::PipelineError;
use crate::pipeline::{UnitId, WorkSession, WorkSessionFactory};

/// A unit of work as seen downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowUnit {
    pub id: UnitId,
    pub content: Vec<u8>,
    pub attributes: HashMap<String, String>,
    pub relationship: Option<String>,
}

impl FlowUnit {
    pub fn size(&self) -> usize {
        self.content.len()
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: UnitId,
    sessions_created: usize,
    rollbacks: usize,
    committed: Vec<FlowUnit>,
}

#[derive(Debug, Clone, Default)]
pub struct MemorySessionFactory {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        lock_state(&self.state)
    }

    /// Every unit committed so far, in commit order.
    pub fn committed(&self) -> Vec<FlowUnit> {
        self.lock().committed.clone()
    }

    pub fn committed_to(&self, relationship: &str) -> Vec<FlowUnit> {
        self.lock()
            .committed
            .iter()
            .filter(|unit| unit.relationship.as_deref() == Some(relationship))
            .cloned()
            .collect()
    }

    pub fn session_count(&self) -> usize {
        self.lock().sessions_created
    }

    pub fn rollback_count(&self) -> usize {
        self.lock().rollbacks
    }
}

impl WorkSessionFactory for MemorySessionFactory {
    fn create_session(&self) -> Box<dyn WorkSession> {
        self.lock().sessions_created += 1;
        Box::new(MemorySession {
            state: Arc::clone(&self.state),
            pending: HashMap::new(),
        })
    }
}

fn lock_state(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct MemorySession {
    state: Arc<Mutex<MemoryState>>,
    pending: HashMap<UnitId, FlowUnit>,
}

impl MemorySession {
    fn unit_mut(&mut self, unit: UnitId) -> Result<&mut FlowUnit, PipelineError> {
        self.pending
            .get_mut(&unit)
            .ok_or(PipelineError::UnknownUnit(unit))
    }
}

impl WorkSession for MemorySession {
    fn create(&mut self) -> UnitId {
        let id = {
            let mut state = lock_state(&self.state);
            state.next_id += 1;
            state.next_id
        };
        self.pending.insert(
            id,
            FlowUnit {
                id,
                ..FlowUnit::default()
            },
        );
        id
    }

    fn write(&mut self, unit: UnitId, bytes: &[u8]) -> Result<(), PipelineError> {
        self.unit_mut(unit)?.content.extend_from_slice(bytes);
        Ok(())
    }

    fn put_attribute(&mut self, unit: UnitId, key: &str, value: &str) -> Result<(), PipelineError> {
        self.unit_mut(unit)?
            .attributes
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn transfer(&mut self, unit: UnitId, relationship: &str) -> Result<(), PipelineError> {
        self.unit_mut(unit)?.relationship = Some(relationship.to_string());
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<(), PipelineError> {
        if let Some(unit) = self.pending.values().find(|unit| unit.relationship.is_none()) {
            return Err(PipelineError::CommitFailed(format!(
                "unit {} was not transferred to any relationship",
                unit.id
            )));
        }

        let mut units: Vec<FlowUnit> = self.pending.into_values().collect();
        units.sort_by_key(|unit| unit.id);

        let mut state = lock_state(&self.state);
        for unit in units {
            info!(
                "Committed unit {} ({} bytes) to '{}' with attributes {:?}",
                unit.id,
                unit.size(),
                unit.relationship.as_deref().unwrap_or_default(),
                unit.attributes
            );
            state.committed.push(unit);
        }
        Ok(())
    }

    fn rollback(self: Box<Self>) {
        debug!("Rolling back {} pending unit(s)", self.pending.len());
        lock_state(&self.state).rollbacks += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RELATIONSHIP_SUCCESS;

    #[test]
    fn test_commit_publishes_units() {
        let factory = MemorySessionFactory::new();
        let mut session = factory.create_session();
        let unit = session.create();
        session.write(unit, b"hello ").unwrap();
        session.write(unit, b"world").unwrap();
        session.put_attribute(unit, "filename", "f.txt").unwrap();
        session.transfer(unit, RELATIONSHIP_SUCCESS).unwrap();

        assert!(factory.committed().is_empty());
        session.commit().unwrap();

        let committed = factory.committed_to(RELATIONSHIP_SUCCESS);
        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].content, b"hello world");
        assert_eq!(committed[0].attribute("filename"), Some("f.txt"));
        assert_eq!(factory.session_count(), 1);
    }

    #[test]
    fn test_rollback_discards_units() {
        let factory = MemorySessionFactory::new();
        let mut session = factory.create_session();
        let unit = session.create();
        session.write(unit, b"partial").unwrap();
        session.rollback();

        assert!(factory.committed().is_empty());
        assert_eq!(factory.rollback_count(), 1);
    }

    #[test]
    fn test_commit_requires_a_relationship() {
        let factory = MemorySessionFactory::new();
        let mut session = factory.create_session();
        session.create();
        assert!(matches!(
            session.commit(),
            Err(PipelineError::CommitFailed(_))
        ));
        assert!(factory.committed().is_empty());
    }

    #[test]
    fn test_unknown_unit_is_rejected() {
        let factory = MemorySessionFactory::new();
        let mut session = factory.create_session();
        assert!(matches!(
            session.write(42, b"x"),
            Err(PipelineError::UnknownUnit(42))
        ));
    }
}
