//! Registry of live host instances that follow tree changes.

use generational_arena::{Arena, Index};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::trace;

/// Something the registry can hold: a non-owning reference plus its bindings.
pub trait Registrant: Send + Sync {
    /// Address of the referenced instance; stable while the record exists.
    fn identity(&self) -> usize;

    /// False once the referenced instance has been dropped.
    fn is_alive(&self) -> bool;
}

/// Stable handle to a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceHandle(Index);

/// Arena of registrations.
///
/// Iteration always works on a snapshot, so records may be added or removed
/// while a re-sync pass walks the previous set.
pub struct InstanceRegistry<R: ?Sized> {
    records: RwLock<Arena<Arc<R>>>,
}

impl<R: ?Sized + Registrant> Default for InstanceRegistry<R> {
    fn default() -> Self {
        Self {
            records: RwLock::new(Arena::new()),
        }
    }
}

impl<R: ?Sized + Registrant> InstanceRegistry<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `record` unless its instance is already registered; dead records are pruned on the way.
    pub fn add(&self, record: Arc<R>) -> InstanceHandle {
        let mut records = self.records.write();
        Self::prune_locked(&mut records);
        let identity = record.identity();
        if let Some((index, _)) = records.iter().find(|(_, r)| r.identity() == identity) {
            return InstanceHandle(index);
        }
        let index = records.insert(record);
        trace!(?index, "registered instance {identity:#x}");
        InstanceHandle(index)
    }

    /// Drop the record for the instance at `identity`; no-op if absent.
    pub fn remove(&self, identity: usize) -> bool {
        let mut records = self.records.write();
        let index = records
            .iter()
            .find(|(_, r)| r.identity() == identity)
            .map(|(index, _)| index);
        match index {
            Some(index) => records.remove(index).is_some(),
            None => false,
        }
    }

    pub fn release(&self, handle: InstanceHandle) -> bool {
        self.records.write().remove(handle.0).is_some()
    }

    pub fn contains(&self, identity: usize) -> bool {
        self.records
            .read()
            .iter()
            .any(|(_, r)| r.identity() == identity && r.is_alive())
    }

    pub fn get(&self, handle: InstanceHandle) -> Option<Arc<R>> {
        self.records
            .read()
            .get(handle.0)
            .filter(|r| r.is_alive())
            .cloned()
    }

    /// Live records at this moment.
    pub fn snapshot(&self) -> Vec<Arc<R>> {
        self.records
            .read()
            .iter()
            .filter(|(_, r)| r.is_alive())
            .map(|(_, r)| Arc::clone(r))
            .collect()
    }

    /// Physically remove records whose instance is gone. Returns how many were dropped.
    pub fn prune(&self) -> usize {
        Self::prune_locked(&mut self.records.write())
    }

    pub fn len(&self) -> usize {
        self.records.read().iter().filter(|(_, r)| r.is_alive()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prune_locked(records: &mut Arena<Arc<R>>) -> usize {
        let before = records.len();
        records.retain(|_, r| r.is_alive());
        before - records.len()
    }
}

impl<R: ?Sized + Registrant> std::fmt::Debug for InstanceRegistry<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("records", &self.records.read().len())
            .finish()
    }
}
