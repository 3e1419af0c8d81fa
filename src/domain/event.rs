//! Change events and listener registries.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::domain::value::PrefValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeChangeKind {
    Added,
    Removed,
}

impl fmt::Display for NodeChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => f.write_str("ADDED"),
            Self::Removed => f.write_str("REMOVED"),
        }
    }
}

/// A node was linked into or detached from the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeChangeEvent {
    pub path: String,
    pub kind: NodeChangeKind,
}

impl NodeChangeEvent {
    pub fn new(path: impl Into<String>, kind: NodeChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// A key's value changed on the node at `path`.
///
/// `old_value` is `None` when the key was just created, `new_value` is `None`
/// when it was removed.
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceChangeEvent {
    pub path: String,
    pub key: String,
    pub old_value: Option<PrefValue>,
    pub new_value: Option<PrefValue>,
}

pub trait NodeChangeListener: Send + Sync {
    fn node_changed(&self, event: &NodeChangeEvent);
}

pub trait PreferenceChangeListener: Send + Sync {
    fn preference_changed(&self, event: &PreferenceChangeEvent);
}

impl<F> NodeChangeListener for F
where
    F: Fn(&NodeChangeEvent) + Send + Sync,
{
    fn node_changed(&self, event: &NodeChangeEvent) {
        self(event)
    }
}

impl<F> PreferenceChangeListener for F
where
    F: Fn(&PreferenceChangeEvent) + Send + Sync,
{
    fn preference_changed(&self, event: &PreferenceChangeEvent) {
        self(event)
    }
}

/// Ordered listener list, deduplicated by identity.
///
/// Mutation swaps in a fresh vector, so a dispatch iterating a snapshot never
/// observes a concurrent add or remove.
pub struct ListenerList<L: ?Sized> {
    listeners: ArcSwap<Vec<Arc<L>>>,
}

impl<L: ?Sized> Default for ListenerList<L> {
    fn default() -> Self {
        Self {
            listeners: ArcSwap::from_pointee(Vec::new()),
        }
    }
}

impl<L: ?Sized> ListenerList<L> {
    /// Returns false if the same listener instance is already registered.
    pub fn add(&self, listener: Arc<L>) -> bool {
        let mut added = false;
        self.listeners.rcu(|current| {
            if current.iter().any(|l| Arc::ptr_eq(l, &listener)) {
                added = false;
                Arc::clone(current)
            } else {
                added = true;
                let mut next = Vec::with_capacity(current.len() + 1);
                next.extend(current.iter().cloned());
                next.push(Arc::clone(&listener));
                Arc::new(next)
            }
        });
        added
    }

    pub fn remove(&self, listener: &Arc<L>) -> bool {
        let mut removed = false;
        self.listeners.rcu(|current| {
            removed = current.iter().any(|l| Arc::ptr_eq(l, listener));
            if removed {
                Arc::new(
                    current
                        .iter()
                        .filter(|l| !Arc::ptr_eq(*l, listener))
                        .cloned()
                        .collect(),
                )
            } else {
                Arc::clone(current)
            }
        });
        removed
    }

    pub fn snapshot(&self) -> Arc<Vec<Arc<L>>> {
        self.listeners.load_full()
    }

    pub fn len(&self) -> usize {
        self.listeners.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fan-out point shared by every node of one tree.
#[derive(Default)]
pub struct ChangeDispatcher {
    pub(crate) node_listeners: ListenerList<dyn NodeChangeListener>,
    pub(crate) preference_listeners: ListenerList<dyn PreferenceChangeListener>,
}

impl ChangeDispatcher {
    pub fn node_changed(&self, event: &NodeChangeEvent) {
        for listener in self.node_listeners.snapshot().iter() {
            listener.node_changed(event);
        }
    }

    pub fn preference_changed(&self, event: &PreferenceChangeEvent) {
        for listener in self.preference_listeners.snapshot().iter() {
            listener.preference_changed(event);
        }
    }
}

impl fmt::Debug for ChangeDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeDispatcher")
            .field("node_listeners", &self.node_listeners.len())
            .field("preference_listeners", &self.preference_listeners.len())
            .finish()
    }
}
