//! The preferences tree: one root node plus the listener registries.

use std::sync::Arc;

use crate::domain::error::DomainResult;
use crate::domain::event::{ChangeDispatcher, NodeChangeListener, PreferenceChangeListener};
use crate::domain::node::Node;

/// Handle to a preferences tree. Cloning shares the same tree.
#[derive(Debug, Clone)]
pub struct Preferences {
    root: Arc<Node>,
    dispatcher: Arc<ChangeDispatcher>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self::new()
    }
}

impl Preferences {
    pub fn new() -> Self {
        let dispatcher = Arc::new(ChangeDispatcher::default());
        let root = Node::root(Arc::clone(&dispatcher));
        Self { root, dispatcher }
    }

    pub fn root(&self) -> &Arc<Node> {
        &self.root
    }

    pub fn node(&self, path: &str) -> DomainResult<Arc<Node>> {
        self.root.node(path)
    }

    pub fn node_for<T: ?Sized>(&self) -> DomainResult<Arc<Node>> {
        self.root.node_for::<T>()
    }

    pub fn find(&self, path: &str) -> DomainResult<Option<Arc<Node>>> {
        self.root.find(path)
    }

    pub fn remove_node(&self, path: &str) -> DomainResult<Option<Arc<Node>>> {
        self.root.remove_node(path)
    }

    pub fn remove_node_for<T: ?Sized>(&self) -> DomainResult<Option<Arc<Node>>> {
        self.root.remove_node_for::<T>()
    }

    /// True when the root holds neither keys nor children.
    pub fn is_empty(&self) -> bool {
        self.root.keys().is_empty() && self.root.children().is_empty()
    }

    pub fn add_node_change_listener(&self, listener: Arc<dyn NodeChangeListener>) -> bool {
        self.dispatcher.node_listeners.add(listener)
    }

    pub fn remove_node_change_listener(&self, listener: &Arc<dyn NodeChangeListener>) -> bool {
        self.dispatcher.node_listeners.remove(listener)
    }

    pub fn node_change_listeners(&self) -> Vec<Arc<dyn NodeChangeListener>> {
        self.dispatcher.node_listeners.snapshot().to_vec()
    }

    pub fn add_preference_change_listener(
        &self,
        listener: Arc<dyn PreferenceChangeListener>,
    ) -> bool {
        self.dispatcher.preference_listeners.add(listener)
    }

    pub fn remove_preference_change_listener(
        &self,
        listener: &Arc<dyn PreferenceChangeListener>,
    ) -> bool {
        self.dispatcher.preference_listeners.remove(listener)
    }

    pub fn preference_change_listeners(&self) -> Vec<Arc<dyn PreferenceChangeListener>> {
        self.dispatcher.preference_listeners.snapshot().to_vec()
    }
}
