//! A single addressable location in the preferences tree.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{instrument, trace};

use crate::domain::error::DomainResult;
use crate::domain::event::{
    ChangeDispatcher, NodeChangeEvent, NodeChangeKind, PreferenceChangeEvent,
};
use crate::domain::path::{parse_node_path, type_path, PATH_SEPARATOR, ROOT_PATH};
use crate::domain::value::PrefValue;

/// Tree node holding its own key/value map and an ordered set of named children.
///
/// Parents own their children; a child only keeps a weak back reference.
pub struct Node {
    name: String,
    /// Computed once at creation from the ancestor chain.
    path: String,
    parent: Weak<Node>,
    dispatcher: Arc<ChangeDispatcher>,
    /// Cleared on the whole subtree when it is removed from its parent.
    attached: AtomicBool,
    properties: DashMap<String, PrefValue>,
    children: RwLock<Vec<Arc<Node>>>,
}

impl Node {
    pub(crate) fn root(dispatcher: Arc<ChangeDispatcher>) -> Arc<Self> {
        Arc::new(Self {
            name: String::new(),
            path: ROOT_PATH.to_string(),
            parent: Weak::new(),
            dispatcher,
            attached: AtomicBool::new(true),
            properties: DashMap::new(),
            children: RwLock::new(Vec::new()),
        })
    }

    fn new_child(parent: &Arc<Node>, name: &str) -> Self {
        let path = if parent.is_root() {
            format!("{ROOT_PATH}{name}")
        } else {
            format!("{}{PATH_SEPARATOR}{name}", parent.path)
        };
        Self {
            name: name.to_string(),
            path,
            parent: Arc::downgrade(parent),
            dispatcher: Arc::clone(&parent.dispatcher),
            attached: AtomicBool::new(parent.is_attached()),
            properties: DashMap::new(),
            children: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn parent(&self) -> Option<Arc<Node>> {
        self.parent.upgrade()
    }

    pub fn is_root(&self) -> bool {
        self.path == ROOT_PATH
    }

    /// False once this node (or an ancestor) has been removed from the tree.
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    // ---------------------------------------------------------------
    // properties
    // ---------------------------------------------------------------

    pub fn get(&self, key: &str) -> Option<PrefValue> {
        self.properties.get(key).map(|v| v.value().clone())
    }

    /// Store `value` under `key`; fires a change event unless the previous
    /// value is semantically equal.
    pub fn put(&self, key: impl Into<String>, value: impl Into<PrefValue>) {
        let key = key.into();
        let value = value.into();
        let old = self.properties.insert(key.clone(), value.clone());
        if old.as_ref() != Some(&value) {
            self.fire_preference_changed(key, old, Some(value));
        }
    }

    /// Remove `key`, firing a change event only if a value was present.
    pub fn remove(&self, key: &str) -> Option<PrefValue> {
        let old = self.properties.remove(key).map(|(_, v)| v);
        if let Some(value) = &old {
            self.fire_preference_changed(key.to_string(), Some(value.clone()), None);
        }
        old
    }

    /// Drop every key without notifying listeners.
    pub fn clear(&self) {
        self.properties.clear();
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Keys of this node, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.properties.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    // ---------------------------------------------------------------
    // structure
    // ---------------------------------------------------------------

    /// Snapshot of the children in insertion order.
    pub fn children(&self) -> Children {
        Children(self.children.read().clone())
    }

    pub fn child(&self, name: &str) -> Option<Arc<Node>> {
        self.children
            .read()
            .iter()
            .find(|c| c.name == name)
            .cloned()
    }

    /// Navigate to `path`, creating every missing segment on the way.
    #[instrument(level = "trace", skip(self), fields(at = %self.path))]
    pub fn node(self: &Arc<Self>, path: &str) -> DomainResult<Arc<Node>> {
        let (head, tail) = parse_node_path(path, self.is_root())?;
        let child = self.child_or_create(&head);
        match tail {
            Some(tail) => child.node(&tail),
            None => Ok(child),
        }
    }

    /// Navigate to the node derived from a Rust type name.
    pub fn node_for<T: ?Sized>(self: &Arc<Self>) -> DomainResult<Arc<Node>> {
        self.node(&type_path(std::any::type_name::<T>()))
    }

    /// Look `path` up without creating anything.
    pub fn find(&self, path: &str) -> DomainResult<Option<Arc<Node>>> {
        let (head, tail) = parse_node_path(path, self.is_root())?;
        let Some(child) = self.child(&head) else {
            return Ok(None);
        };
        match tail {
            Some(tail) => child.find(&tail),
            None => Ok(Some(child)),
        }
    }

    /// Remove the node at `path` together with its subtree.
    ///
    /// A single `Removed` event is fired for the removed node itself.
    #[instrument(level = "trace", skip(self), fields(at = %self.path))]
    pub fn remove_node(&self, path: &str) -> DomainResult<Option<Arc<Node>>> {
        let (head, tail) = parse_node_path(path, self.is_root())?;
        match tail {
            Some(tail) => match self.child(&head) {
                Some(child) => child.remove_node(&tail),
                None => Ok(None),
            },
            None => Ok(self.remove_child(&head)),
        }
    }

    pub fn remove_node_for<T: ?Sized>(&self) -> DomainResult<Option<Arc<Node>>> {
        self.remove_node(&type_path(std::any::type_name::<T>()))
    }

    fn child_or_create(self: &Arc<Self>, name: &str) -> Arc<Node> {
        if let Some(existing) = self.child(name) {
            return existing;
        }
        let created = {
            let mut children = self.children.write();
            if let Some(existing) = children.iter().find(|c| c.name == name) {
                return Arc::clone(existing);
            }
            let child = Arc::new(Node::new_child(self, name));
            children.push(Arc::clone(&child));
            child
        };
        // Linked and unlocked before anyone hears about it.
        trace!("created node {}", created.path);
        self.fire_node_changed(&created.path, NodeChangeKind::Added);
        created
    }

    fn remove_child(&self, name: &str) -> Option<Arc<Node>> {
        let removed = {
            let mut children = self.children.write();
            let pos = children.iter().position(|c| c.name == name)?;
            children.remove(pos)
        };
        removed.detach();
        trace!("removed node {}", removed.path);
        self.fire_node_changed(&removed.path, NodeChangeKind::Removed);
        Some(removed)
    }

    fn detach(&self) {
        self.attached.store(false, Ordering::Release);
        for child in self.children.read().iter() {
            child.detach();
        }
    }

    fn fire_node_changed(&self, path: &str, kind: NodeChangeKind) {
        if self.is_attached() {
            self.dispatcher
                .node_changed(&NodeChangeEvent::new(path, kind));
        }
    }

    fn fire_preference_changed(
        &self,
        key: String,
        old_value: Option<PrefValue>,
        new_value: Option<PrefValue>,
    ) {
        if self.is_attached() {
            self.dispatcher.preference_changed(&PreferenceChangeEvent {
                path: self.path.clone(),
                key,
                old_value,
                new_value,
            });
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("path", &self.path)
            .field("keys", &self.keys())
            .field("children", &self.children().names())
            .finish()
    }
}

/// Immutable snapshot of a node's children.
#[derive(Debug, Clone, Default)]
pub struct Children(Vec<Arc<Node>>);

impl Children {
    pub fn get(&self, name: &str) -> Option<&Arc<Node>> {
        self.0.iter().find(|c| c.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|c| c.name()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Node>> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Children {
    type Item = &'a Arc<Node>;
    type IntoIter = std::slice::Iter<'a, Arc<Node>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
