//! Loading and storing the preferences tree.
//!
//! The JSON document mirrors the tree: scalar and array entries are keys of a
//! node, object entries are child nodes.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Number, Value};
use tracing::{debug, info, instrument, warn};

use crate::domain::{Node, PrefValue, Preferences};
use crate::infrastructure::traits::FileSystem;
use crate::infrastructure::{InfraError, InfraResult};

/// Moves a whole tree between memory and a backing store.
pub trait PreferencesPersistor: Send + Sync {
    fn location(&self) -> &Path;

    /// Merge the stored document into `preferences`.
    ///
    /// A store that does not exist is reported as [`InfraError::BackingStoreUnavailable`].
    fn read(&self, preferences: &Preferences) -> InfraResult<()>;

    fn write(&self, preferences: &Preferences) -> InfraResult<()>;
}

pub struct JsonPreferencesPersistor {
    fs: Arc<dyn FileSystem>,
    location: PathBuf,
}

impl JsonPreferencesPersistor {
    pub fn new(fs: Arc<dyn FileSystem>, location: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            location: location.into(),
        }
    }

    fn unavailable(&self) -> InfraError {
        InfraError::BackingStoreUnavailable {
            location: self.location.clone(),
        }
    }
}

impl PreferencesPersistor for JsonPreferencesPersistor {
    fn location(&self) -> &Path {
        &self.location
    }

    #[instrument(level = "debug", skip_all, fields(location = %self.location.display()))]
    fn read(&self, preferences: &Preferences) -> InfraResult<()> {
        if !self.fs.exists(&self.location) {
            return Err(self.unavailable());
        }
        let content = self.fs.read_to_string(&self.location).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                self.unavailable()
            } else {
                InfraError::io(format!("reading {}", self.location.display()), e)
            }
        })?;
        if content.trim().is_empty() {
            debug!("backing store is empty");
            return Ok(());
        }

        let document: Value = serde_json::from_str(&content)
            .map_err(|e| InfraError::malformed(&self.location, e.to_string()))?;
        let Value::Object(entries) = document else {
            return Err(InfraError::malformed(
                &self.location,
                "top-level value is not a mapping",
            ));
        };
        load_node(preferences.root(), entries);
        info!("read preferences from {}", self.location.display());
        Ok(())
    }

    #[instrument(level = "debug", skip_all, fields(location = %self.location.display()))]
    fn write(&self, preferences: &Preferences) -> InfraResult<()> {
        let document = Value::Object(node_document(preferences.root()));
        let content = serde_json::to_string_pretty(&document)?;
        self.fs
            .ensure_parent(&self.location)
            .map_err(|e| InfraError::io(format!("creating parent of {}", self.location.display()), e))?;
        self.fs
            .write(&self.location, &content)
            .map_err(|e| InfraError::io(format!("writing {}", self.location.display()), e))?;
        info!("wrote preferences to {}", self.location.display());
        Ok(())
    }
}

fn load_node(node: &Arc<Node>, entries: Map<String, Value>) {
    for (name, value) in entries {
        match value {
            Value::Null => continue,
            Value::Object(children) => match node.node(&name) {
                Ok(child) => load_node(&child, children),
                Err(e) => warn!("skipping child '{name}' of {}: {e}", node.path()),
            },
            other => {
                if let Some(value) = from_json(other) {
                    node.put(name, value);
                }
            }
        }
    }
}

fn node_document(node: &Node) -> Map<String, Value> {
    let mut document = Map::new();
    for key in node.keys() {
        let Some(value) = node.get(&key) else {
            continue;
        };
        match to_json(&value) {
            Some(json) => {
                document.insert(key, json);
            }
            None => warn!("not persisting {} value of {}.{key}", value.kind(), node.path()),
        }
    }
    for child in &node.children() {
        if document.contains_key(child.name()) {
            warn!(
                "child node {} replaces the key of the same name in {}",
                child.name(),
                node.path()
            );
        }
        document.insert(child.name().to_string(), Value::Object(node_document(child)));
    }
    document
}

/// Leaf value for a JSON entry; nulls carry no value.
pub fn from_json(value: Value) -> Option<PrefValue> {
    Some(match value {
        Value::Null => return None,
        Value::Bool(b) => PrefValue::Bool(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => PrefValue::Int(i),
            None => PrefValue::Float(n.as_f64()?),
        },
        Value::String(s) => PrefValue::Text(s),
        Value::Array(items) => PrefValue::List(items.into_iter().filter_map(from_json).collect()),
        Value::Object(entries) => PrefValue::Map(
            entries
                .into_iter()
                .filter_map(|(k, v)| from_json(v).map(|v| (k, v)))
                .collect::<BTreeMap<_, _>>(),
        ),
    })
}

/// JSON form of a leaf value; deferred values and non-finite floats have none.
pub fn to_json(value: &PrefValue) -> Option<Value> {
    Some(match value {
        PrefValue::Bool(b) => Value::Bool(*b),
        PrefValue::Int(i) => Value::Number((*i).into()),
        PrefValue::Float(f) => Value::Number(Number::from_f64(*f)?),
        PrefValue::Text(s) => Value::String(s.clone()),
        PrefValue::List(items) | PrefValue::Set(items) => {
            Value::Array(items.iter().filter_map(to_json).collect())
        }
        PrefValue::Map(entries) => Value::Object(
            entries
                .iter()
                .filter_map(|(k, v)| to_json(v).map(|v| (k.clone(), v)))
                .collect(),
        ),
        PrefValue::Deferred(_) => return None,
    })
}
