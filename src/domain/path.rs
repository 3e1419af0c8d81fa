//! Path grammar for nodes and preferences.
//!
//! Two splitting rules coexist and must stay separate:
//! - node paths split at *every* separator (`a.b/c` descends `a` → `b` → `c`)
//! - preference paths split *once* at the first `.`; everything after it is an
//!   opaque key (`app.ui.theme` is key `ui.theme` of node `app`)

use crate::domain::error::{DomainError, DomainResult};

pub const PATH_SEPARATOR: char = '/';
pub const KEY_SEPARATOR: char = '.';
pub const ROOT_PATH: &str = "/";

/// Split a node path into the immediate child name and the remaining path.
///
/// `.` and `/` are both accepted as separators. A leading `/` is only legal
/// when the lookup starts at the root.
pub fn parse_node_path(path: &str, at_root: bool) -> DomainResult<(String, Option<String>)> {
    if path.trim().is_empty() {
        return Err(DomainError::invalid_path(path, "path is blank"));
    }
    if !at_root && path.starts_with(PATH_SEPARATOR) {
        return Err(DomainError::invalid_path(
            path,
            "absolute path is only valid at the root node",
        ));
    }
    let normalized = path.replace(KEY_SEPARATOR, "/");
    if normalized.ends_with(PATH_SEPARATOR) {
        return Err(DomainError::invalid_path(path, "path ends with a separator"));
    }
    let relative = if at_root {
        normalized
            .strip_prefix(PATH_SEPARATOR)
            .unwrap_or(&normalized)
    } else {
        normalized.as_str()
    };
    if relative.split(PATH_SEPARATOR).any(str::is_empty) {
        return Err(DomainError::invalid_path(path, "path contains an empty segment"));
    }

    Ok(match relative.split_once(PATH_SEPARATOR) {
        Some((head, tail)) => (head.to_string(), Some(tail.to_string())),
        None => (relative.to_string(), None),
    })
}

/// A preference address: the node holding the value and the key inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferencePath {
    /// Node path relative to the root, `None` for keys stored on the root itself.
    pub node: Option<String>,
    pub key: String,
}

impl PreferencePath {
    /// Split at the first `.` only.
    pub fn parse(path: &str) -> DomainResult<Self> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_path(path, "path is blank"));
        }

        let (node, key) = match trimmed.split_once(KEY_SEPARATOR) {
            Some((node, key)) => (node, key),
            None => ("", trimmed),
        };
        let key = if node.is_empty() {
            key.trim_start_matches(PATH_SEPARATOR)
        } else {
            key
        };
        if key.is_empty() {
            return Err(DomainError::invalid_path(path, "preference key is missing"));
        }
        if key.contains(PATH_SEPARATOR) {
            return Err(DomainError::invalid_path(
                path,
                "preference key must not contain '/'",
            ));
        }

        let node = node.trim_start_matches(PATH_SEPARATOR);
        if node.is_empty() {
            return Ok(Self {
                node: None,
                key: key.to_string(),
            });
        }
        if node.split(PATH_SEPARATOR).any(str::is_empty) {
            return Err(DomainError::invalid_path(path, "node part contains an empty segment"));
        }

        Ok(Self {
            node: Some(node.to_string()),
            key: key.to_string(),
        })
    }

    /// Canonical form, identical to what [`preference_path`] yields for change events.
    pub fn canonical(&self) -> String {
        match &self.node {
            Some(node) => format!("{ROOT_PATH}{node}{KEY_SEPARATOR}{}", self.key),
            None => format!("{ROOT_PATH}{}", self.key),
        }
    }
}

/// Fully-qualified path of `key` inside the node at `node_path`.
pub fn preference_path(node_path: &str, key: &str) -> String {
    if node_path == ROOT_PATH {
        format!("{ROOT_PATH}{key}")
    } else {
        format!("{node_path}{KEY_SEPARATOR}{key}")
    }
}

/// True if the canonical preference path lives strictly below `node_path`.
pub fn is_below(preference: &str, node_path: &str) -> bool {
    preference
        .strip_prefix(node_path)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c == KEY_SEPARATOR || c == PATH_SEPARATOR)
}

/// Node path for a type name: `my_app::ui::Settings` → `my_app/ui/Settings`.
pub fn type_path(type_name: &str) -> String {
    type_name
        .replace("::", "/")
        .replace([KEY_SEPARATOR, '$'], "/")
}

/// Path used by a binding that declares no explicit key.
pub fn derived_preference_path(declaring_type: &str, field: &str) -> String {
    format!("{ROOT_PATH}{}{KEY_SEPARATOR}{field}", type_path(declaring_type))
}
