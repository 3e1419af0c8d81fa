//! Domain layer: the preferences tree and its change events
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod error;
pub mod event;
pub mod node;
pub mod path;
pub mod tree;
pub mod value;

pub use error::{DomainError, DomainResult};
pub use event::{
    NodeChangeEvent, NodeChangeKind, NodeChangeListener, PreferenceChangeEvent,
    PreferenceChangeListener,
};
pub use node::{Children, Node};
pub use path::PreferencePath;
pub use tree::Preferences;
pub use value::{DeferredValue, PrefValue};
