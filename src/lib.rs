//! rsprefs: a hierarchical preferences store.
//!
//! Values live in a tree of named nodes addressed by slash or dot separated
//! paths. Host types declare field bindings; the binding engine fills those
//! fields from the tree, writes them back on save, and keeps registered
//! instances in sync when the tree changes.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

pub use application::{
    shared, Binding, BindingTable, PrefField, Preferable, PreferencesLifecycle,
    PreferencesManager, Shared,
};
pub use domain::{Node, PrefValue, Preferences};
