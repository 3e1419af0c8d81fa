//! Tests for loading at startup and saving at shutdown.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use rsprefs::application::{
    shared, Binding, BindingTable, Preferable, PreferencesLifecycle, PreferencesManager,
};
use rsprefs::domain::{PrefValue, Preferences};
use rsprefs::infrastructure::persistence::JsonPreferencesPersistor;
use rsprefs::infrastructure::traits::RealFileSystem;
use rsprefs::util::testing;

fn lifecycle(location: &Path) -> PreferencesLifecycle {
    PreferencesLifecycle::new(
        PreferencesManager::new(Preferences::new()),
        Arc::new(JsonPreferencesPersistor::new(Arc::new(RealFileSystem), location)),
    )
}

#[derive(Default)]
struct Window {
    title: String,
}

impl Preferable for Window {
    fn bindings() -> BindingTable<Self> {
        BindingTable::named("demo::Window")
            .tree_aware()
            .bind(
                Binding::field("title", |w: &Self| &w.title, |w: &mut Self| &mut w.title)
                    .key("window.title")
                    .default_value("untitled"),
            )
    }
}

#[test]
fn given_missing_store_when_starting_then_tree_empty_and_shutdown_creates_file() {
    testing::init_test_setup();
    let dir = TempDir::new().unwrap();
    let location = dir.path().join("prefs/default.json");
    let lifecycle = lifecycle(&location);

    lifecycle.startup();
    assert!(lifecycle.saves_on_shutdown());
    assert!(lifecycle.manager().preferences().is_empty());

    lifecycle.manager().preferences().root().put("volume", 4);
    lifecycle.shutdown();

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&location).unwrap()).unwrap();
    assert_eq!(written, serde_json::json!({ "volume": 4 }));
}

#[test]
fn given_stored_document_when_starting_then_tree_is_loaded() {
    let dir = TempDir::new().unwrap();
    let location = dir.path().join("default.json");
    fs::write(&location, r#"{ "window": { "title": "Notes" } }"#).unwrap();
    let lifecycle = lifecycle(&location);

    lifecycle.startup();

    let window = lifecycle
        .manager()
        .preferences()
        .find("window")
        .unwrap()
        .expect("window node");
    assert_eq!(window.get("title"), Some(PrefValue::from("Notes")));
    assert!(lifecycle.saves_on_shutdown());
}

#[test]
fn given_malformed_store_when_shutting_down_then_file_is_left_untouched() {
    let dir = TempDir::new().unwrap();
    let location = dir.path().join("default.json");
    fs::write(&location, "[not an object]").unwrap();
    let lifecycle = lifecycle(&location);

    lifecycle.startup();
    assert!(!lifecycle.saves_on_shutdown());
    lifecycle.manager().preferences().root().put("volume", 4);
    lifecycle.shutdown();

    assert_eq!(fs::read_to_string(&location).unwrap(), "[not an object]");
}

#[test]
fn given_created_instance_when_store_loaded_then_stored_value_is_injected() {
    let dir = TempDir::new().unwrap();
    let location = dir.path().join("default.json");
    fs::write(&location, r#"{ "window": { "title": "Notes" } }"#).unwrap();
    let lifecycle = lifecycle(&location);
    lifecycle.startup();
    let window = shared(Window::default());

    let handle = lifecycle.instance_created(&window);

    assert!(handle.is_some());
    assert_eq!(window.read().title, "Notes");

    lifecycle
        .manager()
        .preferences()
        .node("window")
        .unwrap()
        .put("title", "Draft");
    assert_eq!(window.read().title, "Draft");

    assert!(lifecycle.instance_destroyed(&window));
    lifecycle
        .manager()
        .preferences()
        .node("window")
        .unwrap()
        .put("title", "Final");
    assert_eq!(window.read().title, "Draft");
}

#[test]
fn given_released_handle_when_releasing_twice_then_second_is_noop() {
    let dir = TempDir::new().unwrap();
    let lifecycle = lifecycle(&dir.path().join("default.json"));
    let window = shared(Window::default());
    let handle = lifecycle.instance_created(&window).expect("tree aware");

    assert!(lifecycle.release(handle));
    assert!(!lifecycle.release(handle));
}

#[test]
fn given_seeded_defaults_when_shutting_down_then_defaults_are_persisted() {
    let dir = TempDir::new().unwrap();
    let location = dir.path().join("default.json");
    let lifecycle = lifecycle(&location);
    lifecycle.startup();
    lifecycle.instance_created(&shared(Window::default()));

    lifecycle.shutdown();

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&location).unwrap()).unwrap();
    assert_eq!(
        written,
        serde_json::json!({ "window": { "title": "untitled" } })
    );
}
