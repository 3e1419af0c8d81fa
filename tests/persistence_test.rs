//! Tests for reading and writing the JSON backing store.

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use rsprefs::domain::{PrefValue, Preferences};
use rsprefs::infrastructure::persistence::{JsonPreferencesPersistor, PreferencesPersistor};
use rsprefs::infrastructure::traits::RealFileSystem;
use rsprefs::infrastructure::InfraError;

fn persistor(dir: &TempDir, name: &str) -> JsonPreferencesPersistor {
    JsonPreferencesPersistor::new(Arc::new(RealFileSystem), dir.path().join(name))
}

#[test]
fn given_populated_tree_when_round_tripping_then_equivalent_tree() {
    let dir = TempDir::new().unwrap();
    let store = persistor(&dir, "nested/dir/prefs.json");

    let prefs = Preferences::new();
    prefs.root().put("volume", 7);
    let app = prefs.node("app").unwrap();
    app.put("theme", "dark");
    app.put("ratio", 0.25);
    app.put("enabled", true);
    app.put("ui.font", "mono");
    app.put(
        "tags",
        PrefValue::List(vec!["a".into(), PrefValue::Int(2)]),
    );
    prefs.node("app/panels/left").unwrap().put("width", 200);
    store.write(&prefs).unwrap();

    let loaded = Preferences::new();
    store.read(&loaded).unwrap();

    assert_eq!(loaded.root().get("volume"), Some(PrefValue::Int(7)));
    let app = loaded.find("app").unwrap().expect("app node");
    assert_eq!(app.keys(), vec!["enabled", "ratio", "tags", "theme", "ui.font"]);
    assert_eq!(app.get("theme"), Some(PrefValue::from("dark")));
    assert_eq!(app.get("ratio"), Some(PrefValue::Float(0.25)));
    assert_eq!(app.get("enabled"), Some(PrefValue::Bool(true)));
    assert_eq!(app.get("ui.font"), Some(PrefValue::from("mono")));
    assert_eq!(
        app.get("tags"),
        Some(PrefValue::List(vec!["a".into(), PrefValue::Int(2)]))
    );
    let left = loaded.find("app/panels/left").unwrap().expect("left node");
    assert_eq!(left.get("width"), Some(PrefValue::Int(200)));
}

#[test]
fn given_set_value_when_round_tripping_then_normalized_to_list() {
    let dir = TempDir::new().unwrap();
    let store = persistor(&dir, "prefs.json");
    let prefs = Preferences::new();
    prefs
        .root()
        .put("flags", PrefValue::Set(vec!["x".into(), "y".into()]));
    store.write(&prefs).unwrap();

    let loaded = Preferences::new();
    store.read(&loaded).unwrap();

    assert_eq!(
        loaded.root().get("flags"),
        Some(PrefValue::List(vec!["x".into(), "y".into()]))
    );
}

#[test]
fn given_missing_store_when_reading_then_backing_store_unavailable() {
    let dir = TempDir::new().unwrap();
    let store = persistor(&dir, "absent.json");
    let prefs = Preferences::new();

    let err = store.read(&prefs).unwrap_err();

    assert!(err.is_not_found());
    assert!(prefs.is_empty());
}

#[test]
fn given_empty_file_when_reading_then_empty_tree() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("prefs.json"), "  \n").unwrap();
    let prefs = Preferences::new();

    persistor(&dir, "prefs.json").read(&prefs).unwrap();

    assert!(prefs.is_empty());
}

#[test]
fn given_top_level_array_when_reading_then_malformed_document() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("prefs.json"), "[1, 2]").unwrap();
    let prefs = Preferences::new();

    let err = persistor(&dir, "prefs.json").read(&prefs).unwrap_err();

    assert!(matches!(err, InfraError::MalformedDocument { .. }));
    assert!(prefs.is_empty());
}

#[test]
fn given_invalid_json_when_reading_then_malformed_document() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("prefs.json"), "{ not json").unwrap();

    let err = persistor(&dir, "prefs.json")
        .read(&Preferences::new())
        .unwrap_err();

    assert!(matches!(err, InfraError::MalformedDocument { .. }));
}

#[test]
fn given_null_entries_when_reading_then_skipped() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("prefs.json"),
        r#"{ "a": null, "b": 1, "child": { "c": null, "d": "x" } }"#,
    )
    .unwrap();
    let prefs = Preferences::new();

    persistor(&dir, "prefs.json").read(&prefs).unwrap();

    assert_eq!(prefs.root().keys(), vec!["b"]);
    let child = prefs.find("child").unwrap().unwrap();
    assert_eq!(child.keys(), vec!["d"]);
}

#[test]
fn given_deferred_value_when_writing_then_it_is_left_out() {
    let dir = TempDir::new().unwrap();
    let store = persistor(&dir, "prefs.json");
    let prefs = Preferences::new();
    prefs.root().put("later", PrefValue::deferred(|_| PrefValue::Int(1)));
    prefs.root().put("now", 1);

    store.write(&prefs).unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.location()).unwrap()).unwrap();
    assert_eq!(written, serde_json::json!({ "now": 1 }));
}

#[test]
fn given_tree_when_writing_then_keys_precede_children_in_document() {
    let dir = TempDir::new().unwrap();
    let store = persistor(&dir, "prefs.json");
    let prefs = Preferences::new();
    prefs.node("second").unwrap();
    prefs.node("first").unwrap().put("k", "v");
    prefs.root().put("b", 2);
    prefs.root().put("a", 1);

    store.write(&prefs).unwrap();

    let text = fs::read_to_string(store.location()).unwrap();
    let position = |needle: &str| text.find(needle).unwrap();
    assert!(position("\"a\"") < position("\"b\""));
    assert!(position("\"b\"") < position("\"second\""));
    assert!(position("\"second\"") < position("\"first\""));
}

#[test]
fn given_existing_tree_when_reading_then_document_is_merged_into_it() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("prefs.json"),
        r#"{ "app": { "theme": "dark" } }"#,
    )
    .unwrap();
    let prefs = Preferences::new();
    prefs.node("app").unwrap().put("font", "mono");

    persistor(&dir, "prefs.json").read(&prefs).unwrap();

    let app = prefs.find("app").unwrap().unwrap();
    assert_eq!(app.keys(), vec!["font", "theme"]);
}
