//! Tests for node and preference change events.

use std::sync::Arc;

use parking_lot::Mutex;

use rsprefs::domain::{
    NodeChangeEvent, NodeChangeKind, NodeChangeListener, PrefValue, PreferenceChangeEvent,
    PreferenceChangeListener, Preferences,
};

fn record_nodes(prefs: &Preferences) -> Arc<Mutex<Vec<NodeChangeEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    prefs.add_node_change_listener(Arc::new(move |e: &NodeChangeEvent| {
        sink.lock().push(e.clone())
    }));
    events
}

fn record_values(prefs: &Preferences) -> Arc<Mutex<Vec<PreferenceChangeEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    prefs.add_preference_change_listener(Arc::new(move |e: &PreferenceChangeEvent| {
        sink.lock().push(e.clone())
    }));
    events
}

#[test]
fn given_new_path_when_navigating_then_added_event_per_created_node() {
    let prefs = Preferences::new();
    let events = record_nodes(&prefs);

    prefs.node("a.b").unwrap();
    prefs.node("a.b").unwrap();

    assert_eq!(
        *events.lock(),
        vec![
            NodeChangeEvent::new("/a", NodeChangeKind::Added),
            NodeChangeEvent::new("/a/b", NodeChangeKind::Added),
        ]
    );
}

#[test]
fn given_subtree_when_removing_then_single_removed_event_for_its_root() {
    let prefs = Preferences::new();
    prefs.node("a/b/c").unwrap();
    let events = record_nodes(&prefs);

    prefs.remove_node("a/b").unwrap();

    assert_eq!(
        *events.lock(),
        vec![NodeChangeEvent::new("/a/b", NodeChangeKind::Removed)]
    );
}

#[test]
fn given_same_value_twice_when_putting_then_one_event() {
    let prefs = Preferences::new();
    let events = record_values(&prefs);
    let node = prefs.node("app").unwrap();

    node.put("theme", "dark");
    node.put("theme", "dark");

    let events = events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].path, "/app");
    assert_eq!(events[0].key, "theme");
    assert_eq!(events[0].old_value, None);
    assert_eq!(events[0].new_value, Some(PrefValue::from("dark")));
}

#[test]
fn given_semantically_equal_value_when_putting_then_no_event() {
    let prefs = Preferences::new();
    let node = prefs.root();
    node.put(
        "tags",
        PrefValue::Set(vec!["a".into(), "b".into()]),
    );
    let events = record_values(&prefs);

    node.put(
        "tags",
        PrefValue::Set(vec!["b".into(), "a".into()]),
    );
    node.put("n", 1);
    node.put("n", 1.0);

    assert_eq!(events.lock().len(), 1);
}

#[test]
fn given_nan_twice_when_putting_then_one_event() {
    let prefs = Preferences::new();
    let events = record_values(&prefs);
    let node = prefs.root();

    node.put("ratio", f64::NAN);
    node.put("ratio", f64::NAN);

    assert_eq!(events.lock().len(), 1);
}

#[test]
fn given_changed_value_when_putting_then_event_carries_old_and_new() {
    let prefs = Preferences::new();
    let node = prefs.root();
    node.put("volume", 3);
    let events = record_values(&prefs);

    node.put("volume", 7);

    let events = events.lock();
    assert_eq!(events[0].path, "/");
    assert_eq!(events[0].old_value, Some(PrefValue::Int(3)));
    assert_eq!(events[0].new_value, Some(PrefValue::Int(7)));
}

#[test]
fn given_key_removed_when_present_then_event_with_absent_new_value() {
    let prefs = Preferences::new();
    let node = prefs.node("app").unwrap();
    node.put("theme", "dark");
    let events = record_values(&prefs);

    node.remove("theme");
    node.remove("theme");

    let events = events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].old_value, Some(PrefValue::from("dark")));
    assert_eq!(events[0].new_value, None);
}

#[test]
fn given_cleared_node_when_clearing_then_no_events() {
    let prefs = Preferences::new();
    let node = prefs.node("app").unwrap();
    node.put("a", 1);
    let events = record_values(&prefs);

    node.clear();

    assert!(events.lock().is_empty());
}

#[test]
fn given_detached_node_when_mutated_then_tree_listeners_stay_silent() {
    let prefs = Preferences::new();
    let b = prefs.node("a/b").unwrap();
    prefs.remove_node("a/b").unwrap();
    let values = record_values(&prefs);
    let nodes = record_nodes(&prefs);

    b.put("x", 1);
    b.node("c").unwrap();

    assert!(values.lock().is_empty());
    assert!(nodes.lock().is_empty());
    assert_eq!(b.get("x"), Some(PrefValue::Int(1)));
}

#[test]
fn given_duplicate_listener_when_registering_then_rejected_and_removable() {
    let prefs = Preferences::new();
    let listener: Arc<dyn PreferenceChangeListener> =
        Arc::new(|_: &PreferenceChangeEvent| {});

    assert!(prefs.add_preference_change_listener(Arc::clone(&listener)));
    assert!(!prefs.add_preference_change_listener(Arc::clone(&listener)));
    assert_eq!(prefs.preference_change_listeners().len(), 1);

    assert!(prefs.remove_preference_change_listener(&listener));
    assert!(!prefs.remove_preference_change_listener(&listener));
    assert!(prefs.preference_change_listeners().is_empty());
}

#[test]
fn given_listener_navigating_tree_when_node_added_then_new_node_is_linked() {
    let prefs = Preferences::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let listener: Arc<dyn NodeChangeListener> = {
        let prefs = prefs.clone();
        let seen = Arc::clone(&seen);
        Arc::new(move |e: &NodeChangeEvent| {
            let found = prefs.find(&e.path).unwrap().is_some();
            seen.lock().push(found);
        })
    };
    prefs.add_node_change_listener(listener);

    prefs.node("x/y").unwrap();

    assert_eq!(*seen.lock(), vec![true, true]);
}
