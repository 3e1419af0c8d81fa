//! Tests for node navigation, key storage and node removal.

use std::sync::Arc;

use rstest::rstest;

use rsprefs::domain::{DomainError, PrefValue, Preferences};
use rsprefs::util::testing;

#[test]
fn given_empty_tree_when_navigating_dotted_path_then_creates_each_level() {
    testing::init_test_setup();
    let prefs = Preferences::new();

    let b = prefs.node("a.b").unwrap();
    b.put("x", 1);

    let a = prefs.node("a").unwrap();
    assert!(a.children().contains("b"));
    assert_eq!(b.path(), "/a/b");
    assert_eq!(a.path(), "/a");
    assert_eq!(prefs.node("a.b").unwrap().get("x"), Some(PrefValue::Int(1)));
}

#[rstest]
#[case("a/b/c")]
#[case("a.b.c")]
#[case("/a/b.c")]
fn given_same_path_twice_when_navigating_then_same_node_instance(#[case] path: &str) {
    let prefs = Preferences::new();
    let first = prefs.node(path).unwrap();
    let second = prefs.node(path).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.path(), "/a/b/c");
}

#[test]
fn given_child_node_when_navigating_relative_path_then_descends_from_it() {
    let prefs = Preferences::new();
    let a = prefs.node("a").unwrap();
    let c = a.node("b/c").unwrap();
    assert_eq!(c.path(), "/a/b/c");
    assert!(Arc::ptr_eq(&c, &prefs.node("/a/b/c").unwrap()));
}

#[test]
fn given_child_node_when_navigating_absolute_path_then_invalid_path() {
    let prefs = Preferences::new();
    let a = prefs.node("a").unwrap();
    let err = a.node("/b").unwrap_err();
    assert!(matches!(err, DomainError::InvalidPath { .. }));
}

#[rstest]
#[case("")]
#[case("a/")]
#[case("a.")]
#[case("a//b")]
fn given_malformed_path_when_navigating_then_invalid_path(#[case] path: &str) {
    let prefs = Preferences::new();
    assert!(prefs.node(path).is_err());
    assert!(prefs.root().children().is_empty());
}

#[test]
fn given_value_when_put_and_removed_then_get_reflects_both() {
    let prefs = Preferences::new();
    let node = prefs.node("app").unwrap();

    node.put("theme", "dark");
    assert_eq!(node.get("theme"), Some(PrefValue::from("dark")));
    assert!(node.contains_key("theme"));

    assert_eq!(node.remove("theme"), Some(PrefValue::from("dark")));
    assert_eq!(node.get("theme"), None);
    assert_eq!(node.remove("theme"), None);
}

#[test]
fn given_keys_in_any_order_when_listing_then_sorted() {
    let prefs = Preferences::new();
    let node = prefs.root();
    node.put("zeta", 1);
    node.put("alpha", 2);
    node.put("mid", 3);
    assert_eq!(node.keys(), vec!["alpha", "mid", "zeta"]);
}

#[test]
fn given_children_when_listing_then_insertion_order() {
    let prefs = Preferences::new();
    for name in ["z", "a", "m"] {
        prefs.node(name).unwrap();
    }
    assert_eq!(prefs.root().children().names(), vec!["z", "a", "m"]);
}

#[test]
fn given_subtree_when_removing_node_then_detached_with_descendants() {
    let prefs = Preferences::new();
    let leaf = prefs.node("a/b/c").unwrap();

    let removed = prefs.remove_node("a.b").unwrap().expect("node existed");
    assert_eq!(removed.path(), "/a/b");
    assert!(!removed.is_attached());
    assert!(!leaf.is_attached());
    assert!(prefs.find("a/b").unwrap().is_none());
    assert!(prefs.find("a").unwrap().is_some());
}

#[test]
fn given_missing_node_when_removing_then_none() {
    let prefs = Preferences::new();
    assert!(prefs.remove_node("nope/deeper").unwrap().is_none());
    assert!(prefs.root().children().is_empty());
}

#[test]
fn given_find_when_node_missing_then_nothing_is_created() {
    let prefs = Preferences::new();
    assert!(prefs.find("a/b").unwrap().is_none());
    assert!(prefs.is_empty());
}

#[test]
fn given_parent_link_when_walking_up_then_reaches_root() {
    let prefs = Preferences::new();
    let c = prefs.node("a/b/c").unwrap();
    let b = c.parent().unwrap();
    let a = b.parent().unwrap();
    let root = a.parent().unwrap();
    assert!(root.is_root());
    assert!(Arc::ptr_eq(&root, prefs.root()));
    assert!(root.parent().is_none());
}

mod ui {
    pub struct Settings;
}

#[test]
fn given_rust_type_when_navigating_by_type_then_path_follows_module() {
    let prefs = Preferences::new();
    let node = prefs.node_for::<ui::Settings>().unwrap();
    assert_eq!(node.path(), "/tree_test/ui/Settings");
    assert!(prefs.remove_node_for::<ui::Settings>().unwrap().is_some());
}

#[test]
fn given_clear_when_node_has_keys_then_all_gone() {
    let prefs = Preferences::new();
    let node = prefs.node("a").unwrap();
    node.put("x", 1);
    node.put("y", 2);
    node.clear();
    assert!(node.keys().is_empty());
}
