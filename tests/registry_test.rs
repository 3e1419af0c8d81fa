//! Tests for the instance registry.

use std::sync::{Arc, Weak};
use std::thread;

use rsprefs::application::{InstanceRegistry, Registrant};

struct Record {
    target: Weak<String>,
}

impl Record {
    fn of(target: &Arc<String>) -> Arc<Self> {
        Arc::new(Self {
            target: Arc::downgrade(target),
        })
    }
}

impl Registrant for Record {
    fn identity(&self) -> usize {
        self.target.as_ptr() as *const () as usize
    }

    fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }
}

fn identity(target: &Arc<String>) -> usize {
    Arc::as_ptr(target) as *const () as usize
}

#[test]
fn given_same_instance_twice_when_adding_then_single_record() {
    let registry: InstanceRegistry<Record> = InstanceRegistry::new();
    let target = Arc::new("a".to_string());

    let first = registry.add(Record::of(&target));
    let second = registry.add(Record::of(&target));

    assert_eq!(first, second);
    assert_eq!(registry.len(), 1);
    assert!(registry.contains(identity(&target)));
}

#[test]
fn given_equal_but_distinct_instances_when_adding_then_both_registered() {
    let registry: InstanceRegistry<Record> = InstanceRegistry::new();
    let a = Arc::new("same".to_string());
    let b = Arc::new("same".to_string());

    registry.add(Record::of(&a));
    registry.add(Record::of(&b));

    assert_eq!(registry.len(), 2);
}

#[test]
fn given_registered_instance_when_removing_then_gone_and_second_remove_is_noop() {
    let registry: InstanceRegistry<Record> = InstanceRegistry::new();
    let target = Arc::new("a".to_string());
    registry.add(Record::of(&target));

    assert!(registry.remove(identity(&target)));
    assert!(!registry.remove(identity(&target)));
    assert!(!registry.contains(identity(&target)));
    assert!(registry.is_empty());
}

#[test]
fn given_handle_when_releasing_then_record_is_dropped() {
    let registry: InstanceRegistry<Record> = InstanceRegistry::new();
    let target = Arc::new("a".to_string());
    let handle = registry.add(Record::of(&target));

    assert!(registry.get(handle).is_some());
    assert!(registry.release(handle));
    assert!(registry.get(handle).is_none());
    assert!(!registry.release(handle));
}

#[test]
fn given_dropped_instance_when_iterating_then_record_is_skipped() {
    let registry: InstanceRegistry<Record> = InstanceRegistry::new();
    let kept = Arc::new("kept".to_string());
    let dropped = Arc::new("dropped".to_string());
    registry.add(Record::of(&kept));
    let dead_handle = registry.add(Record::of(&dropped));

    drop(dropped);

    let live = registry.snapshot();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].identity(), identity(&kept));
    assert!(registry.get(dead_handle).is_none());
    assert_eq!(registry.prune(), 1);
    assert_eq!(registry.prune(), 0);
}

#[test]
fn given_snapshot_when_registry_changes_then_snapshot_is_stable() {
    let registry: InstanceRegistry<Record> = InstanceRegistry::new();
    let a = Arc::new("a".to_string());
    let b = Arc::new("b".to_string());
    registry.add(Record::of(&a));

    let snapshot = registry.snapshot();
    registry.add(Record::of(&b));
    registry.remove(identity(&a));

    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].identity(), identity(&a));
    assert_eq!(registry.len(), 1);
}

#[test]
fn given_concurrent_add_and_remove_when_iterating_then_no_fault() {
    let registry: Arc<InstanceRegistry<Record>> = Arc::new(InstanceRegistry::new());
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..200 {
                    let target = Arc::new(i.to_string());
                    registry.add(Record::of(&target));
                    let _ = registry.snapshot().len();
                    registry.remove(identity(&target));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker panicked");
    }
    assert!(registry.is_empty());
}
