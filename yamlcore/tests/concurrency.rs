//! A registry shared between threads.

use std::sync::Arc;
use std::thread;

use tempfile::TempDir;
use yamlcore::{Registry, Value};

#[test]
fn racing_creates_of_one_id_yield_a_single_document() {
    let tmp = TempDir::new().unwrap();
    let registry = Arc::new(Registry::open(tmp.path()).build().unwrap());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            // Mixed case so the case-insensitive check is what serializes them.
            let id = if i % 2 == 0 { "arena" } else { "ARENA" };
            thread::spawn(move || registry.create(id).is_ok())
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(successes, 1);
    assert_eq!(registry.count(), 1);
}

#[test]
fn parallel_creates_and_writes_of_distinct_ids() {
    let tmp = TempDir::new().unwrap();
    let registry = Arc::new(Registry::open(tmp.path()).build().unwrap());

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let id = format!("player{i}");
                registry.create(&id).unwrap();
                registry.set_value_and_save(&id, "score", i).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.count(), 16);
    let fresh = Registry::open(tmp.path()).build().unwrap();
    assert_eq!(fresh.count(), 16);
    assert_eq!(fresh.get_value("player7", "score").unwrap(), Some(Value::from(7)));
}

#[test]
fn concurrent_writers_on_one_document() {
    let tmp = TempDir::new().unwrap();
    let registry = Arc::new(Registry::open(tmp.path()).build().unwrap());
    registry.create("counter").unwrap();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for n in 0..25 {
                    registry
                        .set_value("counter", &format!("t{t}.n{n}"), n)
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let keys = registry.get_keys("counter", "", true).unwrap().unwrap();
    assert_eq!(keys.len(), 4 + 4 * 25);
}

#[test]
fn saving_while_removing_never_resurrects_the_file() {
    let tmp = TempDir::new().unwrap();
    let registry = Arc::new(Registry::open(tmp.path()).build().unwrap());
    let path = tmp.path().join("x.yml");

    for _ in 0..200 {
        let doc = registry.create("x").unwrap();
        for k in 0..300 {
            doc.set_value(&format!("k{k}"), k).unwrap();
        }

        let saver = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || while registry.save("x").is_ok() {})
        };
        assert!(registry.remove("x").unwrap());
        saver.join().unwrap();

        assert!(!registry.exists("x"));
        assert!(!path.exists(), "file reappeared after remove");
    }
}

#[test]
fn set_value_racing_remove_and_create_keeps_the_new_document() {
    let tmp = TempDir::new().unwrap();
    let registry = Arc::new(Registry::open(tmp.path()).build().unwrap());

    for _ in 0..200 {
        registry.create("y").unwrap();

        let writer = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let _ = registry.set_value("y", "stale", true);
            })
        };
        assert!(registry.remove("y").unwrap());
        let fresh = registry.create("y").unwrap();
        writer.join().unwrap();

        let indexed = registry.find("y").unwrap();
        assert!(indexed.ptr_eq(&fresh));
        assert!(registry.remove("y").unwrap());
    }
}
