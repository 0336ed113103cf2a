use snapmap::HashMap;
use std::sync::Arc;

#[test]
fn new() {
    let _map = HashMap::<usize, usize>::new();
}

#[test]
fn get_empty() {
    let map = HashMap::<usize, usize>::new();
    let guard = map.guard();
    let e = map.get(&42, &guard);
    assert!(e.is_none());
}

#[test]
fn remove_empty() {
    let map = HashMap::<usize, usize>::new();
    let guard = map.guard();
    let old = map.remove(&42, &guard);
    assert!(old.is_none());
    assert_eq!(map.len(), 0);
}

#[test]
fn insert_and_get() {
    let map = HashMap::<usize, usize>::new();
    let guard = map.guard();

    assert_eq!(map.insert(42, 0, &guard), None);
    let e = map.get(&42, &guard).unwrap();
    assert_eq!(e, &0);
}

#[test]
fn insert_and_remove() {
    let map = HashMap::<usize, usize>::new();
    let guard = map.guard();

    map.insert(42, 0, &guard);
    let old = map.remove(&42, &guard).unwrap();
    assert_eq!(old, &0);
    assert!(map.get(&42, &guard).is_none());
    assert_eq!(map.len(), 0);
}

#[test]
fn remove_returns_none_the_second_time() {
    let map = HashMap::<usize, usize>::new();
    let guard = map.guard();

    map.insert(42, 0, &guard);
    assert_eq!(map.remove(&42, &guard), Some(&0));
    assert_eq!(map.remove(&42, &guard), None);
}

#[test]
fn update() {
    let map = HashMap::<usize, usize>::new();
    let guard = map.guard();

    map.insert(42, 0, &guard);
    let old = map.insert(42, 1, &guard);
    assert_eq!(old, Some(&0));
    let e = map.get(&42, &guard).unwrap();
    assert_eq!(e, &1);
    assert_eq!(map.len(), 1);
}

#[test]
fn update_after_reads_settle() {
    let map = HashMap::<usize, usize>::new();
    let guard = map.guard();

    map.insert(42, 0, &guard);
    // read until the key is served lock-free, then overwrite it in place
    for _ in 0..4 {
        assert_eq!(map.get(&42, &guard), Some(&0));
    }
    assert_eq!(map.insert(42, 1, &guard), Some(&0));
    assert_eq!(map.get(&42, &guard), Some(&1));
    assert_eq!(map.len(), 1);
}

#[test]
fn len_across_inserts_and_removes() {
    let map = HashMap::<i32, i32>::new();
    let guard = map.guard();

    for i in 0..10 {
        map.insert(i, i, &guard);
    }
    assert_eq!(map.len(), 10);

    for i in 0..3 {
        map.remove(&i, &guard);
    }
    assert_eq!(map.len(), 7);

    // removing an absent key must not move the count
    map.remove(&100, &guard);
    assert_eq!(map.len(), 7);

    for i in 3..5 {
        map.remove(&i, &guard);
    }
    assert_eq!(map.len(), 5);
    assert!(!map.is_empty());
}

#[test]
fn store_delete_store_roundtrip() {
    let map = HashMap::<&str, usize>::new();
    let guard = map.guard();

    map.insert("a", 1, &guard);
    map.remove(&"a", &guard);
    assert!(map.get(&"a", &guard).is_none());
    map.insert("a", 2, &guard);
    assert_eq!(map.get(&"a", &guard), Some(&2));
    assert_eq!(map.len(), 1);
}

#[test]
fn try_insert_fresh_key() {
    let map = HashMap::<usize, usize>::new();
    let guard = map.guard();

    assert_eq!(map.try_insert(42, 0, &guard), Ok(&0));
    assert_eq!(map.get(&42, &guard), Some(&0));
    assert_eq!(map.len(), 1);
}

#[test]
fn try_insert_existing_key_returns_the_input() {
    let map = HashMap::<usize, usize>::new();
    let guard = map.guard();

    map.insert(42, 0, &guard);
    let err = map.try_insert(42, 1, &guard).unwrap_err();
    assert_eq!(err.current, &0);
    assert_eq!(err.not_inserted, 1);
    // the first value is retained
    assert_eq!(map.get(&42, &guard), Some(&0));
    assert_eq!(map.len(), 1);
}

#[test]
fn try_insert_after_remove() {
    let map = HashMap::<usize, usize>::new();
    let guard = map.guard();

    map.insert(42, 0, &guard);
    map.remove(&42, &guard);
    assert_eq!(map.try_insert(42, 1, &guard), Ok(&1));
    assert_eq!(map.len(), 1);
}

#[test]
fn try_insert_error_display() {
    let map = HashMap::<usize, usize>::new();
    let guard = map.guard();

    map.insert(42, 0, &guard);
    let err = map.try_insert(42, 1, &guard).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Insert of \"1\" failed as key was already present with value \"0\""
    );
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Endpoint {
    addrs: Vec<String>,
    port: u16,
    healthy: bool,
}

#[test]
fn composite_values() {
    let map = HashMap::<String, Endpoint>::new();
    let guard = map.guard();

    let primary = Endpoint {
        addrs: vec!["10.0.0.1".to_owned(), "10.0.0.2".to_owned()],
        port: 443,
        healthy: true,
    };
    map.insert("primary".to_owned(), primary.clone(), &guard);
    assert_eq!(map.get("primary", &guard), Some(&primary));

    let degraded = Endpoint {
        healthy: false,
        ..primary.clone()
    };
    assert_eq!(
        map.insert("primary".to_owned(), degraded.clone(), &guard),
        Some(&primary)
    );
    assert_eq!(map.get("primary", &guard), Some(&degraded));
}

#[test]
fn shared_ownership_values() {
    let map = HashMap::<usize, Arc<String>>::new();
    let guard = map.guard();

    let v = Arc::new("shared".to_owned());
    map.insert(1, Arc::clone(&v), &guard);
    let loaded = map.get(&1, &guard).unwrap();
    assert!(Arc::ptr_eq(loaded, &v));
}

#[test]
fn current_kv_dropped() {
    let dropped1 = Arc::new(0);
    let dropped2 = Arc::new(0);

    let map = HashMap::<Arc<usize>, Arc<usize>>::new();

    map.insert(dropped1.clone(), dropped2.clone(), &map.guard());
    assert_eq!(Arc::strong_count(&dropped1), 2);
    assert_eq!(Arc::strong_count(&dropped2), 2);

    drop(map);

    // dropping the map should immediately drop (not deferred) all keys and values
    assert_eq!(Arc::strong_count(&dropped1), 1);
    assert_eq!(Arc::strong_count(&dropped2), 1);
}

#[test]
fn replaced_value_reclaimed_with_the_map() {
    let first = Arc::new(0);
    let map = HashMap::<usize, Arc<usize>>::new();
    {
        let guard = map.guard();
        map.insert(1, first.clone(), &guard);
        map.insert(1, Arc::new(1), &guard);
        // the guard is still pinned, so the replaced value lingers
        assert_eq!(Arc::strong_count(&first), 2);
    }
    drop(map);
    assert_eq!(Arc::strong_count(&first), 1);
}

#[test]
fn removed_value_reclaimed_with_the_map() {
    let value = Arc::new(0);
    let map = HashMap::<usize, Arc<usize>>::new();
    {
        let guard = map.guard();
        map.insert(1, value.clone(), &guard);
        assert_eq!(map.remove(&1, &guard).map(Arc::strong_count), Some(2));
    }
    drop(map);
    assert_eq!(Arc::strong_count(&value), 1);
}

#[test]
fn concurrent_insert() {
    let map = Arc::new(HashMap::<usize, usize>::new());

    let map1 = map.clone();
    let t1 = std::thread::spawn(move || {
        for i in 0..64 {
            map1.insert(i, 0, &map1.guard());
        }
    });
    let map2 = map.clone();
    let t2 = std::thread::spawn(move || {
        for i in 0..64 {
            map2.insert(i, 1, &map2.guard());
        }
    });

    t1.join().unwrap();
    t2.join().unwrap();

    let guard = map.guard();
    for i in 0..64 {
        let v = map.get(&i, &guard).unwrap();
        assert!(v == &0 || v == &1);
    }
    assert_eq!(map.len(), 64);
}

#[test]
fn concurrent_remove() {
    let map = Arc::new(HashMap::<usize, usize>::new());

    {
        let guard = map.guard();
        for i in 0..64 {
            map.insert(i, i, &guard);
        }
    }

    let map1 = map.clone();
    let t1 = std::thread::spawn(move || {
        let guard = map1.guard();
        for i in 0..64 {
            if let Some(v) = map1.remove(&i, &guard) {
                assert_eq!(v, &i);
            }
        }
    });
    let map2 = map.clone();
    let t2 = std::thread::spawn(move || {
        let guard = map2.guard();
        for i in 0..64 {
            if let Some(v) = map2.remove(&i, &guard) {
                assert_eq!(v, &i);
            }
        }
    });

    t1.join().unwrap();
    t2.join().unwrap();

    // after joining the threads, no keys should be left in the map
    let guard = map.guard();
    for i in 0..64 {
        assert!(map.get(&i, &guard).is_none());
    }
    assert_eq!(map.len(), 0);
}

#[test]
fn concurrent_try_insert() {
    let map = Arc::new(HashMap::<usize, usize>::new());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let map = map.clone();
            std::thread::spawn(move || {
                let guard = map.guard();
                let mut won = 0;
                for i in 0..64 {
                    if map.try_insert(i, t, &guard).is_ok() {
                        won += 1;
                    }
                }
                won
            })
        })
        .collect();

    let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    // exactly one writer wins each key
    assert_eq!(total, 64);
    assert_eq!(map.len(), 64);
}

#[test]
fn empty_maps_equal() {
    let map1 = HashMap::<usize, usize>::new();
    let map2 = HashMap::<usize, usize>::new();
    assert_eq!(map1, map2);
    assert_eq!(map2, map1);
}

#[test]
fn different_size_maps_not_equal() {
    let map1 = HashMap::<usize, usize>::new();
    let map2 = HashMap::<usize, usize>::new();
    {
        let guard1 = map1.guard();
        let guard2 = map2.guard();

        map1.insert(1, 0, &guard1);
        map1.insert(2, 0, &guard1);
        map2.insert(1, 0, &guard2);
    }

    assert_ne!(map1, map2);
    assert_ne!(map2, map1);
}

#[test]
fn same_mapping_maps_equal() {
    let map1 = HashMap::<usize, usize>::new();
    let map2 = HashMap::<usize, usize>::new();
    {
        let guard1 = map1.guard();
        let guard2 = map2.guard();

        map1.insert(1, 0, &guard1);
        map1.insert(2, 1, &guard1);
        map2.insert(1, 0, &guard2);
        map2.insert(2, 1, &guard2);
    }

    assert_eq!(map1, map2);
    assert_eq!(map2, map1);
}

#[test]
fn extend_and_check() {
    let map = HashMap::<usize, usize>::new();
    {
        let mut r = &map;
        r.extend((0..100).map(|i| (i, i * 10)));
    }
    let guard = map.guard();
    assert_eq!(map.len(), 100);
    assert_eq!(map.get(&42, &guard), Some(&420));
}

#[test]
fn from_iter_and_check() {
    let map: HashMap<usize, usize> = (0..10).map(|i| (i, i)).collect();
    let guard = map.guard();
    assert_eq!(map.len(), 10);
    assert_eq!(map.get(&7, &guard), Some(&7));
}

#[test]
fn from_iter_empty() {
    let entries: Vec<(usize, usize)> = Vec::new();
    let map: HashMap<usize, usize> = entries.into_iter().collect();
    assert_eq!(map.len(), 0);
}

#[test]
fn debug_format() {
    let map = HashMap::<usize, usize>::new();
    let guard = map.guard();
    map.insert(42, 0, &guard);
    assert_eq!(format!("{:?}", map), "{42: 0}");
}

#[test]
#[should_panic]
fn guard_from_another_map_panics() {
    let map1 = HashMap::<usize, usize>::new();
    let map2 = HashMap::<usize, usize>::new();
    let guard1 = map1.guard();
    map2.insert(1, 1, &guard1);
}
