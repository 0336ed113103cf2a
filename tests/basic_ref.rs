use snapmap::HashMap;

#[test]
fn insert_and_get() {
    let map = HashMap::<usize, usize>::new();
    let pinned = map.pin();

    assert_eq!(pinned.insert(42, 0), None);
    assert_eq!(pinned.get(&42), Some(&0));
    assert_eq!(pinned.insert(42, 1), Some(&0));
    assert_eq!(pinned.get(&42), Some(&1));
}

#[test]
fn remove() {
    let map = HashMap::<usize, usize>::new();
    let pinned = map.pin();

    pinned.insert(42, 0);
    assert_eq!(pinned.remove(&42), Some(&0));
    assert_eq!(pinned.remove(&42), None);
    assert!(pinned.is_empty());
}

#[test]
fn try_insert() {
    let map = HashMap::<usize, usize>::new();
    let pinned = map.pin();

    assert_eq!(pinned.try_insert(42, 0), Ok(&0));
    let err = pinned.try_insert(42, 1).unwrap_err();
    assert_eq!(err.current, &0);
    assert_eq!(err.not_inserted, 1);
}

#[test]
fn len_and_contains() {
    let map = HashMap::<usize, usize>::new();
    let pinned = map.pin();

    for i in 0..10 {
        pinned.insert(i, i);
    }
    assert_eq!(pinned.len(), 10);
    assert!(pinned.contains_key(&7));
    assert!(!pinned.contains_key(&17));
}

#[test]
fn index() {
    let map = HashMap::<usize, usize>::new();
    let pinned = map.pin();
    pinned.insert(42, 7);
    assert_eq!(pinned[&42], 7);
}

#[test]
#[should_panic]
fn index_absent_key_panics() {
    let map = HashMap::<usize, usize>::new();
    let pinned = map.pin();
    let _ = pinned[&42];
}

#[test]
fn into_iter() {
    let map = HashMap::<usize, usize>::new();
    let pinned = map.pin();
    pinned.insert(1, 10);
    pinned.insert(2, 20);

    let mut pairs: Vec<_> = (&pinned).into_iter().map(|(k, v)| (*k, *v)).collect();
    pairs.sort_unstable();
    assert_eq!(pairs, vec![(1, 10), (2, 20)]);
}

#[test]
fn ref_equals_map() {
    let map1 = HashMap::<usize, usize>::new();
    let map2 = HashMap::<usize, usize>::new();
    {
        let p1 = map1.pin();
        let p2 = map2.pin();
        p1.insert(1, 0);
        p2.insert(1, 0);
        assert_eq!(p1, p2);
        assert_eq!(p1, map2);
        assert_eq!(map1, p2);
    }
    assert_eq!(map1, map2);
}

#[test]
fn debug_format() {
    let map = HashMap::<usize, usize>::new();
    let pinned = map.pin();
    pinned.insert(42, 0);
    assert_eq!(format!("{:?}", pinned), "{42: 0}");
}
