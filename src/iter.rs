//! Iterators over a map's entries, keys, and values.

use crate::node::Entry;
use crate::reclaim::Guard;
use std::collections::hash_map;
use std::fmt::{self, Debug};
use std::sync::Arc;

/// An iterator over a map's entries.
///
/// See [`HashMap::iter`](crate::HashMap::iter) for details.
pub struct Iter<'g, K, V> {
    pub(crate) entries: hash_map::Iter<'g, K, Arc<Entry<V>>>,
    pub(crate) guard: &'g Guard<'g>,
}

impl<K, V> Debug for Iter<'_, K, V>
where
    K: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.clone().map(|(key, _)| key))
            .finish()
    }
}

impl<'g, K, V> Iterator for Iter<'g, K, V> {
    type Item = (&'g K, &'g V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (key, entry) = self.entries.next()?;
            // tombstoned and expunged entries are not part of the map
            if let Some(value) = entry.load(self.guard) {
                return Some((key, value));
            }
        }
    }
}

/// An iterator over a map's keys.
///
/// See [`HashMap::keys`](crate::HashMap::keys) for details.
pub struct Keys<'g, K, V> {
    pub(crate) iter: Iter<'g, K, V>,
}

impl<K, V> Debug for Keys<'_, K, V>
where
    K: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.iter.fmt(f)
    }
}

impl<'g, K, V> Iterator for Keys<'g, K, V> {
    type Item = &'g K;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|(key, _)| key)
    }
}

/// An iterator over a map's values.
///
/// See [`HashMap::values`](crate::HashMap::values) for details.
pub struct Values<'g, K, V> {
    pub(crate) iter: Iter<'g, K, V>,
}

impl<K, V> Debug for Values<'_, K, V>
where
    K: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.iter.fmt(f)
    }
}

impl<'g, K, V> Iterator for Values<'g, K, V> {
    type Item = &'g V;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|(_, value)| value)
    }
}

#[cfg(test)]
mod tests {
    use crate::HashMap;
    use std::collections::HashSet;

    #[test]
    fn iter() {
        let map = HashMap::<usize, usize>::new();
        let guard = map.guard();
        map.insert(1, 42, &guard);
        map.insert(2, 84, &guard);

        let entries: HashSet<_> = map.iter(&guard).collect();
        let mut expected = HashSet::new();
        expected.insert((&1, &42));
        expected.insert((&2, &84));
        assert_eq!(entries, expected);
    }

    #[test]
    fn iter_skips_removed_keys() {
        let map = HashMap::<usize, usize>::new();
        let guard = map.guard();
        map.insert(1, 42, &guard);
        map.insert(2, 84, &guard);
        map.remove(&1, &guard);

        let entries: Vec<_> = map.iter(&guard).collect();
        assert_eq!(entries, vec![(&2, &84)]);
    }

    #[test]
    fn keys() {
        let map = HashMap::<usize, usize>::new();
        let guard = map.guard();
        map.insert(1, 42, &guard);
        map.insert(2, 84, &guard);

        let keys: HashSet<_> = map.keys(&guard).collect();
        let mut expected = HashSet::new();
        expected.insert(&1);
        expected.insert(&2);
        assert_eq!(keys, expected);
    }

    #[test]
    fn values() {
        let map = HashMap::<usize, usize>::new();
        let guard = map.guard();
        map.insert(1, 42, &guard);
        map.insert(2, 84, &guard);

        let mut values: Vec<_> = map.values(&guard).collect();
        values.sort();
        assert_eq!(values, vec![&42, &84]);
    }
}
