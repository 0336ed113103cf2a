use crate::iter::{Iter, Keys, Values};
use crate::map_ref::HashMapRef;
use crate::node::{Entry, Expunged};
use crate::reclaim::{Atomic, Collector, Guard, GuardRef, RetireShared, Shared};
use crate::DefaultHashBuilder;
use parking_lot::Mutex;
use std::borrow::Borrow;
use std::error::Error;
use std::fmt::{self, Debug, Display};
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type EntryMap<K, V, S> = std::collections::HashMap<K, Arc<Entry<V>>, S>;

/// The immutable view served to lock-free readers.
///
/// Replaced wholesale under the dirty-map mutex; the previous snapshot is
/// retired through the guard, so readers that already loaded it keep a
/// coherent (if stale) view until their guard drops.
struct Snapshot<K, V, S> {
    entries: EntryMap<K, V, S>,
    /// `true` when the dirty map holds keys this snapshot does not.
    amended: bool,
}

/// The mutable overflow store, guarded by the map mutex.
struct Dirty<K, V, S> {
    /// `None` when there are no pending new keys, either because the map was
    /// just created or because the dirty map was promoted into the snapshot.
    /// When materialized it holds every non-expunged entry of the snapshot
    /// plus any keys inserted since.
    map: Option<EntryMap<K, V, S>>,
    /// Number of snapshot misses that had to fall back to the locked path
    /// since the dirty map was last promoted.
    misses: usize,
}

/// A concurrent hash map optimized for read-heavy workloads.
///
/// Reads are served lock-free from an immutable snapshot of the map. Writes to
/// keys the snapshot already covers are a single compare-and-swap on the key's
/// value slot; only writes of *new* keys (and reads that miss the snapshot)
/// take a [`Mutex`] protecting an overflow map. Each such miss is counted, and
/// once enough misses accumulate the overflow map is promoted wholesale into a
/// fresh snapshot so subsequent reads are lock-free again.
///
/// This layout trades write throughput for read scalability: a map whose key
/// set stabilizes (caches, registries, subscription tables) quickly converges
/// to a state where every operation on an existing key touches no lock at all.
/// For workloads that continuously insert fresh keys, a sharded or
/// bucket-level-locked map will generally do better.
///
/// # Keys and values
///
/// Values are stored behind atomically swappable pointers and handed out as
/// `&'g V` references tied to a [`Guard`]. A replaced or removed value is not
/// dropped until every guard that might have observed it is released. Keys are
/// cloned when the overflow map is rebuilt from the snapshot, so `K: Clone` is
/// required for writes; cheap-to-clone keys (integers, `Arc`ed strings) are a
/// good fit.
///
/// Deleting a key tombstones its value slot in place. The key itself remains
/// in the snapshot (and, if materialized, the overflow map) until the next
/// rebuild cycle, which is when entries that are still dead get dropped. A
/// deleted key therefore continues to occupy memory for a while; this is the
/// price of letting readers traverse the snapshot without any coordination.
///
/// # Guards
///
/// Most methods take a `&Guard` obtained from [`HashMap::guard`], which pins
/// the map's garbage collector and keeps every reference returned under it
/// valid. Guards are cheap but not free; batch several operations under one
/// guard when convenient, and drop guards promptly so memory can be reclaimed.
/// [`HashMap::pin`] returns a [`HashMapRef`] that bundles a guard for callers
/// that prefer not to thread one through.
///
/// Using a guard from one map with another map panics.
///
/// # Consistency
///
/// Operations on a single key are linearizable. Aggregates are not:
/// [`len`](HashMap::len) and iteration reflect some recent state of the map
/// and may miss or include keys that are concurrently inserted or removed.
/// Iteration yields each key at most once, and every value it yields was the
/// key's current value at some point during the iteration.
///
/// # Examples
///
/// ```
/// use snapmap::HashMap;
///
/// let map = HashMap::new();
/// let guard = map.guard();
///
/// map.insert("zero", 0, &guard);
/// map.insert("one", 1, &guard);
/// assert_eq!(map.get(&"zero", &guard), Some(&0));
///
/// map.remove(&"zero", &guard);
/// assert!(!map.contains_key(&"zero", &guard));
/// ```
pub struct HashMap<K, V, S = DefaultHashBuilder> {
    /// The published snapshot. Loaded lock-free by readers, replaced only with
    /// `dirty` locked.
    read: Atomic<Snapshot<K, V, S>>,

    /// The overflow store and its miss counter.
    dirty: Mutex<Dirty<K, V, S>>,

    /// Number of live keys. Updated in the same step as the entry lifecycle
    /// transition that justifies it.
    count: AtomicUsize,

    /// Every value and snapshot retired by this map goes through this
    /// collector, and every guard used with the map must come from it.
    collector: Collector,
}

// the map hands out nothing that outlives a guard, but retired keys and
// values may be dropped by whichever thread flushes the collector, so
// shared maps need K and V to move between threads
unsafe impl<K, V, S> Send for HashMap<K, V, S>
where
    K: Send,
    V: Send,
    S: Send,
{
}

unsafe impl<K, V, S> Sync for HashMap<K, V, S>
where
    K: Send + Sync,
    V: Send + Sync,
    S: Sync,
{
}

impl<K, V> HashMap<K, V, DefaultHashBuilder> {
    /// Creates an empty map with the default hasher.
    ///
    /// # Examples
    ///
    /// ```
    /// use snapmap::HashMap;
    /// let map: HashMap<&str, i32> = HashMap::new();
    /// ```
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K, V, S> Default for HashMap<K, V, S>
where
    S: Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> HashMap<K, V, S> {
    /// Creates an empty map which will use `hash_builder` to hash keys.
    ///
    /// The created map has the default initial capacity.
    ///
    /// Warning: `hash_builder` is normally randomly generated, and is designed
    /// to allow the map to be resistant to attacks that cause many collisions
    /// and very poor performance. Setting it manually using this function can
    /// expose a DoS attack vector.
    ///
    /// # Examples
    ///
    /// ```
    /// use snapmap::{HashMap, DefaultHashBuilder};
    ///
    /// let map = HashMap::with_hasher(DefaultHashBuilder::default());
    /// map.pin().insert(1, 2);
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        let collector = Collector::new();
        let snapshot = Snapshot {
            entries: EntryMap::with_hasher(hash_builder),
            amended: false,
        };
        let read = Atomic::from(Shared::boxed(snapshot, &collector));
        Self {
            read,
            dirty: Mutex::new(Dirty {
                map: None,
                misses: 0,
            }),
            count: AtomicUsize::new(0),
            collector,
        }
    }

    /// Pins a guard for use with this map.
    ///
    /// Keeping a guard pinned delays the reclamation of values removed from
    /// the map, so guards should be dropped (or [re-used](HashMap::guard))
    /// rather than held for long stretches.
    pub fn guard(&self) -> Guard<'_> {
        self.collector.enter()
    }

    #[inline]
    fn check_guard(&self, guard: &Guard<'_>) {
        if let Some(c) = guard.collector() {
            assert!(Collector::ptr_eq(c, &self.collector));
        }
    }

    /// Loads the currently published snapshot.
    fn snapshot<'g>(&'g self, guard: &'g Guard<'_>) -> &'g Snapshot<K, V, S> {
        let read = self.read.load(Ordering::SeqCst, guard);
        // safety: snapshots are only replaced under the mutex, and the old one
        // is retired through a guard of our collector. we hold such a guard,
        // so the snapshot we loaded stays valid until the guard drops.
        unsafe { &**read.deref() }
    }

    /// Loads a snapshot that covers every key in the map, promoting the dirty
    /// map first if it holds keys the snapshot does not.
    fn full_snapshot<'g>(&'g self, guard: &'g Guard<'_>) -> &'g Snapshot<K, V, S> {
        let read = self.snapshot(guard);
        if !read.amended {
            return read;
        }
        let mut dirty = self.dirty.lock();
        // a concurrent promotion may have beaten us to the lock
        let read = self.snapshot(guard);
        if !read.amended {
            return read;
        }
        self.promote_locked(&mut dirty, guard)
    }

    /// Publishes the dirty map as the new snapshot and resets the miss count.
    fn promote_locked<'g>(
        &'g self,
        dirty: &mut Dirty<K, V, S>,
        guard: &'g Guard<'_>,
    ) -> &'g Snapshot<K, V, S> {
        let entries = match dirty.map.take() {
            Some(entries) => entries,
            None => unreachable!("tried to promote without pending writes"),
        };
        dirty.misses = 0;
        let snapshot = Shared::boxed(
            Snapshot {
                entries,
                amended: false,
            },
            &self.collector,
        );
        let old = self.read.swap(snapshot, Ordering::SeqCst, guard);
        // safety: the old snapshot is unreachable to new readers, and readers
        // that already loaded it hold guards that defer its reclamation.
        unsafe { guard.retire_shared(old) };
        // safety: we just published this snapshot while holding a guard.
        unsafe { &**snapshot.deref() }
    }

    /// Records a snapshot miss that had to consult the dirty map, and promotes
    /// the dirty map once misses catch up with its size.
    fn miss_locked<'g>(&'g self, dirty: &mut Dirty<K, V, S>, guard: &'g Guard<'_>) {
        dirty.misses += 1;
        if dirty.misses < dirty.map.as_ref().map_or(0, |m| m.len()) {
            return;
        }
        let _ = self.promote_locked(dirty, guard);
    }

    /// Returns the number of live keys in the map.
    ///
    /// The count reflects some recent state of the map; concurrent inserts and
    /// removes may not be visible yet.
    ///
    /// # Examples
    ///
    /// ```
    /// use snapmap::HashMap;
    ///
    /// let map = HashMap::new();
    /// let guard = map.guard();
    ///
    /// map.insert(1, "a", &guard);
    /// map.insert(2, "b", &guard);
    /// assert_eq!(map.len(), 2);
    /// ```
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    /// Returns `true` if the map holds no live keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// An iterator visiting all key-value pairs in arbitrary order.
    ///
    /// The iterator walks a snapshot that covers every key present when the
    /// iterator was created, skipping keys that have since been removed.
    /// Values are read at yield time, so a pair observed late in the iteration
    /// may reflect a write that happened after the iteration began.
    ///
    /// # Examples
    ///
    /// ```
    /// use snapmap::HashMap;
    ///
    /// let map = HashMap::new();
    /// let guard = map.guard();
    /// map.insert(1, "a", &guard);
    /// map.insert(2, "b", &guard);
    ///
    /// for (key, value) in map.iter(&guard) {
    ///     println!("{key}: {value}");
    /// }
    /// ```
    pub fn iter<'g>(&'g self, guard: &'g Guard<'_>) -> Iter<'g, K, V> {
        self.check_guard(guard);
        let snapshot = self.full_snapshot(guard);
        Iter {
            entries: snapshot.entries.iter(),
            guard,
        }
    }

    /// An iterator visiting all keys in arbitrary order.
    pub fn keys<'g>(&'g self, guard: &'g Guard<'_>) -> Keys<'g, K, V> {
        Keys {
            iter: self.iter(guard),
        }
    }

    /// An iterator visiting all values in arbitrary order.
    pub fn values<'g>(&'g self, guard: &'g Guard<'_>) -> Values<'g, K, V> {
        Values {
            iter: self.iter(guard),
        }
    }

    /// Returns a reference to this map bundled with a freshly pinned guard.
    ///
    /// The returned [`HashMapRef`] exposes the same operations without a
    /// `&Guard` argument, at the cost of pinning until it is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use snapmap::HashMap;
    ///
    /// let map = HashMap::new();
    /// map.pin().insert("a", 1);
    /// assert_eq!(map.pin().get(&"a"), Some(&1));
    /// ```
    pub fn pin(&self) -> HashMapRef<'_, K, V, S> {
        HashMapRef {
            map: self,
            guard: GuardRef::Owned(self.guard()),
        }
    }

    /// Returns a reference to this map bundled with an existing guard.
    pub fn with_guard<'g>(&'g self, guard: &'g Guard<'g>) -> HashMapRef<'g, K, V, S> {
        HashMapRef {
            map: self,
            guard: GuardRef::Ref(guard),
        }
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Returns a reference to the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type, but
    /// [`Hash`] and [`Eq`] on the borrowed form *must* match those for the
    /// key type.
    ///
    /// # Examples
    ///
    /// ```
    /// use snapmap::HashMap;
    ///
    /// let map = HashMap::new();
    /// let guard = map.guard();
    /// map.insert(1, "a", &guard);
    /// assert_eq!(map.get(&1, &guard), Some(&"a"));
    /// assert_eq!(map.get(&2, &guard), None);
    /// ```
    pub fn get<'g, Q>(&'g self, key: &Q, guard: &'g Guard<'_>) -> Option<&'g V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.check_guard(guard);
        let read = self.snapshot(guard);
        match read.entries.get(key) {
            Some(entry) => entry.load(guard),
            None if read.amended => self.get_slow(key, guard),
            None => None,
        }
    }

    #[cold]
    fn get_slow<'g, Q>(&'g self, key: &Q, guard: &'g Guard<'_>) -> Option<&'g V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let mut dirty = self.dirty.lock();
        // the dirty map may have been promoted while we waited for the lock
        let read = self.snapshot(guard);
        if let Some(entry) = read.entries.get(key) {
            return entry.load(guard);
        }
        if !read.amended {
            return None;
        }
        let value = dirty
            .map
            .as_ref()
            .and_then(|m| m.get(key))
            .and_then(|entry| entry.load(guard));
        // a miss counts whether or not the dirty map held the key
        self.miss_locked(&mut dirty, guard);
        value
    }

    /// Returns `true` if the map contains a value for the given key.
    ///
    /// # Examples
    ///
    /// ```
    /// use snapmap::HashMap;
    ///
    /// let map = HashMap::new();
    /// let guard = map.guard();
    /// map.insert(1, "a", &guard);
    /// assert!(map.contains_key(&1, &guard));
    /// assert!(!map.contains_key(&2, &guard));
    /// ```
    pub fn contains_key<Q>(&self, key: &Q, guard: &Guard<'_>) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get(key, guard).is_some()
    }

    /// Tests self and another map for inclusion of the same key-value pairs,
    /// using the given guards for each map.
    ///
    /// As with any aggregate operation, the result only reflects some recent
    /// state if either map is concurrently modified.
    pub fn guarded_eq(
        &self,
        other: &Self,
        our_guard: &Guard<'_>,
        their_guard: &Guard<'_>,
    ) -> bool
    where
        V: PartialEq,
    {
        if self.len() != other.len() {
            return false;
        }
        self.iter(our_guard)
            .all(|(key, value)| other.get(key, their_guard) == Some(value))
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    K: 'static + Sync + Send + Clone + Hash + Eq,
    V: 'static + Sync + Send,
    S: BuildHasher + Clone,
{
    /// Inserts a key-value pair into the map, returning the value previously
    /// mapped to the key, if any.
    ///
    /// If the key is covered by the current snapshot the insert is a single
    /// compare-and-swap; otherwise it goes through the map mutex.
    ///
    /// # Examples
    ///
    /// ```
    /// use snapmap::HashMap;
    ///
    /// let map = HashMap::new();
    /// let guard = map.guard();
    /// assert_eq!(map.insert(37, "a", &guard), None);
    /// assert_eq!(map.insert(37, "b", &guard), Some(&"a"));
    /// assert_eq!(map.get(&37, &guard), Some(&"b"));
    /// ```
    pub fn insert<'g>(&'g self, key: K, value: V, guard: &'g Guard<'_>) -> Option<&'g V> {
        self.check_guard(guard);
        let value = Shared::boxed(value, &self.collector);
        let read = self.snapshot(guard);
        if let Some(entry) = read.entries.get(&key) {
            if let Ok(old) = entry.try_store(value, guard) {
                if old.is_none() {
                    self.count.fetch_add(1, Ordering::SeqCst);
                }
                return old;
            }
            // the entry was expunged; fall through to the locked path
        }
        self.insert_slow(key, value, guard)
    }

    #[cold]
    fn insert_slow<'g>(
        &'g self,
        key: K,
        value: Shared<'g, V>,
        guard: &'g Guard<'_>,
    ) -> Option<&'g V> {
        let mut dirty = self.dirty.lock();
        let read = self.snapshot(guard);
        let old = if let Some(entry) = read.entries.get(&key) {
            if entry.unexpunge_locked(guard) {
                // the entry was expunged when the dirty map was last rebuilt,
                // so the dirty map exists and does not contain this key
                match dirty.map.as_mut() {
                    Some(m) => {
                        m.insert(key, Arc::clone(entry));
                    }
                    None => unreachable!("expunged entries imply a materialized dirty map"),
                }
            }
            entry.store_locked(value, guard)
        } else {
            let dirty_entry = dirty.map.as_ref().and_then(|m| m.get(&key)).map(Arc::clone);
            match dirty_entry {
                Some(entry) => entry.store_locked(value, guard),
                None => {
                    if !read.amended {
                        // first key the snapshot does not cover: materialize
                        // the dirty map and republish the snapshot as amended
                        self.amend_locked(read, &mut dirty, guard);
                    }
                    match dirty.map.as_mut() {
                        Some(m) => {
                            m.insert(key, Arc::new(Entry::new(value)));
                        }
                        None => unreachable!("amended snapshots imply a materialized dirty map"),
                    }
                    None
                }
            }
        };
        drop(dirty);
        if old.is_none() {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
        old
    }

    /// Inserts a key-value pair into the map unless the key already holds a
    /// value.
    ///
    /// If the insert happens the new value is returned. Otherwise the error
    /// carries both the value currently mapped to the key and the rejected
    /// value, so the caller gets its input back.
    ///
    /// # Examples
    ///
    /// ```
    /// use snapmap::{HashMap, TryInsertError};
    ///
    /// let map = HashMap::new();
    /// let guard = map.guard();
    /// assert_eq!(map.try_insert(37, "a", &guard), Ok(&"a"));
    /// assert_eq!(
    ///     map.try_insert(37, "b", &guard),
    ///     Err(TryInsertError {
    ///         current: &"a",
    ///         not_inserted: "b",
    ///     })
    /// );
    /// ```
    pub fn try_insert<'g>(
        &'g self,
        key: K,
        value: V,
        guard: &'g Guard<'_>,
    ) -> Result<&'g V, TryInsertError<'g, V>> {
        self.check_guard(guard);
        let read = self.snapshot(guard);
        let snapshot_entry = read.entries.get(&key);
        if let Some(entry) = snapshot_entry {
            // common case: the key is live in the snapshot, which we can
            // report without boxing the value
            if let Some(current) = entry.load(guard) {
                return Err(TryInsertError {
                    current,
                    not_inserted: value,
                });
            }
        }
        let value = Shared::boxed(value, &self.collector);
        let raced = snapshot_entry.and_then(|entry| entry.try_load_or_store(value, guard).ok());
        let (current, loaded) = match raced {
            Some(result) => result,
            None => self.try_insert_slow(key, value, guard),
        };
        if loaded {
            // safety: `value` never became reachable to other threads, so we
            // can reclaim it immediately and return it to the caller.
            let not_inserted = unsafe { value.into_box() }.value;
            return Err(TryInsertError {
                current,
                not_inserted,
            });
        }
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(current)
    }

    #[cold]
    fn try_insert_slow<'g>(
        &'g self,
        key: K,
        value: Shared<'g, V>,
        guard: &'g Guard<'_>,
    ) -> (&'g V, bool) {
        let mut dirty = self.dirty.lock();
        let read = self.snapshot(guard);
        if let Some(entry) = read.entries.get(&key) {
            if entry.unexpunge_locked(guard) {
                match dirty.map.as_mut() {
                    Some(m) => {
                        m.insert(key, Arc::clone(entry));
                    }
                    None => unreachable!("expunged entries imply a materialized dirty map"),
                }
            }
            match entry.try_load_or_store(value, guard) {
                Ok(result) => result,
                // expunging only happens with the lock held, and we hold it
                Err(Expunged) => unreachable!("entry expunged while the map lock was held"),
            }
        } else {
            let dirty_entry = dirty.map.as_ref().and_then(|m| m.get(&key)).map(Arc::clone);
            match dirty_entry {
                Some(entry) => {
                    let result = match entry.try_load_or_store(value, guard) {
                        Ok(result) => result,
                        Err(Expunged) => {
                            unreachable!("entry expunged while the map lock was held")
                        }
                    };
                    self.miss_locked(&mut dirty, guard);
                    result
                }
                None => {
                    if !read.amended {
                        self.amend_locked(read, &mut dirty, guard);
                    }
                    match dirty.map.as_mut() {
                        Some(m) => {
                            m.insert(key, Arc::new(Entry::new(value)));
                        }
                        None => unreachable!("amended snapshots imply a materialized dirty map"),
                    }
                    // safety: we just linked `value` into the new entry.
                    (unsafe { &**value.deref() }, false)
                }
            }
        }
    }

    /// Removes the key (and its value) from the map, returning the value that
    /// was mapped to it, if the key was previously in the map.
    ///
    /// The key may be any borrowed form of the map's key type, but
    /// [`Hash`] and [`Eq`] on the borrowed form *must* match those for the
    /// key type.
    ///
    /// # Examples
    ///
    /// ```
    /// use snapmap::HashMap;
    ///
    /// let map = HashMap::new();
    /// let guard = map.guard();
    /// map.insert(1, "a", &guard);
    /// assert_eq!(map.remove(&1, &guard), Some(&"a"));
    /// assert_eq!(map.remove(&1, &guard), None);
    /// ```
    pub fn remove<'g, Q>(&'g self, key: &Q, guard: &'g Guard<'_>) -> Option<&'g V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.check_guard(guard);
        let read = self.snapshot(guard);
        match read.entries.get(key) {
            Some(entry) => self.delete_entry(entry, guard),
            None if read.amended => self.remove_slow(key, guard),
            None => None,
        }
    }

    #[cold]
    fn remove_slow<'g, Q>(&'g self, key: &Q, guard: &'g Guard<'_>) -> Option<&'g V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let mut dirty = self.dirty.lock();
        let read = self.snapshot(guard);
        if let Some(entry) = read.entries.get(key) {
            return self.delete_entry(entry, guard);
        }
        if !read.amended {
            return None;
        }
        // the entry stays in the dirty map as a tombstone; it is dropped
        // wholesale when the dirty map is next rebuilt, so readers holding
        // a reference to the value are never cut off early
        let removed = dirty
            .map
            .as_ref()
            .and_then(|m| m.get(key))
            .and_then(|entry| self.delete_entry(entry, guard));
        self.miss_locked(&mut dirty, guard);
        removed
    }

    fn delete_entry<'g>(&self, entry: &Entry<V>, guard: &'g Guard<'_>) -> Option<&'g V> {
        let removed = entry.delete(guard);
        if removed.is_some() {
            self.count.fetch_sub(1, Ordering::SeqCst);
        }
        removed
    }

    /// Materializes the dirty map from the snapshot and republishes the
    /// snapshot with `amended` set.
    ///
    /// Tombstoned snapshot entries are expunged instead of copied, which is
    /// what lets the rebuilt map forget deleted keys.
    fn amend_locked(&self, read: &Snapshot<K, V, S>, dirty: &mut Dirty<K, V, S>, guard: &Guard<'_>) {
        if dirty.map.is_none() {
            let mut map = EntryMap::with_capacity_and_hasher(
                read.entries.len(),
                read.entries.hasher().clone(),
            );
            for (key, entry) in &read.entries {
                if !entry.try_expunge_locked(guard) {
                    map.insert(key.clone(), Arc::clone(entry));
                }
            }
            dirty.map = Some(map);
        }
        let amended = Shared::boxed(
            Snapshot {
                entries: read.entries.clone(),
                amended: true,
            },
            &self.collector,
        );
        let old = self.read.swap(amended, Ordering::SeqCst, guard);
        // safety: as in `promote_locked`. note that `read` itself points into
        // the retired snapshot, which our guard keeps alive.
        unsafe { guard.retire_shared(old) };
    }
}

impl<K, V, S> Drop for HashMap<K, V, S> {
    fn drop(&mut self) {
        // dropping the collector afterwards reclaims everything retired
        // through it, so only the published snapshot needs freeing here
        let read = std::mem::replace(&mut self.read, Atomic::null());
        // safety: we have exclusive access, so no guard can still reference
        // the snapshot.
        drop(unsafe { read.into_box() });
    }
}

impl<K, V, S> Debug for HashMap<K, V, S>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.guard();
        f.debug_map().entries(self.iter(&guard)).finish()
    }
}

impl<K, V, S> PartialEq for HashMap<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.guarded_eq(other, &self.guard(), &other.guard())
    }
}

impl<K, V, S> Eq for HashMap<K, V, S>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, V, S> Extend<(K, V)> for &HashMap<K, V, S>
where
    K: 'static + Sync + Send + Clone + Hash + Eq,
    V: 'static + Sync + Send,
    S: BuildHasher + Clone,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        let guard = self.guard();
        for (key, value) in iter {
            self.insert(key, value, &guard);
        }
    }
}

impl<'a, K, V, S> Extend<(&'a K, &'a V)> for &HashMap<K, V, S>
where
    K: 'static + Sync + Send + Copy + Hash + Eq,
    V: 'static + Sync + Send + Copy,
    S: BuildHasher + Clone,
{
    fn extend<T: IntoIterator<Item = (&'a K, &'a V)>>(&mut self, iter: T) {
        self.extend(iter.into_iter().map(|(&key, &value)| (key, value)));
    }
}

impl<K, V> FromIterator<(K, V)> for HashMap<K, V, DefaultHashBuilder>
where
    K: 'static + Sync + Send + Clone + Hash + Eq,
    V: 'static + Sync + Send,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let map = Self::new();
        (&map).extend(iter);
        map
    }
}

impl<'a, K, V> FromIterator<(&'a K, &'a V)> for HashMap<K, V, DefaultHashBuilder>
where
    K: 'static + Sync + Send + Copy + Hash + Eq,
    V: 'static + Sync + Send + Copy,
{
    fn from_iter<T: IntoIterator<Item = (&'a K, &'a V)>>(iter: T) -> Self {
        Self::from_iter(iter.into_iter().map(|(&key, &value)| (key, value)))
    }
}

/// The error returned by [`try_insert`](HashMap::try_insert) when the key
/// already exists.
///
/// Contains the existing value, and the value that was not inserted.
#[derive(Debug, PartialEq, Eq)]
pub struct TryInsertError<'a, V> {
    /// A reference to the current value mapped to the key.
    pub current: &'a V,
    /// The value that [`try_insert`](HashMap::try_insert) failed to insert.
    pub not_inserted: V,
}

impl<'a, V> Display for TryInsertError<'a, V>
where
    V: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Insert of \"{:?}\" failed as key was already present with value \"{:?}\"",
            self.not_inserted, self.current
        )
    }
}

impl<'a, V> Error for TryInsertError<'a, V> where V: Debug {}
