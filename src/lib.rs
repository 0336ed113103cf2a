//! A concurrent hash map optimized for read-heavy workloads, based on the
//! snapshot-plus-overflow design of Go's `sync.Map`.
//!
//! The map keeps its entries in two places: an immutable snapshot that readers
//! traverse without any locking, and a mutex-guarded overflow ("dirty") map
//! that picks up keys the snapshot does not yet cover. Reads that hit the
//! snapshot are a hash lookup plus one atomic load. Writes to keys the
//! snapshot covers are a single compare-and-swap on the key's value slot.
//! Only operations on keys outside the snapshot take the mutex, and every such
//! read is counted as a miss; once the misses catch up with the size of the
//! dirty map, the dirty map is promoted wholesale into a fresh snapshot and
//! the fast path covers everything again.
//!
//! This makes the map a good fit for two access patterns:
//!
//! 1. keys are written once and read many times, as in caches that only grow;
//! 2. disjoint sets of keys are updated from different threads.
//!
//! In both cases the map converges to a state where the mutex is not touched
//! at all. For workloads that keep inserting fresh keys, a sharded map or a
//! `RwLock<HashMap>` may well perform better; measure before committing.
//!
//! # A note on deletion
//!
//! Removing a key does not immediately unlink it. The key's value slot is
//! tombstoned in place so that concurrent readers never observe a torn map,
//! and the key itself is forgotten the next time the dirty map is rebuilt
//! from the snapshot. Memory for deleted keys is therefore reclaimed in
//! batches, not per removal.
//!
//! # Guards and memory reclamation
//!
//! Lock-free reads mean values cannot be dropped the moment they are replaced
//! or removed: another thread may still hold a reference. The map therefore
//! hands out `&'g V` borrows tied to a [`Guard`], and defers reclamation of
//! retired values until no guard that could have observed them remains. The
//! same mechanism protects whole snapshots during promotion.
//!
//! Obtain a guard with [`HashMap::guard`], or use [`HashMap::pin`] to get a
//! [`HashMapRef`] that manages one for you:
//!
//! ```
//! use snapmap::HashMap;
//!
//! let map = HashMap::new();
//!
//! // pinned handle, guard managed for you
//! map.pin().insert('a', 1);
//!
//! // explicit guard, references stay valid as long as it does
//! let guard = map.guard();
//! map.insert('b', 2, &guard);
//! let b = map.get(&'b', &guard);
//! assert_eq!(b, Some(&2));
//! ```
//!
//! Guards are per-map: passing a guard from one map to another panics.
//!
//! # Consistency
//!
//! Operations on a single key are atomic and totally ordered. Aggregate
//! operations ([`HashMap::len`], iteration, equality) reflect some recent
//! state of the map rather than an instantaneous one; iteration visits every
//! key at most once and never yields a torn value, but it may or may not
//! reflect writes that are concurrent with it.
#![deny(missing_docs, missing_debug_implementations, unreachable_pub)]
#![warn(rust_2018_idioms)]

mod map;
mod map_ref;
mod node;
mod reclaim;

pub mod iter;

#[cfg(feature = "rayon")]
mod rayon_impls;
#[cfg(feature = "serde")]
mod serde_impls;

pub use map::{HashMap, TryInsertError};
pub use map_ref::HashMapRef;
pub use seize::Guard;

/// Default hasher for [`HashMap`].
pub type DefaultHashBuilder = ahash::RandomState;
