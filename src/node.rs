use crate::reclaim::{Atomic, Guard, Linked, RetireShared, Shared};
use std::sync::atomic::Ordering;

/// Sentinel slot value marking an entry as expunged.
///
/// The pointer is never dereferenced and never retired; it only ever serves as
/// a distinguished address that the slot can be compared against.
fn expunged<V>() -> Shared<'static, V> {
    Shared::from(usize::MAX as *mut Linked<V>)
}

/// Marker for operations that hit an expunged entry and must be retried
/// through the locked write path.
pub(crate) struct Expunged;

/// A single key's value slot, shared between the read snapshot and the dirty
/// map through an `Arc`.
///
/// The slot is in one of three states:
///
///  - it holds a real value pointer: the key is live;
///  - it is null: the key was deleted, but the entry is still linked from the
///    snapshot and a store can revive it in place (a tombstone);
///  - it holds the expunged sentinel: the entry was left out of the dirty map
///    when that map was last rebuilt. The slot is permanently dead, and the
///    key can only re-enter the map through a fresh entry in the dirty map.
///
/// Transitions into and out of the expunged state only happen with the map's
/// mutex held; everything else is a plain compare-and-swap on the slot.
pub(crate) struct Entry<V> {
    slot: Atomic<V>,
}

// Entry owns its value pointer exclusively, so sending an entry sends the
// value; sharing an entry hands out `&V` and lets any thread retire the value.
unsafe impl<V> Send for Entry<V> where V: Send {}
unsafe impl<V> Sync for Entry<V> where V: Send + Sync {}

impl<V> Entry<V> {
    pub(crate) fn new(value: Shared<'_, V>) -> Self {
        Entry {
            slot: Atomic::from(value),
        }
    }

    /// Returns the current value, or `None` if the entry is tombstoned or
    /// expunged.
    pub(crate) fn load<'g>(&self, guard: &'g Guard<'_>) -> Option<&'g V> {
        let p = self.slot.load(Ordering::SeqCst, guard);
        if p.is_null() || p == expunged() {
            return None;
        }
        // safety: the value was read under our guard and is only retired
        // through guards of the same collector, so it stays valid at least
        // until our guard is dropped.
        Some(unsafe { &**p.deref() })
    }

    /// Stores `value` if the entry has not been expunged, returning the
    /// previous value (`None` if the entry was a tombstone).
    ///
    /// Fails with `Expunged` if the key needs to go through the locked path
    /// and be re-inserted into the dirty map first.
    pub(crate) fn try_store<'g>(
        &self,
        value: Shared<'g, V>,
        guard: &'g Guard<'_>,
    ) -> Result<Option<&'g V>, Expunged> {
        let mut p = self.slot.load(Ordering::SeqCst, guard);
        loop {
            if p == expunged() {
                return Err(Expunged);
            }
            match self
                .slot
                .compare_exchange(p, value, Ordering::SeqCst, Ordering::SeqCst, guard)
            {
                Ok(_) => {
                    if p.is_null() {
                        // revived a tombstone
                        return Ok(None);
                    }
                    // safety: the old value is unreachable through the slot now.
                    // readers that loaded it before the swap hold guards from
                    // the same collector, which defers the reclamation.
                    unsafe { guard.retire_shared(p) };
                    return Ok(Some(unsafe { &**p.deref() }));
                }
                Err(current) => p = current,
            }
        }
    }

    /// Unconditionally stores `value`, returning the previous value.
    ///
    /// The caller must hold the map's mutex and must have unexpunged the entry
    /// first, so the slot can only hold null or a real value here.
    pub(crate) fn store_locked<'g>(
        &self,
        value: Shared<'g, V>,
        guard: &'g Guard<'_>,
    ) -> Option<&'g V> {
        let p = self.slot.swap(value, Ordering::SeqCst, guard);
        if p.is_null() {
            return None;
        }
        // safety: as in `try_store`.
        unsafe { guard.retire_shared(p) };
        Some(unsafe { &**p.deref() })
    }

    /// Returns the current value and `true` if the entry is live, otherwise
    /// stores `value` into the tombstoned slot and returns it with `false`.
    ///
    /// Fails with `Expunged` without touching the slot if the entry has been
    /// expunged.
    pub(crate) fn try_load_or_store<'g>(
        &self,
        value: Shared<'g, V>,
        guard: &'g Guard<'_>,
    ) -> Result<(&'g V, bool), Expunged> {
        let mut p = self.slot.load(Ordering::SeqCst, guard);
        loop {
            if p == expunged() {
                return Err(Expunged);
            }
            if !p.is_null() {
                // safety: as in `load`.
                return Ok((unsafe { &**p.deref() }, true));
            }
            match self.slot.compare_exchange(
                Shared::null(),
                value,
                Ordering::SeqCst,
                Ordering::SeqCst,
                guard,
            ) {
                // safety: we just linked `value` into the entry.
                Ok(_) => return Ok((unsafe { &**value.deref() }, false)),
                Err(current) => p = current,
            }
        }
    }

    /// Tombstones the entry, returning the deleted value if it was live.
    pub(crate) fn delete<'g>(&self, guard: &'g Guard<'_>) -> Option<&'g V> {
        let mut p = self.slot.load(Ordering::SeqCst, guard);
        loop {
            if p.is_null() || p == expunged() {
                return None;
            }
            match self.slot.compare_exchange(
                p,
                Shared::null(),
                Ordering::SeqCst,
                Ordering::SeqCst,
                guard,
            ) {
                Ok(_) => {
                    // safety: as in `try_store`.
                    unsafe { guard.retire_shared(p) };
                    return Some(unsafe { &**p.deref() });
                }
                Err(current) => p = current,
            }
        }
    }

    /// Flips an expunged slot back to a plain tombstone.
    ///
    /// Returns `true` if the entry was expunged, in which case the caller must
    /// re-insert it into the dirty map before storing. Must be called with the
    /// map's mutex held.
    pub(crate) fn unexpunge_locked(&self, guard: &Guard<'_>) -> bool {
        self.slot
            .compare_exchange(
                expunged(),
                Shared::null(),
                Ordering::SeqCst,
                Ordering::SeqCst,
                guard,
            )
            .is_ok()
    }

    /// Expunges the entry if it is a tombstone, so that a rebuilt dirty map
    /// can skip it.
    ///
    /// Returns `true` if the entry ends up expunged, `false` if it holds a
    /// live value and must be carried over into the dirty map. Must be called
    /// with the map's mutex held.
    pub(crate) fn try_expunge_locked(&self, guard: &Guard<'_>) -> bool {
        let mut p = self.slot.load(Ordering::SeqCst, guard);
        while p.is_null() {
            match self.slot.compare_exchange(
                Shared::null(),
                expunged(),
                Ordering::SeqCst,
                Ordering::SeqCst,
                guard,
            ) {
                Ok(_) => return true,
                Err(current) => p = current,
            }
        }
        p == expunged()
    }
}

impl<V> Drop for Entry<V> {
    fn drop(&mut self) {
        // the entry is dropped only once neither the snapshot nor the dirty
        // map reference it any longer, so a remaining value is exclusively ours
        let slot = std::mem::replace(&mut self.slot, Atomic::null());
        let ptr = slot.into_ptr();
        if !ptr.is_null() && Shared::from(ptr) != expunged() {
            // safety: the pointer was created by `Shared::boxed` and is not
            // reachable by any other thread.
            drop(unsafe { Box::from_raw(ptr) });
        }
    }
}
