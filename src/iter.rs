//! Lazy, finite, single-pass iterators over a snapshot of live entries (§4.6).
//!
//! Each iterator pins its own epoch guard for its whole lifetime and walks
//! the slot array once from index 0. Liveness is re-checked on every `next()`
//! call rather than trusted from a prior `hasNext()`-style peek — a slot a
//! concurrent writer clears or recycles between two `next()` calls is simply
//! skipped, never yielded stale (resolves the defensive-peek open question).
//!
//! Which backing an iterator walks — recycling [`Slot`]s or detaching
//! [`DetachSlot`]s — is fixed once at the map's construction (see
//! `map.rs::Backing`); [`BackingRef`] just borrows whichever one is live.

use crossbeam_epoch::Guard;

use crate::map::MonkeyMap;
use crate::record::DetachSlot;
use crate::slot::Slot;

pub(crate) enum BackingRef<'a, K, V> {
    Recycling(&'a [Slot<K, V>]),
    Detaching(&'a [DetachSlot<K, V>]),
}

/// Iterator over live keys. See [`MonkeyMap::keys`].
pub struct Keys<'a, K, V> {
    slots: BackingRef<'a, K, V>,
    guard: Guard,
    cursor: usize,
}

impl<'a, K, V> Keys<'a, K, V> {
    pub(crate) fn new(map: &'a MonkeyMap<K, V>) -> Self {
        Self {
            slots: map.backing_ref(),
            guard: crossbeam_epoch::pin(),
            cursor: 0,
        }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V>
where
    K: Clone,
{
    type Item = K;

    fn next(&mut self) -> Option<K> {
        match &self.slots {
            BackingRef::Recycling(slots) => {
                while self.cursor < slots.len() {
                    let slot = &slots[self.cursor];
                    self.cursor += 1;
                    let key_shared = slot.load_key(&self.guard);
                    if key_shared.is_null() {
                        continue;
                    }
                    // SAFETY: non-null under a guard pinned for this
                    // iterator's life.
                    return Some(unsafe { key_shared.deref() }.clone());
                }
            }
            BackingRef::Detaching(slots) => {
                while self.cursor < slots.len() {
                    let record_shared = slots[self.cursor].load(&self.guard);
                    self.cursor += 1;
                    if record_shared.is_null() {
                        continue;
                    }
                    // SAFETY: non-null under a guard pinned for this
                    // iterator's life.
                    return Some(unsafe { record_shared.deref() }.key.clone());
                }
            }
        }
        None
    }
}

/// Iterator over live values, honoring validated read on the recycling
/// backing. See [`MonkeyMap::values`].
pub struct Values<'a, K, V> {
    map: &'a MonkeyMap<K, V>,
    slots: BackingRef<'a, K, V>,
    guard: Guard,
    cursor: usize,
}

impl<'a, K, V> Values<'a, K, V> {
    pub(crate) fn new(map: &'a MonkeyMap<K, V>) -> Self {
        Self {
            slots: map.backing_ref(),
            map,
            guard: crossbeam_epoch::pin(),
            cursor: 0,
        }
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V>
where
    V: Clone,
{
    type Item = V;

    fn next(&mut self) -> Option<V> {
        match &self.slots {
            BackingRef::Recycling(slots) => {
                while self.cursor < slots.len() {
                    let slot = &slots[self.cursor];
                    self.cursor += 1;
                    let key_shared = slot.load_key(&self.guard);
                    if key_shared.is_null() {
                        continue;
                    }
                    let value_shared = slot.load_value(&self.guard);
                    if value_shared.is_null() {
                        continue;
                    }
                    // SAFETY: non-null under a guard pinned for this
                    // iterator's life.
                    let (key_ref, value_ref) =
                        unsafe { (key_shared.deref(), value_shared.deref()) };
                    if !self.map.validate_for_iter(key_ref, value_ref) {
                        continue; // rejects a recycled slot's stale pairing
                    }
                    return Some(value_ref.clone());
                }
            }
            BackingRef::Detaching(slots) => {
                while self.cursor < slots.len() {
                    let record_shared = slots[self.cursor].load(&self.guard);
                    self.cursor += 1;
                    if record_shared.is_null() {
                        continue;
                    }
                    // SAFETY: non-null under a guard pinned for this
                    // iterator's life.
                    return Some(unsafe { record_shared.deref() }.value.clone());
                }
            }
        }
        None
    }
}

/// Iterator over live (key, value) pairs, honoring validated read on the
/// recycling backing. See [`MonkeyMap::iter`].
pub struct Entries<'a, K, V> {
    map: &'a MonkeyMap<K, V>,
    slots: BackingRef<'a, K, V>,
    guard: Guard,
    cursor: usize,
}

impl<'a, K, V> Entries<'a, K, V> {
    pub(crate) fn new(map: &'a MonkeyMap<K, V>) -> Self {
        Self {
            slots: map.backing_ref(),
            map,
            guard: crossbeam_epoch::pin(),
            cursor: 0,
        }
    }
}

impl<'a, K, V> Iterator for Entries<'a, K, V>
where
    K: Clone,
    V: Clone,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        match &self.slots {
            BackingRef::Recycling(slots) => {
                while self.cursor < slots.len() {
                    let slot = &slots[self.cursor];
                    self.cursor += 1;
                    let key_shared = slot.load_key(&self.guard);
                    if key_shared.is_null() {
                        continue;
                    }
                    let value_shared = slot.load_value(&self.guard);
                    if value_shared.is_null() {
                        continue;
                    }
                    // SAFETY: non-null under a guard pinned for this
                    // iterator's life.
                    let (key_ref, value_ref) =
                        unsafe { (key_shared.deref(), value_shared.deref()) };
                    if !self.map.validate_for_iter(key_ref, value_ref) {
                        continue; // rejects a recycled slot's stale pairing
                    }
                    return Some((key_ref.clone(), value_ref.clone()));
                }
            }
            BackingRef::Detaching(slots) => {
                while self.cursor < slots.len() {
                    let record_shared = slots[self.cursor].load(&self.guard);
                    self.cursor += 1;
                    if record_shared.is_null() {
                        continue;
                    }
                    // SAFETY: non-null under a guard pinned for this
                    // iterator's life.
                    let record = unsafe { record_shared.deref() };
                    return Some((record.key.clone(), record.value.clone()));
                }
            }
        }
        None
    }
}
