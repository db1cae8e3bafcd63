//! Core map operations — lookup, upsert, delete, clear, iteration, eviction.
//!
//! Exactly one writer thread may call `upsert`, `delete`, `clear`, or
//! `pop_random_value` at a time; any number of reader threads may call
//! `lookup`, `contains_key`, `contains_value`, the iterators, `size`, and
//! `is_empty`, concurrently with the writer and with each other. Violating
//! the single-writer rule voids every guarantee below (§5).
//!
//! Storage is one of two backings, chosen once at construction from whether
//! a value→key derivation is configured (§9):
//! - **Recycling** ([`Slot`]): independent key/value atomics reused in place.
//!   Requires a derivation so a reader can reject a key/value pairing left
//!   over from two different writer operations (§4.5).
//! - **Detaching** ([`DetachSlot`]): the whole (key, value, probe_depth)
//!   record is replaced as one atomic pointer swap, so a reader can never
//!   observe a mismatched pairing in the first place — no derivation needed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_epoch as epoch;
#[cfg(test)]
use crossbeam_epoch::Guard;
use rand::Rng;
use tracing::{debug, trace, warn};

use crate::config::MonkeyMapConfig;
use crate::error::MapError;
use crate::hash::HashFamily;
use crate::histogram::ProbeHistogram;
use crate::iter::{BackingRef, Entries, Keys, Values};
use crate::record::DetachSlot;
use crate::slot::Slot;

enum Backing<K, V> {
    Recycling(Box<[Slot<K, V>]>),
    Detaching(Box<[DetachSlot<K, V>]>),
}

impl<K, V> Backing<K, V> {
    fn len(&self) -> usize {
        match self {
            Backing::Recycling(slots) => slots.len(),
            Backing::Detaching(slots) => slots.len(),
        }
    }
}

/// A fixed-capacity, lock-free, single-writer/multi-reader hash map.
///
/// See the crate-level documentation for the concurrency contract. The slot
/// array is sized once at construction (`max_capacity` and `load_factor`
/// determine its length, rounded up to a power of two) and never rehashed;
/// `upsert` reports `CapacityReached` or `InsertionCapacityExhausted` instead
/// of growing.
pub struct MonkeyMap<K, V> {
    backing: Backing<K, V>,
    mask: usize,
    size: AtomicUsize,
    max_capacity: usize,
    h_max: u8,
    histogram: ProbeHistogram,
    hash_family: HashFamily,
    value_to_key: Option<Arc<dyn Fn(&V) -> K + Send + Sync>>,
}

impl<K, V> MonkeyMap<K, V>
where
    K: std::hash::Hash + Eq + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Builds a map with `max_capacity` and the default load factor / `H_max`
    /// / no value→key derivation. Equivalent to
    /// `Self::with_config(MonkeyMapConfig::new(max_capacity))`.
    pub fn new(max_capacity: usize) -> Self {
        Self::with_config(MonkeyMapConfig::new(max_capacity))
    }

    /// Builds a map from an explicit [`MonkeyMapConfig`]. Recycling storage
    /// is used when `config` carries a value→key derivation; otherwise
    /// detaching storage is used (§9).
    pub fn with_config(config: MonkeyMapConfig<K, V>) -> Self {
        let needed = (config.max_capacity + 1) as f64 / config.load_factor;
        let capacity = (needed.ceil() as usize).max(2).next_power_of_two();

        let backing = if config.value_to_key.is_some() {
            Backing::Recycling(
                (0..capacity)
                    .map(Slot::new)
                    .collect::<Vec<_>>()
                    .into_boxed_slice(),
            )
        } else {
            Backing::Detaching(
                (0..capacity)
                    .map(DetachSlot::new)
                    .collect::<Vec<_>>()
                    .into_boxed_slice(),
            )
        };

        debug!(
            slot_array_len = capacity,
            max_capacity = config.max_capacity,
            h_max = config.h_max,
            load_factor = config.load_factor,
            recycling = config.value_to_key.is_some(),
            "constructed monkeymap"
        );

        Self {
            backing,
            mask: capacity - 1,
            size: AtomicUsize::new(0),
            max_capacity: config.max_capacity,
            h_max: config.h_max,
            histogram: ProbeHistogram::new(config.h_max),
            hash_family: HashFamily::new(),
            value_to_key: config.value_to_key,
        }
    }

    #[inline]
    fn slot_index(&self, key: &K, ordinal: u8) -> usize {
        (self.hash_family.hash(key, ordinal) as usize) & self.mask
    }

    /// Current number of live entries (writer-maintained; eventually
    /// consistent from a reader's view).
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    /// `size() == 0`.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// The largest probe depth any currently-live entry occupies, or 0 if
    /// the map is empty. Diagnostic only.
    pub fn get_max_probe_depth_in_use(&self) -> u8 {
        self.histogram.max_depth_in_use()
    }

    /// Validates a value read from a recycling slot whose key matched
    /// `sought`, rejecting a pairing left over from a prior occupant (§4.5).
    /// Never called against the detaching backing, which cannot produce
    /// such a pairing in the first place.
    #[inline]
    fn validate_recycled(&self, sought: &K, value: &V) -> bool {
        let derive = self
            .value_to_key
            .as_ref()
            .expect("recycling backing is only constructed with a derivation");
        derive(value) == *sought
    }

    /// `lookup(k) -> value | absent` (§4.2). Visits at most
    /// `max_depth_in_use` slots, never mutates, never allocates.
    pub fn lookup(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let guard = epoch::pin();
        let depth = self.histogram.max_depth_in_use();

        match &self.backing {
            Backing::Recycling(slots) => {
                for ordinal in 1..=depth {
                    let idx = self.slot_index(key, ordinal);
                    let slot = &slots[idx];

                    let key_shared = slot.load_key(&guard);
                    if key_shared.is_null() {
                        continue;
                    }
                    // SAFETY: non-null under a pinned guard; writer publishes
                    // key last with Release, we just Acquire-loaded it.
                    if unsafe { key_shared.deref() } != key {
                        continue;
                    }

                    let value_shared = slot.load_value(&guard);
                    if value_shared.is_null() {
                        continue; // vacant value sentinel: treat as miss (§4.2)
                    }
                    // SAFETY: non-null under a pinned guard.
                    let value_ref = unsafe { value_shared.deref() };
                    if !self.validate_recycled(key, value_ref) {
                        continue; // rejects a recycled slot's stale pairing (§4.5)
                    }
                    return Some(value_ref.clone());
                }
            }
            Backing::Detaching(slots) => {
                for ordinal in 1..=depth {
                    let idx = self.slot_index(key, ordinal);
                    let record_shared = slots[idx].load(&guard);
                    if record_shared.is_null() {
                        continue;
                    }
                    // SAFETY: non-null under a pinned guard; the whole record
                    // was published by one `install`/`overwrite` call, so key
                    // and value are always a matched pair (§4.5).
                    let record = unsafe { record_shared.deref() };
                    if record.key == *key {
                        return Some(record.value.clone());
                    }
                }
            }
        }
        None
    }

    /// `contains_key(k)` is `lookup(k) != absent` (§4.8).
    pub fn contains_key(&self, key: &K) -> bool
    where
        V: Clone,
    {
        self.lookup(key).is_some()
    }

    /// Linear scan over all live slots comparing values by equality (§4.8).
    /// Non-deterministic timing under concurrent mutation.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        let guard = epoch::pin();
        match &self.backing {
            Backing::Recycling(slots) => {
                for slot in slots.iter() {
                    let key_shared = slot.load_key(&guard);
                    if key_shared.is_null() {
                        continue;
                    }
                    let value_shared = slot.load_value(&guard);
                    if value_shared.is_null() {
                        continue;
                    }
                    // SAFETY: non-null under a pinned guard.
                    if unsafe { value_shared.deref() } == value {
                        return true;
                    }
                }
            }
            Backing::Detaching(slots) => {
                for slot in slots.iter() {
                    let record_shared = slot.load(&guard);
                    if record_shared.is_null() {
                        continue;
                    }
                    // SAFETY: non-null under a pinned guard.
                    let record = unsafe { record_shared.deref() };
                    if &record.value == value {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// `upsert(k, v) -> prior_value | absent` (§4.3).
    pub fn upsert(&self, key: K, value: V) -> Result<Option<V>, MapError>
    where
        V: Clone,
    {
        let guard = epoch::pin();
        let max_depth = self.histogram.max_depth_in_use();
        let mut first_vacant: Option<(usize, u8)> = None;

        match &self.backing {
            Backing::Recycling(slots) => {
                for ordinal in 1..=self.h_max {
                    let idx = self.slot_index(&key, ordinal);
                    let slot = &slots[idx];
                    let key_shared = slot.load_key(&guard);

                    if !key_shared.is_null() {
                        // SAFETY: non-null under a pinned guard.
                        if unsafe { key_shared.deref() } == &key {
                            debug_assert_eq!(idx, slot.home_index());
                            let prior_shared = slot.overwrite_value(value, &guard);
                            let prior = if prior_shared.is_null() {
                                None
                            } else {
                                // SAFETY: non-null, and we are the sole
                                // writer, so no other thread frees this
                                // pointer concurrently.
                                let prior_ref = unsafe { prior_shared.deref() };
                                let prior = prior_ref.clone();
                                unsafe { guard.defer_destroy(prior_shared) };
                                Some(prior)
                            };
                            return Ok(prior);
                        }
                    } else if first_vacant.is_none() {
                        first_vacant = Some((idx, ordinal));
                    }

                    if first_vacant.is_some() && ordinal > max_depth {
                        break; // no live key beyond max_depth_in_use (§4.3)
                    }
                }

                let Some((idx, depth)) = first_vacant else {
                    warn!(h_max = self.h_max, "insertion exhausted the hash family");
                    return Err(MapError::InsertionCapacityExhausted);
                };
                if self.size.load(Ordering::Relaxed) >= self.max_capacity {
                    warn!(max_capacity = self.max_capacity, "map is at capacity");
                    return Err(MapError::CapacityReached);
                }

                let slot = &slots[idx];
                debug_assert_eq!(idx, slot.home_index());
                slot.install(key, value, depth);
                self.size.fetch_add(1, Ordering::Relaxed);
                self.histogram.record_insert(depth);
                Ok(None)
            }
            Backing::Detaching(slots) => {
                for ordinal in 1..=self.h_max {
                    let idx = self.slot_index(&key, ordinal);
                    let slot = &slots[idx];
                    let record_shared = slot.load(&guard);

                    if !record_shared.is_null() {
                        // SAFETY: non-null under a pinned guard.
                        let record = unsafe { record_shared.deref() };
                        if record.key == key {
                            debug_assert_eq!(idx, slot.home_index());
                            let depth = record.probe_depth;
                            let prior_shared = slot.overwrite(key, depth, value, &guard);
                            // SAFETY: non-null (we just read it), and we are
                            // the sole writer.
                            let prior_value = unsafe { prior_shared.deref() }.value.clone();
                            unsafe { guard.defer_destroy(prior_shared) };
                            return Ok(Some(prior_value));
                        }
                    } else if first_vacant.is_none() {
                        first_vacant = Some((idx, ordinal));
                    }

                    if first_vacant.is_some() && ordinal > max_depth {
                        break; // no live key beyond max_depth_in_use (§4.3)
                    }
                }

                let Some((idx, depth)) = first_vacant else {
                    warn!(h_max = self.h_max, "insertion exhausted the hash family");
                    return Err(MapError::InsertionCapacityExhausted);
                };
                if self.size.load(Ordering::Relaxed) >= self.max_capacity {
                    warn!(max_capacity = self.max_capacity, "map is at capacity");
                    return Err(MapError::CapacityReached);
                }

                let slot = &slots[idx];
                debug_assert_eq!(idx, slot.home_index());
                slot.install(key, value, depth);
                self.size.fetch_add(1, Ordering::Relaxed);
                self.histogram.record_insert(depth);
                Ok(None)
            }
        }
    }

    /// `delete(k) -> value | absent` (§4.4). Writer-only.
    pub fn delete(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let guard = epoch::pin();
        let depth_ceiling = self.histogram.max_depth_in_use();

        match &self.backing {
            Backing::Recycling(slots) => {
                for ordinal in 1..=depth_ceiling {
                    let idx = self.slot_index(key, ordinal);
                    let slot = &slots[idx];

                    let key_shared = slot.load_key(&guard);
                    if key_shared.is_null() {
                        continue;
                    }
                    // SAFETY: non-null under a pinned guard.
                    if unsafe { key_shared.deref() } != key {
                        continue;
                    }

                    let value_shared = slot.load_value(&guard);
                    let result = if value_shared.is_null() {
                        None
                    } else {
                        // SAFETY: non-null under a pinned guard.
                        let value_ref = unsafe { value_shared.deref() };
                        self.validate_recycled(key, value_ref).then(|| value_ref.clone())
                    };
                    let Some(result) = result else {
                        continue; // stale pairing from a recycled slot (§4.5)
                    };

                    debug_assert_eq!(idx, slot.home_index());
                    let depth = slot.probe_depth();
                    self.histogram.record_delete(depth);
                    let (old_key, old_value) = slot.clear(&guard);
                    if !old_value.is_null() {
                        unsafe { guard.defer_destroy(old_value) };
                    }
                    if !old_key.is_null() {
                        unsafe { guard.defer_destroy(old_key) };
                    }
                    self.size.fetch_sub(1, Ordering::Relaxed);
                    return Some(result);
                }
                None
            }
            Backing::Detaching(slots) => {
                for ordinal in 1..=depth_ceiling {
                    let idx = self.slot_index(key, ordinal);
                    let slot = &slots[idx];

                    let record_shared = slot.load(&guard);
                    if record_shared.is_null() {
                        continue;
                    }
                    // SAFETY: non-null under a pinned guard.
                    let record = unsafe { record_shared.deref() };
                    if &record.key != key {
                        continue;
                    }

                    debug_assert_eq!(idx, slot.home_index());
                    self.histogram.record_delete(record.probe_depth);
                    let result = record.value.clone();
                    let old_record = slot.clear(&guard);
                    if !old_record.is_null() {
                        unsafe { guard.defer_destroy(old_record) };
                    }
                    self.size.fetch_sub(1, Ordering::Relaxed);
                    return Some(result);
                }
                None
            }
        }
    }

    /// Clears every live entry (§4.9). Writer-only.
    pub fn clear(&self) {
        trace!(size = self.size(), "clearing monkeymap");
        let guard = epoch::pin();
        match &self.backing {
            Backing::Recycling(slots) => {
                for slot in slots.iter() {
                    let (old_key, old_value) = slot.clear(&guard);
                    if !old_value.is_null() {
                        unsafe { guard.defer_destroy(old_value) };
                    }
                    if !old_key.is_null() {
                        unsafe { guard.defer_destroy(old_key) };
                    }
                }
            }
            Backing::Detaching(slots) => {
                for slot in slots.iter() {
                    let old_record = slot.clear(&guard);
                    if !old_record.is_null() {
                        unsafe { guard.defer_destroy(old_record) };
                    }
                }
            }
        }
        self.histogram.reset();
        self.size.store(0, Ordering::Relaxed);
    }

    /// Pops an arbitrary live entry's value (§4.7). Undefined / non-terminating
    /// if called on an empty map — callers must check `is_empty()` first.
    /// Samples the full slot range `[0, N-1]` (see design notes' resolution
    /// of the source's `[0, N-2]` sampling gap).
    pub fn pop_random_value(&self) -> V
    where
        V: Clone,
    {
        loop {
            let idx = rand::thread_rng().gen_range(0..self.backing.len());
            let guard = epoch::pin();
            let popped = match &self.backing {
                Backing::Recycling(slots) => {
                    let key_shared = slots[idx].load_key(&guard);
                    if key_shared.is_null() {
                        continue;
                    }
                    // SAFETY: non-null under a pinned guard; valid for the
                    // lifetime of this `delete` call since we are the sole
                    // writer.
                    let key_ref = unsafe { key_shared.deref() };
                    self.delete(key_ref)
                }
                Backing::Detaching(slots) => {
                    let record_shared = slots[idx].load(&guard);
                    if record_shared.is_null() {
                        continue;
                    }
                    // SAFETY: non-null under a pinned guard; valid for the
                    // lifetime of this `delete` call since we are the sole
                    // writer.
                    let record = unsafe { record_shared.deref() };
                    self.delete(&record.key)
                }
            };
            if let Some(value) = popped {
                trace!(slot = idx, "evicted random entry");
                return value;
            }
            // Raced with a validated-read miss or the slot emptied; resample.
        }
    }

    /// Bulk insertion from an external mapping is out of scope (§6.1); this
    /// entry point exists so callers reaching for it get an immediate,
    /// explicit refusal rather than a missing method.
    pub fn put_all<I>(&self, _items: I) -> Result<(), MapError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        Err(MapError::Unsupported)
    }

    /// Lazy, finite, single-pass sequence over live keys (§4.6).
    pub fn keys(&self) -> Keys<'_, K, V>
    where
        K: Clone,
    {
        Keys::new(self)
    }

    /// Lazy, finite, single-pass sequence over live values, honoring
    /// validated read (§4.5, §4.6).
    pub fn values(&self) -> Values<'_, K, V>
    where
        V: Clone,
    {
        Values::new(self)
    }

    /// Lazy, finite, single-pass sequence over live (key, value) pairs,
    /// honoring validated read (§4.5, §4.6).
    pub fn iter(&self) -> Entries<'_, K, V>
    where
        K: Clone,
        V: Clone,
    {
        Entries::new(self)
    }

    pub(crate) fn backing_ref(&self) -> BackingRef<'_, K, V> {
        match &self.backing {
            Backing::Recycling(slots) => BackingRef::Recycling(slots),
            Backing::Detaching(slots) => BackingRef::Detaching(slots),
        }
    }

    pub(crate) fn validate_for_iter(&self, key: &K, value: &V) -> bool {
        self.validate_recycled(key, value)
    }

    #[cfg(test)]
    pub(crate) fn guard(&self) -> Guard {
        epoch::pin()
    }
}
