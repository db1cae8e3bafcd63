//! Fixed slot storage for the **recycling** backing — one (key, value,
//! probe-depth, home-index) tuple whose fields are mutated independently and
//! whose memory is reused by later keys once cleared. See `record.rs` for
//! the **detaching** backing used when no value→key derivation is
//! configured, where the whole (key, value) pair is replaced as one unit
//! instead.
//!
//! Key and value are each held behind an independent `crossbeam_epoch::Atomic`
//! pointer. Mutating either is always an atomic pointer swap under a pinned
//! [`Guard`], and the pointer a swap displaces is reclaimed via
//! `Guard::defer_destroy` instead of being freed immediately — the same
//! swap-and-defer-destroy shape this crate's HNSW graph module
//! (`update_neighbors`) already uses for its own lock-free neighbor lists.
//! This gives every in-flight reader the "stale reference still sees a valid,
//! unmodified object" guarantee a garbage-collected runtime would give for
//! free, without ever blocking the writer.
//!
//! `key` is the publication gate: the writer stores `value` (and, for a
//! brand-new slot, `probe_depth`) before storing `key`, and readers load
//! `key` before reading anything else — this is the release/acquire edge
//! that makes a freshly-installed entry visible to readers atomically. Since
//! `key` and `value` are independent pointers, a reader that loads `key`
//! between the writer's `delete` and a later `upsert` reusing this slot can
//! end up pairing the *old* key with the *new* value — which is exactly why
//! this backing is only ever selected when a value→key derivation is
//! configured, letting the reader detect and reject that pairing (§4.5).

use crossbeam_epoch::{Atomic, Guard, Owned, Shared};
use std::sync::atomic::{AtomicU8, Ordering};

pub(crate) struct Slot<K, V> {
    /// Fixed at construction; immutable for the lifetime of the map. Used
    /// only to cross-check the caller's own hash-derived index in debug
    /// builds (`MonkeyMap::upsert`/`delete`).
    home_index: usize,
    /// 0 = vacant. 1..=H_max = the ordinal of the hash function that placed
    /// the resident key. Written by the writer only; `Relaxed` is sufficient
    /// since no reader relies on this field (readers gate on `key`).
    probe_depth: AtomicU8,
    key: Atomic<K>,
    value: Atomic<V>,
}

impl<K, V> Slot<K, V> {
    pub(crate) fn new(home_index: usize) -> Self {
        Self {
            home_index,
            probe_depth: AtomicU8::new(0),
            key: Atomic::null(),
            value: Atomic::null(),
        }
    }

    pub(crate) fn home_index(&self) -> usize {
        self.home_index
    }

    pub(crate) fn probe_depth(&self) -> u8 {
        self.probe_depth.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn load_key<'g>(&self, guard: &'g Guard) -> Shared<'g, K> {
        self.key.load(Ordering::Acquire, guard)
    }

    #[inline]
    pub(crate) fn load_value<'g>(&self, guard: &'g Guard) -> Shared<'g, V> {
        self.value.load(Ordering::Acquire, guard)
    }

    /// Installs a brand-new live entry into a slot the writer has confirmed
    /// is vacant. `depth` is the probe ordinal at which this slot was found.
    /// Publishes `key` last, with release ordering (§4.3).
    pub(crate) fn install(&self, key: K, value: V, depth: u8) {
        self.value.store(Owned::new(value), Ordering::Relaxed);
        self.probe_depth.store(depth, Ordering::Relaxed);
        self.key.store(Owned::new(key), Ordering::Release);
    }

    /// Overwrites the value of an already-live slot whose key matched.
    /// `probe_depth` and `key` are untouched. Returns the prior value,
    /// deferring its destruction until no reader could still be observing it.
    pub(crate) fn overwrite_value<'g>(&self, value: V, guard: &'g Guard) -> Shared<'g, V> {
        let prior = self.value.swap(Owned::new(value), Ordering::Release, guard);
        prior
    }

    /// Clears a live slot: `value` first, then `probe_depth`, then `key`
    /// last — the mirror image of `install`'s publication order (§4.4).
    /// Returns the displaced key/value pointers so the caller can run
    /// `defer_destroy` once it is done reading them.
    pub(crate) fn clear<'g>(&self, guard: &'g Guard) -> (Shared<'g, K>, Shared<'g, V>) {
        let old_value = self.value.swap(Shared::null(), Ordering::Release, guard);
        self.probe_depth.store(0, Ordering::Relaxed);
        let old_key = self.key.swap(Shared::null(), Ordering::Release, guard);
        (old_key, old_value)
    }
}
