//! Detaching-backing storage — one whole-record atomic pointer per slot.
//!
//! Used whenever no value→key derivation is configured (`MonkeyMapConfig`
//! has no `value_to_key`), so there is no way for a reader to detect a
//! key/value pair that belongs to two different installs. Instead of
//! mutating a key field and a value field independently (as `Slot` does),
//! every install, overwrite, or delete replaces the *entire* record behind
//! one `crossbeam_epoch::Atomic` pointer with a single `swap`. A reader that
//! loads a non-null record always sees a key and value that were published
//! together by one writer operation — there is no window in which it could
//! observe a key from one entry paired with a value from another, because
//! there is only ever one pointer to dereference, not two independently
//! mutable fields. The displaced record is reclaimed via
//! `Guard::defer_destroy`, the same discipline `slot.rs` and this crate's
//! HNSW graph module (`update_neighbors`) use for their own swapped-out
//! pointers.

use crossbeam_epoch::{Atomic, Guard, Owned, Shared};
use std::sync::atomic::Ordering;

pub(crate) struct Record<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) probe_depth: u8,
}

pub(crate) struct DetachSlot<K, V> {
    /// Fixed at construction; immutable for the lifetime of the map. Used
    /// only to cross-check the caller's own hash-derived index in debug
    /// builds (`MonkeyMap::upsert`/`delete`).
    home_index: usize,
    cell: Atomic<Record<K, V>>,
}

impl<K, V> DetachSlot<K, V> {
    pub(crate) fn new(home_index: usize) -> Self {
        Self {
            home_index,
            cell: Atomic::null(),
        }
    }

    pub(crate) fn home_index(&self) -> usize {
        self.home_index
    }

    #[inline]
    pub(crate) fn load<'g>(&self, guard: &'g Guard) -> Shared<'g, Record<K, V>> {
        self.cell.load(Ordering::Acquire, guard)
    }

    /// Installs a brand-new record into a slot the writer has confirmed is
    /// vacant. `depth` is the probe ordinal at which this slot was found.
    pub(crate) fn install(&self, key: K, value: V, depth: u8) {
        let record = Owned::new(Record {
            key,
            value,
            probe_depth: depth,
        });
        self.cell.store(record, Ordering::Release);
    }

    /// Replaces the resident record with one carrying a new value (same key,
    /// same probe depth). Returns the displaced record so the caller can
    /// read its value and then defer its destruction.
    pub(crate) fn overwrite<'g>(
        &self,
        key: K,
        depth: u8,
        value: V,
        guard: &'g Guard,
    ) -> Shared<'g, Record<K, V>> {
        let record = Owned::new(Record {
            key,
            value,
            probe_depth: depth,
        });
        self.cell.swap(record, Ordering::Release, guard)
    }

    /// Detaches the resident record, leaving the slot vacant. Returns the
    /// displaced record so the caller can defer its destruction.
    pub(crate) fn clear<'g>(&self, guard: &'g Guard) -> Shared<'g, Record<K, V>> {
        self.cell.swap(Shared::null(), Ordering::Release, guard)
    }
}
