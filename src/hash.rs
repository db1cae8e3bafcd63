//! Hash family — `H_max` independent hashes of a key.
//!
//! `h_1` is the natural hash of the key alone; `h_n` for `n >= 2` mixes the
//! ordinal into the hash so the sequence is distinct across `n` with high
//! probability. Keyed on an `ahash::RandomState` so the family also differs
//! across map instances (the crate already pulls in `ahash` elsewhere).

use std::hash::{Hash, Hasher};

pub(crate) struct HashFamily {
    state: ahash::RandomState,
}

impl HashFamily {
    pub(crate) fn new() -> Self {
        Self {
            state: ahash::RandomState::new(),
        }
    }

    /// `h_ordinal(key)`, `ordinal` in `1..=H_max`.
    pub(crate) fn hash<K: Hash + ?Sized>(&self, key: &K, ordinal: u8) -> u64 {
        let mut hasher = self.state.build_hasher();
        if ordinal > 1 {
            ordinal.hash(&mut hasher);
        }
        key.hash(&mut hasher);
        hasher.finish()
    }
}
