//! Error kinds surfaced by [`crate::MonkeyMap`].
//!
//! Every failure the core can raise is enumerable and carries no nested
//! source error, so a plain `Copy` enum is used here rather than
//! `Box<dyn std::error::Error>` (which this crate reserves for layers that
//! must unify heterogeneous I/O or serialization failures).

use std::fmt;

/// Failure returned by a mutating [`MonkeyMap`](crate::MonkeyMap) operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapError {
    /// `upsert` exhausted the hash family (`H_max` probes) without finding
    /// either a match for the key or a free slot. Probabilistic; rare at
    /// load factor <= 0.5 with the default `H_max`.
    InsertionCapacityExhausted,
    /// `upsert` would install a new key past `max_capacity`.
    CapacityReached,
    /// Bulk insertion from an external mapping is not supported.
    Unsupported,
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::InsertionCapacityExhausted => {
                write!(f, "exhausted the hash family without finding a free slot")
            }
            MapError::CapacityReached => write!(f, "map is at max_capacity"),
            MapError::Unsupported => {
                write!(f, "bulk insertion from an external mapping is not supported")
            }
        }
    }
}

impl std::error::Error for MapError {}
