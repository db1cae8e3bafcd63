//! `monkeymap` — a fixed-capacity, lock-free, single-writer/multi-reader
//! hash map.
//!
//! A single writer thread may call [`MonkeyMap::upsert`],
//! [`MonkeyMap::delete`], [`MonkeyMap::clear`], or
//! [`MonkeyMap::pop_random_value`] at a time. Any number of reader threads
//! may concurrently call [`MonkeyMap::lookup`], [`MonkeyMap::contains_key`],
//! [`MonkeyMap::contains_value`], the iterators, [`MonkeyMap::size`], and
//! [`MonkeyMap::is_empty`] — including while the writer is mutating. No
//! locks, no CAS retry loops: the writer publishes each change with a single
//! release store and readers acquire-load it, the same fence discipline this
//! crate already used for its durable arena and HNSW graph.
//!
//! Capacity is fixed at construction (see [`MonkeyMapConfig`]) and the map
//! never rehashes; once every probe position in the hash family is occupied,
//! [`MonkeyMap::upsert`] returns [`MapError::InsertionCapacityExhausted`]
//! rather than growing.
//!
//! ```
//! use monkeymap::MonkeyMap;
//!
//! let map: MonkeyMap<u64, &'static str> = MonkeyMap::new(1024);
//! assert_eq!(map.upsert(1, "one").unwrap(), None);
//! assert_eq!(map.lookup(&1), Some("one"));
//! assert_eq!(map.delete(&1), Some("one"));
//! assert!(map.is_empty());
//! ```

mod config;
mod error;
mod hash;
mod histogram;
mod iter;
mod map;
mod record;
mod slot;

pub use config::{MonkeyMapConfig, DEFAULT_H_MAX, DEFAULT_LOAD_FACTOR};
pub use error::MapError;
pub use iter::{Entries, Keys, Values};
pub use map::MonkeyMap;
