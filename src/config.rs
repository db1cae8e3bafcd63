//! Construction config for [`crate::MonkeyMap`].
//!
//! A small, explicit config struct with documented defaults, in the style of
//! this crate's `SecurityLimits` (`sekejapql.rs`) rather than a long
//! positional constructor argument list.

use std::sync::Arc;

/// Default upper bound on probe length and on the probe histogram's domain.
pub const DEFAULT_H_MAX: u8 = 50;
/// Default load factor: smaller values mean a larger slot array and a lower
/// collision probability.
pub const DEFAULT_LOAD_FACTOR: f64 = 0.5;

/// Construction parameters for a [`MonkeyMap`](crate::MonkeyMap).
pub struct MonkeyMapConfig<K, V> {
    pub(crate) max_capacity: usize,
    pub(crate) load_factor: f64,
    pub(crate) h_max: u8,
    pub(crate) value_to_key: Option<Arc<dyn Fn(&V) -> K + Send + Sync>>,
}

impl<K, V> MonkeyMapConfig<K, V> {
    /// Starts a config with `max_capacity` and the documented defaults
    /// (`load_factor = 0.5`, `h_max = 50`, no value→key derivation).
    ///
    /// # Panics
    /// Panics if `max_capacity == 0`.
    pub fn new(max_capacity: usize) -> Self {
        assert!(max_capacity > 0, "max_capacity must be greater than zero");
        Self {
            max_capacity,
            load_factor: DEFAULT_LOAD_FACTOR,
            h_max: DEFAULT_H_MAX,
            value_to_key: None,
        }
    }

    /// Overrides the load factor. Must be in `(0.0, 1.0]`.
    ///
    /// # Panics
    /// Panics if `load_factor` is outside `(0.0, 1.0]`.
    pub fn with_load_factor(mut self, load_factor: f64) -> Self {
        assert!(
            load_factor > 0.0 && load_factor <= 1.0,
            "load_factor must be in (0.0, 1.0]"
        );
        self.load_factor = load_factor;
        self
    }

    /// Overrides `H_max`, the probe-length ceiling.
    ///
    /// # Panics
    /// Panics if `h_max == 0`.
    pub fn with_h_max(mut self, h_max: u8) -> Self {
        assert!(h_max > 0, "h_max must be greater than zero");
        self.h_max = h_max;
        self
    }

    /// Supplies a value→key derivation function, enabling slot recycling and
    /// validated reads together (they cannot be toggled independently: see
    /// §4.5/§9 of the design notes).
    pub fn with_value_to_key(mut self, derive: impl Fn(&V) -> K + Send + Sync + 'static) -> Self {
        self.value_to_key = Some(Arc::new(derive));
        self
    }
}
