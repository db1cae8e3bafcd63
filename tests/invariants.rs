//! Structural invariant checks over random upsert/delete sequences.

use monkeymap::MonkeyMap;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Upsert(u16, u16),
    Delete(u16),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u16..64, 0u16..64).prop_map(|(k, v)| Op::Upsert(k, v)),
        (0u16..64).prop_map(Op::Delete),
    ]
}

proptest! {
    /// Invariant 1: `size` stays in lockstep with the number of live slots.
    #[test]
    fn size_matches_successful_operations(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let map: MonkeyMap<u16, u16> = MonkeyMap::new(200);
        let mut model = std::collections::HashMap::new();

        for op in ops {
            match op {
                Op::Upsert(k, v) => {
                    if map.upsert(k, v).is_ok() {
                        model.insert(k, v);
                    }
                }
                Op::Delete(k) => {
                    map.delete(&k);
                    model.remove(&k);
                }
            }
        }

        prop_assert_eq!(map.size(), model.len());
        for (k, v) in &model {
            prop_assert_eq!(map.lookup(k), Some(*v));
        }
    }

    /// Invariant 3: `max_depth_in_use` never exceeds `H_max` and is 0 when empty.
    #[test]
    fn max_depth_bounded_by_h_max(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let map: MonkeyMap<u16, u16> = MonkeyMap::new(200);
        for op in ops {
            match op {
                Op::Upsert(k, v) => { let _ = map.upsert(k, v); }
                Op::Delete(k) => { map.delete(&k); }
            }
        }
        prop_assert!(map.get_max_probe_depth_in_use() <= monkeymap::DEFAULT_H_MAX);
        if map.is_empty() {
            prop_assert_eq!(map.get_max_probe_depth_in_use(), 0);
        }
    }
}

/// Invariant 4: after `clear`, every prior key is absent and size is zero.
#[test]
fn clear_resets_everything() {
    let map: MonkeyMap<u32, u32> = MonkeyMap::new(64);
    for k in 0..32 {
        map.upsert(k, k * 2).unwrap();
    }
    map.clear();
    assert_eq!(map.size(), 0);
    assert_eq!(map.get_max_probe_depth_in_use(), 0);
    for k in 0..32 {
        assert_eq!(map.lookup(&k), None);
    }
}

/// Invariant 5: round-trip upsert/lookup below capacity.
#[test]
fn upsert_then_lookup_round_trips() {
    let map: MonkeyMap<&'static str, i32> = MonkeyMap::new(16);
    map.upsert("alpha", 1).unwrap();
    map.upsert("beta", 2).unwrap();
    assert_eq!(map.lookup(&"alpha"), Some(1));
    assert_eq!(map.lookup(&"beta"), Some(2));
}

/// Invariant 6: overwrite idempotence — repeating the same upsert doesn't
/// change size and returns the prior value on the second call.
#[test]
fn overwrite_is_idempotent_on_size() {
    let map: MonkeyMap<u32, u32> = MonkeyMap::new(16);
    assert_eq!(map.upsert(1, 10).unwrap(), None);
    let before = map.size();
    assert_eq!(map.upsert(1, 10).unwrap(), Some(10));
    assert_eq!(map.size(), before);
}

/// Invariant 7: delete idempotence.
#[test]
fn delete_is_idempotent() {
    let map: MonkeyMap<u32, u32> = MonkeyMap::new(16);
    map.upsert(1, 10).unwrap();
    assert_eq!(map.delete(&1), Some(10));
    let size_after_first = map.size();
    assert_eq!(map.delete(&1), None);
    assert_eq!(map.size(), size_after_first);
}

/// Invariant 8: with recycling enabled, a slot reused by a colliding key
/// never answers a lookup for the evicted key.
#[test]
fn recycled_slot_never_answers_for_the_old_key() {
    let config = monkeymap::MonkeyMapConfig::new(16).with_value_to_key(|v: &u32| *v);
    let map: MonkeyMap<u32, u32> = MonkeyMap::with_config(config);

    map.upsert(1, 1).unwrap();
    assert_eq!(map.delete(&1), Some(1));
    map.upsert(2, 2).unwrap();

    assert_eq!(map.lookup(&1), None);
    assert_eq!(map.lookup(&2), Some(2));
}
