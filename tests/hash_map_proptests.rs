// HashMap property tests through the public API.
//
// Property 1: cursor walks agree with the key set.
//  - Model: BTreeSet of inserted string keys.
//  - Invariant: a forward walk and a reverse walk each visit every key
//    exactly once, in mirrored order; iter() matches the forward walk.
//
// Property 2: growth keeps the load bounded.
//  - Invariant: after every insert, capacity is a power of two and
//    len <= capacity * load_factor (the maximum capacity is never hit).
//
// Property 3: draining by cursor.
//  - Operations: repeatedly erase at a random step count from begin.
//  - Invariant: every erase returns the pre-erase successor and the map
//    ends empty with no occupied buckets.
use bucket_hashmap::{Config, HashMap, Layout, Position, ScalarOps, StringOps};
use proptest::prelude::*;
use std::collections::BTreeSet;

proptest! {
    #[test]
    fn prop_walks_cover_key_set(keys in proptest::collection::vec("[a-z]{1,6}", 0..200)) {
        let mut m = HashMap::with_ops(StringOps::new());
        let mut model = BTreeSet::new();
        for k in keys {
            let fresh = model.insert(k.clone());
            prop_assert_eq!(m.insert(k, "v".to_string()).is_ok(), fresh);
        }

        let mut fwd = Vec::new();
        let mut pos = m.begin();
        while let Position::Entry(h) = pos {
            fwd.push(h.key(&m).unwrap().clone());
            pos = m.next(pos).unwrap();
        }
        let mut rev = Vec::new();
        let mut pos = m.rbegin();
        while let Position::Entry(h) = pos {
            rev.push(h.key(&m).unwrap().clone());
            pos = m.rnext(pos).unwrap();
        }
        rev.reverse();
        prop_assert_eq!(&fwd, &rev);
        prop_assert_eq!(fwd.len(), m.len());
        let seen: BTreeSet<String> = fwd.iter().cloned().collect();
        prop_assert_eq!(seen, model);
        let via_iter: Vec<String> = m.iter().map(|(_, k, _)| k.clone()).collect();
        prop_assert_eq!(via_iter, fwd);
    }

    #[test]
    fn prop_growth_bounds_load(
        init in 1usize..64,
        lf in prop_oneof![Just(0.5f32), Just(0.75), Just(1.0)],
        keys in proptest::collection::btree_set(any::<u32>(), 0..500),
    ) {
        let config = Config::new().capacity_init(init).load_factor(lf);
        let mut m = HashMap::with_ops_and_config(ScalarOps, config);
        for k in keys {
            m.insert(k, ()).unwrap();
            let cap = m.capacity();
            prop_assert!(cap.is_power_of_two());
            prop_assert!(m.len() as f64 <= cap as f64 * f64::from(lf));
            prop_assert!(m.bucket_count() <= m.len());
        }
    }

    #[test]
    fn prop_cursor_drain(
        keys in proptest::collection::btree_set(0u32..2000, 1..300),
        steps in proptest::collection::vec(0usize..8, 1..64),
        tree in any::<bool>(),
    ) {
        let layout = if tree { Layout::TreeOnly } else { Layout::Adaptive };
        let mut m = HashMap::with_ops_and_config(ScalarOps, Config::new().layout(layout));
        for &k in &keys {
            m.insert(k >> 3, k).ok();
        }
        let mut step = steps.iter().cycle();
        while !m.is_empty() {
            let mut pos = m.begin();
            for _ in 0..*step.next().unwrap() {
                let n = m.next(pos).unwrap();
                if n == Position::End {
                    break;
                }
                pos = n;
            }
            let expected = m.next(pos).unwrap();
            let before = m.len();
            prop_assert_eq!(m.erase(pos), Ok(expected));
            prop_assert_eq!(m.len(), before - 1);
        }
        prop_assert_eq!(m.bucket_count(), 0);
        prop_assert_eq!(m.begin(), Position::End);
        prop_assert_eq!(m.rbegin(), Position::Rend);
    }
}
