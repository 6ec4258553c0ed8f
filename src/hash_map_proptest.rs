#![cfg(test)]

// Property tests for HashMap kept inside the crate so they can check the
// structural invariants of buckets and the slot directory after every step.

use crate::config::{Config, Layout, LinearKind};
use crate::error::Error;
use crate::hash_map::HashMap;
use crate::ops::Ops;
use crate::position::{Handle, Position};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::{BTreeSet, HashMap as StdHashMap};

// Sixteen consecutive keys share a hash, so buckets regularly cross the
// treeify and untreeify thresholds as the directory grows.
struct Clustered;
impl Ops<u16, i32> for Clustered {
    fn hash(&self, key: &u16) -> u64 {
        u64::from(*key >> 4)
    }
    fn less(&self, l: &u16, r: &u16) -> bool {
        l < r
    }
}

#[derive(Clone, Debug)]
enum OpI {
    Insert(u16, i32),
    Replace(u16, i32),
    Remove(u16),
    EraseFound(u16),
    EraseFirst,
    Find(u16),
    Mutate(u16, i32),
    Walk,
    // Bit i of the mask erases the i-th entry (mod 64) of a single walk.
    WalkErase(u64),
    Clear,
}

fn arb_ops() -> impl Strategy<Value = Vec<OpI>> {
    let key = 0u16..400;
    let op = prop_oneof![
        6 => (key.clone(), any::<i32>()).prop_map(|(k, v)| OpI::Insert(k, v)),
        2 => (key.clone(), any::<i32>()).prop_map(|(k, v)| OpI::Replace(k, v)),
        3 => key.clone().prop_map(OpI::Remove),
        2 => key.clone().prop_map(OpI::EraseFound),
        1 => Just(OpI::EraseFirst),
        2 => key.clone().prop_map(OpI::Find),
        1 => (key, any::<i32>()).prop_map(|(k, d)| OpI::Mutate(k, d)),
        1 => Just(OpI::Walk),
        1 => any::<u64>().prop_map(OpI::WalkErase),
        1 => Just(OpI::Clear),
    ];
    proptest::collection::vec(op, 1..300)
}

fn arb_config() -> impl Strategy<Value = Config> {
    (
        prop_oneof![Just(1usize), Just(4), Just(16), Just(64)],
        prop_oneof![Just(Layout::Adaptive), Just(Layout::LinearOnly), Just(Layout::TreeOnly)],
        prop_oneof![Just(LinearKind::Chain), Just(LinearKind::List)],
        prop_oneof![Just(0.5f32), Just(0.75), Just(1.0)],
    )
        .prop_map(|(init, layout, linear, lf)| {
            Config::new()
                .capacity_init(init)
                .layout(layout)
                .linear(linear)
                .load_factor(lf)
        })
}

fn walk_forward<O: Ops<u16, i32>>(m: &HashMap<u16, i32, O>) -> Vec<u16> {
    let mut out = Vec::new();
    let mut pos = m.begin();
    while let Position::Entry(h) = pos {
        out.push(*h.key(m).expect("live"));
        pos = m.next(pos).expect("forward step");
    }
    out
}

fn walk_reverse<O: Ops<u16, i32>>(m: &HashMap<u16, i32, O>) -> Vec<u16> {
    let mut out = Vec::new();
    let mut pos = m.rbegin();
    while let Position::Entry(h) = pos {
        out.push(*h.key(m).expect("live"));
        pos = m.rnext(pos).expect("reverse step");
    }
    out
}

// Property: state-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - Duplicate inserts fail; insert_replace keeps the handle and swaps the value.
// - Handles stay valid across rehash and bucket kind switches; erased ones go stale.
// - erase returns exactly what `next` returned before it, and a walk that
//   continues from that position still visits every entry once.
// - Forward and reverse walks visit every live entry once, in mirrored order.
// - Bucket structure, slot placement, window and counters hold after every op.
fn run_scenario(config: Config, ops: Vec<OpI>) -> Result<(), TestCaseError> {
    let mut sut = HashMap::with_ops_and_config(Clustered, config);
    let mut model: StdHashMap<u16, i32> = StdHashMap::new();
    let mut live: StdHashMap<u16, Handle> = StdHashMap::new();
    let mut stale: Vec<Handle> = Vec::new();

    for op in ops {
        match op {
            OpI::Insert(k, v) => match sut.insert(k, v) {
                Ok(h) => {
                    prop_assert!(!model.contains_key(&k));
                    model.insert(k, v);
                    live.insert(k, h);
                }
                Err(e) => {
                    prop_assert_eq!(e, Error::DuplicateKey);
                    prop_assert!(model.contains_key(&k));
                }
            },
            OpI::Replace(k, v) => {
                let h = sut.insert_replace(k, v).expect("replace never fails here");
                if let Some(&prev) = live.get(&k) {
                    prop_assert_eq!(prev, h);
                }
                model.insert(k, v);
                live.insert(k, h);
            }
            OpI::Remove(k) => {
                let n = sut.remove(&k).expect("valid key");
                prop_assert_eq!(n, usize::from(model.remove(&k).is_some()));
                if let Some(h) = live.remove(&k) {
                    stale.push(h);
                }
            }
            OpI::EraseFound(k) => {
                let pos = sut.find(&k).expect("valid key");
                match pos {
                    Position::Entry(h) => {
                        let expected = sut.next(pos).expect("live handle");
                        prop_assert_eq!(sut.erase(pos), Ok(expected));
                        model.remove(&k);
                        live.remove(&k);
                        stale.push(h);
                    }
                    other => {
                        prop_assert_eq!(other, Position::End);
                        prop_assert!(!model.contains_key(&k));
                        prop_assert_eq!(sut.erase(other), Err(Error::Sentinel));
                    }
                }
            }
            OpI::EraseFirst => {
                let pos = sut.begin();
                if let Position::Entry(h) = pos {
                    let k = *h.key(&sut).expect("live");
                    let after = sut.erase(pos).expect("erase first");
                    prop_assert_eq!(after, sut.begin());
                    model.remove(&k);
                    live.remove(&k);
                    stale.push(h);
                } else {
                    prop_assert!(model.is_empty());
                }
            }
            OpI::Find(k) => {
                let pos = sut.find(&k).expect("valid key");
                prop_assert_eq!(pos.handle(), live.get(&k).copied());
                prop_assert_eq!(sut.get(&k), model.get(&k));
            }
            OpI::Mutate(k, d) => {
                if let Some(&h) = live.get(&k) {
                    let v = h.value_mut(&mut sut).expect("live handle should resolve");
                    *v = v.wrapping_add(d);
                    let mv = model.get_mut(&k).expect("model entry");
                    *mv = mv.wrapping_add(d);
                }
            }
            OpI::Walk => {
                let fwd = walk_forward(&sut);
                let mut rev = walk_reverse(&sut);
                rev.reverse();
                prop_assert_eq!(&fwd, &rev);
                let seen: BTreeSet<u16> = fwd.iter().copied().collect();
                prop_assert_eq!(seen.len(), fwd.len());
                let expect: BTreeSet<u16> = model.keys().copied().collect();
                prop_assert_eq!(seen, expect);
                let via_iter: Vec<u16> = sut.iter().map(|(_, k, _)| *k).collect();
                prop_assert_eq!(via_iter, fwd);
            }
            OpI::WalkErase(mask) => {
                let before: BTreeSet<u16> = model.keys().copied().collect();
                let mut visited = Vec::new();
                let mut pos = sut.begin();
                while let Position::Entry(h) = pos {
                    let k = *h.key(&sut).expect("live");
                    if mask >> (visited.len() % 64) & 1 == 1 {
                        pos = sut.erase(pos).expect("erase mid-walk");
                        model.remove(&k);
                        live.remove(&k);
                        stale.push(h);
                    } else {
                        pos = sut.next(pos).expect("forward step");
                    }
                    visited.push(k);
                }
                let seen: BTreeSet<u16> = visited.iter().copied().collect();
                prop_assert_eq!(seen.len(), visited.len());
                prop_assert_eq!(&seen, &before);
                let survivors: BTreeSet<u16> = walk_forward(&sut).into_iter().collect();
                let expect: BTreeSet<u16> = model.keys().copied().collect();
                prop_assert_eq!(&survivors, &expect);
                prop_assert!(survivors.is_subset(&seen));
            }
            OpI::Clear => {
                prop_assert_eq!(sut.clear(), model.len());
                stale.extend(live.drain().map(|(_, h)| h));
                model.clear();
            }
        }

        sut.check_invariants();
        for &h in &stale {
            prop_assert!(h.value(&sut).is_none());
        }
        for (k, &h) in &live {
            prop_assert_eq!(h.value(&sut), model.get(k));
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert!(sut.capacity().is_power_of_two());
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_default_config(ops in arb_ops()) {
        run_scenario(Config::default(), ops)?;
    }

    #[test]
    fn prop_state_machine_any_config(config in arb_config(), ops in arb_ops()) {
        run_scenario(config, ops)?;
    }
}
