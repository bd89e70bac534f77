#![cfg(test)]

// Property tests for HashMap kept inside the crate so they can reach the raw
// table's invariant checker.

use core::hash::BuildHasher;
use core::hash::Hasher;
use std::collections::HashMap as StdHashMap;
use std::vec::Vec;

use proptest::prelude::*;
use siphasher::sip::SipHasher;

use crate::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct Coord {
    x: i32,
    y: i32,
}

/// SipHash with fixed keys, so runs are reproducible.
#[derive(Clone, Default)]
struct FixedSip;

impl BuildHasher for FixedSip {
    type Hasher = SipHasher;

    fn build_hasher(&self) -> Self::Hasher {
        SipHasher::new_with_keys(0x0123_4567_89ab_cdef, 0xfedc_ba98_7654_3210)
    }
}

/// Keeps only a handful of hash bits, forcing long shared clusters.
#[derive(Clone, Default)]
struct Colliding;

struct CollidingHasher(SipHasher);

impl Hasher for CollidingHasher {
    fn write(&mut self, bytes: &[u8]) {
        self.0.write(bytes);
    }

    fn finish(&self) -> u64 {
        self.0.finish() & 0x1f
    }
}

impl BuildHasher for Colliding {
    type Hasher = CollidingHasher;

    fn build_hasher(&self) -> Self::Hasher {
        CollidingHasher(SipHasher::new())
    }
}

#[derive(Clone, Debug)]
enum Op {
    InsertOrUpdate(usize, i64),
    Insert(usize, i64),
    Erase(usize),
    Find(usize),
    EntryAdd(usize, i64),
    Retain(i64),
    Clear,
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<Coord>, Vec<Op>)> {
    proptest::collection::vec((-50i32..50, -50i32..50), 1..=40).prop_flat_map(|raw| {
        let pool: Vec<Coord> = raw.into_iter().map(|(x, y)| Coord { x, y }).collect();
        let idx = 0..pool.len();
        let op = prop_oneof![
            4 => (idx.clone(), any::<i64>()).prop_map(|(i, v)| Op::InsertOrUpdate(i, v)),
            2 => (idx.clone(), any::<i64>()).prop_map(|(i, v)| Op::Insert(i, v)),
            3 => idx.clone().prop_map(Op::Erase),
            2 => idx.clone().prop_map(Op::Find),
            2 => (idx.clone(), -100i64..100).prop_map(|(i, d)| Op::EntryAdd(i, d)),
            1 => any::<i64>().prop_map(Op::Retain),
            1 => Just(Op::Clear),
            1 => Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..200).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn run<S: BuildHasher + Default>(
    pool: &[Coord],
    ops: &[Op],
) -> Result<HashMap<Coord, i64, S>, TestCaseError> {
    let mut sut: HashMap<Coord, i64, S> = HashMap::new();
    let mut model: StdHashMap<Coord, i64> = StdHashMap::new();

    for op in ops {
        match *op {
            Op::InsertOrUpdate(i, v) => {
                let stored = *sut.insert_or_update(pool[i], v);
                prop_assert_eq!(stored, v);
                model.insert(pool[i], v);
            }
            Op::Insert(i, v) => {
                prop_assert_eq!(sut.insert(pool[i], v), model.insert(pool[i], v));
            }
            Op::Erase(i) => {
                let present = model.remove(&pool[i]).is_some();
                prop_assert_eq!(sut.erase(&pool[i]), present);
                prop_assert!(sut.find(&pool[i]).is_none());
            }
            Op::Find(i) => {
                prop_assert_eq!(sut.find(&pool[i]), model.get(&pool[i]));
                prop_assert_eq!(sut.count(&pool[i]), usize::from(model.contains_key(&pool[i])));
            }
            Op::EntryAdd(i, d) => {
                let s = sut.entry(pool[i]).or_insert(0);
                *s = s.wrapping_add(d);
                let m = model.entry(pool[i]).or_insert(0);
                *m = m.wrapping_add(d);
            }
            Op::Retain(pivot) => {
                sut.retain(|_, v| *v < pivot);
                model.retain(|_, v| *v < pivot);
            }
            Op::Clear => {
                sut.clear();
                model.clear();
            }
            Op::Iterate => {
                let mut seen: Vec<(Coord, i64)> = sut.iter().map(|(k, v)| (*k, *v)).collect();
                let mut expected: Vec<(Coord, i64)> = model.iter().map(|(k, v)| (*k, *v)).collect();
                seen.sort();
                expected.sort();
                prop_assert_eq!(seen, expected);
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        sut.raw_table().assert_invariants();
    }

    for (k, v) in &model {
        prop_assert_eq!(sut.get(k), Some(v));
    }
    Ok(sut)
}

// Property: every operation sequence leaves the map agreeing with
// std::collections::HashMap, with the probing invariants intact after each
// step. The colliding hasher squeezes all keys into 32 home slots, so clusters
// wrap and backward shifts cross the end of the array.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn prop_matches_std_model((pool, ops) in arb_scenario()) {
        run::<FixedSip>(&pool, &ops)?;
    }

    #[test]
    fn prop_matches_std_model_under_collisions((pool, ops) in arb_scenario()) {
        run::<Colliding>(&pool, &ops)?;
    }

    #[test]
    fn prop_replay_is_deterministic((pool, ops) in arb_scenario()) {
        let a = run::<FixedSip>(&pool, &ops)?;
        let b = run::<FixedSip>(&pool, &ops)?;

        prop_assert_eq!(&a, &b);
        let a_layout: Vec<_> = a.iter().collect();
        let b_layout: Vec<_> = b.iter().collect();
        prop_assert_eq!(a_layout, b_layout);
    }

    #[test]
    fn prop_iteration_yields_each_key_once(keys in proptest::collection::vec(any::<(i32, i32)>(), 0..500)) {
        let mut map: HashMap<Coord, usize, FixedSip> = HashMap::new();
        for (n, &(x, y)) in keys.iter().enumerate() {
            map.insert_or_update(Coord { x, y }, n);
        }

        let mut seen: Vec<Coord> = map.keys().copied().collect();
        prop_assert_eq!(seen.len(), map.len());
        seen.sort();
        seen.dedup();
        prop_assert_eq!(seen.len(), map.len());
    }
}
