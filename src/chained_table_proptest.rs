#![cfg(test)]

// Property tests for ChainedTable kept inside the crate so they can look at
// chain lengths and bucket placement directly.

use crate::chained_table::{bucket_index, ChainedTable, TableCursor};
use crate::error::ContainerError;
use proptest::prelude::*;
use std::cell::Cell;
use std::collections::{BTreeSet, HashMap};

// Pool-indexed operations so shrinking converges on small key sets.
#[derive(Clone, Debug)]
enum OpI {
    Put(usize, i32),
    Get(usize),
    Remove(usize),
    Take(usize),
    Mutate(usize, i32),
    Contains(String),
    Walk,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Put(i, v)),
            idx.clone().prop_map(OpI::Get),
            idx.clone().prop_map(OpI::Remove),
            idx.clone().prop_map(OpI::Take),
            (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            prop_oneof![contains_pool, "[a-z]{0,5}".prop_map(|s| s)].prop_map(OpI::Contains),
            Just(OpI::Walk),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn walk_keys<C: crate::cleanup::Cleanup<i32>>(t: &ChainedTable<i32, C>) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = t.first();
    while let Some(c) = cur {
        out.push(c.key(t).expect("walked cursor resolves").to_string());
        cur = t.next(c).expect("walked cursor is live");
    }
    out
}

// Drives one table through `ops`, comparing against a HashMap model.
// Invariants exercised:
// - `get` returns the latest `put` value for a key until it is removed or taken.
// - `len` equals the number of distinct live keys.
// - Replacement keeps the entry's cursor; cleanup runs exactly once per
//   overwritten or removed value and never for `take` or reads.
// - A first/next walk visits every live key exactly once, in `iter` order.
// - Cursors of removed entries never resolve again.
// - Every entry sits in the chain its key hashes to.
fn run_scenario(bucket_hint: usize, pool: &[String], ops: Vec<OpI>) -> Result<(), TestCaseError> {
    let cleanups = Cell::new(0usize);
    let mut expected_cleanups = 0usize;
    let mut sut = ChainedTable::with_cleanup(bucket_hint, |_: &mut i32| {
        cleanups.set(cleanups.get() + 1)
    })
    .expect("table construction");
    let mut model: HashMap<String, i32> = HashMap::new();
    let mut live: HashMap<String, TableCursor> = HashMap::new();
    let mut stale: Vec<TableCursor> = Vec::new();

    for op in ops {
        match op {
            OpI::Put(i, v) => {
                let k = &pool[i];
                let c = sut.put(k, v);
                if model.insert(k.clone(), v).is_some() {
                    expected_cleanups += 1;
                    prop_assert_eq!(Some(&c), live.get(k), "replacement keeps identity");
                } else {
                    live.insert(k.clone(), c);
                }
            }
            OpI::Get(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.get(k), model.get(k));
            }
            OpI::Remove(i) => {
                let k = &pool[i];
                let removed = sut.remove(k);
                prop_assert_eq!(removed, model.remove(k).is_some());
                if removed {
                    expected_cleanups += 1;
                    stale.push(live.remove(k).expect("tracked cursor"));
                }
            }
            OpI::Take(i) => {
                let k = &pool[i];
                let taken = sut.take(k);
                prop_assert_eq!(taken, model.remove(k));
                if taken.is_some() {
                    stale.push(live.remove(k).expect("tracked cursor"));
                }
            }
            OpI::Mutate(i, d) => {
                let k = &pool[i];
                if let Some(&c) = live.get(k) {
                    let vr = c.value_mut(&mut sut);
                    prop_assert!(vr.is_some(), "live cursor should resolve");
                    if let Some(vr) = vr {
                        *vr = vr.saturating_add(d);
                    }
                    if let Some(mv) = model.get_mut(k) {
                        *mv = mv.saturating_add(d);
                    }
                }
            }
            OpI::Contains(s) => {
                prop_assert_eq!(sut.contains_key(&s), model.contains_key(&s));
            }
            OpI::Walk => {
                let walked = walk_keys(&sut);
                let iterated: Vec<String> = sut.keys().map(String::from).collect();
                prop_assert_eq!(&walked, &iterated);
                let unique: BTreeSet<String> = walked.iter().cloned().collect();
                prop_assert_eq!(unique.len(), walked.len(), "no key visited twice");
                let m_keys: BTreeSet<String> = model.keys().cloned().collect();
                prop_assert_eq!(unique, m_keys);
            }
        }

        for &c in &stale {
            prop_assert!(c.value(&sut).is_none());
            prop_assert_eq!(sut.next(c), Err(ContainerError::InvalidCursor));
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert_eq!(cleanups.get(), expected_cleanups);

        let mut per_bucket = vec![0usize; sut.bucket_count()];
        for k in model.keys() {
            per_bucket[bucket_index(k, sut.bucket_count())] += 1;
        }
        for (b, &n) in per_bucket.iter().enumerate() {
            prop_assert_eq!(sut.chain_len(b), Some(n), "chain {} length", b);
        }
    }

    let before_drop = cleanups.get();
    let live_count = sut.len();
    drop(sut);
    prop_assert_eq!(cleanups.get(), before_drop + live_count, "drop cleans up every survivor");
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_scenario(0, &pool, ops)?;
    }

    #[test]
    fn prop_state_machine_small_tables((pool, ops) in arb_scenario(), buckets in 2usize..8) {
        run_scenario(buckets, &pool, ops)?;
    }
}

// Same invariants with every key forced into one chain, stressing the
// relinking paths of remove and take.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_single_chain((pool, ops) in arb_scenario()) {
        run_scenario(1, &pool, ops)?;
    }
}
