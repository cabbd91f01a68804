use super::*;

use proptest::prelude::*;
use std::collections::BTreeMap;

/// Spreads a small key over the high, middle and low bytes so that random
/// operations collide often and split nodes at every prefix length.
fn spread(k: u16) -> u64 {
    let k = u64::from(k);
    ((k & 0xF) << 60) | (((k >> 4) & 0xF) << 28) | (k >> 8)
}

#[derive(Clone, Debug)]
enum Op {
    Insert(u16, u64),
    Delete(u16),
    Get(u16),
    DeleteMin,
    Clear,
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        50 => (any::<u16>(), any::<u64>()).prop_map(|(k, v)| Op::Insert(k, v)),
        25 => any::<u16>().prop_map(Op::Delete),
        20 => any::<u16>().prop_map(Op::Get),
        4 => Just(Op::DeleteMin),
        1 => Just(Op::Clear),
    ];
    prop::collection::vec(op, 0..=1000)
}

fn keys_of(t: &Tree<(u64, u64)>) -> Vec<u64> {
    t.iter().map(|&(k, _)| k).collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in ops_strategy()) {
        let mut t: Tree<(u64, u64)> = Tree::new();
        let mut m: BTreeMap<u64, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    let k = spread(k);
                    prop_assert_eq!(t.replace_or_insert((k, v)).map(|(_, v)| v), m.insert(k, v));
                }
                Op::Delete(k) => {
                    let k = spread(k);
                    prop_assert_eq!(t.delete(k).map(|(_, v)| v), m.remove(&k));
                }
                Op::Get(k) => {
                    let k = spread(k);
                    prop_assert_eq!(t.get(k).map(|&(_, v)| v), m.get(&k).copied());
                }
                Op::DeleteMin => {
                    let expected = m.keys().next().copied();
                    if let Some(k) = expected {
                        m.remove(&k);
                    }
                    prop_assert_eq!(t.delete_min().map(|(k, _)| k), expected);
                }
                Op::Clear => {
                    t.clear();
                    m.clear();
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        prop_assert_eq!(t.check_invariants(), Ok(()));
        let got: Vec<(u64, u64)> = t.iter().copied().collect();
        let expected: Vec<(u64, u64)> = m.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_bounded_traversals(keys in prop::collection::vec(any::<u64>(), 0..300), start in any::<u64>()) {
        let t: Tree<u64> = keys.iter().copied().collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        sorted.dedup();

        let mut up = Vec::new();
        t.ascend_greater_or_equal(start, |&k| {
            up.push(k);
            true
        });
        let expected_up: Vec<u64> = sorted.iter().copied().filter(|&k| k >= start).collect();
        prop_assert_eq!(up, expected_up);

        let mut down = Vec::new();
        t.descend_less_or_equal(start, |&k| {
            down.push(k);
            true
        });
        let expected_down: Vec<u64> = sorted.iter().rev().copied().filter(|&k| k <= start).collect();
        prop_assert_eq!(down, expected_down);

        prop_assert_eq!(t.min().copied(), sorted.first().copied());
        prop_assert_eq!(t.max().copied(), sorted.last().copied());
    }

    #[test]
    fn prop_early_stop_visits_exactly_n(keys in prop::collection::vec(any::<u64>(), 1..300), n in 1usize..10) {
        let t: Tree<u64> = keys.into_iter().collect();
        let mut visited = 0;
        t.ascend(|_| {
            visited += 1;
            visited < n
        });
        prop_assert_eq!(visited, n.min(t.len()));

        let mut visited = 0;
        t.descend(|_| {
            visited += 1;
            visited < n
        });
        prop_assert_eq!(visited, n.min(t.len()));
    }

    #[test]
    fn prop_count_less_is_rank(words in any::<[u64; 4]>(), pos in any::<u8>()) {
        let v = Bitmap256::from_words(words);
        let naive = (0..pos).filter(|&i| v.get(i)).count();
        prop_assert_eq!(v.count_less(pos), naive);
    }

    #[test]
    fn prop_find_nth_set_is_select(words in any::<[u64; 4]>(), n in any::<u8>()) {
        let v = Bitmap256::from_words(words);
        let expected = (0..=255u8)
            .filter(|&i| v.get(i))
            .nth(usize::from(n))
            .map_or(Bitmap256::NOT_FOUND, usize::from);
        prop_assert_eq!(v.find_nth_set(n), expected);
        if expected != Bitmap256::NOT_FOUND {
            prop_assert_eq!(v.count_less(expected as u8), usize::from(n));
        }
    }

    #[test]
    fn prop_find_next_set_and_clear(words in any::<[u64; 4]>(), pos in any::<u8>()) {
        let v = Bitmap256::from_words(words);
        let next_set = (pos..=255).find(|&i| v.get(i)).map_or(Bitmap256::NOT_FOUND, usize::from);
        let next_clear = (pos..=255).find(|&i| !v.get(i)).map_or(Bitmap256::NOT_FOUND, usize::from);
        prop_assert_eq!(v.find_next_set(pos), next_set);
        prop_assert_eq!(v.find_next_clear(pos), next_clear);
    }
}

/// Visits every ordering of `keys` (Heap's algorithm, iterative form).
fn each_ordering(keys: &[u64], mut visit: impl FnMut(&[u64])) {
    let mut order = keys.to_vec();
    let mut counters = vec![0usize; order.len()];
    visit(&order);

    let mut i = 1;
    while i < order.len() {
        if counters[i] < i {
            let j = if i % 2 == 0 { 0 } else { counters[i] };
            order.swap(j, i);
            visit(&order);
            counters[i] += 1;
            i = 1;
        } else {
            counters[i] = 0;
            i += 1;
        }
    }
}

/// Keys diverging at the top, middle and bottom bytes, plus one chain that
/// shares seven bytes.
const SMALL_SET: [u64; 6] = [
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0001,
    0x0000_0000_0000_FF00,
    0x0000_0000_0000_FF10,
    0x0000_FF00_0000_0000,
    0xFF00_0000_0000_0000,
];

#[test]
fn exhaustive_insert_order_small_set() {
    let mut orderings = 0;
    each_ordering(&SMALL_SET, |order| {
        orderings += 1;
        let t: Tree<u64> = order.iter().copied().collect();
        t.check_invariants().unwrap();
        let mut expected = SMALL_SET.to_vec();
        expected.sort_unstable();
        assert_eq!(t.iter().copied().collect::<Vec<_>>(), expected);
    });
    assert_eq!(orderings, 720);
}

#[test]
fn exhaustive_remove_order_small_set() {
    let base: Tree<(u64, u64)> = SMALL_SET.iter().map(|&k| (k, !k)).collect();

    each_ordering(&SMALL_SET, |order| {
        let mut t = base.clone();
        let mut m: BTreeMap<u64, u64> = SMALL_SET.iter().map(|&k| (k, !k)).collect();

        for &k in order {
            assert_eq!(t.delete(k).map(|(_, v)| v), m.remove(&k));
            assert_eq!(t.len(), m.len());
            t.check_invariants().unwrap();
            assert_eq!(keys_of(&t), m.keys().copied().collect::<Vec<_>>());
        }
        assert!(t.is_empty());
        assert_eq!(t.stats().nodes, 1);
    });
}
