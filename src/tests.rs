use std::ops::Range;

use proptest::prelude::*;
use tracing_test::traced_test;

use crate::model;

use super::*;

fn pairs(keys: &[i32]) -> Vec<Pair> {
    // Repeat the key as the secondary, like the demo driver does.
    keys.iter().map(|&k| Pair::new(k, k)).collect()
}

fn permutations(items: &[i32]) -> Vec<Vec<i32>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }

    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let first = rest.remove(i);
        for mut perm in permutations(&rest) {
            perm.insert(0, first);
            out.push(perm);
        }
    }
    out
}

fn collect(tree: &AvlTree) -> Vec<Pair> {
    tree.iter().map(Node::pair).collect()
}

fn shape(tree: &AvlTree) -> String {
    let mut out = String::new();
    tree.dotgraph("shape", &mut out).unwrap();
    out
}

fn insert_find_all(keys: &[i32]) {
    let mut tree = AvlTree::new();

    for pair in pairs(keys) {
        assert!(tree.insert(pair.key, pair.secondary));
        tree.assert_invariants();
    }

    for pair in pairs(keys) {
        let node = tree.search(pair.key, pair.secondary).expect("item not found");
        assert_eq!(node.pair(), pair);
    }
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all(&[0]);
}

#[test]
fn two_elems_find() {
    insert_find_all(&[0, 1]);
    insert_find_all(&[1, 0]);
}

#[test]
fn three_elems_find() {
    insert_find_all(&[0, 1, 2]);
    insert_find_all(&[0, 2, 1]);
    insert_find_all(&[1, 0, 2]);
    insert_find_all(&[1, 2, 0]);
    insert_find_all(&[2, 0, 1]);
    insert_find_all(&[2, 1, 0]);
}

#[test]
fn five_elems_find() {
    for keys in permutations(&[0, 1, 2, 3, 4]) {
        insert_find_all(&keys);
    }
}

fn insert_remove_all(keys: &[i32]) {
    let mut tree = AvlTree::new();

    for pair in pairs(keys) {
        tree.insert(pair.key, pair.secondary);
        tree.assert_invariants();
    }

    for pair in pairs(keys) {
        assert!(tree.remove(pair.key, pair.secondary));
        assert!(tree.search(pair.key, pair.secondary).is_none());
        tree.assert_invariants();
    }

    assert!(tree.is_empty());

    for pair in pairs(keys) {
        tree.insert(pair.key, pair.secondary);
        tree.assert_invariants();
    }

    for pair in pairs(keys).into_iter().rev() {
        assert!(tree.remove(pair.key, pair.secondary));
        tree.assert_invariants();
    }

    assert!(tree.is_empty());
}

#[test]
fn remove_one() {
    insert_remove_all(&[0]);
}

#[test]
fn remove_two() {
    insert_remove_all(&[0, 1]);
    insert_remove_all(&[1, 0]);
}

#[test]
fn remove_three() {
    insert_remove_all(&[0, 1, 2]);
    insert_remove_all(&[0, 2, 1]);
    insert_remove_all(&[1, 0, 2]);
    insert_remove_all(&[1, 2, 0]);
    insert_remove_all(&[2, 0, 1]);
    insert_remove_all(&[2, 1, 0]);
}

#[test]
fn remove_five() {
    for keys in permutations(&[0, 1, 2, 3, 4]) {
        insert_remove_all(&keys);
    }
}

#[test]
fn secondary_breaks_ties() {
    let mut tree = AvlTree::new();

    for secondary in [25, 10, 12, 20] {
        assert!(tree.insert(6, secondary));
    }
    assert!(tree.insert(5, 99));
    assert!(tree.insert(7, -1));
    tree.assert_invariants();

    assert_eq!(
        collect(&tree),
        vec![
            Pair::new(5, 99),
            Pair::new(6, 10),
            Pair::new(6, 12),
            Pair::new(6, 20),
            Pair::new(6, 25),
            Pair::new(7, -1),
        ]
    );
    assert!(tree.search(6, 11).is_none());
}

#[test]
fn duplicate_is_rejected_without_change() {
    let mut tree: AvlTree = pairs(&[4, 2, 6, 1, 3, 5, 7]).into_iter().collect();
    let before = shape(&tree);

    assert!(!tree.insert(3, 3));
    assert_eq!(tree.try_insert(7, 7), Err(Error::DuplicateKey(Pair::new(7, 7))));

    assert_eq!(tree.len(), 7);
    assert_eq!(shape(&tree), before);
    tree.assert_invariants();
}

#[test]
fn missing_is_not_removed() {
    let mut tree: AvlTree = pairs(&[1, 2, 3]).into_iter().collect();
    let before = shape(&tree);

    assert!(!tree.remove(2, 3));
    assert_eq!(tree.try_remove(9, 9), Err(Error::NotFound(Pair::new(9, 9))));

    assert_eq!(tree.len(), 3);
    assert_eq!(shape(&tree), before);

    let mut empty = AvlTree::new();
    assert!(!empty.remove(0, 0));
    assert!(empty.search(0, 0).is_none());
    empty.assert_invariants();
}

#[test]
fn first_and_last() {
    let mut tree = AvlTree::new();
    assert!(tree.first().is_none());
    assert!(tree.last().is_none());

    tree.extend(pairs(&[5, -3, 8, 0]));
    assert_eq!(tree.first().map(Node::pair), Some(Pair::new(-3, -3)));
    assert_eq!(tree.last().map(Node::pair), Some(Pair::new(8, 8)));
}

#[test]
fn every_removal_keeps_balance() {
    for n in 1..40 {
        for key in 0..n {
            let mut tree: AvlTree = (0..n).map(|k| Pair::new(k, k)).collect();
            assert!(tree.remove(key, key), "n = {n}, key = {key}");
            tree.assert_invariants();

            let expected: Vec<Pair> = (0..n)
                .filter(|&k| k != key)
                .map(|k| Pair::new(k, k))
                .collect();
            assert_eq!(collect(&tree), expected);
        }
    }
}

#[test]
fn remove_root_with_two_children() {
    let mut tree = AvlTree::new();
    for i in 0..15 {
        assert!(tree.insert(i, i));
    }

    let root = tree.root().expect("tree is not empty").pair();
    assert!(tree.search(root.key, root.secondary).is_some());

    assert!(tree.remove(root.key, root.secondary));
    tree.assert_invariants();

    let expected: Vec<Pair> = (0..15)
        .map(|i| Pair::new(i, i))
        .filter(|&p| p != root)
        .collect();
    assert_eq!(collect(&tree), expected);
    assert_eq!(tree.len(), 14);
}

#[test]
fn demo_sequence() {
    let mut tree = AvlTree::new();
    assert!(tree.insert(10, 10));

    for i in 0..15 {
        assert_eq!(tree.insert(i, i), i != 10);
        tree.assert_invariants();
    }
    assert_eq!(tree.len(), 15);
    assert!(tree.search(20, 20).is_none());

    for i in (1..=17).rev() {
        assert_eq!(tree.remove(i, i), i < 15);
        tree.assert_invariants();
    }

    assert_eq!(collect(&tree), vec![Pair::new(0, 0)]);
}

#[test]
fn sequential_inserts_stay_within_height_bound() {
    fn bound(n: usize) -> f64 {
        1.44 * ((n + 2) as f64).log2() - 0.328
    }

    let mut ascending = AvlTree::new();
    let mut descending = AvlTree::new();

    for i in 0..10_000 {
        ascending.insert(i, 0);
        descending.insert(-i, 0);

        // `height` counts edges; the bound counts levels.
        let n = ascending.len();
        assert!((ascending.height() + 1) as f64 <= bound(n), "n = {n}");
        assert!((descending.height() + 1) as f64 <= bound(n), "n = {n}");
    }

    ascending.assert_invariants();
    descending.assert_invariants();
}

#[test]
fn rotations_rewire_links() {
    let mut tree: AvlTree = [Pair::new(1, 0), Pair::new(2, 0)].into_iter().collect();

    let one = tree.search_raw(&Pair::new(1, 0)).unwrap();
    let two = tree.search_raw(&Pair::new(2, 0)).unwrap();
    assert_eq!(tree.root, Some(one));

    let up = tree.rotate_left(one).unwrap();
    assert_eq!(up, two);
    assert_eq!(tree.root, Some(two));
    unsafe {
        assert_eq!(links(two).left(), Some(one));
        assert_eq!(links(one).parent(), Some(two));
        assert_eq!(links(two).parent(), None);
        assert_eq!(links(one).height(), 0);
        assert_eq!(links(two).height(), 1);
    }
    tree.assert_invariants();

    let up = tree.rotate_right(two).unwrap();
    assert_eq!(up, one);
    assert_eq!(tree.root, Some(one));
    tree.assert_invariants();
}

#[test]
fn rotation_without_child_fails() {
    let mut tree: AvlTree = [Pair::new(1, 0), Pair::new(2, 0)].into_iter().collect();
    let before = shape(&tree);

    let one = tree.search_raw(&Pair::new(1, 0)).unwrap();
    let two = tree.search_raw(&Pair::new(2, 0)).unwrap();

    assert_eq!(
        tree.rotate_right(one),
        Err(Error::InvalidRotation {
            pair: Pair::new(1, 0),
            direction: "right",
        })
    );
    assert_eq!(
        tree.rotate_left(two),
        Err(Error::InvalidRotation {
            pair: Pair::new(2, 0),
            direction: "left",
        })
    );

    assert_eq!(shape(&tree), before);
    tree.assert_invariants();
}

#[test]
fn double_rotation_cases() {
    // left-right, right-left, left-left, right-right
    for keys in [[3, 1, 2], [1, 3, 2], [3, 2, 1], [1, 2, 3]] {
        let tree: AvlTree = pairs(&keys).into_iter().collect();
        tree.assert_invariants();

        assert_eq!(tree.root().map(Node::pair), Some(Pair::new(2, 2)));
        assert_eq!(tree.height(), 1);
    }
}

#[test]
fn intersection_and_union_scenario() {
    let a: AvlTree = [(6, 25), (6, 10), (6, 12), (6, 20), (9, 25), (10, 25)]
        .into_iter()
        .map(Pair::from)
        .collect();
    let b: AvlTree = [(6, 25), (5, 10), (6, 12), (6, 20), (8, 35), (10, 25)]
        .into_iter()
        .map(Pair::from)
        .collect();

    let intersection = a.intersection(&b);
    intersection.assert_invariants();
    assert_eq!(
        collect(&intersection),
        vec![
            Pair::new(6, 12),
            Pair::new(6, 20),
            Pair::new(6, 25),
            Pair::new(10, 25),
        ]
    );

    let union = a.union(&b);
    union.assert_invariants();
    assert_eq!(
        collect(&union),
        vec![
            Pair::new(5, 10),
            Pair::new(6, 10),
            Pair::new(6, 12),
            Pair::new(6, 20),
            Pair::new(6, 25),
            Pair::new(8, 35),
            Pair::new(9, 25),
            Pair::new(10, 25),
        ]
    );

    assert_eq!(a.len(), 6);
    assert_eq!(b.len(), 6);
}

#[test]
fn set_ops_with_empty_tree() {
    let empty = AvlTree::new();
    let tree: AvlTree = pairs(&[1, 2, 3]).into_iter().collect();

    assert!(tree.intersection(&empty).is_empty());
    assert!(empty.intersection(&tree).is_empty());
    assert!(empty.intersection(&empty).is_empty());

    let mut union = empty.union(&tree);
    assert_eq!(collect(&union), collect(&tree));

    // The result owns its own nodes.
    assert!(union.remove(2, 2));
    assert!(tree.contains(2, 2));
    assert_eq!(collect(&tree.union(&empty)), collect(&tree));
    assert!(empty.union(&empty).is_empty());
}

#[test]
fn clone_is_independent() {
    let mut tree: AvlTree = (0..100).map(|i| Pair::new(i % 10, i)).collect();
    let copy = tree.clone();

    copy.assert_invariants();
    assert_eq!(shape(&copy), shape(&tree));

    for i in 0..50 {
        assert!(tree.remove(i % 10, i));
    }

    assert_eq!(copy.len(), 100);
    copy.assert_invariants();
    tree.assert_invariants();
}

#[test]
fn clear_and_reuse() {
    let mut tree: AvlTree = (0..1000).map(|i| Pair::new(i, -i)).collect();
    tree.clear();

    assert!(tree.is_empty());
    assert_eq!(tree.height(), -1);
    tree.assert_invariants();

    assert!(tree.insert(1, 1));
    tree.assert_invariants();
}

#[test]
fn display_lists_pairs_with_heights() {
    let tree: AvlTree = pairs(&[2, 1, 3]).into_iter().collect();
    assert_eq!(tree.to_string(), "(1,1)0\n(2,2)1\n(3,3)0\n");
    assert_eq!(
        format!("{tree:?}"),
        "{Pair { key: 1, secondary: 1 }, Pair { key: 2, secondary: 2 }, \
         Pair { key: 3, secondary: 3 }}"
    );
    assert_eq!(AvlTree::new().to_string(), "");
}

#[test]
fn dotgraph_output() {
    assert_eq!(shape(&AvlTree::new()), "digraph \"graph-shape\" {}");

    let tree: AvlTree = pairs(&[2, 1, 3]).into_iter().collect();
    let dot = shape(&tree);
    assert!(dot.contains("\"graphshape-2_2\" [label=\"2,2:1\"];"));
    assert!(dot.contains("\"graphshape-2_2\" -> \"graphshape-1_1\";"));
    assert!(dot.contains("\"graphshape-2_2\" -> \"graphshape-3_3\";"));
    assert!(dot.ends_with(" }\n}"));
}

#[test]
fn iter_is_exact() {
    let tree: AvlTree = (0..37).map(|i| Pair::new(i, 0)).collect();
    let mut iter = tree.iter();
    assert_eq!(iter.len(), 37);

    iter.next();
    assert_eq!(iter.len(), 36);
    assert_eq!(iter.count(), 36);
    assert_eq!((&tree).into_iter().last().map(Node::pair), Some(Pair::new(36, 0)));
}

#[traced_test]
#[test]
fn rejected_operations_are_logged() {
    let mut tree = AvlTree::new();
    tree.insert(1, 1);
    tree.insert(1, 1);
    tree.remove(2, 2);

    assert!(logs_contain("rejected duplicate insert"));
    assert!(logs_contain("nothing to remove"));
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn btree_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_btree_equivalence(ops);
    }

    #[test]
    fn set_ops_equivalence(
        left in proptest::collection::vec(model::pair_strategy(), 0..200),
        right in proptest::collection::vec(model::pair_strategy(), 0..200),
    ) {
        model::run_set_ops_equivalence(left, right);
    }

    #[test]
    fn round_trip(keys in proptest::collection::btree_set(model::pair_strategy(), 0..300)) {
        let mut tree = AvlTree::new();
        for pair in &keys {
            prop_assert!(tree.insert(pair.key, pair.secondary));
        }
        tree.assert_invariants();

        for pair in &keys {
            prop_assert!(tree.contains(pair.key, pair.secondary));
        }

        for pair in &keys {
            prop_assert!(tree.remove(pair.key, pair.secondary));
            prop_assert!(!tree.contains(pair.key, pair.secondary));
            tree.assert_invariants();
        }
        prop_assert!(tree.is_empty());
    }
}
