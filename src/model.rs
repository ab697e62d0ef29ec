//! Equivalence harness checking [`AvlTree`] against [`BTreeSet`].
//!
//! Shared by the property tests and the fuzz targets.

use std::collections::BTreeSet;

use arbitrary::Arbitrary;
use proptest::strategy::{Just, Strategy};

use crate::{AvlTree, Node, Pair};

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum ItemValue {
    /// Picks an existing pair by position, so removals and searches mostly hit.
    Index(usize),
    Random(Pair),
}

proptest::prop_compose! {
    fn index_strategy()(
        index in 0usize..1000,
    ) -> ItemValue {
        ItemValue::Index(index)
    }
}

proptest::prop_compose! {
    fn random_strategy()(
        key in -16i32..16,
        secondary in -16i32..16,
    ) -> ItemValue {
        ItemValue::Random(Pair::new(key, secondary))
    }
}

fn value_strategy() -> impl Strategy<Value = ItemValue> {
    proptest::prop_oneof![index_strategy(), random_strategy()]
}

pub fn pair_strategy() -> impl Strategy<Value = Pair> {
    (-32i32..32, -32i32..32).prop_map(Pair::from)
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Op {
    Insert(ItemValue),
    Search(ItemValue),
    Remove(ItemValue),
    First,
    Last,
    CloneTree,
}

impl Op {
    fn finalize(self, sorted: &[Pair]) -> FinalOp {
        fn get_value(v: &[Pair], i: ItemValue) -> Pair {
            match i {
                ItemValue::Index(idx) => {
                    if v.is_empty() {
                        Pair::new(idx as i32, 0)
                    } else {
                        v[idx % v.len()]
                    }
                }
                ItemValue::Random(p) => p,
            }
        }

        match self {
            Op::Insert(item) => FinalOp::Insert(get_value(sorted, item)),
            Op::Search(item) => FinalOp::Search(get_value(sorted, item)),
            Op::Remove(item) => FinalOp::Remove(get_value(sorted, item)),
            Op::First => FinalOp::First,
            Op::Last => FinalOp::Last,
            Op::CloneTree => FinalOp::CloneTree,
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum FinalOp {
    Insert(Pair),
    Search(Pair),
    Remove(Pair),
    First,
    Last,
    CloneTree,
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    proptest::prop_oneof![
        value_strategy().prop_map(Op::Insert),
        value_strategy().prop_map(Op::Search),
        value_strategy().prop_map(Op::Remove),
        Just(Op::First),
        Just(Op::Last),
        Just(Op::CloneTree),
    ]
}

fn assert_same(btree: &BTreeSet<Pair>, avl: &AvlTree) {
    avl.assert_invariants();
    assert_eq!(btree.len(), avl.len());
    assert!(btree.iter().copied().eq(avl.iter().map(Node::pair)));
}

pub fn run_btree_equivalence(ops: Vec<Op>) {
    let mut sorted_values: Vec<Pair> = Vec::with_capacity(ops.len());
    let mut btree = BTreeSet::new();
    let mut avl = AvlTree::new();

    fn insert_sorted(v: &mut Vec<Pair>, value: Pair) {
        if let Err(idx) = v.binary_search(&value) {
            v.insert(idx, value);
        }
    }

    fn remove_sorted(v: &mut Vec<Pair>, value: Pair) {
        if let Ok(idx) = v.binary_search(&value) {
            v.remove(idx);
        }
    }

    for (op_id, op) in ops.into_iter().enumerate() {
        let final_op = op.finalize(&sorted_values);

        match final_op {
            FinalOp::Insert(value) => {
                insert_sorted(&mut sorted_values, value);

                let from_btree = btree.insert(value);
                let from_avl = avl.insert(value.key, value.secondary);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Search(value) => {
                let from_btree = btree.get(&value).copied();
                let from_avl = avl.search(value.key, value.secondary).map(Node::pair);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Remove(value) => {
                remove_sorted(&mut sorted_values, value);

                let from_btree = btree.remove(&value);
                let from_avl = avl.remove(value.key, value.secondary);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
                assert!(!avl.contains(value.key, value.secondary));
            }

            FinalOp::First => {
                let from_btree = btree.first().copied();
                let from_avl = avl.first().map(Node::pair);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Last => {
                let from_btree = btree.last().copied();
                let from_avl = avl.last().map(Node::pair);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::CloneTree => {
                let copy = avl.clone();
                assert_same(&btree, &copy);
                drop(copy);
            }
        }

        assert_same(&btree, &avl);
    }
}

#[derive(Clone, Debug, Arbitrary)]
pub struct SetOpsInput {
    pub left: Vec<Pair>,
    pub right: Vec<Pair>,
}

/// Checks union and intersection of the trees built from `left` and `right` in both orders.
pub fn run_set_ops_equivalence(left: Vec<Pair>, right: Vec<Pair>) {
    let left_set: BTreeSet<Pair> = left.iter().copied().collect();
    let right_set: BTreeSet<Pair> = right.iter().copied().collect();

    let left_tree: AvlTree = left.into_iter().collect();
    let right_tree: AvlTree = right.into_iter().collect();

    assert_same(&left_set, &left_tree);
    assert_same(&right_set, &right_tree);

    for (a_set, b_set, a, b) in [
        (&left_set, &right_set, &left_tree, &right_tree),
        (&right_set, &left_set, &right_tree, &left_tree),
    ] {
        let union = a.union(b);
        let expected: BTreeSet<Pair> = a_set.union(b_set).copied().collect();
        assert_same(&expected, &union);

        let intersection = a.intersection(b);
        let expected: BTreeSet<Pair> = a_set.intersection(b_set).copied().collect();
        assert_same(&expected, &intersection);
    }

    // Neither operation touches its inputs.
    assert_same(&left_set, &left_tree);
    assert_same(&right_set, &right_tree);
}
