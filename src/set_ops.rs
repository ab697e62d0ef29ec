use core::ptr::NonNull;

use tracing::debug;

use crate::{links, links_mut, AvlTree, Dir, Link, Node};

impl Clone for AvlTree {
    /// Copies every node, keeping the shape of the tree.
    ///
    /// This operation completes in _O(n)_ time.
    fn clone(&self) -> AvlTree {
        AvlTree {
            root: self.root.map(|root| unsafe { clone_subtree(root, None) }),
            len: self.len,
        }
    }
}

// Recursion depth is bounded by the height of the tree.
unsafe fn clone_subtree(src: NonNull<Node>, parent: Link) -> NonNull<Node> {
    unsafe {
        let copy = Node::alloc(src.as_ref().pair);
        links_mut(copy).set_parent(parent);
        links_mut(copy).set_height(links(src).height());

        for dir in [Dir::Left, Dir::Right] {
            if let Some(child) = links(src).child(dir) {
                let child_copy = clone_subtree(child, Some(copy));
                links_mut(copy).set_child(dir, Some(child_copy));
            }
        }

        copy
    }
}

impl AvlTree {
    /// Returns a new tree holding every pair found in `self` or `other`.
    ///
    /// If either tree is empty the result is a copy of the other one.
    ///
    /// This operation completes in _O(m log(n) + n)_ time, where `m` is the length of `other`.
    pub fn union(&self, other: &AvlTree) -> AvlTree {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }

        let mut result = self.clone();

        for node in other.iter() {
            if self.search_raw(&node.pair).is_none() {
                let inserted = result.insert_pair(node.pair).is_ok();
                debug_assert!(inserted, "{} is missing from the copy", node.pair);
            }
        }

        debug!(
            left = self.len(),
            right = other.len(),
            result = result.len(),
            "union"
        );

        result
    }

    /// Returns a new tree holding every pair found in both `self` and `other`.
    ///
    /// If either tree is empty the result is empty.
    ///
    /// This operation completes in _O(m log(n) + m log(m))_ time, where `m` is the length of
    /// `other`.
    pub fn intersection(&self, other: &AvlTree) -> AvlTree {
        let mut result = AvlTree::new();

        if self.is_empty() || other.is_empty() {
            return result;
        }

        for node in other.iter() {
            if self.search_raw(&node.pair).is_some() {
                let inserted = result.insert_pair(node.pair).is_ok();
                debug_assert!(inserted, "{} was yielded twice", node.pair);
            }
        }

        debug!(
            left = self.len(),
            right = other.len(),
            result = result.len(),
            "intersection"
        );

        result
    }
}
