use core::iter::FusedIterator;

use crate::{links, AvlTree, Dir, Link, Node};

enum CameFrom {
    Parent,
    LeftChild,
    Here,
    RightChild,
}

/// An in-order iterator over the nodes of an [`AvlTree`].
///
/// Walks the parent links, so it needs no stack.
pub struct Iter<'tree> {
    tree: &'tree AvlTree,

    front_cur: Link,
    front_from: CameFrom,

    len: usize,
}

impl<'tree> Iter<'tree> {
    pub(crate) fn new(tree: &'tree AvlTree) -> Self {
        Iter {
            tree,

            front_cur: tree.root,
            front_from: CameFrom::Parent,
            len: tree.len(),
        }
    }
}

impl<'tree> Iterator for Iter<'tree> {
    type Item = &'tree Node;

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        let mut cur = self.front_cur?;

        loop {
            match self.front_from {
                CameFrom::Parent => {
                    // Upon entering a new subtree, find the minimum element.
                    while let Some(left) = unsafe { links(cur).left() } {
                        cur = left;
                    }

                    // Once the minimum is found, its (empty) left subtree has been exhausted.
                    self.front_from = CameFrom::LeftChild;
                }

                CameFrom::LeftChild => {
                    // The left subtree has been exhausted, so this node is up next.
                    self.front_cur = Some(cur);
                    self.front_from = CameFrom::Here;
                    self.len -= 1;

                    return Some(unsafe { cur.as_ref() });
                }

                CameFrom::Here => {
                    if let Some(right) = unsafe { links(cur).right() } {
                        self.front_from = CameFrom::Parent;

                        cur = right;
                    } else if let Some(parent) = unsafe { links(cur).parent() } {
                        self.front_from = match unsafe { self.tree.which_child(parent, cur) } {
                            Dir::Left => CameFrom::LeftChild,
                            Dir::Right => CameFrom::RightChild,
                        };

                        cur = parent;
                    } else {
                        // The root without a right subtree is always the last element.
                        unreachable!()
                    }
                }

                CameFrom::RightChild => {
                    // Ascend until we find the successor element.
                    while let Some(parent) = unsafe { links(cur).parent() } {
                        match unsafe { self.tree.which_child(parent, cur) } {
                            Dir::Left => {
                                cur = parent;
                                break;
                            }
                            Dir::Right => cur = parent,
                        }
                    }

                    self.front_from = CameFrom::LeftChild;
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}
