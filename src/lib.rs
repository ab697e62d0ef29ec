//! An AVL tree over composite `(key, secondary)` integer pairs.
//!
//! Pairs are ordered lexicographically, first by `key` and then by `secondary`, and each pair is
//! stored at most once. Every node carries a non-owning link to its parent so that rebalancing
//! can climb from the point of a mutation to the root without re-descending.
//!
//! ```
//! use avl_pairs::AvlTree;
//!
//! let mut tree = AvlTree::new();
//! assert!(tree.insert(6, 25));
//! assert!(tree.insert(6, 10));
//! assert!(!tree.insert(6, 25));
//!
//! assert_eq!(tree.len(), 2);
//! assert_eq!(tree.search(6, 10).map(|node| node.secondary()), Some(10));
//!
//! assert!(tree.remove(6, 25));
//! assert!(tree.search(6, 25).is_none());
//! ```

// Conventions used in comments:
// - The height of a leaf is 0 and the height of a missing child is -1.
// - The balance of a node is `height(left) - height(right)`.
//
// The invariants of the tree are:
// 1. An in-order walk yields strictly increasing pairs.
// 2. Every balance is -1, 0 or 1.
// 3. Every child's parent link points at the node holding it; the root has no parent.
// 4. Every cached height equals the height of the subtree.

use core::{
    cell::UnsafeCell, cmp::Ordering, fmt, marker::PhantomPinned, mem, ops::Not, ptr::NonNull,
};

use arbitrary::Arbitrary;
use cordyceps::Linked;
use tracing::{debug, trace};

mod display;
mod error;
mod iter;
#[cfg(any(test, feature = "model"))]
pub mod model;
pub mod records;
mod set_ops;
#[cfg(test)]
mod tests;

pub use error::Error;
pub use iter::Iter;

/// A composite key.
///
/// The derived ordering compares `key` first and breaks ties with `secondary`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Arbitrary)]
pub struct Pair {
    pub key: i32,
    pub secondary: i32,
}

impl Pair {
    pub const fn new(key: i32, secondary: i32) -> Pair {
        Pair { key, secondary }
    }
}

impl From<(i32, i32)> for Pair {
    fn from((key, secondary): (i32, i32)) -> Pair {
        Pair::new(key, secondary)
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.key, self.secondary)
    }
}

/// A self-balancing binary search tree of [`Pair`]s.
pub struct AvlTree {
    root: Link,
    len: usize,
}

// SAFETY: the tree exclusively owns every node reachable from `root`, and parent links never
// point outside of it.
unsafe impl Send for AvlTree {}

/// A single element of an [`AvlTree`].
#[repr(C)]
pub struct Node {
    links: Links,
    pair: Pair,
}

#[doc(hidden)]
pub struct Links {
    inner: UnsafeCell<LinksInner>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Dir {
    Left = 0,
    Right = 1,
}

impl Dir {
    fn name(self) -> &'static str {
        match self {
            Dir::Left => "left",
            Dir::Right => "right",
        }
    }
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

#[repr(C)]
struct LinksInner {
    parent: Link,
    children: [Link; 2],
    height: i32,
    _unpin: PhantomPinned,
}

type Link = Option<NonNull<Node>>;

impl Node {
    /// Returns the primary component of this node's pair.
    pub fn key(&self) -> i32 {
        self.pair.key
    }

    /// Returns the secondary component of this node's pair.
    pub fn secondary(&self) -> i32 {
        self.pair.secondary
    }

    pub fn pair(&self) -> Pair {
        self.pair
    }

    /// Returns the height of the subtree rooted at this node. A leaf has height 0.
    pub fn height(&self) -> i32 {
        self.links.height()
    }

    fn alloc(pair: Pair) -> NonNull<Node> {
        <Node as Linked<Links>>::into_ptr(Box::new(Node {
            links: Links::new(),
            pair,
        }))
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("key", &self.pair.key)
            .field("secondary", &self.pair.secondary)
            .field("height", &self.height())
            .finish()
    }
}

unsafe impl Linked<Links> for Node {
    type Handle = Box<Node>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        NonNull::from(Box::leak(r))
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links> {
        // SAFETY: Self is #[repr(C)] and `links` is first field
        ptr.cast()
    }
}

#[inline]
unsafe fn links<'a>(node: NonNull<Node>) -> &'a Links {
    unsafe { <Node as Linked<Links>>::links(node).as_ref() }
}

#[inline]
unsafe fn links_mut<'a>(node: NonNull<Node>) -> &'a mut Links {
    unsafe { <Node as Linked<Links>>::links(node).as_mut() }
}

/// Returns ownership of a node that has been unlinked from its tree.
#[inline]
unsafe fn release(node: NonNull<Node>) -> Box<Node> {
    unsafe { <Node as Linked<Links>>::from_ptr(node) }
}

/// Returns the cached height of the pointed-to node, or -1 for a missing child.
#[inline]
unsafe fn height(link: Link) -> i32 {
    link.map(|n| unsafe { links(n).height() }).unwrap_or(-1)
}

#[inline]
unsafe fn balance(node: NonNull<Node>) -> i32 {
    unsafe { height(links(node).left()) - height(links(node).right()) }
}

#[inline]
unsafe fn update_height(node: NonNull<Node>) {
    unsafe {
        let h = 1 + height(links(node).left()).max(height(links(node).right()));
        links_mut(node).set_height(h);
    }
}

impl AvlTree {
    /// Returns a new empty tree.
    pub const fn new() -> AvlTree {
        AvlTree { root: None, len: 0 }
    }

    /// Returns `true` if the tree contains no elements.
    pub const fn is_empty(&self) -> bool {
        let empty = self.len() == 0;

        if cfg!(debug_assertions) {
            // Can't use assert_eq!() in const fn.
            assert!(empty == self.root.is_none());
        }

        empty
    }

    /// Returns the number of elements in the tree.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns the height of the tree: -1 when empty, 0 for a single node.
    pub fn height(&self) -> i32 {
        unsafe { height(self.root) }
    }

    /// Returns the root node, if any.
    pub fn root(&self) -> Option<&Node> {
        self.root.map(|root| unsafe { root.as_ref() })
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        if let Some(root) = self.root {
            assert!(
                unsafe { links(root).parent() }.is_none(),
                "root must not have a parent"
            );
        }

        let mut count = 0;
        unsafe { self.assert_invariants_at(self.root, None, None, &mut count) };
        assert_eq!(count, self.len, "length does not match the number of nodes");
    }

    // Checks the subtree at `link` and returns its recomputed height.
    #[allow(clippy::only_used_in_recursion)]
    unsafe fn assert_invariants_at(
        &self,
        link: Link,
        lower: Option<Pair>,
        upper: Option<Pair>,
        count: &mut usize,
    ) -> i32 {
        let Some(node) = link else {
            return -1;
        };

        *count += 1;

        unsafe {
            let pair = node.as_ref().pair;

            if let Some(lower) = lower {
                assert!(lower < pair, "{pair} is out of order after {lower}");
            }
            if let Some(upper) = upper {
                assert!(pair < upper, "{pair} is out of order before {upper}");
            }

            // Ensure each child's parent pointer points to this node.
            for dir in [Dir::Left, Dir::Right] {
                if let Some(child) = links(node).child(dir) {
                    let parent = links(child).parent();
                    assert_eq!(
                        parent,
                        Some(node),
                        "{} child of {pair} has a wrong parent pointer",
                        dir.name()
                    );
                }
            }

            let left = self.assert_invariants_at(links(node).left(), lower, Some(pair), count);
            let right = self.assert_invariants_at(links(node).right(), Some(pair), upper, count);

            assert!(
                (left - right).abs() <= 1,
                "{pair} is unbalanced: left height {left}, right height {right}"
            );

            let actual = 1 + left.max(right);
            assert_eq!(
                links(node).height(),
                actual,
                "{pair} caches a stale height"
            );

            actual
        }
    }

    /// Returns the node holding `(key, secondary)`.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn search(&self, key: i32, secondary: i32) -> Option<&Node> {
        let ptr = self.search_raw(&Pair::new(key, secondary))?;
        unsafe { Some(ptr.as_ref()) }
    }

    /// Returns `true` if the tree contains `(key, secondary)`.
    pub fn contains(&self, key: i32, secondary: i32) -> bool {
        self.search_raw(&Pair::new(key, secondary)).is_some()
    }

    fn search_raw(&self, pair: &Pair) -> Link {
        let mut opt_cur = self.root;

        loop {
            let cur = opt_cur?;

            unsafe {
                match pair.cmp(&cur.as_ref().pair) {
                    Ordering::Less => opt_cur = links(cur).left(),
                    Ordering::Equal => return Some(cur),
                    Ordering::Greater => opt_cur = links(cur).right(),
                }
            }
        }
    }

    /// Returns the minimum element of the tree.
    pub fn first(&self) -> Option<&Node> {
        let root = self.root?;

        unsafe {
            let (first, _) = self.min_in_subtree(root);
            Some(first.as_ref())
        }
    }

    /// Returns the maximum element of the tree.
    pub fn last(&self) -> Option<&Node> {
        let mut cur = self.root?;

        unsafe {
            while let Some(right) = links(cur).right() {
                cur = right;
            }

            Some(cur.as_ref())
        }
    }

    /// Returns an in-order iterator over the nodes of the tree.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self)
    }

    unsafe fn maybe_set_parent(&mut self, opt_node: Link, parent: Link) {
        let Some(node) = opt_node else {
            return;
        };

        unsafe { links_mut(node).set_parent(parent) };
    }

    #[inline]
    unsafe fn replace_child_or_set_root(
        &mut self,
        parent: Link,
        old_child: NonNull<Node>,
        new_child: Link,
    ) {
        match parent {
            Some(parent) => unsafe { self.replace_child(parent, old_child, new_child) },
            None => self.root = new_child,
        }
    }

    // Replaces the child pointer of `parent` pointing at `old_child` with `new_child`.
    //
    // `new_child`'s parent pointer is not updated.
    //
    // # Safety
    //
    // The caller must ensure that `old_child` is a child node of `parent`.
    #[inline]
    unsafe fn replace_child(
        &mut self,
        parent: NonNull<Node>,
        old_child: NonNull<Node>,
        new_child: Link,
    ) {
        unsafe {
            let dir = self.which_child(parent, old_child);
            links_mut(parent).set_child(dir, new_child);
        }
    }

    unsafe fn which_child(&self, parent: NonNull<Node>, child: NonNull<Node>) -> Dir {
        unsafe {
            if links(parent).left() == Some(child) {
                Dir::Left
            } else {
                debug_assert_eq!(
                    links(parent).right(),
                    Some(child),
                    "`child` must be a child of `parent`"
                );
                Dir::Right
            }
        }
    }

    // Rotates `down` towards `dir`: its `!dir` child moves up into its place and `down` becomes
    // that child's `dir` child. Returns the new local root.
    //
    // Fails without touching the tree if the `!dir` child is missing.
    fn rotate(&mut self, down: NonNull<Node>, dir: Dir) -> Result<NonNull<Node>, Error> {
        unsafe {
            let Some(up) = links(down).child(!dir) else {
                return Err(Error::InvalidRotation {
                    pair: down.as_ref().pair,
                    direction: dir.name(),
                });
            };

            // `across` goes from the `dir` child of `up` to the `!dir` child of `down`.
            let across = links(up).child(dir);
            links_mut(down).set_child(!dir, across);
            self.maybe_set_parent(across, Some(down));

            links_mut(up).set_child(dir, Some(down));
            let parent = links_mut(down).set_parent(Some(up));
            links_mut(up).set_parent(parent);

            self.replace_child_or_set_root(parent, down, Some(up));

            // `down` is now below `up`, so it is refreshed first.
            update_height(down);
            update_height(up);

            trace!(
                down = %down.as_ref().pair,
                up = %up.as_ref().pair,
                "rotated {}",
                dir.name()
            );

            Ok(up)
        }
    }

    /// Promotes the right child of `node` into its place.
    fn rotate_left(&mut self, node: NonNull<Node>) -> Result<NonNull<Node>, Error> {
        self.rotate(node, Dir::Left)
    }

    /// Promotes the left child of `node` into its place.
    fn rotate_right(&mut self, node: NonNull<Node>) -> Result<NonNull<Node>, Error> {
        self.rotate(node, Dir::Right)
    }

    // Walks from `start` to the root, refreshing heights and rotating wherever a balance has
    // reached 2 or -2.
    fn rebalance_from(&mut self, start: Link) {
        let mut opt_cur = start;

        while let Some(cur) = opt_cur {
            unsafe {
                // A rotation at `cur` keeps the parent above the new local root.
                let parent = links(cur).parent();

                update_height(cur);

                let cur_balance = balance(cur);
                if cur_balance > 1 {
                    let left = links(cur).left().expect("left-heavy node has no left child");

                    if balance(left) < 0 {
                        trace!(at = %cur.as_ref().pair, "left-right case");
                        self.rotate_left(left)
                            .expect("left-right case requires a left-right grandchild");
                    } else {
                        trace!(at = %cur.as_ref().pair, "left-left case");
                    }

                    self.rotate_right(cur)
                        .expect("left-heavy node must rotate right");
                } else if cur_balance < -1 {
                    let right = links(cur).right().expect("right-heavy node has no right child");

                    if balance(right) > 0 {
                        trace!(at = %cur.as_ref().pair, "right-left case");
                        self.rotate_right(right)
                            .expect("right-left case requires a right-left grandchild");
                    } else {
                        trace!(at = %cur.as_ref().pair, "right-right case");
                    }

                    self.rotate_left(cur)
                        .expect("right-heavy node must rotate left");
                }

                opt_cur = parent;
            }
        }
    }

    /// Inserts `(key, secondary)` into the tree.
    ///
    /// Returns `false` and leaves the tree untouched if the pair is already present.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn insert(&mut self, key: i32, secondary: i32) -> bool {
        self.insert_pair(Pair::new(key, secondary)).is_ok()
    }

    /// Inserts `(key, secondary)` into the tree, reporting a duplicate as an error.
    pub fn try_insert(&mut self, key: i32, secondary: i32) -> Result<(), Error> {
        self.insert_pair(Pair::new(key, secondary))
    }

    pub(crate) fn insert_pair(&mut self, pair: Pair) -> Result<(), Error> {
        let Some(root) = self.root else {
            // Tree is empty. Set the new node as the root and return.
            self.root = Some(Node::alloc(pair));
            self.len += 1;
            return Ok(());
        };

        let mut parent = root;

        // Descend the tree, looking for a free slot.
        let dir = loop {
            let dir = match pair.cmp(unsafe { &parent.as_ref().pair }) {
                Ordering::Less => Dir::Left,
                Ordering::Equal => {
                    debug!(%pair, "rejected duplicate insert");
                    return Err(Error::DuplicateKey(pair));
                }
                Ordering::Greater => Dir::Right,
            };

            match unsafe { links(parent).child(dir) } {
                Some(child) => parent = child,
                None => break dir,
            }
        };

        let node = Node::alloc(pair);
        unsafe {
            links_mut(parent).set_child(dir, Some(node));
            links_mut(node).set_parent(Some(parent));
        }

        self.len += 1;
        self.rebalance_from(Some(parent));

        Ok(())
    }

    // Returns the minimum node in the subtree.
    //
    // If the subtree root is not the minimum, also returns the minimum node's parent.
    #[inline]
    unsafe fn min_in_subtree(&self, root: NonNull<Node>) -> (NonNull<Node>, Link) {
        let mut parent = None;
        let mut cur = root;

        while let Some(left) = unsafe { links(cur).left() } {
            parent = Some(cur);
            cur = left;
        }

        (cur, parent)
    }

    /// Removes `(key, secondary)` from the tree.
    ///
    /// Returns `false` and leaves the tree untouched if the pair is not present.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn remove(&mut self, key: i32, secondary: i32) -> bool {
        self.try_remove(key, secondary).is_ok()
    }

    /// Removes `(key, secondary)` from the tree, reporting a missing pair as an error.
    pub fn try_remove(&mut self, key: i32, secondary: i32) -> Result<(), Error> {
        let pair = Pair::new(key, secondary);

        let Some(node) = self.search_raw(&pair) else {
            debug!(%pair, "nothing to remove");
            return Err(Error::NotFound(pair));
        };

        drop(unsafe { self.remove_at(node) });

        Ok(())
    }

    // Unlinks `node`, rebalances, and hands the node back to the caller.
    //
    // # Safety
    //
    // `node` must be an element of `self`.
    unsafe fn remove_at(&mut self, node: NonNull<Node>) -> Box<Node> {
        unsafe {
            let parent = links(node).parent();
            let left = links(node).left();
            let right = links(node).right();

            let walk_from = match (left, right) {
                (Some(left), Some(right)) => Some(self.join(node, left, right)),

                (Some(child), None) | (None, Some(child)) => {
                    self.replace_child_or_set_root(parent, node, Some(child));
                    links_mut(child).set_parent(parent);
                    parent
                }

                (None, None) => {
                    self.replace_child_or_set_root(parent, node, None);
                    parent
                }
            };

            self.rebalance_from(walk_from);
            self.len -= 1;

            release(node)
        }
    }

    // Joins `left` and `right`, the subtrees of `node`, under the minimum of `right`, and puts
    // that minimum in `node`'s place.
    //
    // Returns the deepest node whose subtree changed. Walking up from it passes through the
    // joined node before reaching `node`'s former parent.
    unsafe fn join(
        &mut self,
        node: NonNull<Node>,
        left: NonNull<Node>,
        right: NonNull<Node>,
    ) -> NonNull<Node> {
        unsafe {
            let (successor, successor_parent) = self.min_in_subtree(right);

            if let Some(successor_parent) = successor_parent {
                // Elevate the successor's right child to replace it.
                let successor_right = links(successor).right();
                links_mut(successor_parent).set_left(successor_right);
                self.maybe_set_parent(successor_right, Some(successor_parent));

                links_mut(successor).set_right(Some(right));
                links_mut(right).set_parent(Some(successor));
            }
            // Otherwise the successor is `right` itself and keeps its right subtree.

            links_mut(successor).set_left(Some(left));
            links_mut(left).set_parent(Some(successor));

            let parent = links(node).parent();
            self.replace_child_or_set_root(parent, node, Some(successor));
            links_mut(successor).set_parent(parent);

            successor_parent.unwrap_or(successor)
        }
    }

    /// Clears the tree, removing all elements.
    pub fn clear(&mut self) {
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                // Descend to the minimum node.
                let (cur, parent) = self.min_in_subtree(cur);
                let parent = parent.or_else(|| links(cur).parent());

                let right = links(cur).right();

                // Elevate the node's right child (which may be None).
                self.replace_child_or_set_root(parent, cur, right);
                self.maybe_set_parent(right, parent);

                // Drop the node.
                drop(release(cur));
                self.len -= 1;

                // If the node had no right child, climb to the parent. If the node had no parent,
                // the tree is empty.
                opt_cur = right.or(parent);
            }
        }

        debug_assert!(self.root.is_none());
        debug_assert_eq!(self.len(), 0);
    }
}

impl Default for AvlTree {
    fn default() -> Self {
        AvlTree::new()
    }
}

impl Drop for AvlTree {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for AvlTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(Node::pair)).finish()
    }
}

impl FromIterator<Pair> for AvlTree {
    fn from_iter<I: IntoIterator<Item = Pair>>(iter: I) -> Self {
        let mut tree = AvlTree::new();
        tree.extend(iter);
        tree
    }
}

impl Extend<Pair> for AvlTree {
    /// Inserts every pair, skipping those already present.
    fn extend<I: IntoIterator<Item = Pair>>(&mut self, iter: I) {
        for pair in iter {
            let _ = self.insert_pair(pair);
        }
    }
}

impl<'tree> IntoIterator for &'tree AvlTree {
    type Item = &'tree Node;
    type IntoIter = Iter<'tree>;

    fn into_iter(self) -> Iter<'tree> {
        self.iter()
    }
}

impl Links {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                height: 0,
                _unpin: PhantomPinned,
            }),
        }
    }

    #[inline]
    fn height(&self) -> i32 {
        unsafe { (*self.inner.get()).height }
    }

    #[inline]
    fn parent(&self) -> Link {
        unsafe { (*self.inner.get()).parent }
    }

    #[inline]
    fn child(&self, dir: Dir) -> Link {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    fn left(&self) -> Link {
        self.child(Dir::Left)
    }

    #[inline]
    fn right(&self) -> Link {
        self.child(Dir::Right)
    }

    #[inline]
    fn set_parent(&mut self, parent: Link) -> Link {
        mem::replace(&mut self.inner.get_mut().parent, parent)
    }

    #[inline]
    fn set_child(&mut self, dir: Dir, child: Link) -> Link {
        mem::replace(&mut self.inner.get_mut().children[dir as usize], child)
    }

    #[inline]
    fn set_left(&mut self, left: Link) -> Link {
        self.set_child(Dir::Left, left)
    }

    #[inline]
    fn set_right(&mut self, right: Link) -> Link {
        self.set_child(Dir::Right, right)
    }

    #[inline]
    fn set_height(&mut self, height: i32) {
        self.inner.get_mut().height = height;
    }
}

impl Default for Links {
    fn default() -> Self {
        Links::new()
    }
}
