//! The public ordered container.

use std::fmt;
use std::mem;

use tracing::trace;

use crate::error::InvariantError;
use crate::iter::Iter;
use crate::node::{Node, NodeStats};
use crate::Item;

/// A radix tree of items keyed by `u64`.
///
/// At most one item is stored per key. The empty tree does not allocate.
#[derive(Clone)]
pub struct Tree<T> {
    root: Node<T>,
    len: usize,
}

/// Shape and memory figures reported by [`Tree::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Live items.
    pub len: usize,
    /// Nodes, root included.
    pub nodes: usize,
    /// Deepest node below the root (the root is depth 0).
    pub max_depth: usize,
    /// Allocated child slots across all nodes.
    pub child_slots: usize,
    /// Branches left with one child by deletions.
    pub single_child_branches: usize,
    /// Approximate heap and inline bytes held by the tree.
    pub memory_bytes: usize,
}

impl<T> Tree<T> {
    pub const fn new() -> Self {
        Self {
            root: Node::new(),
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes every item, returning the tree to its empty state.
    pub fn clear(&mut self) {
        trace!(len = self.len, "clearing tree");
        self.root = Node::new();
        self.len = 0;
    }

    /// The item with the smallest key.
    pub fn min(&self) -> Option<&T> {
        self.root.min()
    }

    /// The item with the largest key.
    pub fn max(&self) -> Option<&T> {
        self.root.max()
    }

    /// Items in ascending key order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(&self.root, self.len)
    }
}

impl<T: Item> Tree<T> {
    pub fn get(&self, key: u64) -> Option<&T> {
        self.root.fetch(key)
    }

    pub fn contains(&self, key: u64) -> bool {
        self.get(key).is_some()
    }

    /// Adds `item`, replacing and returning any item already stored at its
    /// key. The length grows only when nothing was replaced.
    pub fn replace_or_insert(&mut self, item: T) -> Option<T> {
        let old = self.root.insert(item);
        if old.is_none() {
            self.len += 1;
        }
        old
    }

    /// Removes and returns the item at `key`.
    ///
    /// # Panics
    ///
    /// If an item is removed while the recorded length is already zero,
    /// which means the tree is corrupted.
    pub fn delete(&mut self, key: u64) -> Option<T> {
        let old = self.root.delete(key)?;
        self.len = match self.len.checked_sub(1) {
            Some(len) => len,
            None => panic!(
                "removed key {key:#018x} from a tree recording no items, root {:?}",
                self.root
            ),
        };
        Some(old)
    }

    pub fn delete_min(&mut self) -> Option<T> {
        let key = self.min()?.key();
        self.delete(key)
    }

    pub fn delete_max(&mut self) -> Option<T> {
        let key = self.max()?.key();
        self.delete(key)
    }

    /// Calls `visit` on every item in ascending key order until it returns
    /// `false`.
    pub fn ascend<F>(&self, visit: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.ascend_greater_or_equal(0, visit);
    }

    /// Calls `visit` on items with keys `>= key` in ascending order until it
    /// returns `false`.
    pub fn ascend_greater_or_equal<F>(&self, key: u64, mut visit: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.root.ascend_greater_or_equal(key, &mut visit);
    }

    /// Ascending over keys `< pivot`.
    pub fn ascend_less_than<F>(&self, pivot: u64, mut visit: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.ascend(|item| item.key() < pivot && visit(item));
    }

    /// Ascending over keys in `[greater_or_equal, less_than)`.
    pub fn ascend_range<F>(&self, greater_or_equal: u64, less_than: u64, mut visit: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.ascend_greater_or_equal(greater_or_equal, |item| {
            item.key() < less_than && visit(item)
        });
    }

    /// Calls `visit` on every item in descending key order until it returns
    /// `false`.
    pub fn descend<F>(&self, visit: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.descend_less_or_equal(u64::MAX, visit);
    }

    /// Calls `visit` on items with keys `<= key` in descending order until it
    /// returns `false`.
    pub fn descend_less_or_equal<F>(&self, key: u64, mut visit: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.root.descend_less_or_equal(key, &mut visit);
    }

    /// Descending over keys `> pivot`.
    pub fn descend_greater_than<F>(&self, pivot: u64, mut visit: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.descend(|item| item.key() > pivot && visit(item));
    }

    /// Descending over keys in `(greater_than, less_or_equal]`.
    pub fn descend_range<F>(&self, less_or_equal: u64, greater_than: u64, mut visit: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.descend_less_or_equal(less_or_equal, |item| {
            item.key() > greater_than && visit(item)
        });
    }

    pub fn stats(&self) -> TreeStats {
        let mut raw = NodeStats::default();
        self.root.collect_stats(0, &mut raw);
        TreeStats {
            len: self.len,
            nodes: raw.nodes,
            max_depth: raw.max_depth,
            child_slots: raw.child_slots,
            single_child_branches: raw.single_child_branches,
            memory_bytes: mem::size_of::<Self>() + raw.bytes,
        }
    }

    /// Approximate bytes held by the tree, excluding heap memory owned by
    /// the items themselves.
    pub fn memory_usage(&self) -> usize {
        self.stats().memory_bytes
    }

    /// Walks the whole tree and verifies its structural invariants: prefix
    /// lengths, bitmap/children agreement, branch-byte placement, strictly
    /// increasing leaf order, no empty branches, and the recorded length.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let mut last = None;
        let mut reachable = 0;
        self.root.check(true, &mut last, &mut reachable)?;
        if reachable != self.len {
            return Err(InvariantError::LenMismatch {
                recorded: self.len,
                reachable,
            });
        }
        Ok(())
    }
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Tree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: Item> Extend<T> for Tree<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.replace_or_insert(item);
        }
    }
}

impl<T: Item> FromIterator<T> for Tree<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl<'a, T> IntoIterator for &'a Tree<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
