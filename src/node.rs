//! Path-compressed trie node.
//!
//! A node covers every key sharing its `prefix_len` high bytes. The byte that
//! follows the prefix (the branch byte) selects a child; only present children
//! are stored, compacted in branch-byte order, and `presence` maps a branch
//! byte to its slot by rank.

use std::fmt;
use std::mem;

use tracing::trace;

use crate::bitmap::Bitmap256;
use crate::error::InvariantError;
use crate::{Item, SHRINK_MIN_LEN, SHRINK_RATIO, SPLIT_CAPACITY};

/// Mask selecting the top `prefix_len` bytes of a key.
#[inline]
pub(crate) fn prefix_mask(prefix_len: usize) -> u64 {
    debug_assert!(prefix_len <= 8);
    if prefix_len == 0 {
        0
    } else {
        u64::MAX << (64 - 8 * prefix_len)
    }
}

/// Number of leading bytes shared by `a` and `b` (8 when equal).
#[inline]
pub(crate) fn common_prefix_len(a: u64, b: u64) -> usize {
    ((a ^ b).leading_zeros() / 8) as usize
}

#[derive(Clone)]
pub(crate) enum Child<T> {
    Leaf(T),
    Branch(Box<Node<T>>),
}

impl<T: Item> Child<T> {
    /// Representative key: the item key, or a branch's masked prefix.
    fn key(&self) -> u64 {
        match self {
            Child::Leaf(item) => item.key(),
            Child::Branch(node) => node.key(),
        }
    }

    fn into_leaf(self) -> Option<T> {
        match self {
            Child::Leaf(item) => Some(item),
            Child::Branch(_) => None,
        }
    }

    /// Replaces the occupant of this slot with a new branch holding both the
    /// occupant and `item`, split at their longest common prefix.
    fn split(&mut self, item: T) {
        let key = item.key();
        let prefix_len = common_prefix_len(key, self.key());
        trace!(key, prefix_len, "splitting slot into new branch");

        let branch = Box::new(Node::with_prefix(key, prefix_len));
        let occupant = mem::replace(self, Child::Branch(branch));
        if let Child::Branch(branch) = self {
            branch.adopt(occupant);
            branch.adopt(Child::Leaf(item));
        }
    }
}

#[derive(Clone)]
pub(crate) struct Node<T> {
    /// Prefix bytes in the high bytes, prefix length in the low byte.
    prefix: u64,
    presence: Bitmap256,
    children: Vec<Child<T>>,
}

impl<T> Node<T> {
    /// The empty root: prefix length 0, matching every key.
    pub(crate) const fn new() -> Self {
        Self {
            prefix: 0,
            presence: Bitmap256::new(),
            children: Vec::new(),
        }
    }

    /// A split node. It always receives exactly two children right away.
    fn with_prefix(key: u64, prefix_len: usize) -> Self {
        Self {
            prefix: (key & prefix_mask(prefix_len)) | prefix_len as u64,
            presence: Bitmap256::new(),
            children: Vec::with_capacity(SPLIT_CAPACITY),
        }
    }

    #[inline]
    pub(crate) fn key(&self) -> u64 {
        self.prefix & self.prefix_mask()
    }

    #[inline]
    pub(crate) fn prefix_len(&self) -> usize {
        (self.prefix & 0xFF) as usize
    }

    #[inline]
    fn prefix_mask(&self) -> u64 {
        prefix_mask(self.prefix_len())
    }

    #[inline]
    fn matches_prefix(&self, key: u64) -> bool {
        (key ^ self.prefix) & self.prefix_mask() == 0
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// The branch byte of `key` below this node.
    #[inline]
    fn index(&self, key: u64) -> u8 {
        (key >> (8 * (7 - self.prefix_len()))) as u8
    }

    fn insert_child(&mut self, index: u8, slot: usize, child: Child<T>) {
        self.presence.set(index);
        self.children.insert(slot, child);
    }

    fn remove_child(&mut self, index: u8, slot: usize) -> Child<T> {
        self.presence.clear(index);
        let removed = self.children.remove(slot);

        let len = self.children.len();
        let capacity = self.children.capacity();
        if len > SHRINK_MIN_LEN && len < capacity / SHRINK_RATIO {
            trace!(len, capacity, "recompacting children");
            self.children.shrink_to_fit();
        }
        removed
    }

    pub(crate) fn children(&self) -> &[Child<T>] {
        &self.children
    }

    pub(crate) fn min(&self) -> Option<&T> {
        let mut node = self;
        loop {
            match node.children.first()? {
                Child::Branch(next) => node = &**next,
                Child::Leaf(item) => return Some(item),
            }
        }
    }

    pub(crate) fn max(&self) -> Option<&T> {
        let mut node = self;
        loop {
            match node.children.last()? {
                Child::Branch(next) => node = &**next,
                Child::Leaf(item) => return Some(item),
            }
        }
    }
}

impl<T: Item> Node<T> {
    /// Inserts `child` at the slot for its own branch byte.
    fn adopt(&mut self, child: Child<T>) {
        let index = self.index(child.key());
        let slot = self.presence.count_less(index);
        self.insert_child(index, slot, child);
    }

    pub(crate) fn fetch(&self, key: u64) -> Option<&T> {
        let mut node = self;
        loop {
            if !node.matches_prefix(key) {
                return None;
            }

            let index = node.index(key);
            if !node.presence.get(index) {
                return None;
            }
            match &node.children[node.presence.count_less(index)] {
                Child::Branch(next) => node = &**next,
                // A leaf only shares the bytes down to this branch byte.
                Child::Leaf(item) => return (item.key() == key).then_some(item),
            }
        }
    }

    /// Inserts `item`, returning the item it replaced at the same key.
    ///
    /// # Panics
    ///
    /// If the descent reaches a node whose prefix does not cover the key,
    /// which means the tree is corrupted.
    pub(crate) fn insert(&mut self, item: T) -> Option<T> {
        let key = item.key();
        let mut node = self;
        loop {
            if !node.matches_prefix(key) {
                panic!("key {key:#018x} does not belong on node {node:?}");
            }

            let index = node.index(key);
            let slot = node.presence.count_less(index);
            if !node.presence.get(index) {
                node.insert_child(index, slot, Child::Leaf(item));
                return None;
            }

            let descend = matches!(
                &node.children[slot],
                Child::Branch(next) if next.matches_prefix(key)
            );
            if descend {
                let Child::Branch(next) = &mut node.children[slot] else {
                    unreachable!("descend implies a branch child");
                };
                node = &mut **next;
                continue;
            }

            let occupant = &mut node.children[slot];
            if let Child::Leaf(existing) = &mut *occupant {
                if existing.key() == key {
                    return Some(mem::replace(existing, item));
                }
            }
            occupant.split(item);
            return None;
        }
    }

    /// Removes the item at `key`. A child branch left empty is unlinked here;
    /// a branch left with a single child is kept as is.
    pub(crate) fn delete(&mut self, key: u64) -> Option<T> {
        if !self.matches_prefix(key) {
            return None;
        }

        let index = self.index(key);
        if !self.presence.get(index) {
            return None;
        }
        let slot = self.presence.count_less(index);

        match &mut self.children[slot] {
            Child::Branch(next) => {
                let old = next.delete(key)?;
                if next.is_empty() {
                    trace!(prefix = next.key(), prefix_len = next.prefix_len(), "unlinking empty branch");
                    self.remove_child(index, slot);
                }
                Some(old)
            }
            Child::Leaf(existing) if existing.key() == key => {
                self.remove_child(index, slot).into_leaf()
            }
            Child::Leaf(_) => None,
        }
    }

    /// Visits items with keys `>= key` in ascending order. Returns `false`
    /// once `visit` has asked to stop.
    pub(crate) fn ascend_greater_or_equal<F>(&self, key: u64, visit: &mut F) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        // Nodes off the key's path are walked whole; their leaves are
        // filtered one by one below.
        let start = if self.matches_prefix(key) {
            self.presence.count_less(self.index(key))
        } else {
            0
        };

        for child in &self.children[start..] {
            match child {
                Child::Branch(next) => {
                    if !next.ascend_greater_or_equal(key, visit) {
                        return false;
                    }
                }
                Child::Leaf(item) => {
                    if item.key() >= key && !visit(item) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Visits items with keys `<= key` in descending order. Returns `false`
    /// once `visit` has asked to stop.
    pub(crate) fn descend_less_or_equal<F>(&self, key: u64, visit: &mut F) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        let end = if self.matches_prefix(key) {
            let index = self.index(key);
            self.presence.count_less(index) + usize::from(self.presence.get(index))
        } else {
            self.children.len()
        };

        for child in self.children[..end].iter().rev() {
            match child {
                Child::Branch(next) => {
                    if !next.descend_less_or_equal(key, visit) {
                        return false;
                    }
                }
                Child::Leaf(item) => {
                    if item.key() <= key && !visit(item) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Accumulates shape and allocation figures for this subtree.
    pub(crate) fn collect_stats(&self, depth: usize, stats: &mut NodeStats) {
        stats.nodes += 1;
        stats.max_depth = stats.max_depth.max(depth);
        stats.child_slots += self.children.capacity();
        stats.bytes += self.children.capacity() * mem::size_of::<Child<T>>();

        for child in &self.children {
            match child {
                Child::Leaf(_) => stats.leaves += 1,
                Child::Branch(next) => {
                    stats.bytes += mem::size_of::<Node<T>>();
                    if next.children.len() == 1 {
                        stats.single_child_branches += 1;
                    }
                    next.collect_stats(depth + 1, stats);
                }
            }
        }
    }

    /// Verifies the structural invariants of this subtree. Leaf keys are
    /// checked to arrive in strictly increasing order through `last`.
    pub(crate) fn check(
        &self,
        is_root: bool,
        last: &mut Option<u64>,
        leaves: &mut usize,
    ) -> Result<(), InvariantError> {
        let prefix_len = self.prefix_len();
        // A node needs a branch byte below its prefix.
        if prefix_len > 7 {
            return Err(InvariantError::PrefixTooLong {
                prefix: self.prefix & !0xFF,
                prefix_len,
            });
        }
        let prefix = self.key();
        if self.children.len() != self.presence.count() {
            return Err(InvariantError::ChildCountMismatch {
                prefix,
                prefix_len,
                children: self.children.len(),
                bits: self.presence.count(),
            });
        }
        if !is_root && self.is_empty() {
            return Err(InvariantError::EmptyBranch { prefix, prefix_len });
        }

        for (found, child) in self.presence.iter().zip(&self.children) {
            let key = child.key();
            if !self.matches_prefix(key) {
                return Err(InvariantError::KeyOutsidePrefix {
                    key,
                    prefix,
                    prefix_len,
                });
            }
            let expected = self.index(key);
            if expected != found {
                return Err(InvariantError::WrongBranchByte {
                    key,
                    expected,
                    found,
                });
            }

            match child {
                Child::Leaf(_) => {
                    if let Some(prev) = *last {
                        if prev >= key {
                            return Err(InvariantError::OutOfOrder { prev, key });
                        }
                    }
                    *last = Some(key);
                    *leaves += 1;
                }
                Child::Branch(next) => {
                    if next.prefix_len() <= prefix_len {
                        return Err(InvariantError::ShortBranchPrefix {
                            prefix: next.key(),
                            prefix_len: next.prefix_len(),
                            parent_prefix_len: prefix_len,
                        });
                    }
                    next.check(false, last, leaves)?;
                }
            }
        }
        Ok(())
    }
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("prefix", &format_args!("{:#018x}", self.key()))
            .field("prefix_len", &self.prefix_len())
            .field("presence", &self.presence)
            .field("children", &self.children.len())
            .finish()
    }
}

/// Raw figures gathered by [`Node::collect_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct NodeStats {
    pub(crate) nodes: usize,
    pub(crate) leaves: usize,
    pub(crate) max_depth: usize,
    pub(crate) child_slots: usize,
    pub(crate) single_child_branches: usize,
    pub(crate) bytes: usize,
}
