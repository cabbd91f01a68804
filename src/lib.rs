//! # radix64
//!
//! A cache-efficient compressed radix tree over `u64` keys.
//!
//! Each node stores a path-compressed key prefix, a 256-bit presence bitmap
//! and only the children that exist, compacted in key order. The bitmap's
//! rank query (`count_less`) maps a branch byte to its child slot, so a node
//! costs memory proportional to its fan-out rather than to 256 slots, and
//! depth grows with the number of distinct branching points rather than with
//! key width.
//!
//! The API follows an ordered-set-of-items shape: items expose their key
//! through [`Item`], and traversal takes a visitor returning `false` to stop.
//!
//! ## Example
//!
//! ```rust
//! use radix64::Tree;
//!
//! let mut tree: Tree<(u64, &str)> = Tree::new();
//! tree.replace_or_insert((0xFF10, "b"));
//! tree.replace_or_insert((0x0001, "a"));
//!
//! assert_eq!(tree.get(0xFF10), Some(&(0xFF10, "b")));
//! assert_eq!(tree.replace_or_insert((0x0001, "c")), Some((0x0001, "a")));
//! assert_eq!(tree.len(), 2);
//!
//! let mut keys = Vec::new();
//! tree.ascend(|&(key, _)| {
//!     keys.push(key);
//!     true
//! });
//! assert_eq!(keys, vec![0x0001, 0xFF10]);
//! ```
//!
//! The tree has no internal synchronization: mutation takes `&mut self`, and
//! callers sharing a tree across threads wrap it in their own lock.

#![forbid(unsafe_code)]

pub mod bitmap;
mod error;
mod iter;
mod node;
mod tree;

pub use bitmap::Bitmap256;
pub use error::InvariantError;
pub use iter::Iter;
pub use tree::{Tree, TreeStats};

use std::rc::Rc;
use std::sync::Arc;

// =============================================================================
// Configuration
// =============================================================================

/// Initial children capacity of a node created by a split.
const SPLIT_CAPACITY: usize = 2;
/// Children are reallocated tightly once fewer than `capacity / SHRINK_RATIO`
/// remain in use.
const SHRINK_RATIO: usize = 3;
/// Nodes with this many children or fewer are never reallocated on removal.
const SHRINK_MIN_LEN: usize = 2;

// =============================================================================
// Items
// =============================================================================

/// A value stored in a [`Tree`], ordered and identified by a `u64` key.
///
/// The key must not change while the item is in the tree.
pub trait Item {
    fn key(&self) -> u64;
}

impl Item for u64 {
    #[inline]
    fn key(&self) -> u64 {
        *self
    }
}

/// Key/value pairs, keyed by the first element.
impl<V> Item for (u64, V) {
    #[inline]
    fn key(&self) -> u64 {
        self.0
    }
}

impl<T: Item + ?Sized> Item for &T {
    #[inline]
    fn key(&self) -> u64 {
        (**self).key()
    }
}

impl<T: Item + ?Sized> Item for Box<T> {
    #[inline]
    fn key(&self) -> u64 {
        (**self).key()
    }
}

impl<T: Item + ?Sized> Item for Rc<T> {
    #[inline]
    fn key(&self) -> u64 {
        (**self).key()
    }
}

impl<T: Item + ?Sized> Item for Arc<T> {
    #[inline]
    fn key(&self) -> u64 {
        (**self).key()
    }
}


#[cfg(test)]
mod proptests;
