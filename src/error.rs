//! Structural validation errors.

use thiserror::Error;

/// A broken structural invariant found by [`Tree::check_invariants`].
///
/// Prefixes and keys are reported in hex; `prefix_len` is in bytes.
///
/// [`Tree::check_invariants`]: crate::Tree::check_invariants
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantError {
    #[error("node prefix {prefix:#018x} has length {prefix_len} (max 7)")]
    PrefixTooLong { prefix: u64, prefix_len: usize },

    #[error("key {key:#018x} is outside node prefix {prefix:#018x}/{prefix_len}")]
    KeyOutsidePrefix {
        key: u64,
        prefix: u64,
        prefix_len: usize,
    },

    #[error("node prefix {prefix:#018x}/{prefix_len} has {children} children but {bits} presence bits")]
    ChildCountMismatch {
        prefix: u64,
        prefix_len: usize,
        children: usize,
        bits: usize,
    },

    #[error("child with key {key:#018x} sits at branch byte {found:#04x}, expected {expected:#04x}")]
    WrongBranchByte { key: u64, expected: u8, found: u8 },

    #[error("branch {prefix:#018x}/{prefix_len} is not longer than its parent's {parent_prefix_len}-byte prefix")]
    ShortBranchPrefix {
        prefix: u64,
        prefix_len: usize,
        parent_prefix_len: usize,
    },

    #[error("empty branch {prefix:#018x}/{prefix_len} left linked")]
    EmptyBranch { prefix: u64, prefix_len: usize },

    #[error("key {key:#018x} visited after {prev:#018x}")]
    OutOfOrder { prev: u64, key: u64 },

    #[error("tree records {recorded} items but {reachable} are reachable")]
    LenMismatch { recorded: usize, reachable: usize },
}
