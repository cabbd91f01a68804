use std::iter::FusedIterator;
use std::slice;

use crate::node::{Child, Node};

/// Ascending iterator over the items of a [`Tree`](crate::Tree).
///
/// Holds one slice cursor per level of the current path, so it allocates
/// at most one small stack and never revisits a node.
pub struct Iter<'a, T> {
    stack: Vec<slice::Iter<'a, Child<T>>>,
    remaining: usize,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(root: &'a Node<T>, len: usize) -> Self {
        Self {
            stack: vec![root.children().iter()],
            remaining: len,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(top) = self.stack.last_mut() {
            match top.next() {
                Some(Child::Leaf(item)) => {
                    self.remaining = self.remaining.saturating_sub(1);
                    return Some(item);
                }
                Some(Child::Branch(node)) => self.stack.push(node.children().iter()),
                None => {
                    self.stack.pop();
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            stack: self.stack.clone(),
            remaining: self.remaining,
        }
    }
}
