// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reusable scratch buffers for graph traversals.

use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::HashSet;

/// Reusable scratch storage for graph traversals.
///
/// Dirty cascades and recompute walks run on every mutation and read, so the
/// store keeps one of these around instead of allocating a fresh stack and
/// visited set each time. Buffers retain capacity across calls.
///
/// # See Also
///
/// - [`DependencyGraph::for_each_transitive_dependent`](crate::DependencyGraph::for_each_transitive_dependent)
/// - [`DependencyGraph::post_order_dependencies`](crate::DependencyGraph::post_order_dependencies)
#[derive(Debug, Default)]
pub struct TraversalScratch<K>
where
    K: Copy + Eq + Hash,
{
    pub(crate) stack: Vec<K>,
    pub(crate) frames: Vec<(K, usize)>,
    pub(crate) visited: HashSet<K>,
}

impl<K> TraversalScratch<K>
where
    K: Copy + Eq + Hash,
{
    /// Creates an empty scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            frames: Vec::new(),
            visited: HashSet::new(),
        }
    }

    /// Creates an empty scratch buffer with pre-allocated capacity.
    ///
    /// `capacity` is a best-effort hint for every internal buffer.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            stack: Vec::with_capacity(capacity),
            frames: Vec::with_capacity(capacity),
            visited: HashSet::with_capacity(capacity),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.stack.clear();
        self.frames.clear();
        self.visited.clear();
    }
}
