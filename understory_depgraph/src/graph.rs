// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dependency graph with reference-counted edges.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::fmt;
use core::hash::Hash;

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use crate::scratch::TraversalScratch;

/// Error returned when adding a dependency would close a cycle.
///
/// This includes the degenerate case where `dependent == dependency`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("adding dependency {dependent:?} -> {dependency:?} would create a cycle")]
pub struct CycleError<K: fmt::Debug> {
    /// The key that would read another.
    pub dependent: K,
    /// The key that would be read.
    pub dependency: K,
}

/// Per-node adjacency.
#[derive(Clone, Debug)]
struct Adjacency<K> {
    /// Keys this node reads, with reference counts, in insertion order.
    forward: SmallVec<[(K, u32); 4]>,
    /// Keys that read this node, in insertion order.
    reverse: SmallVec<[K; 4]>,
}

impl<K> Default for Adjacency<K> {
    fn default() -> Self {
        Self {
            forward: SmallVec::new(),
            reverse: SmallVec::new(),
        }
    }
}

impl<K> Adjacency<K> {
    fn is_unused(&self) -> bool {
        self.forward.is_empty() && self.reverse.is_empty()
    }
}

/// Acyclic dependency graph: "dependent reads dependency" edges.
///
/// `DependencyGraph` keeps both directions of every edge, so "what does `a`
/// read?" ([`dependencies`](Self::dependencies)) and "what reads `a`?"
/// ([`dependents`](Self::dependents)) are both answered from a direct
/// lookup. Both lists preserve insertion order.
///
/// Edges are reference counted. Adding an edge that already exists bumps its
/// count, and [`remove_dependency`](Self::remove_dependency) releases one
/// reference. The edge disappears once its last reference is released, so
/// several owners (for example two modifiers reading the same source) can
/// share one edge.
///
/// The graph is kept acyclic: [`add_dependency`](Self::add_dependency)
/// rejects any edge that would close a loop and leaves the graph untouched.
///
/// # Example
///
/// ```
/// use understory_depgraph::DependencyGraph;
///
/// let mut graph = DependencyGraph::<u32>::new();
///
/// // 2 reads 1, 3 reads 2.
/// graph.add_dependency(2, 1).unwrap();
/// graph.add_dependency(3, 2).unwrap();
///
/// assert!(graph.dependencies(2).any(|k| k == 1));
/// assert!(graph.dependents(1).any(|k| k == 2));
///
/// // 1 -> 3 would close 1 -> 3 -> 2 -> 1.
/// assert!(graph.add_dependency(1, 3).is_err());
///
/// let transitive: Vec<_> = graph.transitive_dependents(1).collect();
/// assert!(transitive.contains(&2));
/// assert!(transitive.contains(&3));
/// ```
#[derive(Clone, Debug)]
pub struct DependencyGraph<K>
where
    K: Copy + Eq + Hash,
{
    nodes: HashMap<K, Adjacency<K>>,
    edge_count: usize,
}

impl<K> Default for DependencyGraph<K>
where
    K: Copy + Eq + Hash + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> DependencyGraph<K>
where
    K: Copy + Eq + Hash + fmt::Debug,
{
    /// Creates a new empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edge_count: 0,
        }
    }

    /// Returns `true` if the graph has no edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }

    /// Returns the number of distinct edges, ignoring reference counts.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Adds a reference to the edge `dependent -> dependency`.
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if the edge was newly created.
    /// - `Ok(false)` if the edge already existed and its reference count was bumped.
    /// - `Err(CycleError)` if `dependent == dependency`, or if `dependency`
    ///   already reaches `dependent` through existing edges. The graph is
    ///   left unchanged.
    pub fn add_dependency(&mut self, dependent: K, dependency: K) -> Result<bool, CycleError<K>> {
        if dependent == dependency || self.would_create_cycle(dependent, dependency) {
            tracing::debug!(?dependent, ?dependency, "rejected cyclic dependency");
            return Err(CycleError {
                dependent,
                dependency,
            });
        }

        let adjacency = self.nodes.entry(dependent).or_default();
        if let Some(edge) = adjacency.forward.iter_mut().find(|(k, _)| *k == dependency) {
            edge.1 += 1;
            return Ok(false);
        }
        adjacency.forward.push((dependency, 1));
        self.nodes.entry(dependency).or_default().reverse.push(dependent);
        self.edge_count += 1;
        Ok(true)
    }

    /// Releases one reference to the edge `dependent -> dependency`.
    ///
    /// The edge is removed once its last reference is gone. Returns `true`
    /// if a reference was released, `false` if the edge did not exist.
    pub fn remove_dependency(&mut self, dependent: K, dependency: K) -> bool {
        let Some(adjacency) = self.nodes.get_mut(&dependent) else {
            return false;
        };
        let Some(pos) = adjacency.forward.iter().position(|(k, _)| *k == dependency) else {
            return false;
        };

        let refs = &mut adjacency.forward[pos].1;
        *refs -= 1;
        if *refs > 0 {
            return true;
        }

        adjacency.forward.remove(pos);
        if adjacency.is_unused() {
            self.nodes.remove(&dependent);
        }
        if let Some(upstream) = self.nodes.get_mut(&dependency) {
            if let Some(pos) = upstream.reverse.iter().position(|k| *k == dependent) {
                upstream.reverse.remove(pos);
            }
            if upstream.is_unused() {
                self.nodes.remove(&dependency);
            }
        }
        self.edge_count -= 1;
        true
    }

    /// Returns `true` if the edge `dependent -> dependency` exists.
    #[must_use]
    pub fn contains(&self, dependent: K, dependency: K) -> bool {
        self.references(dependent, dependency) > 0
    }

    /// Returns the number of live references held on `dependent -> dependency`.
    #[must_use]
    pub fn references(&self, dependent: K, dependency: K) -> u32 {
        self.nodes
            .get(&dependent)
            .and_then(|a| a.forward.iter().find(|(k, _)| *k == dependency))
            .map_or(0, |(_, refs)| *refs)
    }

    /// Checks whether adding `dependent -> dependency` would close a cycle.
    ///
    /// Breadth-first search from `dependency` along existing forward edges;
    /// the edge would close a cycle if `dependent` is reachable. Runs in
    /// `O(V + E)`.
    #[must_use]
    pub fn would_create_cycle(&self, dependent: K, dependency: K) -> bool {
        if dependent == dependency {
            return true;
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        visited.insert(dependency);
        queue.push_back(dependency);

        while let Some(current) = queue.pop_front() {
            if current == dependent {
                return true;
            }
            for next in self.dependencies(current) {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        false
    }

    /// Returns an iterator over the keys `key` reads, in insertion order.
    pub fn dependencies(&self, key: K) -> impl Iterator<Item = K> + '_ {
        let slice: &[(K, u32)] = match self.nodes.get(&key) {
            Some(a) => &a.forward,
            None => &[],
        };
        slice.iter().map(|(k, _)| *k)
    }

    /// Returns an iterator over the keys that read `key`, in insertion order.
    pub fn dependents(&self, key: K) -> impl Iterator<Item = K> + '_ {
        let slice: &[K] = match self.nodes.get(&key) {
            Some(a) => &a.reverse,
            None => &[],
        };
        slice.iter().copied()
    }

    /// Returns `true` if `key` reads anything.
    #[must_use]
    pub fn has_dependencies(&self, key: K) -> bool {
        self.nodes.get(&key).is_some_and(|a| !a.forward.is_empty())
    }

    /// Returns `true` if anything reads `key`.
    #[must_use]
    pub fn has_dependents(&self, key: K) -> bool {
        self.nodes.get(&key).is_some_and(|a| !a.reverse.is_empty())
    }

    /// Returns an iterator over every distinct edge as `(dependent, dependency)`.
    ///
    /// The order across nodes is not specified.
    pub fn edges(&self) -> impl Iterator<Item = (K, K)> + '_ {
        self.nodes
            .iter()
            .flat_map(|(&from, a)| a.forward.iter().map(move |(to, _)| (from, *to)))
    }

    /// Returns an iterator over every key that transitively reads `key`.
    ///
    /// Each key is yielded once. The order is not specified.
    pub fn transitive_dependents(&self, key: K) -> impl Iterator<Item = K> + '_ {
        TransitiveDependentsIter::new(self, key)
    }

    /// Calls `f` for each transitive dependent of `key`, reusing `scratch`.
    ///
    /// Equivalent to iterating [`transitive_dependents`](Self::transitive_dependents)
    /// without allocating per call.
    pub fn for_each_transitive_dependent(
        &self,
        key: K,
        scratch: &mut TraversalScratch<K>,
        mut f: impl FnMut(K),
    ) {
        scratch.reset();
        scratch.stack.extend(self.dependents(key));

        while let Some(next) = scratch.stack.pop() {
            if scratch.visited.insert(next) {
                f(next);
                scratch.stack.extend(self.dependents(next));
            }
        }
    }

    /// Writes the dependency closure of `root` into `out` in post order.
    ///
    /// Every key `root` transitively reads appears exactly once, always after
    /// everything it reads itself, and `root` comes last. Siblings keep
    /// insertion order. The walk is iterative, so deep chains do not grow
    /// the call stack.
    ///
    /// ```
    /// use understory_depgraph::{DependencyGraph, TraversalScratch};
    ///
    /// // Diamond: 4 reads 2 and 3, both read 1.
    /// let mut graph = DependencyGraph::<u32>::new();
    /// graph.add_dependency(2, 1).unwrap();
    /// graph.add_dependency(3, 1).unwrap();
    /// graph.add_dependency(4, 2).unwrap();
    /// graph.add_dependency(4, 3).unwrap();
    ///
    /// let mut scratch = TraversalScratch::new();
    /// let mut order = Vec::new();
    /// graph.post_order_dependencies(4, &mut scratch, &mut order);
    /// assert_eq!(order, vec![1, 2, 3, 4]);
    /// ```
    pub fn post_order_dependencies(
        &self,
        root: K,
        scratch: &mut TraversalScratch<K>,
        out: &mut Vec<K>,
    ) {
        scratch.reset();
        out.clear();
        scratch.visited.insert(root);
        scratch.frames.push((root, 0));

        while let Some(frame) = scratch.frames.last_mut() {
            let (node, next) = *frame;
            match self.dependency_at(node, next) {
                Some(child) => {
                    frame.1 += 1;
                    if scratch.visited.insert(child) {
                        scratch.frames.push((child, 0));
                    }
                }
                None => {
                    scratch.frames.pop();
                    out.push(node);
                }
            }
        }
    }

    fn dependency_at(&self, key: K, index: usize) -> Option<K> {
        self.nodes
            .get(&key)
            .and_then(|a| a.forward.get(index))
            .map(|(k, _)| *k)
    }
}

/// Iterator over transitive dependents using DFS.
struct TransitiveDependentsIter<'a, K>
where
    K: Copy + Eq + Hash,
{
    graph: &'a DependencyGraph<K>,
    visited: HashSet<K>,
    stack: Vec<K>,
}

impl<'a, K> TransitiveDependentsIter<'a, K>
where
    K: Copy + Eq + Hash + fmt::Debug,
{
    fn new(graph: &'a DependencyGraph<K>, start: K) -> Self {
        Self {
            graph,
            visited: HashSet::new(),
            stack: graph.dependents(start).collect(),
        }
    }
}

impl<K> Iterator for TransitiveDependentsIter<'_, K>
where
    K: Copy + Eq + Hash + fmt::Debug,
{
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(key) = self.stack.pop() {
            if self.visited.insert(key) {
                self.stack.extend(self.graph.dependents(key));
                return Some(key);
            }
        }
        None
    }
}
