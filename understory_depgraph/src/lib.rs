// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Depgraph: acyclic dependency graph primitives.
//!
//! This crate provides the graph half of an incremental computation system
//! where one value reads others and must be invalidated when they change:
//!
//! - **Dependency graph** ([`DependencyGraph`]): "A reads B" edges with
//!   reverse lookup, reference counting, and cycle rejection.
//! - **Interning** ([`Interner`], [`NodeId`]): compact `Copy` keys for owned
//!   names.
//! - **Scratch buffers** ([`TraversalScratch`]): reusable traversal state for
//!   cascades that run on every mutation.
//!
//! ## Quick Start
//!
//! ```rust
//! use understory_depgraph::{DependencyGraph, TraversalScratch};
//!
//! let mut graph = DependencyGraph::<u32>::new();
//!
//! // 3 reads 2, 2 reads 1.
//! graph.add_dependency(2, 1).unwrap();
//! graph.add_dependency(3, 2).unwrap();
//!
//! // Everything downstream of 1.
//! let mut scratch = TraversalScratch::new();
//! let mut dirty = Vec::new();
//! graph.for_each_transitive_dependent(1, &mut scratch, |k| dirty.push(k));
//! dirty.sort();
//! assert_eq!(dirty, vec![2, 3]);
//!
//! // Everything 3 needs, inputs first.
//! let mut order = Vec::new();
//! graph.post_order_dependencies(3, &mut scratch, &mut order);
//! assert_eq!(order, vec![1, 2, 3]);
//! ```
//!
//! ## Cycle Detection
//!
//! [`DependencyGraph::add_dependency`] runs a breadth-first search from the
//! new dependency along existing edges. If the dependent is reachable the
//! call returns [`CycleError`] and the graph is left exactly as it was.
//! Self-edges are always rejected.
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.
//!
//! ## Features
//!
//! This crate currently has no optional features.

#![no_std]

extern crate alloc;

mod graph;
mod intern;
mod scratch;

pub use graph::{CycleError, DependencyGraph};
pub use intern::{Interner, NodeId};
pub use scratch::TraversalScratch;
