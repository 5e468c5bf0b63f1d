// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Name interning.
//!
//! Attribute tables and the [`DependencyGraph`](crate::DependencyGraph) are
//! keyed by a compact `Copy` id rather than by the owned name. [`Interner`]
//! hands out one [`NodeId`] per distinct name and resolves it back.
//!
//! ## Example
//!
//! ```rust
//! use understory_depgraph::{DependencyGraph, Interner};
//!
//! let mut names = Interner::new();
//! let hp = names.intern("HP");
//! let attack = names.intern("Attack");
//! assert_eq!(names.intern("HP"), hp);
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_dependency(attack, hp).unwrap();
//!
//! let readers: Vec<_> = graph
//!     .dependents(hp)
//!     .filter_map(|id| names.resolve(id))
//!     .collect();
//! assert_eq!(readers, ["Attack"]);
//! ```

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;

/// A compact, interned name handle.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Returns this id as a `usize` index (for tables keyed by node ids).
    #[inline]
    #[must_use]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Returns the raw numeric id.
    #[inline]
    #[must_use]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Interns names into [`NodeId`] handles.
///
/// Ids are dense and assigned in first-seen order. Names are never removed,
/// so an id stays valid for the lifetime of the interner.
#[derive(Debug, Clone, Default)]
pub struct Interner {
    names: Vec<Box<str>>,
    ids: HashMap<Box<str>, NodeId>,
}

impl Interner {
    /// Creates an empty interner.
    #[must_use]
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            ids: HashMap::new(),
        }
    }

    /// Returns the number of interned names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if nothing has been interned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the id for `name`, interning it if needed.
    ///
    /// # Panics
    ///
    /// Panics if more than `u32::MAX` distinct names are interned.
    pub fn intern(&mut self, name: &str) -> NodeId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }

        let id = NodeId(
            u32::try_from(self.names.len()).expect("too many interned names for NodeId (u32)"),
        );
        self.names.push(name.into());
        self.ids.insert(name.into(), id);
        id
    }

    /// Returns the id for `name` without interning it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.ids.get(name).copied()
    }

    /// Returns the name behind `id`, if the id came from this interner.
    #[must_use]
    pub fn resolve(&self, id: NodeId) -> Option<&str> {
        self.names.get(id.as_usize()).map(|name| &**name)
    }

    /// Returns an iterator over every `(id, name)` pair in id order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &str)> + '_ {
        (0_u32..)
            .zip(self.names.iter())
            .map(|(i, name)| (NodeId(i), &**name))
    }
}
