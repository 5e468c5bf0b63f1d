// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Attribute: reactive numeric attributes.
//!
//! This crate maintains a set of named `f64` attributes (think character
//! stats such as `HP`, `Attack`, `Defense`). Each attribute has a base value
//! and a list of modifiers; its effective value is the base folded through
//! the modifiers in priority order.
//!
//! ## Core Concepts
//!
//! - **Attributes** live in an [`AttributeStore`] and are addressed by name.
//! - **Modifiers** ([`Modifier`], [`ModifierKind`]) transform a value. Some
//!   read another attribute, which adds a dependency edge.
//! - **Dependencies** form a DAG maintained by `understory_depgraph`. Edges
//!   that would close a cycle are rejected with
//!   [`AttributeError::CycleDetected`].
//! - **Dirty tracking**: writes mark the attribute and everything downstream
//!   dirty. Nothing is recomputed until a value is read.
//! - **Observers** ([`AttributeObserver`], [`AttributeStore::on_change`]) are
//!   told about every value that actually moved during a recompute.
//!
//! ## Quick Start
//!
//! ```rust
//! use understory_attribute::{AttributeStore, Modifier};
//!
//! let mut store = AttributeStore::new();
//! store.add_attribute("Attack", 10.0).unwrap();
//! store.add_attribute("Defense", 5.0).unwrap();
//!
//! store.add_modifier(Modifier::additive("Attack", 5.0)).unwrap();
//! store.add_modifier(Modifier::multiplicative("Attack", 1.5)).unwrap();
//! assert_eq!(store.get_value("Attack").unwrap(), 22.5);
//!
//! // SyncFrom runs last and copies its source outright.
//! let sync = store.add_modifier(Modifier::sync_from("Attack", "Defense")).unwrap();
//! assert_eq!(store.get_value("Attack").unwrap(), 5.0);
//!
//! store.remove_modifier(sync);
//! assert_eq!(store.get_value("Attack").unwrap(), 22.5);
//! ```
//!
//! ## Logging
//!
//! Structural changes (attributes created, modifiers attached or detached,
//! dependencies declared) are logged through `tracing` at `debug`. Dirty
//! marks and value changes are logged at `trace`. No subscriber is installed
//! by this crate.
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

mod error;
mod modifier;
mod observer;
mod options;
mod record;
mod store;

pub use error::AttributeError;
pub use modifier::{Modifier, ModifierId, ModifierKind};
pub use observer::{AttributeChange, AttributeObserver, ChangeListener, ListenerId};
pub use options::StoreOptions;
pub use record::AttributeRecord;
pub use store::AttributeStore;
