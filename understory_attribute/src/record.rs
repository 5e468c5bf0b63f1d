// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-attribute storage.

use alloc::vec::Vec;
use smallvec::SmallVec;

use crate::modifier::{Modifier, ModifierId, Transform};
use crate::observer::SubscriptionId;

/// Inline capacity for the per-recompute modifier ordering.
///
/// Most attributes carry a handful of modifiers, so sorting them should not
/// touch the heap.
const INLINE_MODIFIERS: usize = 8;

/// A modifier owned by an attribute record.
#[derive(Debug)]
pub(crate) struct AttachedModifier {
    pub(crate) id: ModifierId,
    pub(crate) modifier: Modifier,
    pub(crate) transform: Transform,
    /// Invalidation subscription on the source, for modifiers that read one.
    pub(crate) subscription: Option<SubscriptionId>,
}

/// Storage for one attribute.
///
/// Obtained from [`AttributeStore::record`](crate::AttributeStore::record).
/// The cached value is only meaningful when the record is not dirty; use
/// [`AttributeStore::get_value`](crate::AttributeStore::get_value) to read a
/// fresh value.
#[derive(Debug)]
pub struct AttributeRecord {
    pub(crate) base_value: f64,
    pub(crate) cached_value: f64,
    pub(crate) dirty: bool,
    /// Attached modifiers in attach order.
    pub(crate) modifiers: Vec<AttachedModifier>,
}

impl AttributeRecord {
    pub(crate) fn new(base_value: f64) -> Self {
        Self {
            base_value,
            cached_value: base_value,
            dirty: false,
            modifiers: Vec::new(),
        }
    }

    /// Returns the unmodified input value.
    #[must_use]
    pub fn base_value(&self) -> f64 {
        self.base_value
    }

    /// Returns the value computed by the last recompute.
    #[must_use]
    pub fn cached_value(&self) -> f64 {
        self.cached_value
    }

    /// Returns `true` if the cached value is stale.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the attached modifiers in attach order.
    pub fn modifiers(&self) -> impl Iterator<Item = (ModifierId, &Modifier)> + '_ {
        self.modifiers.iter().map(|m| (m.id, &m.modifier))
    }

    /// Returns the transforms in application order.
    ///
    /// Ascending priority; the sort is stable so equal priorities keep attach
    /// order.
    pub(crate) fn application_order(&self) -> SmallVec<[Transform; INLINE_MODIFIERS]> {
        let mut ordered: SmallVec<[&AttachedModifier; INLINE_MODIFIERS]> =
            self.modifiers.iter().collect();
        ordered.sort_by_key(|m| m.modifier.priority());
        ordered.into_iter().map(|m| m.transform).collect()
    }
}
