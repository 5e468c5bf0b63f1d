// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Modifier definitions.
//!
//! A [`Modifier`] is a value transform attached to one attribute. The set of
//! transforms is closed ([`ModifierKind`]); each kind has a default priority
//! that fixes where it runs in the composition chain:
//!
//! | Kind | Priority | Transform |
//! |---|---|---|
//! | [`Additive`](ModifierKind::Additive) | 10 | `value + delta` |
//! | [`DependencyScaled`](ModifierKind::DependencyScaled) | 15 | `value + source * coefficient` |
//! | [`Multiplicative`](ModifierKind::Multiplicative) | 20 | `value * factor` |
//! | [`ExtraMultiplicative`](ModifierKind::ExtraMultiplicative) | 30 | `value * (1 + extra)` |
//! | [`SyncFrom`](ModifierKind::SyncFrom) | 100 | `source` |

use alloc::string::String;
use core::fmt;

use understory_depgraph::NodeId;

use crate::error::AttributeError;
use crate::store::AttributeStore;

/// The transform a [`Modifier`] applies.
#[derive(Clone, Debug, PartialEq)]
pub enum ModifierKind {
    /// Adds a constant.
    Additive {
        /// Amount added to the running value.
        delta: f64,
    },
    /// Adds a multiple of another attribute's value.
    DependencyScaled {
        /// Attribute whose value is read.
        source: String,
        /// Multiplier applied to the source value.
        coefficient: f64,
    },
    /// Multiplies by a constant.
    Multiplicative {
        /// Factor applied to the running value.
        factor: f64,
    },
    /// Multiplies by `1 + extra`.
    ExtraMultiplicative {
        /// Bonus fraction, `0.1` meaning "+10%".
        extra: f64,
    },
    /// Replaces the running value with another attribute's value.
    SyncFrom {
        /// Attribute whose value is copied.
        source: String,
    },
}

impl ModifierKind {
    /// Returns the priority this kind runs at unless overridden.
    #[must_use]
    pub fn default_priority(&self) -> i32 {
        match self {
            Self::Additive { .. } => Modifier::ADDITIVE_PRIORITY,
            Self::DependencyScaled { .. } => Modifier::DEPENDENCY_SCALED_PRIORITY,
            Self::Multiplicative { .. } => Modifier::MULTIPLICATIVE_PRIORITY,
            Self::ExtraMultiplicative { .. } => Modifier::EXTRA_MULTIPLICATIVE_PRIORITY,
            Self::SyncFrom { .. } => Modifier::SYNC_FROM_PRIORITY,
        }
    }

    /// Returns the attribute this kind reads, if any.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        match self {
            Self::DependencyScaled { source, .. } | Self::SyncFrom { source } => Some(source),
            Self::Additive { .. } | Self::Multiplicative { .. } | Self::ExtraMultiplicative { .. } => {
                None
            }
        }
    }
}

/// A value transform targeting one attribute.
///
/// Modifiers are applied in ascending [`priority`](Self::priority) order;
/// modifiers with equal priority run in the order they were attached, so the
/// most recently attached one has the last word.
///
/// # Example
///
/// ```rust
/// use understory_attribute::{AttributeStore, Modifier};
///
/// let mut store = AttributeStore::new();
/// store.add_attribute("Attack", 10.0).unwrap();
///
/// store.add_modifier(Modifier::additive("Attack", 5.0)).unwrap();
/// store.add_modifier(Modifier::multiplicative("Attack", 2.0)).unwrap();
/// assert_eq!(store.get_value("Attack").unwrap(), 30.0);
///
/// // Running the multiplier before the addition changes the result.
/// let early = Modifier::multiplicative("Attack", 2.0).with_priority(0);
/// store.add_modifier(early).unwrap();
/// assert_eq!(store.get_value("Attack").unwrap(), 50.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Modifier {
    target: String,
    priority: i32,
    kind: ModifierKind,
}

impl Modifier {
    /// Default priority of [`ModifierKind::Additive`].
    pub const ADDITIVE_PRIORITY: i32 = 10;
    /// Default priority of [`ModifierKind::DependencyScaled`].
    pub const DEPENDENCY_SCALED_PRIORITY: i32 = 15;
    /// Default priority of [`ModifierKind::Multiplicative`].
    pub const MULTIPLICATIVE_PRIORITY: i32 = 20;
    /// Default priority of [`ModifierKind::ExtraMultiplicative`].
    pub const EXTRA_MULTIPLICATIVE_PRIORITY: i32 = 30;
    /// Default priority of [`ModifierKind::SyncFrom`].
    pub const SYNC_FROM_PRIORITY: i32 = 100;

    /// Creates a modifier of `kind` on `target` at the kind's default priority.
    #[must_use]
    pub fn new(target: impl Into<String>, kind: ModifierKind) -> Self {
        Self {
            target: target.into(),
            priority: kind.default_priority(),
            kind,
        }
    }

    /// `value + delta`.
    #[must_use]
    pub fn additive(target: impl Into<String>, delta: f64) -> Self {
        Self::new(target, ModifierKind::Additive { delta })
    }

    /// `value + source * coefficient`.
    #[must_use]
    pub fn dependency_scaled(
        target: impl Into<String>,
        source: impl Into<String>,
        coefficient: f64,
    ) -> Self {
        Self::new(
            target,
            ModifierKind::DependencyScaled {
                source: source.into(),
                coefficient,
            },
        )
    }

    /// `value * factor`.
    #[must_use]
    pub fn multiplicative(target: impl Into<String>, factor: f64) -> Self {
        Self::new(target, ModifierKind::Multiplicative { factor })
    }

    /// `value * (1 + extra)`.
    #[must_use]
    pub fn extra_multiplicative(target: impl Into<String>, extra: f64) -> Self {
        Self::new(target, ModifierKind::ExtraMultiplicative { extra })
    }

    /// Replaces the value with `source`'s value.
    #[must_use]
    pub fn sync_from(target: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(
            target,
            ModifierKind::SyncFrom {
                source: source.into(),
            },
        )
    }

    /// Overrides the priority. Lower priorities run first.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Returns the attribute this modifier transforms.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the composition priority.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns the transform.
    #[must_use]
    pub fn kind(&self) -> &ModifierKind {
        &self.kind
    }

    /// Returns the attribute this modifier reads, if any.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.kind.source()
    }

    pub(crate) fn validate(&self) -> Result<(), AttributeError> {
        if self.target.is_empty() {
            return Err(AttributeError::InvalidArgument {
                reason: "modifier target must not be empty",
            });
        }
        if self.source().is_some_and(str::is_empty) {
            return Err(AttributeError::InvalidArgument {
                reason: "modifier source must not be empty",
            });
        }
        Ok(())
    }
}

/// Handle to a modifier attached to an [`AttributeStore`].
///
/// Returned by [`AttributeStore::add_modifier`] and consumed by
/// [`AttributeStore::remove_modifier`]. Handles are never reused within a
/// store.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModifierId(u64);

impl ModifierId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for ModifierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModifierId").field(&self.0).finish()
    }
}

/// A [`ModifierKind`] with its source resolved to a node.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum Transform {
    Add(f64),
    Scaled { source: NodeId, coefficient: f64 },
    Multiply(f64),
    ExtraMultiply(f64),
    Sync(NodeId),
}

impl Transform {
    pub(crate) fn source(self) -> Option<NodeId> {
        match self {
            Self::Scaled { source, .. } | Self::Sync(source) => Some(source),
            Self::Add(_) | Self::Multiply(_) | Self::ExtraMultiply(_) => None,
        }
    }

    /// Applies the transform to the running value.
    ///
    /// Sources are read through the store, which refreshes them first if
    /// they are dirty.
    pub(crate) fn apply(self, value: f64, store: &mut AttributeStore) -> f64 {
        match self {
            Self::Add(delta) => value + delta,
            Self::Scaled {
                source,
                coefficient,
            } => value + store.value_of(source) * coefficient,
            Self::Multiply(factor) => value * factor,
            Self::ExtraMultiply(extra) => value * (1.0 + extra),
            Self::Sync(source) => store.value_of(source),
        }
    }
}
