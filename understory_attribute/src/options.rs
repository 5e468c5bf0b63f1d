// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Store configuration.

/// Configuration for an [`AttributeStore`](crate::AttributeStore).
///
/// # Example
///
/// ```rust
/// use understory_attribute::{AttributeStore, StoreOptions};
///
/// // Ignore drift smaller than a millionth.
/// let options = StoreOptions::new().with_change_tolerance(1e-6);
/// let store = AttributeStore::with_options(options);
/// assert_eq!(store.options().change_tolerance(), 1e-6);
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StoreOptions {
    change_tolerance: f64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreOptions {
    /// Creates the default options.
    ///
    /// The default change tolerance is `0.0`: any detectable difference
    /// between the old and new value counts as a change and is notified.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            change_tolerance: 0.0,
        }
    }

    /// Sets the absolute difference a recompute must exceed to count as a
    /// change.
    ///
    /// Negative and `NaN` tolerances are treated as `0.0`.
    #[must_use]
    pub fn with_change_tolerance(mut self, tolerance: f64) -> Self {
        self.change_tolerance = if tolerance > 0.0 { tolerance } else { 0.0 };
        self
    }

    /// Returns the change tolerance.
    #[must_use]
    pub fn change_tolerance(&self) -> f64 {
        self.change_tolerance
    }

    /// Returns `true` if moving from `old` to `new` is a change.
    ///
    /// A move into or out of `NaN` is a change; `NaN` to `NaN` is not.
    pub(crate) fn differs(&self, old: f64, new: f64) -> bool {
        match (old.is_nan(), new.is_nan()) {
            (false, false) => {
                let delta = if old > new { old - new } else { new - old };
                delta > self.change_tolerance
            }
            (old_nan, new_nan) => old_nan != new_nan,
        }
    }
}
