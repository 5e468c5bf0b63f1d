// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error type for attribute store operations.

use alloc::string::String;

/// Errors returned by [`AttributeStore`](crate::AttributeStore) operations.
///
/// Every variant is caller-triggered and deterministic; retrying the same
/// call against the same store state yields the same error.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AttributeError {
    /// An argument was rejected before any state changed, such as an empty
    /// attribute name.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with the argument.
        reason: &'static str,
    },

    /// A read named an attribute that does not exist.
    #[error("attribute `{name}` does not exist")]
    NotFound {
        /// The requested attribute name.
        name: String,
    },

    /// A dependency edge would have closed a cycle.
    ///
    /// Also returned when an attribute would depend on itself.
    #[error("dependency `{dependent}` -> `{dependency}` would create a cycle")]
    CycleDetected {
        /// The attribute that would read another.
        dependent: String,
        /// The attribute that would be read.
        dependency: String,
    },
}

impl AttributeError {
    pub(crate) const EMPTY_NAME: Self = Self::InvalidArgument {
        reason: "attribute name must not be empty",
    };
}
