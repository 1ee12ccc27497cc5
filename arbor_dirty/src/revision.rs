// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Revision counter for change detection.

/// A monotonically advancing change counter.
///
/// Stores bump their revision on every mutation. Comparing a revision taken
/// earlier with the current one tells an observer whether anything changed in
/// between, without diffing the store. The counter wraps on overflow.
///
/// # Example
///
/// ```
/// use arbor_dirty::Revision;
///
/// let mut revision = Revision::new();
/// let seen = revision;
/// revision.bump();
/// assert_ne!(seen, revision);
/// assert_eq!(revision.get(), 1);
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Revision(u64);

impl Revision {
    /// Returns the initial revision.
    #[must_use]
    #[inline]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Returns the raw counter value.
    #[must_use]
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Advances the revision and returns the new value.
    #[inline]
    pub fn bump(&mut self) -> Self {
        self.0 = self.0.wrapping_add(1);
        *self
    }
}
