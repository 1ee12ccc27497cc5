// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Explainability helpers for invalidation.
//!
//! The dependency table does not remember why a consumer was reported stale.
//! Embedders debugging an over-eager or surprising re-render usually want to
//! answer: “Why was this key invalidated?”.
//!
//! [`InvalidationTrace`] is a small callback sink that the store invokes for
//! every invalidated key, and [`OneCauseRecorder`] keeps **one plausible cause
//! chain** per key (the first cause observed wins).

use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::{HashMap, HashSet};

/// The recorded cause of a key's invalidation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvalidationCause<K, T> {
    /// The key read `(producer, kind)`, which was then written.
    Write {
        /// Key whose element was written.
        producer: K,
        /// Kind of the written element.
        kind: T,
    },
    /// The key lies beneath `ancestor`, which was invalidated.
    Ancestor {
        /// The invalidated ancestor.
        ancestor: K,
    },
    /// The key read an element at `producer`, which was garbage collected.
    Collected {
        /// Key that was collected.
        producer: K,
    },
    /// The key was invalidated directly by the embedder.
    Requested,
}

/// A callback sink for invalidation tracing.
pub trait InvalidationTrace<K, T> {
    /// Called when `key` is invalidated because of `cause`.
    fn invalidated(&mut self, key: &K, cause: InvalidationCause<K, T>);
}

/// Records one cause per invalidated key.
///
/// # Example
///
/// ```
/// use arbor_dirty::{InvalidationCause, InvalidationTrace, OneCauseRecorder};
///
/// let mut recorder = OneCauseRecorder::<u32, u8>::new();
/// recorder.invalidated(&2, InvalidationCause::Write { producer: 1, kind: 0 });
/// recorder.invalidated(&3, InvalidationCause::Ancestor { ancestor: 2 });
///
/// assert_eq!(recorder.explain_path(&3), Some(vec![1, 2, 3]));
/// ```
#[derive(Debug, Clone)]
pub struct OneCauseRecorder<K, T>
where
    K: Clone + Eq + Hash,
{
    causes: HashMap<K, InvalidationCause<K, T>>,
}

impl<K, T> Default for OneCauseRecorder<K, T>
where
    K: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> OneCauseRecorder<K, T>
where
    K: Clone + Eq + Hash,
{
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            causes: HashMap::new(),
        }
    }

    /// Returns the number of keys with a recorded cause.
    #[must_use]
    pub fn len(&self) -> usize {
        self.causes.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.causes.is_empty()
    }

    /// Clears all recorded causes.
    pub fn clear(&mut self) {
        self.causes.clear();
    }

    /// Forgets the cause recorded for `key`.
    ///
    /// The next invalidation of `key` is then recorded again, which lets a
    /// store explain the most recent invalidation rather than the first.
    pub fn forget(&mut self, key: &K) -> bool {
        self.causes.remove(key).is_some()
    }

    /// Returns the recorded cause for `key`, if any.
    #[must_use]
    pub fn cause(&self, key: &K) -> Option<&InvalidationCause<K, T>> {
        self.causes.get(key)
    }

    /// Returns one plausible path from the originating write to `key`.
    ///
    /// The returned vector starts at the written or collected key and ends at
    /// `key` (inclusive). Returns `None` if `key` has no recorded cause.
    #[must_use]
    pub fn explain_path(&self, key: &K) -> Option<Vec<K>> {
        let mut out = Vec::new();
        let mut seen: HashSet<K> = HashSet::new();

        let mut current = key.clone();
        loop {
            if !seen.insert(current.clone()) {
                return None;
            }
            out.push(current.clone());

            match self.cause(&current)? {
                InvalidationCause::Write { producer, .. }
                | InvalidationCause::Collected { producer } => {
                    if *producer != current {
                        out.push(producer.clone());
                    }
                    break;
                }
                InvalidationCause::Ancestor { ancestor } => current = ancestor.clone(),
                InvalidationCause::Requested => break,
            }
        }

        out.reverse();
        Some(out)
    }
}

impl<K, T> InvalidationTrace<K, T> for OneCauseRecorder<K, T>
where
    K: Clone + Eq + Hash,
{
    fn invalidated(&mut self, key: &K, cause: InvalidationCause<K, T>) {
        self.causes.entry(key.clone()).or_insert(cause);
    }
}
