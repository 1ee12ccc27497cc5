// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dependency records between producers and consumers.

use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::{HashMap, HashSet};

/// Which writes a dependency record reacts to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// Only writes of the recorded kind at exactly the producer key.
    #[default]
    Exact,
    /// Writes of the recorded kind at the producer key or any key beneath it.
    ///
    /// The table itself knows nothing about hierarchy: callers look these
    /// records up on each ancestor of the written key.
    Subtree,
}

/// A single record as seen from its consumer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Dependency<K, T> {
    /// The key whose element was read.
    pub producer: K,
    /// The kind of element that was read.
    pub kind: T,
    /// Which writes invalidate the consumer.
    pub scope: Scope,
}

/// Bidirectional "consumer read `(producer, kind)`" records.
///
/// Records are created at read time and consumed at write time: a write to
/// `(producer, kind)` takes the consumers that read it, and the caller marks
/// them stale. Taking records removes them, so a consumer is reported once per
/// read, and it records again when it is recomputed.
///
/// The reverse index allows a consumer's records to be dropped in one step
/// when it is recomputed, so that only the reads of its latest computation
/// count.
///
/// # Type Parameters
///
/// - `K`: The key type, e.g. a structural location.
/// - `T`: The kind of element read at a key, e.g. a type tag.
///
/// # Example
///
/// ```
/// use arbor_dirty::{DependencyTable, Scope};
///
/// const WIDTH: u8 = 0;
///
/// let mut table = DependencyTable::<u32, u8>::new();
/// table.record(1, WIDTH, 10, Scope::Exact);
/// table.record(1, WIDTH, 11, Scope::Exact);
///
/// let mut stale = table.take_dependents(&1, WIDTH, Scope::Exact);
/// stale.sort();
/// assert_eq!(stale, [10, 11]);
///
/// // Records are consumed by the write that reported them.
/// assert!(table.take_dependents(&1, WIDTH, Scope::Exact).is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct DependencyTable<K, T>
where
    K: Clone + Eq + Hash,
    T: Copy + Eq + Hash,
{
    /// Producer key -> (kind, scope) -> consumers.
    dependents: HashMap<K, HashMap<(T, Scope), HashSet<K>>>,
    /// Consumer key -> records it made.
    dependencies: HashMap<K, HashSet<Dependency<K, T>>>,
}

impl<K, T> Default for DependencyTable<K, T>
where
    K: Clone + Eq + Hash,
    T: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> DependencyTable<K, T>
where
    K: Clone + Eq + Hash,
    T: Copy + Eq + Hash,
{
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dependents: HashMap::new(),
            dependencies: HashMap::new(),
        }
    }

    /// Returns `true` if no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dependencies.values().map(HashSet::len).sum()
    }

    /// Records that `consumer` read the `kind` element at `producer`.
    ///
    /// Returns `true` if the record is new.
    pub fn record(&mut self, producer: K, kind: T, consumer: K, scope: Scope) -> bool {
        let inserted = self
            .dependencies
            .entry(consumer.clone())
            .or_default()
            .insert(Dependency {
                producer: producer.clone(),
                kind,
                scope,
            });
        if inserted {
            self.dependents
                .entry(producer)
                .or_default()
                .entry((kind, scope))
                .or_default()
                .insert(consumer);
        }
        inserted
    }

    /// Returns `true` if `consumer` holds a record on `(producer, kind)`.
    #[must_use]
    pub fn contains(&self, producer: &K, kind: T, consumer: &K, scope: Scope) -> bool {
        self.dependents
            .get(producer)
            .and_then(|kinds| kinds.get(&(kind, scope)))
            .is_some_and(|consumers| consumers.contains(consumer))
    }

    /// Returns the consumers recorded on `(producer, kind)` with `scope`.
    ///
    /// The iteration order is not specified.
    pub fn dependents(&self, producer: &K, kind: T, scope: Scope) -> impl Iterator<Item = &K> + '_ {
        self.dependents
            .get(producer)
            .and_then(|kinds| kinds.get(&(kind, scope)))
            .into_iter()
            .flatten()
    }

    /// Returns the records made by `consumer`.
    ///
    /// The iteration order is not specified.
    pub fn dependencies(&self, consumer: &K) -> impl Iterator<Item = &Dependency<K, T>> + '_ {
        self.dependencies.get(consumer).into_iter().flatten()
    }

    /// Removes and returns the consumers recorded on `(producer, kind)` with `scope`.
    pub fn take_dependents(&mut self, producer: &K, kind: T, scope: Scope) -> Vec<K> {
        let Some(kinds) = self.dependents.get_mut(producer) else {
            return Vec::new();
        };
        let consumers = kinds.remove(&(kind, scope)).unwrap_or_default();
        if kinds.is_empty() {
            self.dependents.remove(producer);
        }
        for consumer in &consumers {
            self.unlink_consumer(
                consumer,
                &Dependency {
                    producer: producer.clone(),
                    kind,
                    scope,
                },
            );
        }
        consumers.into_iter().collect()
    }

    /// Removes and returns every consumer recorded on `producer`, any kind or scope.
    pub fn take_all_dependents(&mut self, producer: &K) -> Vec<K> {
        let Some(kinds) = self.dependents.remove(producer) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for ((kind, scope), consumers) in kinds {
            for consumer in consumers {
                self.unlink_consumer(
                    &consumer,
                    &Dependency {
                        producer: producer.clone(),
                        kind,
                        scope,
                    },
                );
                out.push(consumer);
            }
        }
        out
    }

    /// Drops every record made by `consumer`.
    ///
    /// Returns the number of records dropped.
    pub fn forget_consumer(&mut self, consumer: &K) -> usize {
        let Some(records) = self.dependencies.remove(consumer) else {
            return 0;
        };
        let count = records.len();
        for record in records {
            let Some(kinds) = self.dependents.get_mut(&record.producer) else {
                continue;
            };
            if let Some(consumers) = kinds.get_mut(&(record.kind, record.scope)) {
                consumers.remove(consumer);
                if consumers.is_empty() {
                    kinds.remove(&(record.kind, record.scope));
                }
            }
            if kinds.is_empty() {
                self.dependents.remove(&record.producer);
            }
        }
        count
    }

    /// Removes a key entirely, both as a producer and as a consumer.
    pub fn remove_key(&mut self, key: &K) {
        self.forget_consumer(key);
        self.take_all_dependents(key);
    }

    /// Removes all records.
    pub fn clear(&mut self) {
        self.dependents.clear();
        self.dependencies.clear();
    }

    fn unlink_consumer(&mut self, consumer: &K, record: &Dependency<K, T>) {
        if let Some(records) = self.dependencies.get_mut(consumer) {
            records.remove(record);
            if records.is_empty() {
                self.dependencies.remove(consumer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    const WIDTH: u8 = 0;
    const COLOR: u8 = 1;

    fn sorted(mut keys: Vec<u32>) -> Vec<u32> {
        keys.sort_unstable();
        keys
    }

    #[test]
    fn record_is_idempotent() {
        let mut table = DependencyTable::<u32, u8>::new();
        assert!(table.is_empty());
        assert!(table.record(1, WIDTH, 2, Scope::Exact));
        assert!(!table.record(1, WIDTH, 2, Scope::Exact));
        assert_eq!(table.len(), 1);
        assert!(table.contains(&1, WIDTH, &2, Scope::Exact));
        assert!(!table.contains(&1, WIDTH, &2, Scope::Subtree));
    }

    #[test]
    fn kinds_are_independent() {
        let mut table = DependencyTable::<u32, u8>::new();
        table.record(1, WIDTH, 2, Scope::Exact);
        table.record(1, COLOR, 3, Scope::Exact);

        assert_eq!(table.take_dependents(&1, WIDTH, Scope::Exact), vec![2]);
        assert!(table.contains(&1, COLOR, &3, Scope::Exact));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn scopes_are_independent() {
        let mut table = DependencyTable::<u32, u8>::new();
        table.record(1, WIDTH, 2, Scope::Exact);
        table.record(1, WIDTH, 3, Scope::Subtree);

        assert_eq!(table.take_dependents(&1, WIDTH, Scope::Subtree), vec![3]);
        assert_eq!(table.take_dependents(&1, WIDTH, Scope::Exact), vec![2]);
        assert!(table.is_empty());
    }

    #[test]
    fn taking_updates_the_reverse_index() {
        let mut table = DependencyTable::<u32, u8>::new();
        table.record(1, WIDTH, 9, Scope::Exact);
        table.record(2, WIDTH, 9, Scope::Exact);

        table.take_dependents(&1, WIDTH, Scope::Exact);
        let remaining: Vec<_> = table.dependencies(&9).map(|d| d.producer).collect();
        assert_eq!(remaining, vec![2]);
    }

    #[test]
    fn take_all_dependents_spans_kinds_and_scopes() {
        let mut table = DependencyTable::<u32, u8>::new();
        table.record(1, WIDTH, 2, Scope::Exact);
        table.record(1, COLOR, 3, Scope::Subtree);
        table.record(4, COLOR, 3, Scope::Exact);

        assert_eq!(sorted(table.take_all_dependents(&1)), vec![2, 3]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.dependents(&4, COLOR, Scope::Exact).count(), 1);
    }

    #[test]
    fn forget_consumer_drops_only_its_records() {
        let mut table = DependencyTable::<u32, u8>::new();
        table.record(1, WIDTH, 2, Scope::Exact);
        table.record(1, WIDTH, 3, Scope::Exact);
        table.record(5, COLOR, 2, Scope::Subtree);

        assert_eq!(table.forget_consumer(&2), 2);
        assert_eq!(table.forget_consumer(&2), 0);
        assert_eq!(table.take_dependents(&1, WIDTH, Scope::Exact), vec![3]);
        assert_eq!(table.dependents(&5, COLOR, Scope::Subtree).count(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn remove_key_clears_both_directions() {
        let mut table = DependencyTable::<u32, u8>::new();
        table.record(1, WIDTH, 2, Scope::Exact);
        table.record(2, WIDTH, 3, Scope::Exact);

        table.remove_key(&2);
        assert!(table.is_empty());

        table.record(7, WIDTH, 8, Scope::Exact);
        table.clear();
        assert_eq!(table.len(), 0);
    }
}
