// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The synchronous core of the shadow graph.
//!
//! The store owns everything the graph knows about each location: the
//! rendered component, the elements, who read what, and which subtrees are
//! hidden. It never awaits; the async render driver in [`crate::render`]
//! takes the lock only around the store calls it needs.
//!
//! Locations are kept in a [`BTreeMap`], whose pre-order key ordering makes
//! every subtree one contiguous range.

use core::mem;
use std::collections::{BTreeMap, BTreeSet};

use arbor_dirty::{
    DependencyTable, InvalidationCause, InvalidationTrace, OneCauseRecorder, Revision, Scope,
};
use arbor_location::{Direction, Location};
use smallvec::SmallVec;

use crate::component::AnyComponent;
use crate::config::{GarbageCollection, GraphConfig};
use crate::dependency::{self, Watcher};
use crate::element::{Element, ElementKind, ErasedElement, Lifetime};
use crate::property::PropertyPath;

/// Most locations carry a handful of elements: child locations, context,
/// state.
const INLINE_ELEMENTS: usize = 4;

pub(crate) type Cause = InvalidationCause<Location, ElementKind>;

/// The children a location expanded to, in order.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ChildLocations(pub(crate) Vec<Location>);

impl Element for ChildLocations {}

/// The children a location expanded to most recently.
///
/// Unlike [`ChildLocations`], this outlives invalidations caused by the
/// subtree's own output, such as a preference assigned beneath, so that
/// aggregating readers can follow the structure while it renders again. Any
/// other invalidation drops it.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct LastExpansion(pub(crate) Vec<Location>);

impl Element for LastExpansion {
    const LIFETIME: Lifetime = Lifetime::Persistent;
}

/// Everything stored at one location.
#[derive(Debug, Default)]
pub(crate) struct Node {
    component: Option<AnyComponent>,
    /// Sorted by kind.
    elements: SmallVec<[ErasedElement; INLINE_ELEMENTS]>,
}

impl Node {
    fn find(&self, kind: ElementKind) -> Result<usize, usize> {
        self.elements.binary_search_by_key(&kind, ErasedElement::kind)
    }

    fn element<E: Element>(&self) -> Option<&E> {
        let index = self.find(ElementKind::of::<E>()).ok()?;
        self.elements[index].downcast_ref()
    }

    fn insert(&mut self, element: ErasedElement) {
        match self.find(element.kind()) {
            Ok(index) => self.elements[index] = element,
            Err(index) => self.elements.insert(index, element),
        }
    }

    fn remove(&mut self, kind: ElementKind) -> Option<ErasedElement> {
        let index = self.find(kind).ok()?;
        Some(self.elements.remove(index))
    }

    fn retain_persistent(&mut self) {
        self.elements
            .retain(|element| element.lifetime() == Lifetime::Persistent);
    }

    fn is_empty(&self) -> bool {
        self.component.is_none() && self.elements.is_empty()
    }

    fn kinds(&self) -> impl Iterator<Item = ElementKind> + '_ {
        self.elements.iter().map(ErasedElement::kind)
    }

    /// Rewrites the stored child lists of a node moved from `from` to `to`.
    fn rebase_children(&mut self, from: &Location, to: &Location) {
        let rebase = |children: &[Location]| -> Vec<Location> {
            children
                .iter()
                .map(|child| {
                    child
                        .relative_to(from)
                        .map_or_else(|| child.clone(), |relative| to.rebase(&relative))
                })
                .collect()
        };
        let current = self
            .element::<ChildLocations>()
            .map(|ChildLocations(children)| ChildLocations(rebase(children.as_slice())));
        let last = self
            .element::<LastExpansion>()
            .map(|LastExpansion(children)| LastExpansion(rebase(children.as_slice())));
        if let Some(current) = current {
            self.insert(ErasedElement::new(current));
        }
        if let Some(last) = last {
            self.insert(ErasedElement::new(last));
        }
    }
}

/// Per-location storage plus the dependency bookkeeping that keeps it fresh.
#[derive(Debug)]
pub(crate) struct Store {
    root: AnyComponent,
    config: GraphConfig,
    nodes: BTreeMap<Location, Node>,
    dependencies: DependencyTable<Location, ElementKind>,
    hidden: BTreeSet<Location>,
    /// Stale subtrees awaiting [`collect_garbage`](Self::collect_garbage).
    garbage: Vec<Location>,
    /// Streams feeding observed dependencies, polled by the graph.
    watchers: Vec<Watcher>,
    revision: Revision,
    trace: Option<OneCauseRecorder<Location, ElementKind>>,
}

impl Store {
    pub(crate) fn new(root: AnyComponent, config: GraphConfig) -> Self {
        Self {
            root,
            config,
            nodes: BTreeMap::new(),
            dependencies: DependencyTable::new(),
            hidden: BTreeSet::new(),
            garbage: Vec::new(),
            watchers: Vec::new(),
            revision: Revision::new(),
            trace: config.trace_invalidations.then(OneCauseRecorder::new),
        }
    }

    pub(crate) fn root(&self) -> AnyComponent {
        self.root.clone()
    }

    pub(crate) fn config(&self) -> GraphConfig {
        self.config
    }

    pub(crate) fn revision(&self) -> Revision {
        self.revision
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    fn subtree(&self, root: &Location) -> impl Iterator<Item = (&Location, &Node)> + '_ {
        let root = root.clone();
        self.nodes
            .range(root.clone()..)
            .take_while(move |(location, _)| root.contains(location))
    }

    fn subtree_keys(&self, root: &Location) -> Vec<Location> {
        self.subtree(root)
            .map(|(location, _)| location.clone())
            .collect()
    }

    /// Hidden locations strictly beneath `root`, outermost first.
    fn hidden_below(&self, root: &Location) -> Vec<Location> {
        self.hidden
            .range(root.clone()..)
            .take_while(|location| root.contains(location))
            .filter(|location| *location != root)
            .cloned()
            .collect()
    }

    // --- components ---------------------------------------------------------

    pub(crate) fn component(&self, location: &Location) -> Option<AnyComponent> {
        self.nodes.get(location)?.component.clone()
    }

    pub(crate) fn is_rendered(&self, location: &Location) -> bool {
        self.nodes
            .get(location)
            .is_some_and(|node| node.component.is_some())
    }

    pub(crate) fn set_component(&mut self, location: Location, component: AnyComponent) {
        log::trace!("rendered {location} as {}", component.type_name());
        self.nodes.entry(location).or_default().component = Some(component);
        self.revision.bump();
    }

    // --- elements -----------------------------------------------------------

    pub(crate) fn element<E: Element>(&self, location: &Location) -> Option<E> {
        self.nodes.get(location)?.element::<E>().cloned()
    }

    /// Reads `E` at `location` on behalf of `consumer`.
    pub(crate) fn read<E: Element>(
        &mut self,
        location: &Location,
        consumer: Option<&Location>,
    ) -> Option<E> {
        if let Some(consumer) = consumer {
            self.record(location.clone(), ElementKind::of::<E>(), consumer.clone(), Scope::Exact);
        }
        self.element(location)
    }

    pub(crate) fn record(
        &mut self,
        producer: Location,
        kind: ElementKind,
        consumer: Location,
        scope: Scope,
    ) {
        if self.dependencies.record(producer.clone(), kind, consumer.clone(), scope) {
            log::trace!("{consumer} reads `{}` at {producer} ({scope:?})", kind.name());
        }
    }

    /// Forgets everything `consumer` read, ahead of reading it all again.
    pub(crate) fn forget_reads(&mut self, consumer: &Location) {
        self.dependencies.forget_consumer(consumer);
    }

    /// Stores `value` without notifying anyone who read the previous value.
    ///
    /// Only for values derived from what the readers already depend on.
    pub(crate) fn cache<E: Element>(&mut self, location: Location, value: E) {
        self.nodes
            .entry(location)
            .or_default()
            .insert(ErasedElement::new(value));
        self.revision.bump();
    }

    /// Stores `value` and invalidates every location that read `E` here.
    pub(crate) fn write<E: Element>(&mut self, location: Location, value: E) {
        self.cache(location.clone(), value);
        self.trigger(&location, ElementKind::of::<E>());
    }

    /// Like [`write`](Self::write), but does nothing if the stored value is equal.
    pub(crate) fn write_if_changed<E: Element + PartialEq>(
        &mut self,
        location: Location,
        value: E,
    ) -> bool {
        if self.element::<E>(&location).as_ref() == Some(&value) {
            return false;
        }
        self.write(location, value);
        true
    }

    pub(crate) fn remove_element<E: Element>(&mut self, location: &Location) -> Option<E> {
        let kind = ElementKind::of::<E>();
        let node = self.nodes.get_mut(location)?;
        let removed = node.remove(kind)?;
        if node.is_empty() {
            self.nodes.remove(location);
        }
        self.revision.bump();
        self.trigger(location, kind);
        removed.downcast_ref::<E>().cloned()
    }

    /// Invalidates the readers of `(location, kind)`, including readers of
    /// any subtree containing `location`.
    fn trigger(&mut self, location: &Location, kind: ElementKind) {
        let readers = self
            .dependencies
            .take_dependents(location, kind, Scope::Exact);
        let aggregators = self.take_subtree_readers(location, kind);
        let cause = InvalidationCause::Write {
            producer: location.clone(),
            kind,
        };
        for consumer in readers {
            self.invalidate(&consumer, cause.clone());
        }
        for consumer in aggregators {
            self.invalidate_output_reader(&consumer, cause.clone());
        }
    }

    /// Takes the readers of `kind` anywhere in a subtree containing `location`.
    fn take_subtree_readers(&mut self, location: &Location, kind: ElementKind) -> Vec<Location> {
        let mut consumers = Vec::new();
        for container in core::iter::once(location.clone()).chain(location.ancestors()) {
            consumers.extend(
                self.dependencies
                    .take_dependents(&container, kind, Scope::Subtree),
            );
        }
        consumers
    }

    // --- invalidation -------------------------------------------------------

    /// Drops the rendered state of `consumer` and everything beneath it.
    ///
    /// Components and derived elements are removed; persistent elements stay,
    /// apart from the last expansions, since the subtree may be produced
    /// differently. Hidden subtrees beneath `consumer` are left untouched.
    pub(crate) fn invalidate(&mut self, consumer: &Location, cause: Cause) {
        self.invalidate_rendering(consumer, cause, false);
    }

    /// Like [`invalidate`](Self::invalidate), for a consumer that read what
    /// its own subtree produced. The subtree's structure stays known.
    fn invalidate_output_reader(&mut self, consumer: &Location, cause: Cause) {
        self.invalidate_rendering(consumer, cause, true);
    }

    fn invalidate_rendering(&mut self, consumer: &Location, cause: Cause, keep_structure: bool) {
        let protected = self.hidden_below(consumer);
        let affected: Vec<Location> = self
            .subtree_keys(consumer)
            .into_iter()
            .filter(|location| !protected.iter().any(|hidden| hidden.contains(location)))
            .collect();

        self.dependencies.forget_consumer(consumer);
        if self.is_rendered(consumer) {
            self.note(consumer, cause);
        }
        for location in &affected {
            let Some(node) = self.nodes.get_mut(location) else {
                continue;
            };
            let was_rendered = node.component.take().is_some();
            node.retain_persistent();
            if !keep_structure {
                node.remove(ElementKind::of::<LastExpansion>());
            }
            if node.is_empty() {
                self.nodes.remove(location);
            }
            if location != consumer {
                self.dependencies.forget_consumer(location);
                if was_rendered {
                    self.note(
                        location,
                        InvalidationCause::Ancestor {
                            ancestor: consumer.clone(),
                        },
                    );
                }
            }
        }
        self.revision.bump();
        log::debug!(
            "invalidated {consumer} ({} locations, {} hidden subtrees kept)",
            affected.len(),
            protected.len()
        );
    }

    /// Records why the rendered state at `location` was dropped, replacing
    /// the explanation of any earlier invalidation.
    fn note(&mut self, location: &Location, cause: Cause) {
        if let Some(trace) = &mut self.trace {
            trace.forget(location);
            trace.invalidated(location, cause);
        }
    }

    pub(crate) fn invalidation_cause(&self, location: &Location) -> Option<Cause> {
        self.trace.as_ref()?.cause(location).cloned()
    }

    pub(crate) fn explain_invalidation(&self, location: &Location) -> Option<Vec<Location>> {
        self.trace.as_ref()?.explain_path(location)
    }

    // --- hidden locations ---------------------------------------------------

    pub(crate) fn set_hidden(&mut self, location: Location, hidden: bool) {
        let changed = if hidden {
            self.hidden.insert(location.clone())
        } else {
            self.hidden.remove(&location)
        };
        if changed {
            log::debug!("{location} is now {}", if hidden { "hidden" } else { "visible" });
        }
    }

    /// Returns `true` if `location` or one of its ancestors is hidden.
    pub(crate) fn is_hidden(&self, location: &Location) -> bool {
        self.hidden.contains(location)
            || location
                .ancestors()
                .any(|ancestor| self.hidden.contains(&ancestor))
    }

    // --- expansion ----------------------------------------------------------

    pub(crate) fn child_locations(&self, parent: &Location) -> Option<Vec<Location>> {
        self.element::<ChildLocations>(parent)
            .map(|children| children.0)
    }

    /// Direct children of `parent` that have anything stored beneath them.
    fn occupied_children(&self, parent: &Location) -> BTreeSet<Location> {
        let depth = parent.depth() + 1;
        self.subtree(parent)
            .filter_map(|(location, _)| location.prefix(depth))
            .collect()
    }

    /// Moves identified subtrees whose slot changed to their new location.
    ///
    /// A child identified by `id` that used to live at another position of
    /// `parent` keeps its stored state. Readers of anything moved are
    /// invalidated, since the location they read no longer exists.
    pub(crate) fn migrate_identities(&mut self, parent: &Location, children: &[Location]) {
        let occupied = self.occupied_children(parent);
        let mut claimed: Vec<Location> = Vec::new();
        for child in children {
            let Some(Direction::Identified { id, .. }) = child.last() else {
                continue;
            };
            if occupied.contains(child) {
                continue;
            }
            let previous = occupied.iter().find(|candidate| {
                !children.contains(candidate)
                    && !claimed.contains(candidate)
                    && candidate.last().and_then(Direction::identifier) == Some(id)
            });
            if let Some(previous) = previous {
                claimed.push(previous.clone());
                self.move_subtree(previous, child);
            }
        }
    }

    fn move_subtree(&mut self, from: &Location, to: &Location) {
        for old in self.subtree_keys(from) {
            for consumer in self.dependencies.take_all_dependents(&old) {
                self.invalidate(
                    &consumer,
                    InvalidationCause::Collected {
                        producer: old.clone(),
                    },
                );
            }
            self.dependencies.forget_consumer(&old);
            let (Some(mut node), Some(relative)) =
                (self.nodes.remove(&old), old.relative_to(from))
            else {
                continue;
            };
            node.rebase_children(from, to);
            self.nodes.insert(to.rebase(&relative), node);
        }
        for queued in &mut self.garbage {
            if let Some(relative) = queued.relative_to(from) {
                *queued = to.rebase(&relative);
            }
        }
        for watcher in &mut self.watchers {
            watcher.rebase(from, to);
        }
        for old in self.hidden_below(from) {
            self.hidden.remove(&old);
            if let Some(relative) = old.relative_to(from) {
                self.hidden.insert(to.rebase(&relative));
            }
        }
        if self.hidden.remove(from) {
            self.hidden.insert(to.clone());
        }
        self.revision.bump();
        log::debug!("moved {from} to {to}");
    }

    /// Records the result of expanding `parent`.
    ///
    /// Returns `false`, storing nothing, if `parent` was invalidated while its
    /// children were being prepared.
    pub(crate) fn commit_expansion(
        &mut self,
        parent: &Location,
        children: Vec<Location>,
        prepared: Vec<(Location, AnyComponent)>,
    ) -> bool {
        if !self.is_rendered(parent) {
            log::debug!("dropping expansion of {parent}: invalidated while preparing");
            return false;
        }
        for (location, component) in prepared {
            self.set_component(location, component);
        }
        let stale: Vec<Location> = self
            .occupied_children(parent)
            .into_iter()
            .filter(|child| !children.contains(child))
            .collect();
        self.cache(parent.clone(), ChildLocations(children.clone()));
        for location in stale {
            match self.config.garbage_collection {
                GarbageCollection::Eager => {
                    self.remove_subtree(&location);
                }
                GarbageCollection::Deferred => {
                    if !self.garbage.contains(&location) {
                        log::trace!("queued {location} for collection");
                        self.garbage.push(location);
                    }
                }
            }
        }
        // May invalidate `parent` itself, if an aggregating reader sits at or
        // above it and the structure changed.
        self.write_if_changed(parent.clone(), LastExpansion(children));
        true
    }

    // --- garbage collection -------------------------------------------------

    /// Removes `root` and everything beneath it, except hidden subtrees.
    ///
    /// Readers of anything removed are invalidated.
    pub(crate) fn remove_subtree(&mut self, root: &Location) -> usize {
        if self.is_hidden(root) {
            return 0;
        }
        let protected = self.hidden_below(root);
        let doomed: Vec<Location> = self
            .subtree_keys(root)
            .into_iter()
            .filter(|location| !protected.iter().any(|hidden| hidden.contains(location)))
            .collect();

        let mut removed = 0;
        for location in &doomed {
            let Some(node) = self.nodes.remove(location) else {
                continue;
            };
            removed += 1;
            let readers = self.dependencies.take_all_dependents(location);
            let mut aggregators = Vec::new();
            for kind in node.kinds() {
                aggregators.extend(self.take_subtree_readers(location, kind));
            }
            self.dependencies.forget_consumer(location);
            let cause = InvalidationCause::Collected {
                producer: location.clone(),
            };
            for consumer in readers {
                self.invalidate(&consumer, cause.clone());
            }
            for consumer in aggregators {
                self.invalidate_output_reader(&consumer, cause.clone());
            }
        }
        self.revision.bump();
        log::debug!("collected {removed} locations under {root}");
        removed
    }

    /// Collects every queued subtree.
    pub(crate) fn collect_garbage(&mut self) -> usize {
        let queued = mem::take(&mut self.garbage);
        queued
            .iter()
            .map(|location| self.remove_subtree(location))
            .sum()
    }

    /// Collects the queued children of `parent` ahead of its expansion.
    ///
    /// A queued location is never revived: if `parent` produces it again, it
    /// starts out empty, as it would have under eager collection.
    pub(crate) fn collect_stale_children(&mut self, parent: &Location) -> usize {
        let (stale, kept): (Vec<Location>, Vec<Location>) = mem::take(&mut self.garbage)
            .into_iter()
            .partition(|location| location.parent().as_ref() == Some(parent));
        self.garbage = kept;
        stale
            .iter()
            .map(|location| self.remove_subtree(location))
            .sum()
    }

    pub(crate) fn pending_garbage(&self) -> usize {
        self.garbage.len()
    }

    // --- external dependencies ---------------------------------------------

    /// Registers `watcher`, replacing any watcher of the same property.
    pub(crate) fn watch(&mut self, watcher: Watcher) {
        self.watchers
            .retain(|existing| !existing.observes(&watcher.location, &watcher.path));
        self.watchers.push(watcher);
    }

    pub(crate) fn is_watching(&self, location: &Location, path: &PropertyPath) -> bool {
        self.watchers
            .iter()
            .any(|watcher| watcher.observes(location, path))
    }

    /// Takes the watchers out for polling, dropping those whose location no
    /// longer observes anything.
    pub(crate) fn take_watchers(&mut self) -> Vec<Watcher> {
        let watchers = mem::take(&mut self.watchers);
        let (live, dead): (Vec<Watcher>, Vec<Watcher>) = watchers
            .into_iter()
            .partition(|watcher| dependency::is_live(self, watcher));
        if !dead.is_empty() {
            log::debug!("dropping {} watchers of collected locations", dead.len());
        }
        live
    }

    /// Puts polled watchers back, unless a property registered a new watcher
    /// in the meantime.
    pub(crate) fn restore_watchers(&mut self, mut polled: Vec<Watcher>) {
        polled.retain(|watcher| !self.is_watching(&watcher.location, &watcher.path));
        polled.append(&mut self.watchers);
        self.watchers = polled;
    }

    // --- aggregation --------------------------------------------------------

    /// Collects the outermost `E` elements strictly beneath `root`, in
    /// child order, skipping hidden subtrees.
    ///
    /// Only the children each location last expanded to are visited, so
    /// locations no longer produced contribute nothing, and neither do
    /// locations not expanded since their last change. Beneath a location
    /// carrying `E`, nothing further is collected.
    pub(crate) fn frontier<E: Element>(&self, root: &Location) -> Vec<E> {
        let mut found = Vec::new();
        let mut pending = self.last_expansion(root);
        pending.reverse();
        while let Some(location) = pending.pop() {
            if self.hidden.contains(&location) {
                continue;
            }
            let Some(node) = self.nodes.get(&location) else {
                continue;
            };
            if let Some(element) = node.element::<E>() {
                found.push(element.clone());
            } else if let Some(LastExpansion(children)) = node.element::<LastExpansion>() {
                pending.extend(children.iter().rev().cloned());
            }
        }
        found
    }

    fn last_expansion(&self, location: &Location) -> Vec<Location> {
        self.element::<LastExpansion>(location)
            .map(|LastExpansion(children)| children)
            .unwrap_or_default()
    }
}
