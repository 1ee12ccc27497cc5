// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The shadow graph handle.

use core::any::Any;
use core::fmt;
use std::sync::Arc;

use arbor_dirty::{InvalidationCause, Revision};
use arbor_location::Location;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use parking_lot::{Mutex, MutexGuard};

use crate::component::{AnyComponent, IntoComponent};
use crate::config::{GraphBuilder, GraphConfig};
use crate::dependency;
use crate::element::{Element, ElementKind};
use crate::error::RenderResult;
use crate::property::PropertyPath;
use crate::render;
use crate::shadow::Shadow;
use crate::state;
use crate::store::Store;

/// A change requested from outside a render, applied at the next graph entry.
pub(crate) enum Mutation {
    /// A [`State`](crate::State) was assigned.
    State {
        location: Location,
        path: PropertyPath,
        value: Arc<dyn Any + Send + Sync>,
    },
    /// An observed [`Dependency`](crate::Dependency) changed.
    Dependency {
        location: Location,
        path: PropertyPath,
        change: Arc<dyn Any + Send + Sync>,
    },
}

struct Shared {
    store: Mutex<Store>,
    sender: UnboundedSender<Mutation>,
    receiver: Mutex<UnboundedReceiver<Mutation>>,
}

/// A lazily rendered component tree together with everything derived from it.
///
/// The graph renders a location the first time something asks for it, and
/// keeps the result until something the rendering read is written. Cloning
/// the graph is cheap and yields another handle to the same graph.
///
/// # Example
///
/// ```rust
/// use arbor::{Body, Component, Group, IntoComponent, ShadowGraph, ready};
/// use futures::TryStreamExt;
/// use futures::executor::block_on;
///
/// #[derive(Clone)]
/// struct Leaf(u32);
///
/// impl Component for Leaf {
///     fn body(&self) -> Body<'_> {
///         ready(arbor::Empty)
///     }
/// }
///
/// #[derive(Clone)]
/// struct Pair;
///
/// impl Component for Pair {
///     fn body(&self) -> Body<'_> {
///         ready(Group::new([Leaf(1).into_any(), Leaf(2).into_any()]))
///     }
/// }
///
/// block_on(async {
///     let root = ShadowGraph::render(Pair).await.unwrap();
///     let leaves: Vec<u32> = root
///         .children()
///         .map_ok(|leaf| leaf.subject_as::<Leaf>().map_or(0, |leaf| leaf.0))
///         .try_collect()
///         .await
///         .unwrap();
///     assert_eq!(leaves, [1, 2]);
/// });
/// ```
#[derive(Clone)]
pub struct ShadowGraph {
    shared: Arc<Shared>,
}

impl ShadowGraph {
    /// Creates a graph for `root` with the default configuration.
    ///
    /// Nothing is rendered until a shadow is requested.
    #[must_use]
    pub fn new(root: impl IntoComponent) -> Self {
        Self::with_config(root.into_any(), GraphConfig::default())
    }

    /// Creates a graph for `root` with `config`.
    #[must_use]
    pub fn with_config(root: AnyComponent, config: GraphConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded();
        Self {
            shared: Arc::new(Shared {
                store: Mutex::new(Store::new(root, config)),
                sender,
                receiver: Mutex::new(receiver),
            }),
        }
    }

    /// Returns a builder for a configured graph.
    #[must_use]
    pub fn builder() -> GraphBuilder {
        GraphBuilder::new()
    }

    /// Creates a graph for `root` and renders the root.
    pub async fn render(root: impl IntoComponent) -> RenderResult<Shadow> {
        Self::new(root).root().await
    }

    /// Returns the shadow of the root component, rendering it if needed.
    pub async fn root(&self) -> RenderResult<Shadow> {
        self.shadow(Location::anchor()).await
    }

    /// Returns the shadow of the component at `location`, rendering it if needed.
    ///
    /// # Panics
    ///
    /// Panics if neither `location` nor its parent are rendered: locations
    /// are discovered top-down, through [`Shadow::children`].
    pub async fn shadow(&self, location: Location) -> RenderResult<Shadow> {
        self.apply_pending_mutations();
        let subject = render::render_if_needed(self, &location).await?;
        Ok(Shadow::new(self.clone(), location, subject))
    }

    /// Returns the configuration the graph was created with.
    #[must_use]
    pub fn config(&self) -> GraphConfig {
        self.lock().config()
    }

    /// Returns the current revision, advanced by every change to the graph.
    #[must_use]
    pub fn revision(&self) -> Revision {
        self.lock().revision()
    }

    /// Returns the number of locations with stored content.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing is stored yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the component rendered at `location`, without rendering anything.
    #[must_use]
    pub fn component(&self, location: &Location) -> Option<AnyComponent> {
        self.apply_pending_mutations();
        self.lock().component(location)
    }

    /// Returns `true` if a component is rendered at `location`.
    #[must_use]
    pub fn is_rendered(&self, location: &Location) -> bool {
        self.apply_pending_mutations();
        self.lock().is_rendered(location)
    }

    /// Returns the `E` element at `location`.
    ///
    /// The read is not recorded: use [`Shadow::element`] from within renders.
    #[must_use]
    pub fn element<E: Element>(&self, location: &Location) -> Option<E> {
        self.apply_pending_mutations();
        self.lock().element(location)
    }

    /// Stores `value` at `location`, invalidating every location that read
    /// the `E` element there.
    pub fn set_element<E: Element>(&self, location: Location, value: E) {
        self.apply_pending_mutations();
        self.lock().write(location, value);
    }

    /// Like [`set_element`](Self::set_element), but leaves readers alone if
    /// the stored value is equal to `value`.
    ///
    /// Returns `true` if `value` was stored.
    pub fn set_element_if_changed<E: Element + PartialEq>(&self, location: Location, value: E) -> bool {
        self.apply_pending_mutations();
        self.lock().write_if_changed(location, value)
    }

    /// Stores `value` at `location` without invalidating its readers.
    ///
    /// Meant for memoizing values computed from what the readers depend on
    /// anyway.
    pub fn cache_element<E: Element>(&self, location: Location, value: E) {
        self.apply_pending_mutations();
        self.lock().cache(location, value);
    }

    /// Removes the `E` element at `location`, invalidating its readers.
    pub fn remove_element<E: Element>(&self, location: &Location) -> Option<E> {
        self.apply_pending_mutations();
        self.lock().remove_element(location)
    }

    /// Drops the rendered component at `location` and everything beneath it.
    ///
    /// Persistent elements, such as state, survive. The next request renders
    /// the location anew from its parent.
    pub fn invalidate(&self, location: &Location) {
        self.apply_pending_mutations();
        self.lock().invalidate(location, InvalidationCause::Requested);
    }

    /// Hides or reveals the subtree at `location`.
    ///
    /// Hidden subtrees are neither invalidated nor collected with their
    /// ancestors, and preference aggregation skips them.
    pub fn set_hidden(&self, location: Location, hidden: bool) {
        self.lock().set_hidden(location, hidden);
    }

    /// Returns `true` if `location` lies within a hidden subtree.
    #[must_use]
    pub fn is_hidden(&self, location: &Location) -> bool {
        self.lock().is_hidden(location)
    }

    /// Removes the stale subtrees queued under
    /// [`GarbageCollection::Deferred`](crate::GarbageCollection::Deferred).
    ///
    /// Hidden subtrees are kept. Returns the number of locations removed.
    pub fn collect_garbage(&self) -> usize {
        self.apply_pending_mutations();
        self.lock().collect_garbage()
    }

    /// Returns why the component at `location` was last invalidated.
    ///
    /// Requires [`GraphConfig::trace_invalidations`].
    #[must_use]
    pub fn invalidation_cause(
        &self,
        location: &Location,
    ) -> Option<InvalidationCause<Location, ElementKind>> {
        self.lock().invalidation_cause(location)
    }

    /// Returns the chain of locations from the originating write to `location`.
    ///
    /// Requires [`GraphConfig::trace_invalidations`].
    #[must_use]
    pub fn explain_invalidation(&self, location: &Location) -> Option<Vec<Location>> {
        self.lock().explain_invalidation(location)
    }

    /// Applies state assignments and dependency changes made since the last
    /// graph access.
    ///
    /// Every other entry point calls this first, so calling it directly is
    /// only needed to observe invalidations eagerly. Dependency streams are
    /// polled without blocking: changes that are not ready yet are picked up
    /// by a later call. Returns the number of mutations applied.
    pub fn apply_pending_mutations(&self) -> usize {
        self.poll_dependencies();
        let mut receiver = self.shared.receiver.lock();
        let mut applied = 0;
        while let Ok(mutation) = receiver.try_recv() {
            match mutation {
                Mutation::State {
                    location,
                    path,
                    value,
                } => state::apply(&mut self.lock(), location, &path, value),
                Mutation::Dependency {
                    location,
                    path,
                    change,
                } => dependency::apply(&mut self.lock(), location, &path, change),
            }
            applied += 1;
        }
        if applied > 0 {
            log::debug!("applied {applied} pending mutations");
        }
        applied
    }

    /// Forwards ready dependency changes to the mutation channel.
    ///
    /// Streams are polled outside the store lock.
    fn poll_dependencies(&self) {
        let mut watchers = self.lock().take_watchers();
        if watchers.is_empty() {
            return;
        }
        watchers.retain_mut(|watcher| watcher.poll(&self.shared.sender));
        self.lock().restore_watchers(watchers);
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Store> {
        self.shared.store.lock()
    }

    pub(crate) fn sender(&self) -> UnboundedSender<Mutation> {
        self.shared.sender.clone()
    }
}

impl fmt::Debug for ShadowGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.lock();
        f.debug_struct("ShadowGraph")
            .field("locations", &store.len())
            .field("revision", &store.revision())
            .finish_non_exhaustive()
    }
}
