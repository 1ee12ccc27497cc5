// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! External dependencies: values tracked outside the graph.

use core::any::Any;
use core::fmt;
use std::sync::Arc;

use arbor_location::Location;
use futures::channel::mpsc::UnboundedSender;
use futures::future::{self, BoxFuture};
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use hashbrown::HashMap;

use crate::element::{Element, Lifetime};
use crate::error::RenderResult;
use crate::graph::Mutation;
use crate::property::{DynamicProperty, PropertyPath};
use crate::shadow::Shadow;
use crate::store::Store;

type SharedChange = Arc<dyn Any + Send + Sync>;

/// A source of changes outside the graph that components can depend on.
///
/// Components observe a dependency through an [`Observed`] property. Every
/// change the stream yields re-renders the observing component at the next
/// graph access.
pub trait Dependency: Send + Sync + 'static {
    /// What a change reports.
    type Change: Clone + Send + Sync + 'static;

    /// Returns a stream of changes to the tracked value.
    ///
    /// Called once per observing location. The location stops observing when
    /// the stream ends.
    fn changes(&self) -> BoxStream<'static, Self::Change>;
}

/// What one location has seen of each dependency it observes.
#[derive(Clone, Default)]
pub(crate) struct Observations {
    seen: HashMap<PropertyPath, Seen>,
}

#[derive(Clone, Default)]
struct Seen {
    changes: u64,
    latest: Option<SharedChange>,
}

impl Element for Observations {
    const LIFETIME: Lifetime = Lifetime::Persistent;
}

impl fmt::Debug for Observations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.seen.iter().map(|(path, seen)| (path, seen.changes)))
            .finish()
    }
}

/// A change stream feeding one observing property.
pub(crate) struct Watcher {
    pub(crate) location: Location,
    pub(crate) path: PropertyPath,
    changes: BoxStream<'static, SharedChange>,
}

impl Watcher {
    pub(crate) fn observes(&self, location: &Location, path: &PropertyPath) -> bool {
        self.location == *location && self.path == *path
    }

    /// Follows its location when the subtree at `from` moves to `to`.
    pub(crate) fn rebase(&mut self, from: &Location, to: &Location) {
        if let Some(relative) = self.location.relative_to(from) {
            self.location = to.rebase(&relative);
        }
    }

    /// Forwards the changes that are ready to `sink`.
    ///
    /// Returns `false` once the stream has ended or the graph is gone.
    pub(crate) fn poll(&mut self, sink: &UnboundedSender<Mutation>) -> bool {
        loop {
            match self.changes.next().now_or_never() {
                None => return true,
                Some(None) => {
                    log::debug!("`{}` at {} stopped observing", self.path, self.location);
                    return false;
                }
                Some(Some(change)) => {
                    let mutation = Mutation::Dependency {
                        location: self.location.clone(),
                        path: self.path.clone(),
                        change,
                    };
                    if sink.unbounded_send(mutation).is_err() {
                        return false;
                    }
                }
            }
        }
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("location", &self.location)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Returns `true` if `watcher` still feeds an observing location.
///
/// Observations go away when their location is collected.
pub(crate) fn is_live(store: &Store, watcher: &Watcher) -> bool {
    store
        .element::<Observations>(&watcher.location)
        .is_some_and(|observations| observations.seen.contains_key(&watcher.path))
}

/// Records a change observed for `path` at `location`, re-rendering the
/// observer.
pub(crate) fn apply(store: &mut Store, location: Location, path: &PropertyPath, change: SharedChange) {
    let Some(mut observations) = store.element::<Observations>(&location) else {
        log::debug!("dropping change to `{path}` at {location}: no longer rendered");
        return;
    };
    let seen = observations.seen.entry(path.clone()).or_default();
    seen.changes += 1;
    seen.latest = Some(change);
    log::debug!("`{path}` at {location} changed");
    store.write(location, observations);
}

/// A component field that re-renders its component whenever a
/// [`Dependency`] changes.
///
/// # Example
///
/// ```rust
/// use arbor::{Body, Component, Dependency, Observed, PropertyField, ready};
/// use futures::StreamExt;
/// use futures::stream::{self, BoxStream};
///
/// struct Clock;
///
/// impl Dependency for Clock {
///     type Change = u64;
///
///     fn changes(&self) -> BoxStream<'static, u64> {
///         stream::iter([1, 2, 3]).boxed()
///     }
/// }
///
/// #[derive(Clone)]
/// struct Face {
///     clock: Observed<Clock>,
/// }
///
/// impl Component for Face {
///     fn body(&self) -> Body<'_> {
///         let _tick = self.clock.latest().copied().unwrap_or_default();
///         ready(arbor::Empty)
///     }
///
///     fn properties(&mut self) -> Vec<PropertyField<'_>> {
///         vec![PropertyField::new("clock", &mut self.clock)]
///     }
/// }
/// ```
pub struct Observed<D: Dependency> {
    dependency: Arc<D>,
    changes: u64,
    latest: Option<D::Change>,
}

impl<D: Dependency> Observed<D> {
    /// Observes `dependency`.
    #[must_use]
    pub fn new(dependency: D) -> Self {
        Self::shared(Arc::new(dependency))
    }

    /// Observes a dependency shared with other components.
    #[must_use]
    pub fn shared(dependency: Arc<D>) -> Self {
        Self {
            dependency,
            changes: 0,
            latest: None,
        }
    }

    /// Returns the observed dependency.
    #[must_use]
    pub fn dependency(&self) -> &D {
        &self.dependency
    }

    /// Returns how many changes the component has seen as of this render.
    #[must_use]
    pub fn changes(&self) -> u64 {
        self.changes
    }

    /// Returns the most recent change seen as of this render.
    #[must_use]
    pub fn latest(&self) -> Option<&D::Change> {
        self.latest.as_ref()
    }
}

impl<D: Dependency> Clone for Observed<D> {
    fn clone(&self) -> Self {
        Self {
            dependency: self.dependency.clone(),
            changes: self.changes,
            latest: self.latest.clone(),
        }
    }
}

impl<D: Dependency> fmt::Debug for Observed<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observed")
            .field("dependency", &core::any::type_name::<D>())
            .field("changes", &self.changes)
            .finish_non_exhaustive()
    }
}

impl<D: Dependency> DynamicProperty for Observed<D> {
    fn update<'a>(
        &'a mut self,
        shadow: &'a Shadow,
        path: &'a PropertyPath,
    ) -> BoxFuture<'a, RenderResult<()>> {
        let location = shadow.location();
        let mut store = shadow.graph().lock();
        let observations = store.read::<Observations>(location, shadow.consumer());
        let seen = observations
            .as_ref()
            .and_then(|observations| observations.seen.get(path))
            .cloned();
        if seen.is_none() {
            let mut observations = observations.unwrap_or_default();
            observations.seen.insert(path.clone(), Seen::default());
            store.cache(location.clone(), observations);
        }
        // Moved locations bring their watcher along.
        let watching = store.is_watching(location, path);
        drop(store);

        if !watching {
            let changes = self
                .dependency
                .changes()
                .map(|change| Arc::new(change) as SharedChange)
                .boxed();
            shadow.graph().lock().watch(Watcher {
                location: location.clone(),
                path: path.clone(),
                changes,
            });
        }

        let seen = seen.unwrap_or_default();
        self.changes = seen.changes;
        self.latest = seen
            .latest
            .and_then(|change| change.downcast_ref::<D::Change>().cloned());
        future::ready(Ok(())).boxed()
    }
}
