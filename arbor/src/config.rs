// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Graph configuration.

use crate::component::IntoComponent;
use crate::error::RenderResult;
use crate::graph::ShadowGraph;
use crate::shadow::Shadow;

/// When locations that are no longer produced by their parent are dropped.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum GarbageCollection {
    /// Drop them as soon as the parent is re-expanded.
    #[default]
    Eager,
    /// Queue them until [`ShadowGraph::collect_garbage`] is called, or until
    /// their parent is expanded again.
    ///
    /// Queued locations are never revived. A location its parent produces
    /// again starts out empty, just as under [`Eager`](Self::Eager).
    Deferred,
}

/// Options for a [`ShadowGraph`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct GraphConfig {
    /// Garbage collection policy.
    pub garbage_collection: GarbageCollection,
    /// Record why each location was invalidated.
    ///
    /// See [`ShadowGraph::explain_invalidation`].
    pub trace_invalidations: bool,
}

/// Builder for a configured [`ShadowGraph`].
///
/// # Example
///
/// ```rust
/// use arbor::{Empty, GarbageCollection, IntoComponent, ShadowGraph};
///
/// let graph = ShadowGraph::builder()
///     .garbage_collection(GarbageCollection::Deferred)
///     .trace_invalidations(true)
///     .build(Empty);
/// assert!(graph.config().trace_invalidations);
/// ```
#[derive(Clone, Debug, Default)]
pub struct GraphBuilder {
    config: GraphConfig,
}

impl GraphBuilder {
    /// Creates a builder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the garbage collection policy.
    #[must_use]
    pub fn garbage_collection(mut self, policy: GarbageCollection) -> Self {
        self.config.garbage_collection = policy;
        self
    }

    /// Enables or disables invalidation tracing.
    #[must_use]
    pub fn trace_invalidations(mut self, enabled: bool) -> Self {
        self.config.trace_invalidations = enabled;
        self
    }

    /// Returns the configuration built so far.
    #[must_use]
    pub fn config(&self) -> GraphConfig {
        self.config
    }

    /// Creates a graph for `root` without rendering anything yet.
    #[must_use]
    pub fn build(self, root: impl IntoComponent) -> ShadowGraph {
        ShadowGraph::with_config(root.into_any(), self.config)
    }

    /// Creates a graph for `root` and renders the root.
    pub async fn render(self, root: impl IntoComponent) -> RenderResult<Shadow> {
        self.build(root).root().await
    }
}
