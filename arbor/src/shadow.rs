// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A view of one rendered location.

use core::fmt;

use arbor_location::Location;
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt, TryStreamExt};

use crate::component::{AnyComponent, Component};
use crate::context::{self, Context, ContextKey};
use crate::element::Element;
use crate::error::{RenderError, RenderResult};
use crate::functor::ShadowFunctor;
use crate::graph::ShadowGraph;
use crate::preference::{Assigned, Preference};
use crate::render;
use crate::selector::Selector;

/// A rendered component together with its location in a [`ShadowGraph`].
///
/// Shadows handed to dynamic properties and modifiers are *tracked*: element
/// reads through them are recorded on behalf of the location being rendered,
/// so that writing what was read re-renders that location. Shadows obtained
/// from the graph directly are not tracked.
///
/// A shadow is a snapshot. After the graph changes, [`refresh`](Self::refresh)
/// returns the current shadow at the same location.
#[derive(Clone)]
pub struct Shadow {
    graph: ShadowGraph,
    location: Location,
    subject: AnyComponent,
    consumer: Option<Location>,
}

impl Shadow {
    pub(crate) fn new(graph: ShadowGraph, location: Location, subject: AnyComponent) -> Self {
        Self {
            graph,
            location,
            subject,
            consumer: None,
        }
    }

    /// A shadow whose reads are recorded on behalf of `consumer`.
    pub(crate) fn tracked(
        graph: ShadowGraph,
        location: Location,
        subject: AnyComponent,
        consumer: Location,
    ) -> Self {
        Self {
            graph,
            location,
            subject,
            consumer: Some(consumer),
        }
    }

    /// A shadow at another location, tracked like `self`.
    fn derive(&self, location: Location, subject: AnyComponent) -> Self {
        Self {
            graph: self.graph.clone(),
            location,
            subject,
            consumer: self.consumer.clone(),
        }
    }

    /// Returns the graph.
    #[must_use]
    pub fn graph(&self) -> &ShadowGraph {
        &self.graph
    }

    /// Returns the location of the subject.
    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Returns the rendered component.
    #[must_use]
    pub fn subject(&self) -> &AnyComponent {
        &self.subject
    }

    /// Returns the subject as a `C`, if it is one.
    #[must_use]
    pub fn subject_as<C: Component>(&self) -> Option<&C> {
        self.subject.downcast_ref()
    }

    /// Returns `true` if the subject is a `C`.
    #[must_use]
    pub fn is<C: Component>(&self) -> bool {
        self.subject.is::<C>()
    }

    /// Returns the location on whose behalf reads are recorded.
    pub(crate) fn consumer(&self) -> Option<&Location> {
        self.consumer.as_ref()
    }

    // --- navigation ---------------------------------------------------------

    /// Returns the nearest non-foundational ancestor.
    ///
    /// Returns `None` for the root and for shadows whose location is no
    /// longer produced.
    pub async fn parent(&self) -> RenderResult<Option<Self>> {
        for ancestor in self.location.ancestors() {
            let Some(component) = render::locate(&self.graph, &ancestor).await? else {
                return Ok(None);
            };
            if !component.is_foundational() {
                return Ok(Some(self.derive(ancestor, component)));
            }
        }
        Ok(None)
    }

    /// Streams the nearest non-foundational descendants, in order.
    ///
    /// Foundational children are expanded transparently: the children of a
    /// group are the group's elements, not the group.
    pub fn children(&self) -> BoxStream<'_, RenderResult<Self>> {
        self.clone().into_children()
    }

    /// Like [`children`](Self::children), but owns the parent.
    pub fn into_children(self) -> BoxStream<'static, RenderResult<Self>> {
        stream::try_unfold((self, None), |(parent, pending): (Self, Option<Vec<Location>>)| async move {
            let mut pending = match pending {
                Some(pending) => pending,
                None => {
                    let mut children = render::child_locations(&parent.graph, &parent.location).await?;
                    children.reverse();
                    children
                }
            };
            while let Some(location) = pending.pop() {
                let Some(component) = render::locate(&parent.graph, &location).await? else {
                    continue;
                };
                if component.is_foundational() {
                    let nested = render::expand(&parent.graph, &location, component).await?;
                    pending.extend(nested.into_iter().rev());
                } else {
                    let child = parent.derive(location, component);
                    return Ok(Some((child, (parent, Some(pending)))));
                }
            }
            Ok::<_, RenderError>(None)
        })
        .boxed()
    }

    /// Collects [`children`](Self::children).
    pub async fn child_list(&self) -> RenderResult<Vec<Self>> {
        self.children().try_collect().await
    }

    /// Collects the [`children`](Self::children) whose subject is a `C`.
    pub async fn children_of_type<C: Component>(&self) -> RenderResult<Vec<Self>> {
        self.children()
            .try_filter(|child| futures::future::ready(child.is::<C>()))
            .try_collect()
            .await
    }

    /// Returns the current shadow at this location, rendering it again if it
    /// was invalidated.
    ///
    /// Returns `None` if the location is no longer produced by its parent.
    pub async fn refresh(&self) -> RenderResult<Option<Self>> {
        self.graph.apply_pending_mutations();
        let located = render::locate(&self.graph, &self.location).await?;
        Ok(located.map(|subject| self.derive(self.location.clone(), subject)))
    }

    // --- elements -----------------------------------------------------------

    /// Returns the `E` element at this location, recording the read.
    #[must_use]
    pub fn element<E: Element>(&self) -> Option<E> {
        self.graph
            .lock()
            .read(&self.location, self.consumer.as_ref())
    }

    /// Returns the `E` element at this location without recording the read.
    #[must_use]
    pub fn peek<E: Element>(&self) -> Option<E> {
        self.graph.lock().element(&self.location)
    }

    /// Stores `value` at this location, invalidating its readers.
    pub fn update<E: Element>(&self, value: E) {
        self.graph.lock().write(self.location.clone(), value);
    }

    /// Stores `value` unless an equal value is stored already.
    ///
    /// Returns `true` if `value` was stored.
    pub fn update_if_changed<E: Element + PartialEq>(&self, value: E) -> bool {
        self.graph
            .lock()
            .write_if_changed(self.location.clone(), value)
    }

    /// Stores `value` without invalidating its readers.
    pub fn cache<E: Element>(&self, value: E) {
        self.graph.lock().cache(self.location.clone(), value);
    }

    /// Removes the `E` element at this location, invalidating its readers.
    pub fn remove<E: Element>(&self) -> Option<E> {
        self.graph.lock().remove_element(&self.location)
    }

    // --- context and preferences -------------------------------------------

    /// Returns the context in effect at this location.
    pub fn context(&self) -> Context {
        context::resolve(&mut self.graph.lock(), &self.location, self.consumer.as_ref())
    }

    /// Returns the context value for `K` in effect at this location.
    #[must_use]
    pub fn context_value<K: ContextKey>(&self) -> Option<K::Value> {
        self.context().get::<K>().cloned()
    }

    /// Returns the preference `P` of the subtree rooted here.
    ///
    /// A preference assigned at this location wins. Otherwise the preferences
    /// of the children are merged in order, skipping hidden children, and a
    /// subtree without children yields [`Preference::default_value`].
    ///
    /// Children are rendered as needed.
    pub fn preference<P: Preference>(&self) -> BoxFuture<'_, RenderResult<P>> {
        async move {
            if let Some(Assigned(value)) = self.element::<Assigned<P>>() {
                return Ok(value);
            }
            let mut merged: Option<P> = None;
            for child in self.child_list().await? {
                if child.is_hidden() {
                    continue;
                }
                let preference = child.preference::<P>().await?;
                merged = Some(match merged {
                    Some(merged) => merged.merge(&preference),
                    None => preference,
                });
            }
            Ok(merged.unwrap_or_else(P::default_value))
        }
        .boxed()
    }

    // --- visibility ---------------------------------------------------------

    /// Hides or reveals the subtree rooted here.
    ///
    /// See [`ShadowGraph::set_hidden`].
    pub fn set_hidden(&self, hidden: bool) {
        self.graph.set_hidden(self.location.clone(), hidden);
    }

    /// Returns `true` if this location lies within a hidden subtree.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.graph.is_hidden(&self.location)
    }

    // --- selection ----------------------------------------------------------

    /// Streams the components `selector` selects, starting from this shadow.
    pub fn select<'a, S: Selector + ?Sized>(&'a self, selector: &'a S) -> BoxStream<'a, RenderResult<Self>> {
        selector.select(self)
    }

    /// Collects [`select`](Self::select).
    pub async fn select_list<S: Selector + ?Sized>(&self, selector: &S) -> RenderResult<Vec<Self>> {
        selector.select(self).try_collect().await
    }

    /// Calls `functor` with this shadow.
    pub fn apply<F: ShadowFunctor>(&self, functor: &mut F) -> F::Output {
        functor.call(self)
    }
}

impl fmt::Debug for Shadow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shadow")
            .field("location", &self.location)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}
