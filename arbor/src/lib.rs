// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arbor: a shadow graph for incrementally rendering declarative component trees.
//!
//! Clients describe what they want as a tree of immutable [`Component`]s. The
//! [`ShadowGraph`] renders that tree lazily, one location at a time, and keeps
//! the rendered components together with whatever was derived from them. When
//! something a render read is written, exactly the locations that read it are
//! invalidated and rendered again on the next request.
//!
//! - **Components** ([`Component`], [`AnyComponent`]): user-defined values that
//!   evaluate to a body, plus the [foundational primitives](Foundational)
//!   ([`Empty`], [`Group`], [`Either`], [`ForEach`], [`Modified`]) that the
//!   graph expands itself. Primitives never show up in client-facing
//!   traversals.
//! - **Locations** ([`Location`], [`Direction`]): stable structural addresses.
//!   Positions in groups and identifiers in [`ForEach`] make a component keep
//!   its location, and thus its state, when unrelated siblings change.
//! - **Shadows** ([`Shadow`]): the view on a rendered location, used to walk
//!   the tree and to read and write [`Element`]s.
//! - **Dynamic properties** ([`DynamicProperty`]): component fields whose
//!   value comes from the graph. Built in are [`State`], [`Contextual`] for
//!   top-down context, [`Preferred`] for bottom-up preferences,
//!   [`Observed`] for external [`Dependency`] streams, and
//!   [`StructuralIdentifier`].
//! - **Selectors** ([`Selector`]): composable queries such as "the second
//!   child of each parent of the subject", streamed over shadows.
//!
//! ## Quick Start
//!
//! ```rust
//! use arbor::{Body, Component, ForEach, PropertyField, ShadowGraph, State, ready};
//! use futures::executor::block_on;
//!
//! #[derive(Clone)]
//! struct Item(&'static str);
//!
//! impl Component for Item {
//!     fn body(&self) -> Body<'_> {
//!         ready(arbor::Empty)
//!     }
//! }
//!
//! #[derive(Clone)]
//! struct List {
//!     items: Vec<&'static str>,
//!     selection: State<Option<usize>>,
//! }
//!
//! impl Component for List {
//!     fn body(&self) -> Body<'_> {
//!         ready(ForEach::new(self.items.clone(), |item| *item, |item| Item(*item)))
//!     }
//!
//!     fn properties(&mut self) -> Vec<PropertyField<'_>> {
//!         vec![PropertyField::new("selection", &mut self.selection)]
//!     }
//! }
//!
//! block_on(async {
//!     let list = List {
//!         items: vec!["apples", "pears"],
//!         selection: State::new(None),
//!     };
//!     let graph = ShadowGraph::new(list);
//!     let root = graph.root().await.unwrap();
//!
//!     let items = root.child_list().await.unwrap();
//!     assert_eq!(items.len(), 2);
//!     assert_eq!(items[1].subject_as::<Item>().unwrap().0, "pears");
//!
//!     // Unchanged locations are not rendered again.
//!     let again = graph.root().await.unwrap();
//!     assert!(again.subject().ptr_eq(root.subject()));
//! });
//! ```
//!
//! ## Invalidation
//!
//! Reads through the shadows handed to dynamic properties and modifiers are
//! recorded. Writing an element, e.g. assigning state, drops the rendered
//! component of every location that read it, along with everything beneath
//! those locations. Persistent elements such as state survive; see
//! [`Lifetime`]. [`GraphConfig::trace_invalidations`] records why each
//! location was invalidated.

mod component;
mod config;
mod context;
mod dependency;
mod element;
mod error;
mod functor;
mod graph;
mod identity;
mod modifier;
mod preference;
mod primitives;
mod property;
mod render;
mod selector;
mod shadow;
mod state;
mod store;

pub use arbor_dirty::{InvalidationCause, Revision};
pub use arbor_location::{AnyIdentifier, Direction, Identifier, Location};

pub use component::{AnyComponent, Body, Component, IntoComponent, ready};
pub use config::{GarbageCollection, GraphBuilder, GraphConfig};
pub use context::{Context, ContextKey, ContextModifier, Contextual};
pub use dependency::{Dependency, Observed};
pub use element::{Element, ElementKind, Lifetime};
pub use error::{RenderError, RenderResult};
pub use functor::{ShadowFunctor, TypeDispatch};
pub use graph::ShadowGraph;
pub use identity::StructuralIdentifier;
pub use modifier::Modifier;
pub use preference::{Preference, PreferenceModifier, Preferred};
pub use primitives::{Either, Empty, ForEach, Foundational, Group, Modified, optional};
pub use property::{DynamicProperty, PropertyField, PropertyPath};
pub use selector::{
    ChildSelector, IndexSelector, ParentSelector, PredicateSelector, RootSelector, Selector,
    SiblingSelector, SubjectSelector, TypeSelector,
};
pub use shadow::Shadow;
pub use state::{Binding, State};
