// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Selectors: composable queries over rendered components.
//!
//! A selector starts from a subject shadow and streams the shadows it
//! selects. Selectors are built from [`SubjectSelector`] or [`RootSelector`]
//! and refined with the combinators on [`Selector`]:
//!
//! ```rust
//! use arbor::{Body, Component, Group, IntoComponent, Selector, ShadowGraph, SubjectSelector, ready};
//! use futures::executor::block_on;
//!
//! #[derive(Clone)]
//! struct Leaf(u32);
//!
//! impl Component for Leaf {
//!     fn body(&self) -> Body<'_> {
//!         ready(arbor::Empty)
//!     }
//! }
//!
//! block_on(async {
//!     let tree = Group::new([Leaf(1).into_any(), Leaf(2).into_any(), Leaf(3).into_any()]);
//!     let root = ShadowGraph::render(tree).await.unwrap();
//!     let selector = SubjectSelector
//!         .children()
//!         .typed::<Leaf>()
//!         .filter(|leaf| leaf.subject_as::<Leaf>().is_some_and(|leaf| leaf.0 > 1));
//!     let selected = root.select_list(&selector).await.unwrap();
//!     assert_eq!(selected.len(), 2);
//! });
//! ```
//!
//! Selection renders what it visits, like the traversals on
//! [`Shadow`] it is built on.

use core::fmt;
use core::marker::PhantomData;
use core::ops::Range;

use futures::future;
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};

use crate::component::Component;
use crate::error::RenderResult;
use crate::shadow::Shadow;

/// A query that selects components relative to a subject.
pub trait Selector: Send + Sync {
    /// Streams the components selected for `subject`, in order.
    fn select<'a>(&'a self, subject: &'a Shadow) -> BoxStream<'a, RenderResult<Shadow>>;

    /// Selects the children of the selected components.
    fn children(self) -> ChildSelector<Self>
    where
        Self: Sized,
    {
        ChildSelector { parents: self }
    }

    /// Selects the parents of the selected components.
    fn parents(self) -> ParentSelector<Self>
    where
        Self: Sized,
    {
        ParentSelector { children: self }
    }

    /// Selects the siblings `offset` places after the selected components;
    /// negative offsets select preceding siblings.
    fn sibling(self, offset: isize) -> SiblingSelector<Self>
    where
        Self: Sized,
    {
        SiblingSelector {
            siblings: self,
            offset,
        }
    }

    /// Selects the siblings right before the selected components.
    fn predecessor(self) -> SiblingSelector<Self>
    where
        Self: Sized,
    {
        self.sibling(-1)
    }

    /// Selects the siblings right after the selected components.
    fn successor(self) -> SiblingSelector<Self>
    where
        Self: Sized,
    {
        self.sibling(1)
    }

    /// Selects the component at position `index` of the selection.
    fn at(self, index: usize) -> IndexSelector<Self>
    where
        Self: Sized,
    {
        self.range(index..index.saturating_add(1))
    }

    /// Selects the components at the positions in `range` of the selection.
    fn range(self, range: Range<usize>) -> IndexSelector<Self>
    where
        Self: Sized,
    {
        IndexSelector {
            candidates: self,
            range,
        }
    }

    /// Selects the selected components that are a `C`.
    fn typed<C: Component>(self) -> TypeSelector<Self, C>
    where
        Self: Sized,
    {
        TypeSelector {
            candidates: self,
            component: PhantomData,
        }
    }

    /// Selects the selected components for which `predicate` holds.
    fn filter<F>(self, predicate: F) -> PredicateSelector<Self, F>
    where
        Self: Sized,
        F: Fn(&Shadow) -> bool + Send + Sync,
    {
        PredicateSelector {
            candidates: self,
            predicate,
        }
    }
}

/// Selects the subject itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct SubjectSelector;

impl Selector for SubjectSelector {
    fn select<'a>(&'a self, subject: &'a Shadow) -> BoxStream<'a, RenderResult<Shadow>> {
        stream::once(future::ready(Ok(subject.clone()))).boxed()
    }
}

/// Selects the root of the subject's graph.
#[derive(Clone, Copy, Debug, Default)]
pub struct RootSelector;

impl Selector for RootSelector {
    fn select<'a>(&'a self, subject: &'a Shadow) -> BoxStream<'a, RenderResult<Shadow>> {
        stream::once(subject.graph().root()).boxed()
    }
}

/// Selects the children of the components another selector selects.
#[derive(Clone, Debug)]
pub struct ChildSelector<S> {
    parents: S,
}

impl<S: Selector> Selector for ChildSelector<S> {
    fn select<'a>(&'a self, subject: &'a Shadow) -> BoxStream<'a, RenderResult<Shadow>> {
        self.parents
            .select(subject)
            .map_ok(Shadow::into_children)
            .try_flatten()
            .boxed()
    }
}

/// Selects the parents of the components another selector selects.
///
/// The parent is the nearest non-foundational ancestor, or the root if there
/// is none. The root has no parent and contributes nothing.
#[derive(Clone, Debug)]
pub struct ParentSelector<S> {
    children: S,
}

impl<S: Selector> Selector for ParentSelector<S> {
    fn select<'a>(&'a self, subject: &'a Shadow) -> BoxStream<'a, RenderResult<Shadow>> {
        self.children
            .select(subject)
            .try_filter_map(|child| async move { enclosing(&child).await })
            .boxed()
    }
}

/// Selects siblings at a fixed offset from the components another selector
/// selects.
///
/// Siblings are the children of the same parent, as listed by
/// [`Shadow::children`]. Offsets past either end select nothing.
#[derive(Clone, Debug)]
pub struct SiblingSelector<S> {
    siblings: S,
    offset: isize,
}

impl<S: Selector> Selector for SiblingSelector<S> {
    fn select<'a>(&'a self, subject: &'a Shadow) -> BoxStream<'a, RenderResult<Shadow>> {
        let offset = self.offset;
        self.siblings
            .select(subject)
            .try_filter_map(move |sibling| sibling_at(sibling, offset))
            .boxed()
    }
}

/// Returns the shadow whose children include `shadow`.
async fn enclosing(shadow: &Shadow) -> RenderResult<Option<Shadow>> {
    if let Some(parent) = shadow.parent().await? {
        return Ok(Some(parent));
    }
    if shadow.location().is_anchor() {
        return Ok(None);
    }
    // Children of a foundational root have no non-foundational ancestor.
    let root = shadow.graph().root().await?;
    Ok(root.subject().is_foundational().then_some(root))
}

async fn sibling_at(sibling: Shadow, offset: isize) -> RenderResult<Option<Shadow>> {
    let Some(parent) = enclosing(&sibling).await? else {
        return Ok(None);
    };
    let siblings = parent.child_list().await?;
    Ok(siblings
        .iter()
        .position(|candidate| candidate.location() == sibling.location())
        .and_then(|index| index.checked_add_signed(offset))
        .and_then(|index| siblings.into_iter().nth(index)))
}

/// Selects the components at a range of positions among those another
/// selector selects.
#[derive(Clone, Debug)]
pub struct IndexSelector<S> {
    candidates: S,
    range: Range<usize>,
}

impl<S: Selector> Selector for IndexSelector<S> {
    fn select<'a>(&'a self, subject: &'a Shadow) -> BoxStream<'a, RenderResult<Shadow>> {
        self.candidates
            .select(subject)
            .skip(self.range.start)
            .take(self.range.len())
            .boxed()
    }
}

/// Selects the components of type `C` among those another selector selects.
pub struct TypeSelector<S, C> {
    candidates: S,
    component: PhantomData<fn() -> C>,
}

impl<S: Selector, C: Component> Selector for TypeSelector<S, C> {
    fn select<'a>(&'a self, subject: &'a Shadow) -> BoxStream<'a, RenderResult<Shadow>> {
        self.candidates
            .select(subject)
            .try_filter(|candidate| future::ready(candidate.is::<C>()))
            .boxed()
    }
}

impl<S: Clone, C> Clone for TypeSelector<S, C> {
    fn clone(&self) -> Self {
        Self {
            candidates: self.candidates.clone(),
            component: PhantomData,
        }
    }
}

impl<S: fmt::Debug, C> fmt::Debug for TypeSelector<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSelector")
            .field("candidates", &self.candidates)
            .field("component", &core::any::type_name::<C>())
            .finish()
    }
}

/// Selects the components for which a predicate holds among those another
/// selector selects.
#[derive(Clone)]
pub struct PredicateSelector<S, F> {
    candidates: S,
    predicate: F,
}

impl<S, F> Selector for PredicateSelector<S, F>
where
    S: Selector,
    F: Fn(&Shadow) -> bool + Send + Sync,
{
    fn select<'a>(&'a self, subject: &'a Shadow) -> BoxStream<'a, RenderResult<Shadow>> {
        self.candidates
            .select(subject)
            .try_filter(|candidate| future::ready((self.predicate)(candidate)))
            .boxed()
    }
}

impl<S: fmt::Debug, F> fmt::Debug for PredicateSelector<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateSelector")
            .field("candidates", &self.candidates)
            .finish_non_exhaustive()
    }
}
