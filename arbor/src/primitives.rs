// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The foundational primitives and their expansion protocol.
//!
//! Primitives have no body. Instead, the graph asks them which children they
//! have, relative to themselves, and for the component at each of those
//! relative locations:
//!
//! | Primitive | Children |
//! |---|---|
//! | [`Empty`] | none |
//! | [`Group`] | one positional child per element, in order |
//! | [`Either`] | position `0` for the first case, `1` for the second |
//! | [`ForEach`] | one identified child per element, at the element's index |
//! | [`Modified`] | the content, at `body` |

use core::fmt;
use std::sync::Arc;

use arbor_location::{AnyIdentifier, Direction, Identifier, Location};

use crate::component::{AnyComponent, Body, IntoComponent, ready};
use crate::modifier::Modifier;

/// What a primitive exposes to the graph instead of a body.
pub(crate) trait Expansion {
    /// Returns the child locations relative to the primitive, in order.
    fn child_locations(&self) -> Vec<Location>;

    /// Produces the child at `relative`, one of the [`child_locations`](Self::child_locations).
    fn child(&self, relative: &Direction) -> Option<Body<'_>>;
}

/// A component without content.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Empty;

impl Expansion for Empty {
    fn child_locations(&self) -> Vec<Location> {
        Vec::new()
    }

    fn child(&self, _: &Direction) -> Option<Body<'_>> {
        None
    }
}

/// An ordered sequence of components.
#[derive(Clone, Debug, Default)]
pub struct Group {
    children: Vec<AnyComponent>,
}

impl Group {
    /// Creates a group of `children`.
    #[must_use]
    pub fn new(children: impl IntoIterator<Item = AnyComponent>) -> Self {
        Self {
            children: children.into_iter().collect(),
        }
    }

    /// Appends a child.
    #[must_use]
    pub fn with(mut self, child: impl IntoComponent) -> Self {
        self.children.push(child.into_any());
        self
    }

    /// Returns the children.
    #[must_use]
    pub fn children(&self) -> &[AnyComponent] {
        &self.children
    }
}

impl Expansion for Group {
    fn child_locations(&self) -> Vec<Location> {
        let anchor = Location::anchor();
        (0..self.children.len()).map(|index| anchor.child(index)).collect()
    }

    fn child(&self, relative: &Direction) -> Option<Body<'_>> {
        match relative {
            Direction::Position(index) => self.children.get(*index).cloned().map(ready),
            _ => None,
        }
    }
}

/// One of two components.
///
/// The cases occupy different positions, so switching cases never carries
/// state from one case over to the other.
#[derive(Clone, Debug)]
pub enum Either {
    /// The first case, at position `0`.
    First(AnyComponent),
    /// The second case, at position `1`.
    Second(AnyComponent),
}

impl Either {
    /// Returns the first case if `condition` holds, the second otherwise.
    #[must_use]
    pub fn when(
        condition: bool,
        first: impl IntoComponent,
        second: impl IntoComponent,
    ) -> Self {
        if condition {
            Self::First(first.into_any())
        } else {
            Self::Second(second.into_any())
        }
    }

    fn position(&self) -> usize {
        match self {
            Self::First(_) => 0,
            Self::Second(_) => 1,
        }
    }

    fn content(&self) -> &AnyComponent {
        match self {
            Self::First(content) | Self::Second(content) => content,
        }
    }
}

impl Expansion for Either {
    fn child_locations(&self) -> Vec<Location> {
        vec![Location::anchor().child(self.position())]
    }

    fn child(&self, relative: &Direction) -> Option<Body<'_>> {
        (*relative == Direction::Position(self.position())).then(|| ready(self.content().clone()))
    }
}

/// Returns a component that shows `component` if present, and nothing otherwise.
#[must_use]
pub fn optional(component: Option<impl IntoComponent>) -> Either {
    match component {
        Some(component) => Either::First(component.into_any()),
        None => Either::Second(Empty.into_any()),
    }
}

type MakeChild = dyn Fn(usize) -> Option<Body<'static>> + Send + Sync;

/// One component per element of a collection.
///
/// Children are identified by the identifier computed for their element, so
/// reordering the collection moves each child's state along with it.
///
/// # Example
///
/// ```rust
/// use arbor::{Body, Component, ForEach, ready};
///
/// #[derive(Clone)]
/// struct Row(u32);
///
/// impl Component for Row {
///     fn body(&self) -> Body<'_> {
///         ready(arbor::Empty)
///     }
/// }
///
/// let rows = ForEach::new([3_u32, 1, 2], |id| *id, |id| Row(*id));
/// assert_eq!(rows.len(), 3);
/// ```
#[derive(Clone)]
pub struct ForEach {
    identifiers: Vec<AnyIdentifier>,
    make: Arc<MakeChild>,
}

impl ForEach {
    /// Creates one child per element of `data`.
    ///
    /// `id` computes each element's identifier and `make` its component.
    #[must_use]
    pub fn new<D, I, C>(
        data: impl IntoIterator<Item = D>,
        id: impl Fn(&D) -> I,
        make: impl Fn(&D) -> C + Send + Sync + 'static,
    ) -> Self
    where
        D: Send + Sync + 'static,
        I: Identifier,
        C: IntoComponent,
    {
        Self::new_async(data, id, move |element| ready(make(element)))
    }

    /// Like [`new`](Self::new), but `make` may suspend or fail.
    #[must_use]
    pub fn new_async<D, I>(
        data: impl IntoIterator<Item = D>,
        id: impl Fn(&D) -> I,
        make: impl Fn(&D) -> Body<'static> + Send + Sync + 'static,
    ) -> Self
    where
        D: Send + Sync + 'static,
        I: Identifier,
    {
        let data: Arc<[D]> = data.into_iter().collect();
        let identifiers = data.iter().map(|element| AnyIdentifier::new(id(element))).collect();
        Self {
            identifiers,
            make: Arc::new(move |index| data.get(index).map(&make)),
        }
    }

    /// Returns the number of children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    /// Returns `true` if there are no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Returns the children's identifiers, in order.
    #[must_use]
    pub fn identifiers(&self) -> &[AnyIdentifier] {
        &self.identifiers
    }

    fn index_of(&self, id: &AnyIdentifier, position: usize) -> Option<usize> {
        if self.identifiers.get(position) == Some(id) {
            return Some(position);
        }
        self.identifiers.iter().position(|candidate| candidate == id)
    }
}

impl fmt::Debug for ForEach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForEach")
            .field("identifiers", &self.identifiers)
            .finish_non_exhaustive()
    }
}

impl Expansion for ForEach {
    fn child_locations(&self) -> Vec<Location> {
        let anchor = Location::anchor();
        self.identifiers
            .iter()
            .enumerate()
            .map(|(position, id)| anchor.child_identified(id.clone(), position))
            .collect()
    }

    fn child(&self, relative: &Direction) -> Option<Body<'_>> {
        let Direction::Identified { id, position } = relative else {
            return None;
        };
        (self.make)(self.index_of(id, *position)?)
    }
}

/// A component with a [`Modifier`] applied to it.
///
/// The modifier reaches the non-foundational components of the content: if
/// the content is itself a primitive, such as a [`Group`], the modifier is
/// applied to each of its non-foundational descendants, stopping at nested
/// `Modified` components.
#[derive(Clone)]
pub struct Modified {
    content: AnyComponent,
    modifier: Arc<dyn Modifier>,
}

impl Modified {
    /// Applies `modifier` to `content`.
    #[must_use]
    pub fn new(content: impl IntoComponent, modifier: impl Modifier) -> Self {
        Self {
            content: content.into_any(),
            modifier: Arc::new(modifier),
        }
    }

    /// Returns the modified content.
    #[must_use]
    pub fn content(&self) -> &AnyComponent {
        &self.content
    }

    /// Returns the modifier.
    #[must_use]
    pub fn modifier(&self) -> &dyn Modifier {
        &*self.modifier
    }
}

impl fmt::Debug for Modified {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Modified")
            .field("content", &self.content)
            .field("modifier", &self.modifier.name())
            .finish()
    }
}

impl Expansion for Modified {
    fn child_locations(&self) -> Vec<Location> {
        vec![Location::anchor().body()]
    }

    fn child(&self, relative: &Direction) -> Option<Body<'_>> {
        (*relative == Direction::Body).then(|| ready(self.content.clone()))
    }
}

/// The closed set of foundational primitives.
#[derive(Clone, Debug)]
pub enum Foundational {
    /// See [`Empty`].
    Empty(Empty),
    /// See [`Group`].
    Group(Group),
    /// See [`Either`].
    Either(Either),
    /// See [`ForEach`].
    ForEach(ForEach),
    /// See [`Modified`].
    Modified(Modified),
}

impl Foundational {
    fn expansion(&self) -> &dyn Expansion {
        match self {
            Self::Empty(empty) => empty,
            Self::Group(group) => group,
            Self::Either(either) => either,
            Self::ForEach(for_each) => for_each,
            Self::Modified(modified) => modified,
        }
    }

    /// Returns the primitive's name, for diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Empty(_) => "Empty",
            Self::Group(_) => "Group",
            Self::Either(_) => "Either",
            Self::ForEach(_) => "ForEach",
            Self::Modified(_) => "Modified",
        }
    }

    /// Returns the child locations relative to the primitive, in order.
    #[must_use]
    pub fn child_locations(&self) -> Vec<Location> {
        self.expansion().child_locations()
    }

    /// Produces the child at `relative`.
    ///
    /// # Panics
    ///
    /// Panics if `relative` is not one of [`child_locations`](Self::child_locations):
    /// only locations reachable from a rendered parent may be requested.
    pub fn child(&self, relative: &Location) -> Body<'_> {
        let body = match relative.directions() {
            [direction] => self.expansion().child(direction),
            _ => None,
        };
        match body {
            Some(body) => body,
            None => panic!("`{}` has no child at {relative}", self.name()),
        }
    }

    /// Returns the modifier of a [`Modified`] primitive.
    #[must_use]
    pub fn as_modifier(&self) -> Option<&dyn Modifier> {
        match self {
            Self::Modified(modified) => Some(modified.modifier()),
            _ => None,
        }
    }
}
