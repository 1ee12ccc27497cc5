// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed values associated with locations in a shadow graph.
//!
//! Besides the rendered component, a location can carry any number of
//! elements, at most one per element type. The graph stores them erased and
//! hands them back by value.

use core::any::{Any, TypeId};
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};

/// How long an element survives at its location.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// A cache derived from the rendered component or its surroundings.
    ///
    /// Dropped whenever its location, or one of its ancestors, is invalidated.
    #[default]
    Derived,
    /// Storage whose content outlives individual renders, e.g. state.
    ///
    /// Only dropped when its location is no longer produced by its parent.
    Persistent,
}

/// A value that can be associated with a location.
///
/// # Example
///
/// ```rust
/// use arbor::{Element, Lifetime};
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Selection(usize);
///
/// impl Element for Selection {
///     const LIFETIME: Lifetime = Lifetime::Persistent;
/// }
/// ```
pub trait Element: Any + Clone + Send + Sync {
    /// How long the element survives at its location.
    const LIFETIME: Lifetime = Lifetime::Derived;
}

/// The erased type of an [`Element`].
#[derive(Copy, Clone)]
pub struct ElementKind {
    type_id: TypeId,
    name: &'static str,
}

impl ElementKind {
    /// Returns the kind of `E`.
    #[must_use]
    #[inline]
    pub fn of<E: Element>() -> Self {
        Self {
            type_id: TypeId::of::<E>(),
            name: core::any::type_name::<E>(),
        }
    }

    /// Returns the element's type name, for diagnostics.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ElementKind {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ElementKind {}

impl PartialOrd for ElementKind {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ElementKind {
    fn cmp(&self, other: &Self) -> Ordering {
        self.type_id.cmp(&other.type_id)
    }
}

impl Hash for ElementKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementKind({})", self.name)
    }
}

/// A type-erased element together with its kind and lifetime.
pub(crate) struct ErasedElement {
    value: Box<dyn Any + Send + Sync>,
    kind: ElementKind,
    lifetime: Lifetime,
}

impl ErasedElement {
    pub(crate) fn new<E: Element>(value: E) -> Self {
        Self {
            value: Box::new(value),
            kind: ElementKind::of::<E>(),
            lifetime: E::LIFETIME,
        }
    }

    #[inline]
    pub(crate) fn kind(&self) -> ElementKind {
        self.kind
    }

    #[inline]
    pub(crate) fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub(crate) fn downcast_ref<E: Element>(&self) -> Option<&E> {
        self.value.downcast_ref()
    }
}

impl fmt::Debug for ErasedElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedElement")
            .field("kind", &self.kind)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}
