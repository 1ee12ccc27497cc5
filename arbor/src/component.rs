// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Components: immutable, declarative tree nodes.
//!
//! A component is either *composite*, described by the body it evaluates to,
//! or one of the closed set of [foundational primitives](crate::Foundational)
//! that the graph expands itself. [`AnyComponent`] erases both.

use core::any::{Any, TypeId};
use core::fmt;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};

use crate::context::{ContextKey, ContextModifier};
use crate::error::RenderResult;
use crate::modifier::Modifier;
use crate::preference::{Preference, PreferenceModifier};
use crate::primitives::{Either, Empty, ForEach, Foundational, Group, Modified};
use crate::property::PropertyField;

/// The pending result of evaluating a body or producing a primitive's child.
pub type Body<'a> = BoxFuture<'a, RenderResult<AnyComponent>>;

/// Returns an already-evaluated body.
///
/// Most bodies are synchronous: their inputs are dynamic properties that the
/// graph updated before evaluating the body.
pub fn ready(component: impl IntoComponent) -> Body<'static> {
    future::ready(Ok(component.into_any())).boxed()
}

/// A composite component.
///
/// Components are configuration-only values, created fresh on every render.
/// Anything that must survive a render lives in a dynamic property, e.g.
/// [`State`](crate::State), whose storage the graph keeps at the component's
/// location.
///
/// # Example
///
/// ```rust
/// use arbor::{Body, Component, Group, IntoComponent, ready};
///
/// #[derive(Clone)]
/// struct Paragraph(&'static str);
///
/// impl Component for Paragraph {
///     fn body(&self) -> Body<'_> {
///         ready(arbor::Empty)
///     }
/// }
///
/// #[derive(Clone)]
/// struct Article;
///
/// impl Component for Article {
///     fn body(&self) -> Body<'_> {
///         ready(Group::new([
///             Paragraph("first").into_any(),
///             Paragraph("second").into_any(),
///         ]))
///     }
/// }
/// ```
pub trait Component: Any + Clone + Send + Sync {
    /// Evaluates the component's content.
    ///
    /// The graph evaluates bodies only after updating every dynamic property
    /// returned by [`properties`](Self::properties).
    fn body(&self) -> Body<'_>;

    /// Lists the component's dynamic properties, in declaration order.
    ///
    /// Paths must be stable across renders: storage such as state is keyed by
    /// them.
    fn properties(&mut self) -> Vec<PropertyField<'_>> {
        Vec::new()
    }
}

/// Values that can be placed in a component tree.
///
/// Implemented by every [`Component`], by the foundational primitives, and by
/// [`AnyComponent`] itself. The provided methods wrap the value in a
/// [`Modified`] primitive.
pub trait IntoComponent: Sized {
    /// Erases the value.
    fn into_any(self) -> AnyComponent;

    /// Applies `modifier` to the non-foundational components in `self`.
    fn modifier(self, modifier: impl Modifier) -> Modified {
        Modified::new(self, modifier)
    }

    /// Makes `value` the context value for `K` beneath `self`.
    fn context<K: ContextKey>(self, value: K::Value) -> Modified {
        self.modifier(ContextModifier::<K>::new(value))
    }

    /// Assigns `value` as the preference of the non-foundational components in `self`.
    fn preference<P: Preference>(self, value: P) -> Modified {
        self.modifier(PreferenceModifier::new(value))
    }
}

impl<C: Component> IntoComponent for C {
    fn into_any(self) -> AnyComponent {
        AnyComponent::new(self)
    }
}

impl IntoComponent for AnyComponent {
    fn into_any(self) -> AnyComponent {
        self
    }
}

impl IntoComponent for Foundational {
    fn into_any(self) -> AnyComponent {
        AnyComponent {
            repr: Repr::Foundational(Arc::new(self)),
        }
    }
}

macro_rules! primitive_into_component {
    ($($primitive:ident),*) => {
        $(
            impl IntoComponent for $primitive {
                fn into_any(self) -> AnyComponent {
                    Foundational::$primitive(self).into_any()
                }
            }
        )*
    };
}

primitive_into_component!(Empty, Group, Either, ForEach, Modified);

/// A type-erased component.
///
/// Cloning is cheap: composite values are shared, and primitives share their
/// children.
#[derive(Clone)]
pub struct AnyComponent {
    repr: Repr,
}

#[derive(Clone)]
enum Repr {
    Composite(Arc<dyn ErasedComponent>),
    Foundational(Arc<Foundational>),
}

impl AnyComponent {
    /// Erases a composite component.
    #[must_use]
    pub fn new<C: Component>(component: C) -> Self {
        Self {
            repr: Repr::Composite(Arc::new(component)),
        }
    }

    /// Returns `true` for foundational primitives.
    #[must_use]
    #[inline]
    pub fn is_foundational(&self) -> bool {
        matches!(self.repr, Repr::Foundational(_))
    }

    /// Returns the primitive, if this is a foundational component.
    #[must_use]
    pub fn as_foundational(&self) -> Option<&Foundational> {
        match &self.repr {
            Repr::Foundational(foundational) => Some(&**foundational),
            Repr::Composite(_) => None,
        }
    }

    /// Returns `true` if this is a composite component of type `C`.
    #[must_use]
    pub fn is<C: Component>(&self) -> bool {
        self.downcast_ref::<C>().is_some()
    }

    /// Returns the composite component as a `C`, if it is one.
    #[must_use]
    pub fn downcast_ref<C: Component>(&self) -> Option<&C> {
        self.composite()?.as_any().downcast_ref()
    }

    /// Returns the [`TypeId`] of a composite component.
    #[must_use]
    pub fn component_type(&self) -> Option<TypeId> {
        self.composite().map(|composite| composite.as_any().type_id())
    }

    /// Returns the component's type name, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match &self.repr {
            Repr::Composite(composite) => composite.type_name(),
            Repr::Foundational(foundational) => foundational.name(),
        }
    }

    /// Evaluates the body of a composite component.
    ///
    /// # Panics
    ///
    /// Foundational primitives have no body; asking for one is a contract
    /// violation.
    pub fn body(&self) -> Body<'_> {
        match &self.repr {
            Repr::Composite(composite) => composite.body(),
            Repr::Foundational(foundational) => panic!(
                "`{}` is a foundational component and has no body",
                foundational.name()
            ),
        }
    }

    pub(crate) fn composite(&self) -> Option<&Arc<dyn ErasedComponent>> {
        match &self.repr {
            Repr::Composite(composite) => Some(composite),
            Repr::Foundational(_) => None,
        }
    }

    pub(crate) fn from_erased(composite: Arc<dyn ErasedComponent>) -> Self {
        Self {
            repr: Repr::Composite(composite),
        }
    }

    /// Returns `true` if both values share the same composite allocation.
    ///
    /// Used to check that cached components are handed out unchanged.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self.composite(), other.composite()) {
            (Some(this), Some(that)) => Arc::ptr_eq(this, that),
            _ => false,
        }
    }
}

impl fmt::Debug for AnyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Composite(composite) => write!(f, "AnyComponent({})", composite.type_name()),
            Repr::Foundational(foundational) => fmt::Debug::fmt(foundational, f),
        }
    }
}

/// Object-safe view of a [`Component`].
pub(crate) trait ErasedComponent: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
    fn boxed_clone(&self) -> Box<dyn ErasedComponent>;
    fn body(&self) -> Body<'_>;
    fn properties(&mut self) -> Vec<PropertyField<'_>>;
}

impl<C: Component> ErasedComponent for C {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        core::any::type_name::<C>()
    }

    fn boxed_clone(&self) -> Box<dyn ErasedComponent> {
        Box::new(self.clone())
    }

    fn body(&self) -> Body<'_> {
        Component::body(self)
    }

    fn properties(&mut self) -> Vec<PropertyField<'_>> {
        Component::properties(self)
    }
}
