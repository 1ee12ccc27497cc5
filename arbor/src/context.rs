// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Top-down propagation of values through the component tree.
//!
//! A component sets a context value for its content with
//! [`IntoComponent::context`](crate::IntoComponent::context); any
//! non-foundational descendant reads it through a [`Contextual`] property.
//! When several ancestors set the same key, the nearest one wins.
//!
//! # Example
//!
//! ```rust
//! use arbor::{Body, Component, ContextKey, Contextual, IntoComponent, PropertyField, ready};
//!
//! struct UserName;
//!
//! impl ContextKey for UserName {
//!     type Value = String;
//! }
//!
//! #[derive(Clone, Default)]
//! struct Welcome {
//!     name: Contextual<UserName>,
//! }
//!
//! impl Component for Welcome {
//!     fn body(&self) -> Body<'_> {
//!         assert_eq!(self.name.get(), "Jake");
//!         ready(arbor::Empty)
//!     }
//!
//!     fn properties(&mut self) -> Vec<PropertyField<'_>> {
//!         vec![PropertyField::new("name", &mut self.name)]
//!     }
//! }
//!
//! let document = Welcome::default().context::<UserName>("Jake".into());
//! # let _ = document;
//! ```

use core::any::{Any, TypeId};
use core::fmt;
use core::marker::PhantomData;
use std::sync::Arc;

use arbor_dirty::Scope;
use arbor_location::Location;
use futures::FutureExt;
use futures::future::{self, BoxFuture};
use hashbrown::HashMap;

use crate::element::{Element, ElementKind};
use crate::error::RenderResult;
use crate::modifier::Modifier;
use crate::primitives::Foundational;
use crate::property::{DynamicProperty, PropertyPath};
use crate::shadow::Shadow;
use crate::store::Store;

/// A key of the [`Context`].
///
/// Keys are types, usually empty ones, so that unrelated crates cannot
/// collide.
pub trait ContextKey: Send + Sync + 'static {
    /// The type of the values set for this key.
    type Value: Clone + Send + Sync + 'static;
}

type SharedValue = Arc<dyn Any + Send + Sync>;

/// An immutable map of context values, as seen from one location.
///
/// Cloning is cheap. Two contexts are equal if they hold the same keys bound
/// to the very same values.
#[derive(Clone, Default)]
pub struct Context {
    values: Arc<HashMap<TypeId, SharedValue>>,
}

impl Context {
    /// Returns an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for `K`, if any ancestor set one.
    #[must_use]
    pub fn get<K: ContextKey>(&self) -> Option<&K::Value> {
        self.values.get(&TypeId::of::<K>())?.downcast_ref()
    }

    /// Returns `true` if a value is set for `K`.
    #[must_use]
    pub fn contains<K: ContextKey>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<K>())
    }

    /// Returns the context with `value` set for `K`.
    #[must_use]
    pub fn with<K: ContextKey>(mut self, value: K::Value) -> Self {
        self.insert::<K>(value);
        self
    }

    /// Sets `value` for `K`.
    pub fn insert<K: ContextKey>(&mut self, value: K::Value) {
        self.insert_shared(TypeId::of::<K>(), Arc::new(value));
    }

    fn insert_shared(&mut self, key: TypeId, value: SharedValue) {
        Arc::make_mut(&mut self.values).insert(key, value);
    }

    /// Returns the number of keys set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no key is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
            || (self.values.len() == other.values.len()
                && self.values.iter().all(|(key, value)| {
                    other
                        .values
                        .get(key)
                        .is_some_and(|other| Arc::ptr_eq(value, other))
                }))
    }
}

impl Element for Context {}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("len", &self.values.len())
            .finish_non_exhaustive()
    }
}

/// Returns the context in effect at `location`.
///
/// Walks up from `location` to the nearest stored context, then applies the
/// values set by the modified primitives passed on the way, outermost first.
/// Every location visited is recorded as read by `consumer`.
///
/// The result is stored at `location` if `location` itself is the consumer,
/// since only then is the stored copy dropped when an input changes.
pub(crate) fn resolve(store: &mut Store, location: &Location, consumer: Option<&Location>) -> Context {
    let context = walk(store, location, consumer, true);
    if consumer == Some(location) && store.element::<Context>(location).is_none() {
        store.cache(location.clone(), context.clone());
    }
    context
}

/// Like [`resolve`], but ignores the context stored at `location` itself.
fn resolve_inherited(store: &mut Store, location: &Location, consumer: Option<&Location>) -> Context {
    walk(store, location, consumer, false)
}

fn walk(
    store: &mut Store,
    location: &Location,
    consumer: Option<&Location>,
    include_self: bool,
) -> Context {
    let kind = ElementKind::of::<Context>();
    let mut modified = Vec::new();
    let mut base = None;
    for visited in core::iter::once(location.clone()).chain(location.ancestors()) {
        let is_self = visited == *location;
        if is_self && !include_self {
            continue;
        }
        if let Some(consumer) = consumer {
            store.record(visited.clone(), kind, consumer.clone(), Scope::Exact);
        }
        if let Some(context) = store.element::<Context>(&visited) {
            base = Some(context);
            break;
        }
        if !is_self
            && let Some(component) = store.component(&visited)
            && matches!(component.as_foundational(), Some(Foundational::Modified(_)))
        {
            modified.push(component);
        }
    }

    let mut context = base.unwrap_or_default();
    for component in modified.iter().rev() {
        if let Some(modifier) = component.as_foundational().and_then(Foundational::as_modifier) {
            modifier.contribute_context(&mut context);
        }
    }
    context
}

/// Sets the context value for `K` beneath a [`Modified`](crate::Modified).
///
/// Created by [`IntoComponent::context`](crate::IntoComponent::context).
pub struct ContextModifier<K: ContextKey> {
    value: SharedValue,
    key: PhantomData<fn() -> K>,
}

impl<K: ContextKey> ContextModifier<K> {
    /// Sets `value` for `K`.
    #[must_use]
    pub fn new(value: K::Value) -> Self {
        Self {
            value: Arc::new(value),
            key: PhantomData,
        }
    }
}

impl<K: ContextKey> fmt::Debug for ContextModifier<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextModifier")
            .field("key", &core::any::type_name::<K>())
            .finish_non_exhaustive()
    }
}

impl<K: ContextKey> Modifier for ContextModifier<K> {
    fn update<'a>(&'a self, shadow: &'a Shadow) -> BoxFuture<'a, RenderResult<()>> {
        let context = resolve_inherited(
            &mut shadow.graph().lock(),
            shadow.location(),
            shadow.consumer(),
        );
        shadow.update_if_changed(context);
        future::ready(Ok(())).boxed()
    }

    fn contribute_context(&self, context: &mut Context) {
        context.insert_shared(TypeId::of::<K>(), self.value.clone());
    }
}

enum Resolution<V> {
    Pending,
    Missing,
    Found(V),
}

/// A dynamic property holding the context value for `K`.
///
/// Reading the value of a key that no ancestor set is a programming error.
pub struct Contextual<K: ContextKey> {
    resolution: Resolution<K::Value>,
}

impl<K: ContextKey> Contextual<K> {
    /// Creates the property. Its value is available once the graph updated it.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resolution: Resolution::Pending,
        }
    }

    /// Returns the context value.
    ///
    /// # Panics
    ///
    /// Panics if the property was not updated yet, or if no ancestor set a
    /// value for `K`.
    #[must_use]
    pub fn get(&self) -> &K::Value {
        match &self.resolution {
            Resolution::Found(value) => value,
            Resolution::Missing => panic!(
                "no ancestor sets a context value for `{}`",
                core::any::type_name::<K>()
            ),
            Resolution::Pending => panic!(
                "contextual `{}` read before the graph updated it",
                core::any::type_name::<K>()
            ),
        }
    }

    /// Returns the context value, or `None` if it is unavailable.
    #[must_use]
    pub fn try_get(&self) -> Option<&K::Value> {
        match &self.resolution {
            Resolution::Found(value) => Some(value),
            Resolution::Missing | Resolution::Pending => None,
        }
    }
}

impl<K: ContextKey> Default for Contextual<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ContextKey> Clone for Contextual<K> {
    fn clone(&self) -> Self {
        let resolution = match &self.resolution {
            Resolution::Pending => Resolution::Pending,
            Resolution::Missing => Resolution::Missing,
            Resolution::Found(value) => Resolution::Found(value.clone()),
        };
        Self { resolution }
    }
}

impl<K: ContextKey> fmt::Debug for Contextual<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.resolution {
            Resolution::Pending => "pending",
            Resolution::Missing => "missing",
            Resolution::Found(_) => "found",
        };
        f.debug_struct("Contextual")
            .field("key", &core::any::type_name::<K>())
            .field("state", &state)
            .finish()
    }
}

impl<K: ContextKey> DynamicProperty for Contextual<K> {
    fn update<'a>(
        &'a mut self,
        shadow: &'a Shadow,
        _: &'a PropertyPath,
    ) -> BoxFuture<'a, RenderResult<()>> {
        self.resolution = match shadow.context_value::<K>() {
            Some(value) => Resolution::Found(value),
            None => Resolution::Missing,
        };
        future::ready(Ok(())).boxed()
    }
}
