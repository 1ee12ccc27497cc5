// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bottom-up aggregation of values through the component tree.
//!
//! A component assigns a preference to its content with
//! [`IntoComponent::preference`](crate::IntoComponent::preference). The
//! preference of a subtree is its assigned value if there is one, and
//! otherwise the merge of its children's preferences, in order. Ancestors read
//! the aggregate through a [`Preferred`] property.

use core::fmt;

use arbor_dirty::Scope;
use futures::FutureExt;
use futures::future::{self, BoxFuture};

use crate::element::{Element, ElementKind, Lifetime};
use crate::error::RenderResult;
use crate::modifier::Modifier;
use crate::property::{DynamicProperty, PropertyPath};
use crate::shadow::Shadow;
use crate::store::LastExpansion;

/// A value that propagates up the component tree.
///
/// `merge` must be associative and have [`default_value`](Self::default_value)
/// as its identity: `P::default_value().merge(&x) == x` and
/// `x.merge(&P::default_value()) == x`.
///
/// # Example
///
/// ```rust
/// use arbor::Preference;
///
/// /// The widest preferred width in a subtree.
/// #[derive(Clone, Debug, PartialEq)]
/// struct Width(u32);
///
/// impl Preference for Width {
///     fn default_value() -> Self {
///         Self(0)
///     }
///
///     fn merge(&self, next: &Self) -> Self {
///         Self(self.0.max(next.0))
///     }
/// }
///
/// assert_eq!(Width(3).merge(&Width::default_value()), Width(3));
/// ```
pub trait Preference: Clone + PartialEq + Send + Sync + 'static {
    /// Returns the identity of [`merge`](Self::merge).
    fn default_value() -> Self;

    /// Combines `self` with the preference of the next sibling.
    #[must_use]
    fn merge(&self, next: &Self) -> Self;
}

/// A preference assigned at a location.
///
/// Assignments outlive re-renders of the location they are stored at: they
/// are rewritten whenever the assigning modifier is applied, and removed with
/// the location.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Assigned<P>(pub(crate) P);

impl<P: Preference> Element for Assigned<P> {
    const LIFETIME: Lifetime = Lifetime::Persistent;
}

/// Assigns a preference to the components beneath a [`Modified`](crate::Modified).
///
/// Created by [`IntoComponent::preference`](crate::IntoComponent::preference).
#[derive(Clone, Debug)]
pub struct PreferenceModifier<P> {
    value: P,
}

impl<P: Preference> PreferenceModifier<P> {
    /// Assigns `value`.
    #[must_use]
    pub fn new(value: P) -> Self {
        Self { value }
    }
}

impl<P: Preference> Modifier for PreferenceModifier<P> {
    fn update<'a>(&'a self, shadow: &'a Shadow) -> BoxFuture<'a, RenderResult<()>> {
        shadow.update_if_changed(Assigned(self.value.clone()));
        future::ready(Ok(())).boxed()
    }
}

/// A dynamic property holding the preference `P` of the component's subtree.
///
/// The aggregate covers the part of the subtree expanded since the component
/// last changed, following the children each location currently produces.
/// Hidden subtrees are left out, and so are subtrees that are no longer
/// produced. Expanding the subtree further, or assigning preferences within
/// it, re-renders the component, so once the subtree has been rendered, the
/// next render of the component sees the complete aggregate. Until then the
/// value may be [`Preference::default_value`].
pub struct Preferred<P> {
    value: Option<P>,
}

impl<P: Preference> Preferred<P> {
    /// Creates the property. Its value is available once the graph updated it.
    #[must_use]
    pub fn new() -> Self {
        Self { value: None }
    }

    /// Returns the aggregated preference.
    ///
    /// # Panics
    ///
    /// Panics if the property was not updated yet.
    #[must_use]
    pub fn get(&self) -> &P {
        match &self.value {
            Some(value) => value,
            None => panic!(
                "preferred `{}` read before the graph updated it",
                core::any::type_name::<P>()
            ),
        }
    }
}

impl<P: Preference> Default for Preferred<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Preference> Clone for Preferred<P> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
        }
    }
}

impl<P: Preference + fmt::Debug> fmt::Debug for Preferred<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preferred")
            .field("value", &self.value)
            .finish()
    }
}

impl<P: Preference> DynamicProperty for Preferred<P> {
    fn update<'a>(
        &'a mut self,
        shadow: &'a Shadow,
        _: &'a PropertyPath,
    ) -> BoxFuture<'a, RenderResult<()>> {
        let location = shadow.location();
        let mut store = shadow.graph().lock();
        let value = match store.read::<Assigned<P>>(location, shadow.consumer()) {
            Some(Assigned(value)) => value,
            None => {
                if let Some(consumer) = shadow.consumer() {
                    for kind in [
                        ElementKind::of::<Assigned<P>>(),
                        ElementKind::of::<LastExpansion>(),
                    ] {
                        store.record(location.clone(), kind, consumer.clone(), Scope::Subtree);
                    }
                }
                merge_all(
                    store
                        .frontier::<Assigned<P>>(location)
                        .into_iter()
                        .map(|Assigned(value)| value),
                )
            }
        };
        drop(store);
        self.value = Some(value);
        future::ready(Ok(())).boxed()
    }
}

/// Merges `values` in order, starting from the default value.
pub(crate) fn merge_all<P: Preference>(values: impl IntoIterator<Item = P>) -> P {
    values
        .into_iter()
        .reduce(|merged, next| merged.merge(&next))
        .unwrap_or_else(P::default_value)
}
