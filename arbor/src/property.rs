// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dynamic properties: component fields whose value comes from the graph.

use core::fmt;

use futures::FutureExt;
use futures::future::BoxFuture;
use smallvec::SmallVec;

use crate::error::RenderResult;
use crate::shadow::Shadow;

/// A component field whose value is supplied from outside the component.
///
/// Before a component's body is evaluated, the graph calls
/// [`update`](Self::update) on each of its dynamic properties so that they can
/// pull their current value, e.g. from state stored in the graph, and cache it
/// for synchronous reads during the body.
///
/// Properties may contain properties of their own. These are updated first.
pub trait DynamicProperty: Send + Sync {
    /// Pulls the property's current value.
    ///
    /// `shadow` is the location being rendered, and reads through it are
    /// recorded as dependencies of that location. `path` identifies the
    /// property among the others at that location.
    fn update<'a>(
        &'a mut self,
        shadow: &'a Shadow,
        path: &'a PropertyPath,
    ) -> BoxFuture<'a, RenderResult<()>>;

    /// Lists nested dynamic properties.
    fn properties(&mut self) -> Vec<PropertyField<'_>> {
        Vec::new()
    }
}

/// A named reference to a dynamic property inside a component or property.
pub struct PropertyField<'a> {
    name: &'static str,
    property: &'a mut dyn DynamicProperty,
}

impl<'a> PropertyField<'a> {
    /// Refers to `property`, stored under `name`.
    #[must_use]
    pub fn new(name: &'static str, property: &'a mut dyn DynamicProperty) -> Self {
        Self { name, property }
    }

    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for PropertyField<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyField")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// The stable path of a dynamic property within its component.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyPath {
    segments: SmallVec<[&'static str; 4]>,
}

impl PropertyPath {
    /// Returns the empty path, i.e. the component itself.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns the path one field further.
    #[must_use]
    pub fn field(&self, name: &'static str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name);
        Self { segments }
    }

    /// Returns the field names from the component to the property.
    #[must_use]
    pub fn segments(&self) -> &[&'static str] {
        &self.segments
    }
}

impl fmt::Debug for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyPath({self})")
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Updates `fields` and their nested properties, innermost first.
pub(crate) fn update_properties<'a>(
    fields: Vec<PropertyField<'a>>,
    shadow: &'a Shadow,
    base: &'a PropertyPath,
) -> BoxFuture<'a, RenderResult<()>> {
    async move {
        for field in fields {
            let path = base.field(field.name);
            let property = field.property;
            update_properties(property.properties(), shadow, &path).await?;
            property.update(shadow, &path).await?;
        }
        Ok(())
    }
    .boxed()
}
