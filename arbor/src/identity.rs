// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Exposing a component's structural identity.

use arbor_location::Location;
use futures::FutureExt;
use futures::future::{self, BoxFuture};

use crate::error::RenderResult;
use crate::property::{DynamicProperty, PropertyPath};
use crate::shadow::Shadow;

/// A dynamic property holding the location of its component.
///
/// The location is made of the positions of the component's ancestors in
/// groups and either-primitives, and of the identifiers and slot positions
/// assigned by [`ForEach`](crate::ForEach). It stays the same across
/// re-renders as long as the component's ancestors keep both. A reordered
/// [`ForEach`](crate::ForEach) child keeps its identifier and its state, but
/// its location changes with its slot.
#[derive(Clone, Debug, Default)]
pub struct StructuralIdentifier {
    location: Option<Location>,
}

impl StructuralIdentifier {
    /// Creates the property. Its value is available once the graph updated it.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the location of the component.
    ///
    /// # Panics
    ///
    /// Panics if the graph has not updated the property yet.
    #[must_use]
    pub fn get(&self) -> &Location {
        match &self.location {
            Some(location) => location,
            None => panic!("structural identifier read before the graph updated it"),
        }
    }
}

impl DynamicProperty for StructuralIdentifier {
    fn update<'a>(
        &'a mut self,
        shadow: &'a Shadow,
        _: &'a PropertyPath,
    ) -> BoxFuture<'a, RenderResult<()>> {
        self.location = Some(shadow.location().clone());
        future::ready(Ok(())).boxed()
    }
}
