// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Component state and bindings.

use core::any::Any;
use core::fmt;
use std::sync::Arc;

use arbor_location::Location;
use futures::FutureExt;
use futures::channel::mpsc::UnboundedSender;
use futures::future::{self, BoxFuture};
use hashbrown::HashMap;

use crate::element::{Element, Lifetime};
use crate::error::RenderResult;
use crate::graph::Mutation;
use crate::property::{DynamicProperty, PropertyPath};
use crate::shadow::Shadow;
use crate::store::Store;

type SharedValue = Arc<dyn Any + Send + Sync>;

/// The state values of one location, keyed by property path.
#[derive(Clone, Default)]
pub(crate) struct StateContainer {
    values: HashMap<PropertyPath, SharedValue>,
}

impl Element for StateContainer {
    const LIFETIME: Lifetime = Lifetime::Persistent;
}

impl fmt::Debug for StateContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

/// Stores an assigned state value, re-rendering the owner.
///
/// Assignments to locations that were collected in the meantime are dropped.
pub(crate) fn apply(store: &mut Store, location: Location, path: &PropertyPath, value: SharedValue) {
    let Some(mut container) = store.element::<StateContainer>(&location) else {
        log::debug!("dropping assignment to `{path}` at {location}: no longer rendered");
        return;
    };
    container.values.insert(path.clone(), value);
    log::debug!("assigned `{path}` at {location}");
    store.write(location, container);
}

#[derive(Clone)]
struct StateSink {
    sender: UnboundedSender<Mutation>,
    location: Location,
    path: PropertyPath,
}

impl StateSink {
    fn send(&self, value: SharedValue) {
        let mutation = Mutation::State {
            location: self.location.clone(),
            path: self.path.clone(),
            value,
        };
        if self.sender.unbounded_send(mutation).is_err() {
            log::debug!(
                "dropping assignment to `{}` at {}: the graph is gone",
                self.path,
                self.location
            );
        }
    }
}

/// A value owned by a component that survives re-renders.
///
/// The value is stored in the graph at the component's location, under the
/// property's path. Assignments are queued and become visible in the next
/// render of the component, never in the current one.
///
/// # Example
///
/// ```rust
/// use arbor::{Body, Component, PropertyField, State, ready};
///
/// #[derive(Clone)]
/// struct Counter {
///     count: State<u32>,
/// }
///
/// impl Component for Counter {
///     fn body(&self) -> Body<'_> {
///         if *self.count.get() < 3 {
///             self.count.set(self.count.get() + 1);
///         }
///         ready(arbor::Empty)
///     }
///
///     fn properties(&mut self) -> Vec<PropertyField<'_>> {
///         vec![PropertyField::new("count", &mut self.count)]
///     }
/// }
/// ```
pub struct State<T> {
    initial: T,
    current: Option<T>,
    sink: Option<StateSink>,
}

impl<T: Clone + Send + Sync + 'static> State<T> {
    /// Creates state that starts out as `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            initial,
            current: None,
            sink: None,
        }
    }

    /// Returns the value as of the current render.
    ///
    /// # Panics
    ///
    /// Panics if the graph has not updated the property yet.
    #[must_use]
    pub fn get(&self) -> &T {
        match &self.current {
            Some(current) => current,
            None => panic!(
                "state of type `{}` read before the graph updated it",
                core::any::type_name::<T>()
            ),
        }
    }

    /// Assigns `value`, to be seen by the next render.
    ///
    /// # Panics
    ///
    /// Panics if the graph has not updated the property yet.
    pub fn set(&self, value: T) {
        self.sink().send(Arc::new(value));
    }

    /// Returns a binding that reads the current value and assigns new ones.
    ///
    /// # Panics
    ///
    /// Panics if the graph has not updated the property yet.
    #[must_use]
    pub fn binding(&self) -> Binding<T> {
        let current = self.get().clone();
        let sink = self.sink().clone();
        Binding::new(move || current.clone(), move |value: T| sink.send(Arc::new(value)))
    }

    fn sink(&self) -> &StateSink {
        match &self.sink {
            Some(sink) => sink,
            None => panic!(
                "state of type `{}` assigned before the graph updated it",
                core::any::type_name::<T>()
            ),
        }
    }
}

impl<T: Clone> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            initial: self.initial.clone(),
            current: self.current.clone(),
            sink: self.sink.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + Default + 'static> Default for State<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("initial", &self.initial)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl<T: Clone + Send + Sync + 'static> DynamicProperty for State<T> {
    fn update<'a>(
        &'a mut self,
        shadow: &'a Shadow,
        path: &'a PropertyPath,
    ) -> BoxFuture<'a, RenderResult<()>> {
        let location = shadow.location();
        let mut store = shadow.graph().lock();
        let container = store.read::<StateContainer>(location, shadow.consumer());
        let stored = container
            .as_ref()
            .and_then(|container| container.values.get(path))
            .and_then(|value| value.downcast_ref::<T>())
            .cloned();
        let current = match stored {
            Some(stored) => stored,
            None => {
                let mut container = container.unwrap_or_default();
                container
                    .values
                    .insert(path.clone(), Arc::new(self.initial.clone()));
                store.cache(location.clone(), container);
                self.initial.clone()
            }
        };
        drop(store);

        self.current = Some(current);
        self.sink = Some(StateSink {
            sender: shadow.graph().sender(),
            location: location.clone(),
            path: path.clone(),
        });
        future::ready(Ok(())).boxed()
    }
}

/// A read-write reference to a value owned elsewhere.
///
/// Bindings let a component hand part of its state to a child without the
/// child knowing where the value lives.
#[derive(Clone)]
pub struct Binding<T> {
    get: Arc<dyn Fn() -> T + Send + Sync>,
    set: Arc<dyn Fn(T) + Send + Sync>,
}

impl<T: 'static> Binding<T> {
    /// Creates a binding from a getter and a setter.
    #[must_use]
    pub fn new(
        get: impl Fn() -> T + Send + Sync + 'static,
        set: impl Fn(T) + Send + Sync + 'static,
    ) -> Self {
        Self {
            get: Arc::new(get),
            set: Arc::new(set),
        }
    }

    /// Creates a binding that always reads `value` and ignores assignments.
    #[must_use]
    pub fn constant(value: T) -> Self
    where
        T: Clone + Send + Sync,
    {
        Self::new(move || value.clone(), |_| {})
    }

    /// Reads the value.
    #[must_use]
    pub fn get(&self) -> T {
        (self.get)()
    }

    /// Assigns `value`.
    pub fn set(&self, value: T) {
        (self.set)(value);
    }
}

impl<T> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn constant_bindings_ignore_assignments() {
        let binding = Binding::constant(3);
        binding.set(4);
        assert_eq!(binding.get(), 3);
    }

    #[test]
    fn bindings_forward_to_their_closures() {
        let slot = Arc::new(Mutex::new(1));
        let reader = slot.clone();
        let writer = slot.clone();
        let binding = Binding::new(
            move || *reader.lock(),
            move |value| *writer.lock() = value,
        );
        binding.set(5);
        assert_eq!(binding.get(), 5);
        assert_eq!(*slot.lock(), 5);
    }

    #[test]
    #[should_panic(expected = "read before the graph updated it")]
    fn reading_before_update_is_a_contract_violation() {
        let _ = State::new(0_u32).get();
    }

    #[test]
    #[should_panic(expected = "assigned before the graph updated it")]
    fn assigning_before_update_is_a_contract_violation() {
        State::new(0_u32).set(1);
    }
}
