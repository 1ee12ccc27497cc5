// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Operations applied to shadows, selected by component type.

use core::fmt;

use crate::component::Component;
use crate::shadow::Shadow;

/// An operation that can be applied to any [`Shadow`].
///
/// Closures taking a `&Shadow` are functors; [`TypeDispatch`] builds one that
/// behaves differently per component type.
pub trait ShadowFunctor {
    /// The result of the operation.
    type Output;

    /// Applies the operation to `shadow`.
    fn call(&mut self, shadow: &Shadow) -> Self::Output;
}

impl<F, O> ShadowFunctor for F
where
    F: FnMut(&Shadow) -> O,
{
    type Output = O;

    fn call(&mut self, shadow: &Shadow) -> O {
        self(shadow)
    }
}

type Arm<'f, O> = Box<dyn FnMut(&Shadow) -> Option<O> + 'f>;

/// A functor selecting a function by the type of the shadow's subject.
///
/// Arms are tried in the order they were added. Subjects no arm handles go
/// to the [`otherwise`](Self::otherwise) function, or yield `None` without
/// one.
///
/// # Example
///
/// ```rust
/// use arbor::{Body, Component, Shadow, ShadowFunctor, TypeDispatch, ready};
///
/// #[derive(Clone)]
/// struct Heading(&'static str);
///
/// impl Component for Heading {
///     fn body(&self) -> Body<'_> {
///         ready(arbor::Empty)
///     }
/// }
///
/// let mut describe = TypeDispatch::new()
///     .on(|_: &Shadow, heading: &Heading| format!("heading {}", heading.0))
///     .otherwise(|shadow: &Shadow| shadow.subject().type_name().to_owned());
/// # let _ = &mut describe;
/// ```
pub struct TypeDispatch<'f, O> {
    arms: Vec<Arm<'f, O>>,
    otherwise: Option<Box<dyn FnMut(&Shadow) -> O + 'f>>,
}

impl<'f, O> TypeDispatch<'f, O> {
    /// Creates a functor without arms.
    #[must_use]
    pub fn new() -> Self {
        Self {
            arms: Vec::new(),
            otherwise: None,
        }
    }

    /// Adds an arm for subjects of type `C`.
    #[must_use]
    pub fn on<C: Component>(mut self, mut arm: impl FnMut(&Shadow, &C) -> O + 'f) -> Self {
        self.arms.push(Box::new(move |shadow: &Shadow| {
            shadow
                .subject_as::<C>()
                .map(|component| arm(shadow, component))
        }));
        self
    }

    /// Sets the function for subjects no arm handles.
    #[must_use]
    pub fn otherwise(mut self, otherwise: impl FnMut(&Shadow) -> O + 'f) -> Self {
        self.otherwise = Some(Box::new(otherwise));
        self
    }

    /// Applies the first matching arm, or the fallback.
    pub fn dispatch(&mut self, shadow: &Shadow) -> Option<O> {
        for arm in &mut self.arms {
            if let Some(output) = arm(shadow) {
                return Some(output);
            }
        }
        self.otherwise.as_mut().map(|otherwise| otherwise(shadow))
    }
}

impl<O> Default for TypeDispatch<'_, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> fmt::Debug for TypeDispatch<'_, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDispatch")
            .field("arms", &self.arms.len())
            .field("otherwise", &self.otherwise.is_some())
            .finish()
    }
}

impl<O> ShadowFunctor for TypeDispatch<'_, O> {
    type Output = Option<O>;

    fn call(&mut self, shadow: &Shadow) -> Option<O> {
        self.dispatch(shadow)
    }
}
