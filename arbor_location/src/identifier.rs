// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Type-erased identifiers for identified children.
//!
//! Repeating primitives address their children by a caller-supplied
//! identifier rather than by index. Identifiers can be of any type, so
//! [`AnyIdentifier`] erases the concrete type while keeping equality, hashing,
//! and a total order that agrees with equality.

use alloc::sync::Arc;
use core::any::{Any, TypeId};
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};

/// Values that can identify a child among its siblings.
///
/// This is blanket-implemented for every type with the required capabilities,
/// e.g. integers, strings, and tuples of them.
pub trait Identifier: Any + fmt::Debug + Eq + Ord + Hash + Send + Sync {}

impl<T> Identifier for T where T: Any + fmt::Debug + Eq + Ord + Hash + Send + Sync {}

/// A type-erased, cheaply clonable [`Identifier`].
///
/// Two identifiers are equal only if they have the same concrete type and
/// equal values. Identifiers of different types are ordered by their type, so
/// the order is total.
///
/// # Example
///
/// ```rust
/// use arbor_location::AnyIdentifier;
///
/// let a = AnyIdentifier::new("a");
/// let one = AnyIdentifier::new(1_u32);
///
/// assert_eq!(a, AnyIdentifier::new("a"));
/// assert_ne!(one, AnyIdentifier::new(1_u64));
/// assert_eq!(one.downcast_ref::<u32>(), Some(&1));
/// ```
#[derive(Clone)]
pub struct AnyIdentifier {
    inner: Arc<dyn ErasedIdentifier>,
    type_id: TypeId,
}

impl AnyIdentifier {
    /// Erases `value`.
    ///
    /// Erasing an identifier that is already an `AnyIdentifier` returns it
    /// unchanged instead of wrapping it a second time.
    #[must_use]
    pub fn new<T: Identifier>(value: T) -> Self {
        if let Some(erased) = (&value as &dyn Any).downcast_ref::<Self>() {
            return erased.clone();
        }
        Self {
            inner: Arc::new(value),
            type_id: TypeId::of::<T>(),
        }
    }

    /// Returns `true` if the identifier is of type `T`.
    #[must_use]
    #[inline]
    pub fn is<T: Identifier>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Attempts to recover the identifier as a `T`.
    #[must_use]
    pub fn downcast_ref<T: Identifier>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref()
    }

    /// Returns the name of the identifier's concrete type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }
}

impl PartialEq for AnyIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.inner.eq_erased(other.inner.as_any())
    }
}

impl Eq for AnyIdentifier {}

impl PartialOrd for AnyIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AnyIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.type_id
            .cmp(&other.type_id)
            .then_with(|| self.inner.cmp_erased(other.inner.as_any()))
    }
}

impl Hash for AnyIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.inner.hash_erased(state);
    }
}

impl fmt::Debug for AnyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt_erased(f)
    }
}

/// Object-safe view of an [`Identifier`].
trait ErasedIdentifier: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
    fn eq_erased(&self, other: &dyn Any) -> bool;
    fn cmp_erased(&self, other: &dyn Any) -> Ordering;
    fn hash_erased(&self, state: &mut dyn Hasher);
    fn fmt_erased(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<T: Identifier> ErasedIdentifier for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        core::any::type_name::<T>()
    }

    fn eq_erased(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<T>() == Some(self)
    }

    // Only reached when both sides share a `TypeId`.
    fn cmp_erased(&self, other: &dyn Any) -> Ordering {
        other
            .downcast_ref::<T>()
            .map_or(Ordering::Equal, |other| self.cmp(other))
    }

    fn hash_erased(&self, mut state: &mut dyn Hasher) {
        self.hash(&mut state);
    }

    fn fmt_erased(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use alloc::format;
    use alloc::string::String;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(id: &AnyIdentifier) -> u64 {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn equal_values_of_the_same_type_are_equal() {
        let a = AnyIdentifier::new(String::from("key"));
        let b = AnyIdentifier::new(String::from("key"));
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_eq!(a.cmp(&b), Ordering::Equal);
    }

    #[test]
    fn different_types_never_compare_equal() {
        let narrow = AnyIdentifier::new(7_u32);
        let wide = AnyIdentifier::new(7_u64);
        assert_ne!(narrow, wide);
        assert_ne!(narrow.cmp(&wide), Ordering::Equal);
        assert_eq!(narrow.cmp(&wide), wide.cmp(&narrow).reverse());
    }

    #[test]
    fn values_of_one_type_keep_their_natural_order() {
        let low = AnyIdentifier::new(1_i32);
        let high = AnyIdentifier::new(9_i32);
        assert!(low < high);
    }

    #[test]
    fn erasing_twice_does_not_nest() {
        let once = AnyIdentifier::new('x');
        let twice = AnyIdentifier::new(once.clone());
        assert_eq!(once, twice);
        assert!(twice.is::<char>());
        assert_eq!(twice.downcast_ref::<char>(), Some(&'x'));
    }

    #[test]
    fn debug_shows_the_wrapped_value() {
        let id = AnyIdentifier::new("row");
        assert_eq!(format!("{id:?}"), "\"row\"");
        assert!(id.type_name().contains("str"));
    }
}
