// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arbor Location: stable structural addresses for shadow graphs.
//!
//! A shadow graph keys everything it caches by where a component sits in the
//! tree, not by which component value happens to be there. This crate provides
//! that key:
//!
//! - [`Location`]: an immutable path from an anchor, made of [`Direction`]s.
//!   Locations support parent and ancestor queries, prefix containment,
//!   rebasing one location under another, and a total pre-order comparison.
//! - [`AnyIdentifier`]: a type-erased identifier so that children of repeating
//!   primitives keep their identity when the backing collection is reordered.
//!
//! ## Ordering
//!
//! Locations compare lexicographically over their directions. Directions
//! compare by the slot position they were assigned, so siblings keep the order
//! of the parent's child list regardless of the identifier type. Ancestors sort
//! before their descendants, and the descendants of a location form a single
//! contiguous range, which makes subtree queries over ordered maps cheap.
//!
//! ```rust
//! use arbor_location::Location;
//! use std::collections::BTreeSet;
//!
//! let root = Location::anchor();
//! let set: BTreeSet<_> = [root.child(1), root.child(0).body(), root.child(0)]
//!     .into_iter()
//!     .collect();
//!
//! let order: Vec<_> = set.iter().map(ToString::to_string).collect();
//! assert_eq!(order, ["/0", "/0/body", "/1"]);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod identifier;
mod location;

pub use identifier::{AnyIdentifier, Identifier};
pub use location::{Ancestors, Direction, Location};
