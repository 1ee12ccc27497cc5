// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural locations and the directions they are made of.

use core::cmp::Ordering;
use core::fmt;
use core::iter::FusedIterator;

use smallvec::SmallVec;

use crate::identifier::{AnyIdentifier, Identifier};

/// Depth up to which a location's directions are stored inline.
///
/// Shadow trees built from nested primitives are rarely deeper than this near
/// the hot paths, so most locations never touch the heap.
const INLINE_DEPTH: usize = 8;

/// One step from a component to one of its children.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Direction {
    /// The body of a composite component, or the content of a modifier.
    Body,
    /// The child at a fixed position of a sequencing or branching primitive.
    Position(usize),
    /// A child of a repeating primitive, identified independently of its slot.
    Identified {
        /// Identifier that follows the child across reorders.
        id: AnyIdentifier,
        /// Slot index in the parent's child list at the time of assignment.
        position: usize,
    },
}

impl Direction {
    /// Returns the slot position used for ordering siblings.
    ///
    /// [`Direction::Body`] occupies slot `0`.
    #[must_use]
    #[inline]
    pub fn position(&self) -> usize {
        match self {
            Self::Body => 0,
            Self::Position(position) | Self::Identified { position, .. } => *position,
        }
    }

    /// Returns the identifier of an identified direction.
    #[must_use]
    pub fn identifier(&self) -> Option<&AnyIdentifier> {
        match self {
            Self::Identified { id, .. } => Some(id),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Body => 0,
            Self::Position(_) => 1,
            Self::Identified { .. } => 2,
        }
    }
}

impl PartialOrd for Direction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Siblings order by slot position. The kind and identifier only break ties,
/// which keeps the order total and consistent with equality.
impl Ord for Direction {
    fn cmp(&self, other: &Self) -> Ordering {
        self.position()
            .cmp(&other.position())
            .then_with(|| self.rank().cmp(&other.rank()))
            .then_with(|| self.identifier().cmp(&other.identifier()))
    }
}

impl fmt::Debug for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Body => f.write_str("body"),
            Self::Position(position) => write!(f, "{position}"),
            Self::Identified { id, position } => write!(f, "#{id:?}@{position}"),
        }
    }
}

/// A component's address relative to an anchor.
///
/// A location is the sequence of [`Direction`]s leading from the anchor to the
/// component. Locations are ordered in pre-order: an ancestor precedes its
/// descendants, and all descendants of a location sort before the siblings
/// that follow it. Consequently, the locations contained by some location `p`
/// form one contiguous range starting at `p`.
///
/// # Example
///
/// ```rust
/// use arbor_location::Location;
///
/// let root = Location::anchor();
/// let row = root.body().child(2);
/// let cell = row.child_identified("name", 0);
///
/// assert!(row.contains(&cell));
/// assert_eq!(cell.parent(), Some(row.clone()));
/// assert!(row < cell);
/// assert!(cell < root.body().child(3));
///
/// // Rebasing places a relative location under an absolute one.
/// let relative = Location::anchor().child(1);
/// assert_eq!(row.rebase(&relative), row.child(1));
/// ```
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    directions: SmallVec<[Direction; INLINE_DEPTH]>,
}

impl Location {
    /// Returns the anchor, i.e. the location of the root component.
    #[must_use]
    #[inline]
    pub fn anchor() -> Self {
        Self {
            directions: SmallVec::new(),
        }
    }

    /// Builds a location from its directions, starting at the anchor.
    #[must_use]
    pub fn from_directions(directions: impl IntoIterator<Item = Direction>) -> Self {
        Self {
            directions: directions.into_iter().collect(),
        }
    }

    /// Returns `true` if this is the anchor.
    #[must_use]
    #[inline]
    pub fn is_anchor(&self) -> bool {
        self.directions.is_empty()
    }

    /// Returns the number of directions between the anchor and this location.
    #[must_use]
    #[inline]
    pub fn depth(&self) -> usize {
        self.directions.len()
    }

    /// Returns the directions from the anchor to this location.
    #[must_use]
    #[inline]
    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }

    /// Returns the direction leading from the parent to this location.
    #[must_use]
    #[inline]
    pub fn last(&self) -> Option<&Direction> {
        self.directions.last()
    }

    /// Returns the location one `direction` further.
    #[must_use]
    pub fn appending(&self, direction: Direction) -> Self {
        let mut directions = self.directions.clone();
        directions.push(direction);
        Self { directions }
    }

    /// Returns the positional child at `position`.
    #[must_use]
    pub fn child(&self, position: usize) -> Self {
        self.appending(Direction::Position(position))
    }

    /// Returns the child identified by `id`, currently in slot `position`.
    #[must_use]
    pub fn child_identified(&self, id: impl Identifier, position: usize) -> Self {
        self.appending(Direction::Identified {
            id: AnyIdentifier::new(id),
            position,
        })
    }

    /// Returns the location of this component's body.
    #[must_use]
    pub fn body(&self) -> Self {
        self.appending(Direction::Body)
    }

    /// Returns the parent location, or `None` at the anchor.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_anchor() {
            return None;
        }
        self.prefix(self.depth() - 1)
    }

    /// Returns the strict ancestors, nearest first and ending at the anchor.
    #[must_use]
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors {
            location: self,
            remaining: self.depth(),
        }
    }

    /// Returns `true` if `other` equals `self` or lies beneath it.
    #[must_use]
    #[inline]
    pub fn contains(&self, other: &Self) -> bool {
        other.directions.starts_with(&self.directions)
    }

    /// Returns `true` if `other` lies strictly beneath `self`.
    #[must_use]
    #[inline]
    pub fn strictly_contains(&self, other: &Self) -> bool {
        other.depth() > self.depth() && self.contains(other)
    }

    /// Replaces the anchor of `relative` by `self`.
    ///
    /// This is how a parent turns the relative child locations reported by a
    /// primitive into absolute ones.
    #[must_use]
    pub fn rebase(&self, relative: &Self) -> Self {
        let mut directions = self.directions.clone();
        directions.extend(relative.directions.iter().cloned());
        Self { directions }
    }

    /// Returns `self` expressed relative to `ancestor`.
    ///
    /// This inverts [`rebase`](Self::rebase): `ancestor.rebase(&l.relative_to(&ancestor)?) == l`.
    #[must_use]
    pub fn relative_to(&self, ancestor: &Self) -> Option<Self> {
        ancestor
            .contains(self)
            .then(|| Self::from_directions(self.directions[ancestor.depth()..].iter().cloned()))
    }

    /// Returns the ancestor (or `self`) at `depth` directions from the anchor.
    ///
    /// Returns `None` if `depth` exceeds [`depth`](Self::depth).
    #[must_use]
    pub fn prefix(&self, depth: usize) -> Option<Self> {
        let directions = self.directions.get(..depth)?;
        Some(Self::from_directions(directions.iter().cloned()))
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Location({self})")
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_anchor() {
            return f.write_str("/");
        }
        for direction in &self.directions {
            write!(f, "/{direction}")?;
        }
        Ok(())
    }
}

impl FromIterator<Direction> for Location {
    fn from_iter<I: IntoIterator<Item = Direction>>(iter: I) -> Self {
        Self::from_directions(iter)
    }
}

/// Iterator over the strict ancestors of a location.
///
/// Created by [`Location::ancestors`].
#[derive(Clone, Debug)]
pub struct Ancestors<'a> {
    location: &'a Location,
    remaining: usize,
}

impl Iterator for Ancestors<'_> {
    type Item = Location;

    fn next(&mut self) -> Option<Location> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.location.prefix(self.remaining)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Ancestors<'_> {}

impl FusedIterator for Ancestors<'_> {}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use alloc::collections::BTreeSet;
    use alloc::format;
    use alloc::vec;
    use alloc::vec::Vec;

    #[test]
    fn anchor_has_no_parent() {
        let anchor = Location::anchor();
        assert!(anchor.is_anchor());
        assert_eq!(anchor.parent(), None);
        assert_eq!(anchor.ancestors().count(), 0);
        assert_eq!(anchor, Location::default());
    }

    #[test]
    fn ancestors_run_from_parent_to_anchor() {
        let leaf = Location::anchor().body().child(1).child_identified(3_u8, 0);
        let ancestors: Vec<_> = leaf.ancestors().collect();
        assert_eq!(
            ancestors,
            vec![
                Location::anchor().body().child(1),
                Location::anchor().body(),
                Location::anchor(),
            ]
        );
        assert_eq!(leaf.ancestors().len(), 3);
    }

    #[test]
    fn prefix_truncates_to_depth() {
        let leaf = Location::anchor().child(2).body();
        assert_eq!(leaf.prefix(0), Some(Location::anchor()));
        assert_eq!(leaf.prefix(1), Some(Location::anchor().child(2)));
        assert_eq!(leaf.prefix(2), Some(leaf.clone()));
        assert_eq!(leaf.prefix(3), None);
    }

    #[test]
    fn contains_is_an_inclusive_prefix_test() {
        let group = Location::anchor().body();
        let child = group.child(0);
        assert!(group.contains(&group));
        assert!(group.contains(&child));
        assert!(!child.contains(&group));
        assert!(group.strictly_contains(&child));
        assert!(!group.strictly_contains(&group));
        assert!(!group.child(1).contains(&child));
    }

    #[test]
    fn rebase_and_relative_to_are_inverse() {
        let base = Location::anchor().body().child(4);
        let relative = Location::anchor().child_identified("k", 2).body();
        let absolute = base.rebase(&relative);
        assert_eq!(absolute.depth(), 4);
        assert_eq!(absolute.relative_to(&base), Some(relative));
        assert_eq!(base.relative_to(&absolute), None);
        assert_eq!(Location::anchor().rebase(&base), base);
    }

    #[test]
    fn siblings_order_by_slot_position_not_identifier() {
        let parent = Location::anchor();
        let z_first = parent.child_identified("z", 0);
        let a_second = parent.child_identified("a", 1);
        assert!(z_first < a_second);
        assert!(parent.child(0) < parent.child(1));
        assert!(parent.child(2) < parent.child(10));
    }

    #[test]
    fn order_is_consistent_with_equality() {
        let parent = Location::anchor();
        let left = parent.child_identified(1_u32, 0);
        let right = parent.child_identified(2_u32, 0);
        assert_ne!(left, right);
        assert_ne!(left.cmp(&right), Ordering::Equal);
        assert_ne!(parent.body().cmp(&parent.child(0)), Ordering::Equal);
    }

    #[test]
    fn descendants_form_a_contiguous_range() {
        let root = Location::anchor();
        let all: BTreeSet<Location> = [
            root.clone(),
            root.child(0),
            root.child(0).body(),
            root.child(0).body().child(3),
            root.child(1),
            root.child(1).child_identified('q', 0),
            root.child(2),
        ]
        .into_iter()
        .collect();

        let subtree = root.child(0);
        let in_range: Vec<_> = all
            .range(subtree.clone()..)
            .take_while(|location| subtree.contains(location))
            .cloned()
            .collect();
        let expected: Vec<_> = all
            .iter()
            .filter(|location| subtree.contains(location))
            .cloned()
            .collect();
        assert_eq!(in_range, expected);
        assert_eq!(in_range.len(), 3);
    }

    #[test]
    fn display_lists_directions() {
        let location = Location::anchor().body().child(2).child_identified("x", 1);
        assert_eq!(format!("{location}"), "/body/2/#\"x\"@1");
        assert_eq!(format!("{}", Location::anchor()), "/");
        assert_eq!(format!("{location:?}"), "Location(/body/2/#\"x\"@1)");
    }
}
