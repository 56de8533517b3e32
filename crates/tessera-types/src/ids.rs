//! Strongly-typed identifiers for simulation entities.
//!
//! Newtype wrappers prevent accidental mixing of element and contact
//! indices. Particles are arena-indexed: constraints refer to them by
//! plain `u32` index, never by reference.

use serde::{Deserialize, Serialize};

/// Index into the tetrahedral element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u32);

/// Index into the active collision constraint list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContactId(pub u32);

/// Kind of constraint a partition entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// Stable Neo-Hookean element constraint (deviatoric + volumetric pair).
    StableNeoHookean,
    /// One-sided contact constraint.
    Collision,
}

/// Identifier of one constraint across both constraint models.
///
/// Partitions are lists of these. An elastic id covers both sub-constraints
/// of its element, which are always projected in the same visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConstraintId {
    /// A tetrahedral element.
    Elastic(ElementId),
    /// An active contact.
    Collision(ContactId),
}

impl ConstraintId {
    /// Elastic constraint of element `index`.
    #[inline]
    pub fn elastic(index: u32) -> Self {
        Self::Elastic(ElementId(index))
    }

    /// Collision constraint `index`.
    #[inline]
    pub fn collision(index: u32) -> Self {
        Self::Collision(ContactId(index))
    }

    /// The model this constraint belongs to.
    #[inline]
    pub fn kind(self) -> ConstraintKind {
        match self {
            Self::Elastic(_) => ConstraintKind::StableNeoHookean,
            Self::Collision(_) => ConstraintKind::Collision,
        }
    }

    /// Index within its model.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Self::Elastic(e) => e.index(),
            Self::Collision(c) => c.index(),
        }
    }
}

impl ElementId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ContactId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for ElementId {
    fn from(val: u32) -> Self {
        Self(val)
    }
}

impl From<u32> for ContactId {
    fn from(val: u32) -> Self {
        Self(val)
    }
}
