//! Constraint partitions consumed by the stepper.
//!
//! A partition is a set of constraints that share no particle, so its
//! members can be projected concurrently. Partitions are visited in table
//! order; each boundary is a synchronization barrier.
//!
//! `Xpbd::set_constraint_partitions` runs
//! [`PartitionTable::validate_conflict_free`] once when a table is
//! installed, and again at the next step after the contact list changes.
//! The projection sweep itself never checks. The unsafe
//! `Xpbd::set_constraint_partitions_unchecked` skips the conflict check and
//! leaves conflict-freedom as a caller precondition. Index ranges are
//! always checked, since an out-of-range id would touch memory outside the
//! constraint buffers.

use std::collections::HashSet;

use tessera_types::{ConstraintId, TesseraError, TesseraResult};

/// Ordered list of conflict-free constraint groups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionTable {
    partitions: Vec<Vec<ConstraintId>>,
    /// One past the largest elastic index referenced (0 if none).
    elastic_end: usize,
    /// One past the largest collision index referenced (0 if none).
    collision_end: usize,
}

impl PartitionTable {
    /// Wraps a list of partitions.
    pub fn new(partitions: Vec<Vec<ConstraintId>>) -> Self {
        let mut elastic_end = 0;
        let mut collision_end = 0;
        for id in partitions.iter().flatten() {
            match id {
                ConstraintId::Elastic(e) => elastic_end = elastic_end.max(e.index() + 1),
                ConstraintId::Collision(c) => collision_end = collision_end.max(c.index() + 1),
            }
        }
        Self {
            partitions,
            elastic_end,
            collision_end,
        }
    }

    /// The partitions, in visiting order.
    pub fn partitions(&self) -> &[Vec<ConstraintId>] {
        &self.partitions
    }

    /// Consumes the table, returning the raw partitions.
    pub fn into_inner(self) -> Vec<Vec<ConstraintId>> {
        self.partitions
    }

    /// Number of partitions.
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    /// Returns true if there are no partitions.
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Total number of constraint entries over all partitions.
    pub fn constraint_count(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }

    /// Returns true if any partition lists an elastic constraint.
    pub fn references_elasticity(&self) -> bool {
        self.elastic_end > 0
    }

    /// Returns true if any partition lists a collision constraint.
    pub fn references_collisions(&self) -> bool {
        self.collision_end > 0
    }

    /// Checks every id against the model sizes. O(1).
    pub fn check_bounds(&self, elastic_count: usize, collision_count: usize) -> TesseraResult<()> {
        if self.elastic_end > elastic_count {
            return Err(TesseraError::InvalidPartition(format!(
                "elastic constraint {} referenced, but only {} exist",
                self.elastic_end - 1,
                elastic_count
            )));
        }
        if self.collision_end > collision_count {
            return Err(TesseraError::InvalidPartition(format!(
                "collision constraint {} referenced, but only {} exist",
                self.collision_end - 1,
                collision_count
            )));
        }
        Ok(())
    }

    /// Offline check of the conflict-free precondition.
    ///
    /// `particles_of` returns the particles touched by a constraint, or
    /// `None` for an unknown id. Fails on the first partition that
    /// repeats a particle or a constraint id.
    pub fn validate_conflict_free<F>(&self, particles_of: F) -> TesseraResult<()>
    where
        F: Fn(ConstraintId) -> Option<Vec<u32>>,
    {
        for (p, partition) in self.partitions.iter().enumerate() {
            let mut particles: HashSet<u32> = HashSet::new();
            let mut ids: HashSet<ConstraintId> = HashSet::new();
            for &id in partition {
                if !ids.insert(id) {
                    return Err(TesseraError::InvalidPartition(format!(
                        "partition {p} lists {id:?} twice"
                    )));
                }
                let touched = particles_of(id).ok_or_else(|| {
                    TesseraError::InvalidPartition(format!("partition {p} lists unknown {id:?}"))
                })?;
                for particle in touched {
                    if !particles.insert(particle) {
                        return Err(TesseraError::InvalidPartition(format!(
                            "partition {p}: particle {particle} is shared ({id:?})"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

impl From<Vec<Vec<ConstraintId>>> for PartitionTable {
    fn from(partitions: Vec<Vec<ConstraintId>>) -> Self {
        Self::new(partitions)
    }
}
