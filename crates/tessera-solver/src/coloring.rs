//! Greedy graph coloring of constraints into partitions.
//!
//! Offline tooling: the stepper never calls this. Two constraints conflict
//! when they share a particle; each color becomes one partition.

use tessera_types::{ConstraintId, TesseraError, TesseraResult};

use crate::partition::PartitionTable;

/// Colors `constraints` greedily in the given order.
///
/// Each entry is a constraint id and the particles it touches. Colors are
/// found with a u64 bitmask of neighbor colors; constraints with 64 or
/// more colored neighbors fall back to a linear scan.
pub fn greedy_partitions(
    constraints: &[(ConstraintId, Vec<u32>)],
    particle_count: usize,
) -> TesseraResult<PartitionTable> {
    if constraints.is_empty() {
        return Ok(PartitionTable::default());
    }

    // Build particle → constraint adjacency
    let mut particle_to_constraints: Vec<Vec<usize>> = vec![Vec::new(); particle_count];
    for (ci, (id, particles)) in constraints.iter().enumerate() {
        for &p in particles {
            let slot = particle_to_constraints.get_mut(p as usize).ok_or_else(|| {
                TesseraError::InvalidPartition(format!(
                    "{id:?} references particle {p} (particle count: {particle_count})"
                ))
            })?;
            slot.push(ci);
        }
    }

    let n = constraints.len();
    let mut colors: Vec<usize> = vec![usize::MAX; n];
    let mut max_color = 0;
    let mut wide: Vec<bool> = Vec::new();

    for ci in 0..n {
        // Bitmask of colors used by already-colored neighbors
        let mut used_mask: u64 = 0;
        let mut overflow = false;
        for &p in &constraints[ci].1 {
            for &neighbor in &particle_to_constraints[p as usize] {
                let c = colors[neighbor];
                if neighbor == ci || c == usize::MAX {
                    continue;
                }
                if c < 64 {
                    used_mask |= 1u64 << c;
                } else {
                    overflow = true;
                }
            }
        }

        let color = if used_mask != u64::MAX {
            (!used_mask).trailing_zeros() as usize
        } else {
            // All 64 low colors taken, scan the rest
            wide.clear();
            wide.resize(max_color + 2, false);
            if overflow {
                for &p in &constraints[ci].1 {
                    for &neighbor in &particle_to_constraints[p as usize] {
                        let c = colors[neighbor];
                        if neighbor != ci && c != usize::MAX {
                            wide[c] = true;
                        }
                    }
                }
            }
            (64..wide.len()).find(|&c| !wide[c]).unwrap_or(wide.len())
        };
        colors[ci] = color;
        max_color = max_color.max(color);
    }

    let mut partitions: Vec<Vec<ConstraintId>> = vec![Vec::new(); max_color + 1];
    for (ci, &color) in colors.iter().enumerate() {
        partitions[color].push(constraints[ci].0);
    }

    Ok(PartitionTable::new(partitions))
}
