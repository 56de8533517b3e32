//! Physical constants and solver defaults.

/// Default simulation timestep (seconds). 1/60th of a second.
pub const DEFAULT_DT: f32 = 1.0 / 60.0;

/// Default number of XPBD solver iterations per substep.
pub const DEFAULT_ITERATIONS: u32 = 10;

/// Default number of substeps per timestep.
pub const DEFAULT_SUBSTEPS: u32 = 1;

/// Default Young's modulus (Pa) for elastic bodies without an explicit material.
pub const DEFAULT_YOUNG_MODULUS: f32 = 1.0e6;

/// Default Poisson ratio for elastic bodies without an explicit material.
pub const DEFAULT_POISSON_RATIO: f32 = 0.45;

/// Default contact compliance (inverse stiffness). Near zero = hard contact.
pub const DEFAULT_COLLISION_COMPLIANCE: f32 = 1.0e-9;

/// Epsilon below which a constraint's weighted gradient norm is treated as zero.
pub const EPSILON: f32 = 1.0e-12;

/// Rest volume threshold for degenerate tetrahedron detection.
pub const DEGENERATE_VOLUME_THRESHOLD: f32 = 1.0e-12;

/// Area threshold for degenerate triangle detection in contact evaluation.
pub const DEGENERATE_AREA_THRESHOLD: f32 = 1.0e-10;
