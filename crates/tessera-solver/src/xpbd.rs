//! The XPBD solver facade and its substepped stepper.
//!
//! Implements the loop, once per substep `h = dt / substeps`:
//! 1. **Predict** — `x_prev = x`, `x += h·v + h²·w·f`
//! 2. **Reset** — zero every elastic and collision multiplier
//! 3. **Project** — `iterations` sweeps over the partition table; members
//!    of a partition run through the scheduler, partitions run in order
//! 4. **Integrate** — `v = (x − x_prev) / h`
//!
//! All mutable state is owned by [`Xpbd`] and reached only through its
//! methods.

use std::time::Instant;

use tessera_contact::{CollisionConstraint, CollisionConstraintModel};
use tessera_material::{ElasticMaterial, LameParameters};
use tessera_math::{Mat3, Vec3};
use tessera_mesh::TetMesh;
use tessera_telemetry::InspectionHook;
use tessera_types::constants::DEFAULT_DT;
use tessera_types::{ConstraintId, ConstraintKind, TesseraError, TesseraResult};
use tracing::{debug, trace, warn};

use crate::coloring;
use crate::config::SolverConfig;
use crate::elasticity::ElasticityConstraintModel;
use crate::particles::ParticleSystem;
use crate::partition::PartitionTable;
use crate::projection::{ProjectionContext, Visit};
use crate::scheduler::{self, Scheduler};
use crate::shared::SharedSlice;
use crate::snapshot::{flatten, unflatten, XpbdSnapshot};

/// Where the stepper currently is.
///
/// Tracked while [`Xpbd::step`] runs. Hooks are not handed the solver, so
/// callers only ever observe `Idle`, including after a failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    /// Between steps.
    Idle,
    /// Computing inertial positions.
    Predicting,
    /// Sweeping constraint partitions.
    Projecting,
    /// Deriving velocities from the position change.
    Integrating,
}

/// Substepped XPBD solver for one tetrahedral body.
///
/// ```text
/// let mut xpbd = Xpbd::new(&mesh, &material)?;
/// xpbd.set_constraint_partitions(xpbd.greedy_partitions()?)?;
/// loop {
///     xpbd.set_collision_constraints(contacts)?;   // optional, per frame
///     xpbd.step(dt, iterations, substeps)?;
/// }
/// ```
pub struct Xpbd {
    config: SolverConfig,
    particles: ParticleSystem,
    elasticity: ElasticityConstraintModel,
    collisions: CollisionConstraintModel,
    partitions: PartitionTable,
    /// False while the installed table has not been checked against the
    /// current contact list.
    partitions_checked: bool,
    scheduler: Box<dyn Scheduler>,
    surface: Vec<u32>,
    hook: Option<Box<dyn InspectionHook>>,
    phase: StepPhase,
    step_count: u64,
    sim_time: f64,
    /// Substep size of the last step, used to scale residual diagnostics.
    last_h: f32,
    /// Set once the missing-elasticity warning was logged for this table.
    warned_unscheduled: bool,
}

impl Xpbd {
    /// Builds a solver with one material for every element and the
    /// default configuration.
    pub fn new(mesh: &TetMesh, material: &ElasticMaterial) -> TesseraResult<Self> {
        let lame = material.lame()?;
        Self::with_materials(
            mesh,
            &vec![lame; mesh.tetrahedron_count()],
            SolverConfig::default(),
        )
    }

    /// Builds a solver with per-element Lamé parameters.
    ///
    /// Particles start at the mesh's rest positions with unit mass.
    pub fn with_materials(
        mesh: &TetMesh,
        lame: &[LameParameters],
        config: SolverConfig,
    ) -> TesseraResult<Self> {
        config.validate()?;
        mesh.validate()?;
        let elasticity = ElasticityConstraintModel::from_mesh(mesh, lame)?;
        let scheduler = scheduler::from_config(&config)?;

        debug!(
            particles = mesh.vertex_count(),
            elements = elasticity.len(),
            scheduler = scheduler.name(),
            model = elasticity.model().name(),
            "Initialized XPBD solver"
        );

        Ok(Self {
            last_h: DEFAULT_DT / config.substeps as f32,
            config,
            particles: ParticleSystem::from_mesh(mesh),
            elasticity,
            collisions: CollisionConstraintModel::new(),
            partitions: PartitionTable::default(),
            partitions_checked: true,
            scheduler,
            surface: mesh.triangles.clone(),
            hook: None,
            phase: StepPhase::Idle,
            step_count: 0,
            sim_time: 0.0,
            warned_unscheduled: false,
        })
    }

    // ─── Configuration ───────────────────────────────────────

    /// Active configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Replaces the configuration and rebuilds the scheduler.
    pub fn set_config(&mut self, config: SolverConfig) -> TesseraResult<()> {
        config.validate()?;
        self.scheduler = scheduler::from_config(&config)?;
        self.config = config;
        Ok(())
    }

    /// Name of the active scheduler.
    pub fn scheduler_name(&self) -> &str {
        self.scheduler.name()
    }

    /// Installs an inspection hook, returning the previous one.
    pub fn set_hook(
        &mut self,
        hook: Box<dyn InspectionHook>,
    ) -> Option<Box<dyn InspectionHook>> {
        self.hook.replace(hook)
    }

    /// Removes the inspection hook.
    pub fn take_hook(&mut self) -> Option<Box<dyn InspectionHook>> {
        self.hook.take()
    }

    // ─── Stepping ────────────────────────────────────────────

    /// Current phase of the step state machine.
    pub fn phase(&self) -> StepPhase {
        self.phase
    }

    /// Completed steps.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Accumulated simulation time in seconds.
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// Advances by `dt` with the configured iteration and substep counts.
    pub fn advance(&mut self, dt: f32) -> TesseraResult<()> {
        self.step(dt, self.config.iterations, self.config.substeps)
    }

    /// Advances the body by `dt` in `substeps` equal substeps with
    /// `iterations` projection sweeps each.
    ///
    /// `iterations == 0` is an unconstrained symplectic Euler step.
    /// Fails without touching any state when `dt` is not positive and
    /// finite, `substeps` is zero, or the partition table references
    /// constraints that no longer exist. A table that lists contacts is
    /// re-checked for conflicts after the contact list changes.
    pub fn step(&mut self, dt: f32, iterations: u32, substeps: u32) -> TesseraResult<()> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(TesseraError::InvalidConfig(format!(
                "dt must be positive and finite, got {dt}"
            )));
        }
        if substeps == 0 {
            return Err(TesseraError::InvalidConfig(
                "substeps must be at least 1".into(),
            ));
        }
        self.partitions
            .check_bounds(self.elasticity.len(), self.collisions.len())?;
        if !self.partitions_checked {
            self.validate_partitions(&self.partitions)?;
            self.partitions_checked = true;
        }

        let start = Instant::now();
        let step = self.step_count;
        let h = dt / substeps as f32;

        if iterations > 0
            && !self.elasticity.is_empty()
            && !self.partitions.references_elasticity()
            && !self.warned_unscheduled
        {
            warn!(
                elements = self.elasticity.len(),
                "Partition table schedules no elastic constraints; elements will not be projected"
            );
            self.warned_unscheduled = true;
        }

        debug!(step, dt, iterations, substeps, "Step begin");
        if let Some(hook) = self.hook.as_mut() {
            hook.on_step_begin(step, dt, iterations, substeps);
        }

        let mut skipped = 0_u64;
        for substep in 0..substeps {
            self.phase = StepPhase::Predicting;
            self.particles.predict(h);
            self.elasticity.reset_multipliers();
            self.collisions.reset_multipliers();

            self.phase = StepPhase::Projecting;
            for _ in 0..iterations {
                skipped += self.project(h);
            }

            self.phase = StepPhase::Integrating;
            self.particles.integrate_velocities(h);

            trace!(step, substep, "Substep complete");
            if let Some(hook) = self.hook.as_mut() {
                hook.on_substep_end(step, substep);
            }
        }

        self.phase = StepPhase::Idle;
        self.last_h = h;
        self.step_count += 1;
        self.sim_time += dt as f64;

        if skipped > 0 {
            warn!(step, skipped, "Skipped degenerate constraint projections");
        }

        if self.config.report_residuals {
            let x = self.particles.positions();
            let max_elastic = self
                .elasticity
                .residuals(&x, h)
                .iter()
                .flatten()
                .fold(0.0_f32, |m, &r| m.max(r));
            let violated = self.collisions.penetrating_count(&x) as u32;
            debug!(step, max_elastic, violated, "Residuals");
            if let Some(hook) = self.hook.as_mut() {
                hook.on_residual(step, max_elastic, violated);
            }
        }

        let wall_time = start.elapsed().as_secs_f64();
        debug!(step, wall_time, skipped, "Step end");
        if let Some(hook) = self.hook.as_mut() {
            hook.on_step_end(step, wall_time, skipped);
        }
        Ok(())
    }

    /// One sweep over all partitions. Returns the number of skipped visits.
    fn project(&mut self, h: f32) -> u64 {
        let (elements, elastic_lambdas, model) = self.elasticity.split_mut();
        let (contacts, contact_lambdas) = self.collisions.split_mut();
        let particles = &mut self.particles;

        let ctx = ProjectionContext {
            pos_x: SharedSlice::new(particles.pos_x.as_mut_slice()),
            pos_y: SharedSlice::new(particles.pos_y.as_mut_slice()),
            pos_z: SharedSlice::new(particles.pos_z.as_mut_slice()),
            inv_mass: &particles.inv_mass,
            elements,
            elastic_lambdas: SharedSlice::new(elastic_lambdas),
            model,
            contacts,
            contact_lambdas: SharedSlice::new(contact_lambdas),
            inv_h2: 1.0 / (h * h),
            mode: self.config.elastic_projection,
            epsilon: self.config.degenerate_epsilon,
        };

        // SAFETY: every id was range-checked against both models before the
        // step began, and each partition was checked to be conflict-free, so
        // concurrent kernels of one partition touch disjoint particles and
        // distinct multipliers. The scheduler returns before the next
        // partition starts.
        let kernel = |id: ConstraintId| matches!(unsafe { ctx.project(id) }, Visit::Skipped);

        let mut skipped = 0;
        for partition in self.partitions.partitions() {
            skipped += self.scheduler.run(partition, &kernel);
        }
        skipped
    }

    // ─── Particles ───────────────────────────────────────────

    /// Overwrites all positions.
    pub fn set_positions(&mut self, positions: &[Vec3]) -> TesseraResult<()> {
        self.particles.set_positions(positions)
    }

    /// Overwrites all velocities.
    pub fn set_velocities(&mut self, velocities: &[Vec3]) -> TesseraResult<()> {
        self.particles.set_velocities(velocities)
    }

    /// Overwrites the external forces. They are held across steps.
    pub fn set_external_forces(&mut self, forces: &[Vec3]) -> TesseraResult<()> {
        self.particles.set_external_forces(forces)
    }

    /// Sets per-particle masses, applying the configured zero-mass policy.
    pub fn set_masses(&mut self, masses: &[f32]) -> TesseraResult<()> {
        self.particles.set_masses(masses, self.config.zero_mass)
    }

    /// Current positions.
    pub fn positions(&self) -> Vec<Vec3> {
        self.particles.positions()
    }

    /// Current velocities.
    pub fn velocities(&self) -> Vec<Vec3> {
        self.particles.velocities()
    }

    /// External forces.
    pub fn external_forces(&self) -> Vec<Vec3> {
        self.particles.external_forces()
    }

    /// Per-particle masses.
    pub fn masses(&self) -> &[f32] {
        self.particles.masses()
    }

    /// Read access to the particle buffers.
    pub fn particles(&self) -> &ParticleSystem {
        &self.particles
    }

    /// Number of particles.
    pub fn number_of_particles(&self) -> usize {
        self.particles.len()
    }

    /// Surface triangles of the reference mesh, flat.
    pub fn surface_triangles(&self) -> &[u32] {
        &self.surface
    }

    // ─── Materials ───────────────────────────────────────────

    /// Per-element Lamé parameters.
    pub fn lame_coefficients(&self) -> Vec<LameParameters> {
        self.elasticity.lame_coefficients()
    }

    /// Replaces every element's material and re-prepares the constraints.
    pub fn set_lame_coefficients(&mut self, lame: &[LameParameters]) -> TesseraResult<()> {
        self.elasticity.set_lame_coefficients(lame)
    }

    /// Recomputes rest-stable gamma and compliance from the current materials.
    pub fn prepare_constraints(&mut self) {
        self.elasticity.prepare_constraints();
    }

    /// Read access to the elastic constraints.
    pub fn elasticity(&self) -> &ElasticityConstraintModel {
        &self.elasticity
    }

    /// Rest shape-matrix inverse per element.
    pub fn shape_matrix_inverses(&self) -> Vec<Mat3> {
        self.elasticity.shape_matrix_inverses()
    }

    /// Rest-stable gamma per element.
    pub fn rest_stable_gamma(&self) -> Vec<f32> {
        self.elasticity.rest_stable_gamma()
    }

    /// Deviation from the undeformed state per element, `[‖F‖ − √3, det F − 1]`.
    pub fn rest_deviation(&self) -> Vec<[f32; 2]> {
        self.elasticity.rest_deviation(&self.particles.positions())
    }

    // ─── Contacts ────────────────────────────────────────────

    /// Installs this frame's contacts.
    ///
    /// A partition table that lists contacts is re-checked at the next
    /// step, so install the matching table before stepping.
    pub fn set_collision_constraints(
        &mut self,
        constraints: Vec<CollisionConstraint>,
    ) -> TesseraResult<()> {
        self.collisions
            .set_constraints(constraints, self.particles.len())?;
        if self.partitions.references_collisions() {
            self.partitions_checked = false;
        }
        Ok(())
    }

    /// Read access to the contacts.
    pub fn collisions(&self) -> &CollisionConstraintModel {
        &self.collisions
    }

    // ─── Per-kind diagnostics ────────────────────────────────

    /// Number of scalar constraints of `kind` (two per element).
    pub fn number_of_constraints(&self, kind: ConstraintKind) -> usize {
        match kind {
            ConstraintKind::StableNeoHookean => 2 * self.elasticity.len(),
            ConstraintKind::Collision => self.collisions.len(),
        }
    }

    /// Accumulated multipliers of `kind`, flat. Elastic entries are
    /// `[deviatoric, volumetric]` per element.
    pub fn lagrange_multipliers(&self, kind: ConstraintKind) -> Vec<f32> {
        match kind {
            ConstraintKind::StableNeoHookean => self
                .elasticity
                .lagrange_multipliers()
                .iter()
                .flatten()
                .copied()
                .collect(),
            ConstraintKind::Collision => self.collisions.lagrange_multipliers().to_vec(),
        }
    }

    /// Unscaled compliance of `kind`, laid out like [`lagrange_multipliers`](Self::lagrange_multipliers).
    pub fn compliance(&self, kind: ConstraintKind) -> Vec<f32> {
        match kind {
            ConstraintKind::StableNeoHookean => {
                self.elasticity.compliance().into_iter().flatten().collect()
            }
            ConstraintKind::Collision => self.collisions.compliance(),
        }
    }

    /// XPBD residuals of `kind` at the current positions, scaled with the
    /// last step's substep size.
    ///
    /// Elastic entries are `|C + α̃λ|`; contact entries are
    /// `max(0, −(C + α̃λ))`.
    pub fn constraint_residuals(&self, kind: ConstraintKind) -> Vec<f32> {
        let x = self.particles.positions();
        match kind {
            ConstraintKind::StableNeoHookean => self
                .elasticity
                .residuals(&x, self.last_h)
                .into_iter()
                .flatten()
                .collect(),
            ConstraintKind::Collision => self.collisions.residuals(&x, self.last_h),
        }
    }

    // ─── Partitions ──────────────────────────────────────────

    /// The installed partition table.
    pub fn partitions(&self) -> &PartitionTable {
        &self.partitions
    }

    /// Installs a partition table after checking id ranges and
    /// conflict-freedom.
    pub fn set_constraint_partitions(
        &mut self,
        partitions: impl Into<PartitionTable>,
    ) -> TesseraResult<()> {
        let partitions = partitions.into();
        self.validate_partitions(&partitions)?;
        debug!(
            partitions = partitions.len(),
            constraints = partitions.constraint_count(),
            "Installed constraint partitions"
        );
        self.partitions = partitions;
        self.partitions_checked = true;
        self.warned_unscheduled = false;
        Ok(())
    }

    /// Installs a partition table checking only id ranges.
    ///
    /// # Safety
    ///
    /// No two constraints within one partition may touch the same
    /// particle, and no id may appear twice in one partition, for as long
    /// as the table is installed. Replacing the contact list re-enables
    /// the full check at the next step.
    pub unsafe fn set_constraint_partitions_unchecked(
        &mut self,
        partitions: impl Into<PartitionTable>,
    ) -> TesseraResult<()> {
        let partitions = partitions.into();
        partitions.check_bounds(self.elasticity.len(), self.collisions.len())?;
        self.partitions = partitions;
        self.partitions_checked = true;
        self.warned_unscheduled = false;
        Ok(())
    }

    /// Checks a table against the current constraints without installing it.
    pub fn validate_partitions(&self, partitions: &PartitionTable) -> TesseraResult<()> {
        partitions.check_bounds(self.elasticity.len(), self.collisions.len())?;
        partitions.validate_conflict_free(|id| self.constraint_particles(id))
    }

    /// Particles touched by a constraint, or `None` for an unknown id.
    pub fn constraint_particles(&self, id: ConstraintId) -> Option<Vec<u32>> {
        match id {
            ConstraintId::Elastic(e) => self.elasticity.particles(e.index()).map(Vec::from),
            ConstraintId::Collision(c) => self
                .collisions
                .constraints()
                .get(c.index())
                .map(|contact| contact.particles().to_vec()),
        }
    }

    /// Every constraint with the particles it touches, elastic first.
    pub fn constraint_graph(&self) -> Vec<(ConstraintId, Vec<u32>)> {
        let elastic = (0..self.elasticity.len() as u32).map(ConstraintId::elastic);
        let contacts = (0..self.collisions.len() as u32).map(ConstraintId::collision);
        elastic
            .chain(contacts)
            .filter_map(|id| self.constraint_particles(id).map(|p| (id, p)))
            .collect()
    }

    /// Greedy coloring of the current constraint set. Offline tooling;
    /// the step never calls it.
    pub fn greedy_partitions(&self) -> TesseraResult<PartitionTable> {
        coloring::greedy_partitions(&self.constraint_graph(), self.particles.len())
    }

    // ─── Checkpointing ───────────────────────────────────────

    /// Captures the full mutable state.
    pub fn snapshot(&self) -> XpbdSnapshot {
        XpbdSnapshot {
            step: self.step_count,
            sim_time: self.sim_time,
            positions: flatten(&self.particles.positions()),
            velocities: flatten(&self.particles.velocities()),
            external_forces: flatten(&self.particles.external_forces()),
            inverse_masses: self.particles.inverse_masses().to_vec(),
            elastic_multipliers: self.elasticity.lagrange_multipliers().to_vec(),
            collision_multipliers: self.collisions.lagrange_multipliers().to_vec(),
        }
    }

    /// Restores a snapshot taken from a solver with the same mesh and
    /// contact count. Checks every buffer before applying any.
    pub fn restore(&mut self, snapshot: &XpbdSnapshot) -> TesseraResult<()> {
        let n = self.particles.len();
        let check = |what: &'static str, expected: usize, actual: usize| {
            if expected == actual {
                Ok(())
            } else {
                Err(TesseraError::dimension(what, expected, actual))
            }
        };
        check("snapshot positions", 3 * n, snapshot.positions.len())?;
        check("snapshot velocities", 3 * n, snapshot.velocities.len())?;
        check("snapshot forces", 3 * n, snapshot.external_forces.len())?;
        check("snapshot inverse masses", n, snapshot.inverse_masses.len())?;
        check(
            "snapshot elastic multipliers",
            self.elasticity.len(),
            snapshot.elastic_multipliers.len(),
        )?;
        check(
            "snapshot collision multipliers",
            self.collisions.len(),
            snapshot.collision_multipliers.len(),
        )?;
        if let Some((index, &value)) = snapshot
            .inverse_masses
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(TesseraError::InvalidMass { index, value });
        }

        self.particles.set_positions(&unflatten(&snapshot.positions))?;
        self.particles
            .set_velocities(&unflatten(&snapshot.velocities))?;
        self.particles
            .set_external_forces(&unflatten(&snapshot.external_forces))?;
        self.particles.restore_inverse_masses(&snapshot.inverse_masses);
        self.elasticity
            .set_lagrange_multipliers(&snapshot.elastic_multipliers)?;
        self.collisions
            .set_lagrange_multipliers(&snapshot.collision_multipliers)?;
        self.step_count = snapshot.step;
        self.sim_time = snapshot.sim_time;
        Ok(())
    }
}

impl std::fmt::Debug for Xpbd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Xpbd")
            .field("particles", &self.particles.len())
            .field("elements", &self.elasticity.len())
            .field("contacts", &self.collisions.len())
            .field("partitions", &self.partitions.len())
            .field("scheduler", &self.scheduler.name())
            .field("phase", &self.phase)
            .field("step", &self.step_count)
            .finish()
    }
}
