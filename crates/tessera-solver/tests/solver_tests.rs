//! Integration tests for tessera-solver.

use std::sync::atomic::{AtomicUsize, Ordering};

use tessera_contact::CollisionConstraint;
use tessera_material::{ElasticMaterial, LameParameters};
use tessera_math::Vec3;
use tessera_mesh::generators::{single_tetrahedron, tet_block};
use tessera_mesh::TetMesh;
use tessera_solver::{
    greedy_partitions, ElasticProjection, ParallelScheduler, PartitionTable, Scheduler,
    SchedulerKind, SequentialScheduler, SolverConfig, StepPhase, Xpbd, XpbdSnapshot,
    ZeroMassPolicy,
};
use tessera_telemetry::{EventBus, EventKind, TelemetryHook, VecSink};
use tessera_types::constants::DEFAULT_COLLISION_COMPLIANCE;
use tessera_types::{ConstraintId, ConstraintKind, TesseraError};

fn soft(young_modulus: f32) -> ElasticMaterial {
    ElasticMaterial::new("soft", young_modulus, 0.3)
}

/// 3×1×1 block of 0.5 cubes with its `x = 0` face pinned.
fn pinned_beam(young_modulus: f32, config: SolverConfig) -> Xpbd {
    let mesh = tet_block(3, 1, 1, 0.5);
    let lame = soft(young_modulus).lame().unwrap();
    let mut xpbd =
        Xpbd::with_materials(&mesh, &vec![lame; mesh.tetrahedron_count()], config).unwrap();
    let masses: Vec<f32> = xpbd
        .positions()
        .iter()
        .map(|p| if p.x == 0.0 { 0.0 } else { 1.0 })
        .collect();
    xpbd.set_masses(&masses).unwrap();
    let table = xpbd.greedy_partitions().unwrap();
    xpbd.set_constraint_partitions(table).unwrap();
    xpbd
}

fn gravity(n: usize) -> Vec<Vec3> {
    vec![Vec3::new(0.0, -9.8, 0.0); n]
}

fn residual_norm(xpbd: &Xpbd) -> f32 {
    xpbd.constraint_residuals(ConstraintKind::StableNeoHookean)
        .iter()
        .map(|r| r * r)
        .sum::<f32>()
        .sqrt()
}

fn max_distance(a: &[Vec3], b: &[Vec3]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(p, q)| (*p - *q).length())
        .fold(0.0, f32::max)
}

fn tet_volume(x: &[Vec3]) -> f32 {
    (x[1] - x[0]).dot((x[2] - x[0]).cross(x[3] - x[0])) / 6.0
}

/// Tetrahedron A on top of the `z = 0` plane and tetrahedron B below it,
/// with B's apex (particle 4) at `z = apex_z` under A's bottom face.
fn stacked_pair(apex_z: f32) -> TetMesh {
    #[rustfmt::skip]
    let positions = [
        0.0, 0.0, 0.0,
        1.0, 0.0, 0.0,
        0.0, 1.0, 0.0,
        0.0, 0.0, 1.0,
        0.25, 0.25, apex_z,
        0.0, 0.0, -1.0,
        1.0, 0.0, -1.0,
        0.0, 1.0, -1.0,
    ];
    TetMesh::from_interleaved(&positions, &[0, 1, 2, 3, 4, 5, 7, 6]).unwrap()
}

/// Tetrahedron A above the `z = 0` plane with edge 0–1 along x, and
/// tetrahedron B below `z = edge_z` with edge 4–5 along y. The two edges
/// cross over the origin; A's edge is below B's when `edge_z > 0`.
fn crossed_pair(edge_z: f32) -> TetMesh {
    #[rustfmt::skip]
    let positions = [
        -0.5, 0.0, 0.0,
        0.5, 0.0, 0.0,
        0.0, -0.5, 1.0,
        0.0, 0.5, 1.0,
        0.0, -0.5, edge_z,
        0.0, 0.5, edge_z,
        -0.5, 0.0, edge_z - 1.0,
        0.5, 0.0, edge_z - 1.0,
    ];
    TetMesh::from_interleaved(&positions, &[0, 1, 3, 2, 4, 5, 7, 6]).unwrap()
}

fn mesh_positions(mesh: &TetMesh) -> Vec<Vec3> {
    (0..mesh.vertex_count())
        .map(|i| mesh.position_vec3(i))
        .collect()
}

fn separation(xpbd: &Xpbd, contact: &CollisionConstraint) -> f32 {
    let x = xpbd.positions();
    let mut nodes = [Vec3::ZERO; 4];
    for (slot, &p) in contact.particles().iter().enumerate() {
        nodes[slot] = x[p as usize];
    }
    contact.evaluate(&nodes).unwrap().value
}

// ─── ParticleSystem Tests ─────────────────────────────────────

#[test]
fn construction_from_mesh() {
    let mesh = tet_block(2, 1, 1, 1.0);
    let xpbd = Xpbd::new(&mesh, &ElasticMaterial::default()).unwrap();

    assert_eq!(xpbd.number_of_particles(), mesh.vertex_count());
    assert_eq!(
        xpbd.number_of_constraints(ConstraintKind::StableNeoHookean),
        2 * mesh.tetrahedron_count()
    );
    assert_eq!(xpbd.number_of_constraints(ConstraintKind::Collision), 0);
    assert_eq!(xpbd.surface_triangles(), mesh.triangles.as_slice());
    assert!(xpbd.masses().iter().all(|&m| m == 1.0), "Default mass is 1");
    assert!(xpbd.velocities().iter().all(|v| *v == Vec3::ZERO), "Starts at rest");
    assert_eq!(xpbd.phase(), StepPhase::Idle);
}

#[test]
fn setters_reject_wrong_length() {
    let mut xpbd = Xpbd::new(&single_tetrahedron(1.0), &ElasticMaterial::default()).unwrap();
    let before = xpbd.positions();

    let err = xpbd.set_positions(&[Vec3::ZERO; 3]).unwrap_err();
    assert!(matches!(
        err,
        TesseraError::DimensionMismatch {
            expected: 4,
            actual: 3,
            ..
        }
    ));
    assert!(xpbd.set_velocities(&[Vec3::ZERO; 5]).is_err());
    assert!(xpbd.set_external_forces(&[]).is_err());
    assert!(xpbd.set_masses(&[1.0; 2]).is_err());
    assert_eq!(xpbd.positions(), before, "Rejected call must not touch state");
}

#[test]
fn setters_round_trip() {
    let mut xpbd = Xpbd::new(&single_tetrahedron(1.0), &ElasticMaterial::default()).unwrap();
    let x = vec![Vec3::X, Vec3::Y, Vec3::Z, Vec3::ONE];
    let v = vec![Vec3::splat(0.5); 4];
    let f = gravity(4);
    xpbd.set_positions(&x).unwrap();
    xpbd.set_velocities(&v).unwrap();
    xpbd.set_external_forces(&f).unwrap();
    xpbd.set_masses(&[1.0, 2.0, 4.0, 0.5]).unwrap();

    assert_eq!(xpbd.positions(), x);
    assert_eq!(xpbd.velocities(), v);
    assert_eq!(xpbd.external_forces(), f);
    assert_eq!(xpbd.particles().inverse_masses(), &[1.0, 0.5, 0.25, 2.0]);
}

#[test]
fn negative_mass_is_rejected() {
    let mut xpbd = Xpbd::new(&single_tetrahedron(1.0), &ElasticMaterial::default()).unwrap();
    let err = xpbd.set_masses(&[1.0, -1.0, 1.0, 1.0]).unwrap_err();
    assert!(matches!(err, TesseraError::InvalidMass { index: 1, .. }));
    assert!(xpbd.set_masses(&[1.0, f32::NAN, 1.0, 1.0]).is_err());
    assert_eq!(xpbd.masses(), &[1.0; 4], "Masses unchanged after rejection");
}

#[test]
fn zero_mass_policy() {
    let mesh = single_tetrahedron(1.0);
    let lame = [ElasticMaterial::default().lame().unwrap()];

    let mut pinning = Xpbd::with_materials(&mesh, &lame, SolverConfig::default()).unwrap();
    pinning.set_masses(&[0.0, 1.0, 1.0, 1.0]).unwrap();
    assert!(pinning.particles().is_pinned(0));
    assert!(!pinning.particles().is_pinned(1));

    let config = SolverConfig {
        zero_mass: ZeroMassPolicy::Reject,
        ..Default::default()
    };
    let mut rejecting = Xpbd::with_materials(&mesh, &lame, config).unwrap();
    assert!(matches!(
        rejecting.set_masses(&[0.0, 1.0, 1.0, 1.0]),
        Err(TesseraError::InvalidMass { index: 0, .. })
    ));
}

// ─── Elasticity Model Tests ───────────────────────────────────

#[test]
fn rest_data_of_single_tetrahedron() {
    let lame = LameParameters::new(2.0, 4.0).unwrap();
    let xpbd = Xpbd::with_materials(&single_tetrahedron(2.0), &[lame], SolverConfig::default())
        .unwrap();

    let dm_inv = xpbd.shape_matrix_inverses()[0];
    assert!(
        (dm_inv.x_axis.x - 0.5).abs() < 1e-6 && (dm_inv.y_axis.y - 0.5).abs() < 1e-6,
        "Dm is 2·I, so its inverse is I/2"
    );
    assert_eq!(xpbd.rest_stable_gamma(), vec![1.0], "Volumetric target is det F = 1");

    let v0 = xpbd.elasticity().rest_volumes()[0];
    assert!((v0 - 8.0 / 6.0).abs() < 1e-5);
    let compliance = xpbd.compliance(ConstraintKind::StableNeoHookean);
    assert!((compliance[0] - 1.0 / (2.0 * v0)).abs() < 1e-6, "α_D = 1/(μV₀)");
    assert!((compliance[1] - 1.0 / (4.0 * v0)).abs() < 1e-6, "α_H = 1/(λV₀)");
}

#[test]
fn set_lame_coefficients_reprepares() {
    let mut xpbd = Xpbd::new(&single_tetrahedron(1.0), &ElasticMaterial::default()).unwrap();
    let lame = LameParameters::new(1.0, 2.0).unwrap();
    xpbd.set_lame_coefficients(&[lame]).unwrap();
    assert_eq!(xpbd.lame_coefficients(), vec![lame]);
    let compliance = xpbd.compliance(ConstraintKind::StableNeoHookean);
    assert!((compliance[0] - 6.0).abs() < 1e-4, "α_D = 1/(μV₀) with V₀ = 1/6");
    assert!((compliance[1] - 3.0).abs() < 1e-4, "α_H = 1/(λV₀) with V₀ = 1/6");

    assert!(xpbd.set_lame_coefficients(&[lame, lame]).is_err());
    let bad = LameParameters {
        mu: -1.0,
        lambda: 1.0,
    };
    assert!(matches!(
        xpbd.set_lame_coefficients(&[bad]),
        Err(TesseraError::InvalidMaterial(_))
    ));
    assert_eq!(xpbd.lame_coefficients(), vec![lame], "Rejected update keeps materials");
}

#[test]
fn invalid_material_fails_construction() {
    let material = ElasticMaterial::new("bad", 1e5, 0.5);
    assert!(Xpbd::new(&single_tetrahedron(1.0), &material).is_err());
}

#[test]
fn degenerate_element_fails_construction() {
    let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 3.0, 0.0, 0.0];
    let mesh = TetMesh::from_interleaved(&positions, &[0, 1, 2, 3]).unwrap();
    assert!(matches!(
        Xpbd::new(&mesh, &ElasticMaterial::default()),
        Err(TesseraError::InvalidMesh(_))
    ));
}

// ─── Stepping Tests ───────────────────────────────────────────

#[test]
fn rest_state_is_fixpoint() {
    for projection in [ElasticProjection::Sequential, ElasticProjection::Coupled] {
        let config = SolverConfig {
            elastic_projection: projection,
            ..Default::default()
        };
        let lame = [soft(1e5).lame().unwrap()];
        let mut xpbd = Xpbd::with_materials(&single_tetrahedron(1.0), &lame, config).unwrap();
        xpbd.set_constraint_partitions(vec![vec![ConstraintId::elastic(0)]])
            .unwrap();
        let rest = xpbd.positions();

        for _ in 0..5 {
            xpbd.step(0.01, 10, 2).unwrap();
        }
        let drift = max_distance(&xpbd.positions(), &rest);
        assert!(drift < 1e-4, "Rest shape drifted by {drift} ({projection:?})");
        assert_eq!(xpbd.phase(), StepPhase::Idle);
        assert_eq!(xpbd.step_count(), 5);
    }
}

#[test]
fn pinned_particles_never_move() {
    for projection in [ElasticProjection::Coupled, ElasticProjection::Sequential] {
        let config = SolverConfig {
            elastic_projection: projection,
            ..Default::default()
        };
        let mut xpbd = pinned_beam(1e4, config);
        let n = xpbd.number_of_particles();
        xpbd.set_external_forces(&gravity(n)).unwrap();
        let before = xpbd.positions();

        for _ in 0..10 {
            xpbd.step(0.01, 5, 2).unwrap();
        }
        let after = xpbd.positions();
        for i in (0..n).filter(|&i| xpbd.particles().is_pinned(i)) {
            assert_eq!(after[i], before[i], "Pinned particle {i} moved ({projection:?})");
            assert_eq!(xpbd.velocities()[i], Vec3::ZERO);
        }
        assert!(
            after.iter().any(|p| p.y < -1e-4),
            "Free particles should sag under gravity ({projection:?})"
        );
    }
}

#[test]
fn zero_iterations_is_free_fall() {
    let mut xpbd = Xpbd::new(&single_tetrahedron(1.0), &ElasticMaterial::default()).unwrap();
    xpbd.set_constraint_partitions(vec![vec![ConstraintId::elastic(0)]])
        .unwrap();
    xpbd.set_external_forces(&gravity(4)).unwrap();
    let before = xpbd.positions();

    xpbd.step(0.01, 0, 1).unwrap();

    for (i, (p, q)) in xpbd.positions().iter().zip(&before).enumerate() {
        let dy = p.y - q.y;
        assert!((dy + 9.8e-4).abs() < 1e-6, "Particle {i}: dy = {dy}");
        assert_eq!(p.x, q.x);
    }
    for v in xpbd.velocities() {
        assert!((v.y + 0.098).abs() < 1e-4, "v.y = {}", v.y);
    }
}

#[test]
fn invalid_step_arguments_are_rejected() {
    let mut xpbd = Xpbd::new(&single_tetrahedron(1.0), &ElasticMaterial::default()).unwrap();
    xpbd.set_external_forces(&gravity(4)).unwrap();
    let before = xpbd.positions();

    for dt in [0.0, -0.01, f32::NAN, f32::INFINITY] {
        assert!(
            matches!(xpbd.step(dt, 10, 1), Err(TesseraError::InvalidConfig(_))),
            "dt = {dt} should be rejected"
        );
    }
    assert!(matches!(
        xpbd.step(0.01, 10, 0),
        Err(TesseraError::InvalidConfig(_))
    ));
    assert_eq!(xpbd.positions(), before, "Rejected step must not move particles");
    assert_eq!(xpbd.step_count(), 0);
    assert_eq!(xpbd.phase(), StepPhase::Idle, "Failed step leaves the solver idle");
}

#[test]
fn advance_uses_configured_counts() {
    let mesh = single_tetrahedron(1.0);
    let lame = [soft(1e5).lame().unwrap()];
    let config = SolverConfig {
        iterations: 0,
        substeps: 4,
        ..Default::default()
    };
    let mut xpbd = Xpbd::with_materials(&mesh, &lame, config).unwrap();
    xpbd.set_external_forces(&gravity(4)).unwrap();
    let y0 = xpbd.positions()[0].y;

    xpbd.advance(0.04).unwrap();

    // Four substeps of 0.01 with no projection: y = y0 − g·h²·(1+2+3+4)
    let dy = xpbd.positions()[0].y - y0;
    assert!((dy + 9.8e-4 * 10.0).abs() < 1e-5, "dy = {dy}");
    assert!((xpbd.sim_time() - 0.04).abs() < 1e-6);
}

#[test]
fn convergence_is_monotonic_in_iterations() {
    let mut norms = Vec::new();
    for iterations in [1, 2, 4, 8, 16] {
        let mut xpbd = pinned_beam(1e5, SolverConfig::default());
        let bent: Vec<Vec3> = xpbd
            .positions()
            .iter()
            .map(|p| Vec3::new(p.x, p.y + 0.05 * p.x * p.x, p.z))
            .collect();
        xpbd.set_positions(&bent).unwrap();
        xpbd.step(0.01, iterations, 1).unwrap();
        norms.push(residual_norm(&xpbd));
    }

    for pair in norms.windows(2) {
        assert!(
            pair[1] <= pair[0] * (1.0 + 1e-3) + 1e-4,
            "Residual grew with more iterations: {norms:?}"
        );
    }
    assert!(
        norms[4] < 0.1 * norms[0],
        "16 iterations should cut the residual by 10×: {norms:?}"
    );
}

#[test]
fn partition_order_does_not_change_fixed_point() {
    let run = |reverse: bool| {
        let mut xpbd = pinned_beam(1e4, SolverConfig::default());
        let mut graph = xpbd.constraint_graph();
        if reverse {
            graph.reverse();
        }
        let table = greedy_partitions(&graph, xpbd.number_of_particles()).unwrap();
        xpbd.set_constraint_partitions(table).unwrap();
        let n = xpbd.number_of_particles();
        xpbd.set_external_forces(&gravity(n)).unwrap();
        for _ in 0..5 {
            xpbd.step(0.01, 40, 2).unwrap();
        }
        (xpbd.partitions().clone(), xpbd.positions())
    };

    let (forward_table, forward) = run(false);
    let (reverse_table, reverse) = run(true);
    assert_ne!(forward_table, reverse_table, "Orderings should give different tables");
    let diff = max_distance(&forward, &reverse);
    assert!(diff < 1e-3, "Partitionings disagree by {diff}");
}

#[test]
fn single_tetrahedron_preserves_volume_under_gravity() {
    let a = 6.0_f32.cbrt();
    let lame = LameParameters::new(1.0, 1.0).unwrap();
    for projection in [ElasticProjection::Sequential, ElasticProjection::Coupled] {
        let config = SolverConfig {
            elastic_projection: projection,
            ..Default::default()
        };
        let mut xpbd = Xpbd::with_materials(&single_tetrahedron(a), &[lame], config).unwrap();
        xpbd.set_masses(&[1.0, 1.0, 0.0, 1.0]).unwrap();
        xpbd.set_external_forces(&gravity(4)).unwrap();
        xpbd.set_constraint_partitions(vec![vec![ConstraintId::elastic(0)]])
            .unwrap();
        let v0 = tet_volume(&xpbd.positions());
        assert!((v0 - 1.0).abs() < 1e-5, "Rest volume should be 1, got {v0}");

        for _ in 0..10 {
            xpbd.step(0.01, 10, 1).unwrap();
        }

        let x = xpbd.positions();
        let v = tet_volume(&x);
        assert!((v - 1.0).abs() < 0.05, "Volume drifted to {v} ({projection:?})");
        assert_eq!(x[2], Vec3::new(0.0, a, 0.0), "Pinned node stays put");
        assert!(x[0].y < 0.0 && x[1].y < 0.0 && x[3].y < 0.0, "Free nodes fall");
    }
}

#[test]
fn fully_pinned_constraints_are_skipped() {
    for projection in [ElasticProjection::Sequential, ElasticProjection::Coupled] {
        let config = SolverConfig {
            elastic_projection: projection,
            ..Default::default()
        };
        let lame = [soft(1e5).lame().unwrap()];
        let mut xpbd = Xpbd::with_materials(&single_tetrahedron(1.0), &lame, config).unwrap();
        xpbd.set_masses(&[0.0; 4]).unwrap();
        let mut deformed = xpbd.positions();
        deformed[3] = Vec3::new(0.1, 0.2, 2.0);
        xpbd.set_positions(&deformed).unwrap();
        xpbd.set_velocities(&[Vec3::ONE; 4]).unwrap();
        xpbd.set_external_forces(&gravity(4)).unwrap();

        // Particles 0 and 1 are 1 apart, the thickness asks for 2
        let contact = CollisionConstraint::point_point(0, 1, 2.0, DEFAULT_COLLISION_COMPLIANCE);
        xpbd.set_collision_constraints(vec![contact]).unwrap();
        xpbd.set_constraint_partitions(vec![
            vec![ConstraintId::elastic(0)],
            vec![ConstraintId::collision(0)],
        ])
        .unwrap();

        let sink = VecSink::new();
        let events = sink.events();
        let mut bus = EventBus::new();
        bus.add_sink(Box::new(sink));
        xpbd.set_hook(Box::new(TelemetryHook::new(bus)));

        xpbd.step(0.01, 5, 2).unwrap();

        let x = xpbd.positions();
        assert_eq!(x, deformed, "All-pinned constraints moved particles ({projection:?})");
        assert!(x.iter().all(|p| p.is_finite()));
        assert!(xpbd.velocities().iter().all(|v| *v == Vec3::ZERO));
        assert!(xpbd
            .lagrange_multipliers(ConstraintKind::StableNeoHookean)
            .iter()
            .chain(&xpbd.lagrange_multipliers(ConstraintKind::Collision))
            .all(|&l| l == 0.0));

        let events = events.lock().unwrap();
        let skipped = events.iter().find_map(|e| match e.kind {
            EventKind::StepEnd { skipped, .. } => Some(skipped),
            _ => None,
        });
        // Two constraints, five sweeps, two substeps
        assert_eq!(skipped, Some(20), "Every visit is a skip ({projection:?})");
    }
}

#[test]
fn empty_partition_table_leaves_elements_unprojected() {
    let mut xpbd = Xpbd::new(&single_tetrahedron(1.0), &soft(1e5)).unwrap();
    assert!(!xpbd.partitions().references_elasticity());
    let mut stretched = xpbd.positions();
    stretched[3].z = 3.0;
    xpbd.set_positions(&stretched).unwrap();

    xpbd.step(0.01, 10, 1).unwrap();
    assert_eq!(xpbd.positions()[3].z, 3.0, "No table, no projection");

    let table = xpbd.greedy_partitions().unwrap();
    assert!(table.references_elasticity());
    assert!(!table.references_collisions());
    xpbd.set_constraint_partitions(table).unwrap();
    xpbd.step(0.01, 10, 1).unwrap();
    let z = xpbd.positions()[3].z;
    assert!(z < 3.0, "Stretched node should be pulled back, z = {z}");
}

#[test]
fn sequential_and_parallel_schedulers_agree() {
    let mesh = tet_block(8, 8, 8, 0.125);
    let lame = vec![soft(1e5).lame().unwrap(); mesh.tetrahedron_count()];
    let run = |scheduler: SchedulerKind, threads: usize| {
        let config = SolverConfig {
            scheduler,
            threads,
            ..Default::default()
        };
        let mut xpbd = Xpbd::with_materials(&mesh, &lame, config).unwrap();
        let n = xpbd.number_of_particles();
        let masses: Vec<f32> = xpbd
            .positions()
            .iter()
            .map(|p| if p.y == 0.0 { 0.0 } else { 1.0 })
            .collect();
        xpbd.set_masses(&masses).unwrap();
        xpbd.set_external_forces(&gravity(n)).unwrap();
        let table = xpbd.greedy_partitions().unwrap();
        xpbd.set_constraint_partitions(table).unwrap();
        for _ in 0..3 {
            xpbd.step(0.01, 5, 1).unwrap();
        }
        xpbd.positions()
    };

    let sequential = run(SchedulerKind::Sequential, 0);
    assert_eq!(run(SchedulerKind::Parallel, 0), sequential);
    assert_eq!(run(SchedulerKind::Parallel, 4), sequential);
}

// ─── Collision Tests ──────────────────────────────────────────

#[test]
fn inactive_contact_is_a_no_op() {
    let mesh = stacked_pair(-0.05);
    // Reversed winding puts the apex on the positive side: C = +0.05
    let contact =
        CollisionConstraint::point_triangle(4, [0, 2, 1], 0.0, DEFAULT_COLLISION_COMPLIANCE);

    let mut reference = Xpbd::new(&mesh, &soft(1e5)).unwrap();
    let table = reference.greedy_partitions().unwrap();
    reference.set_constraint_partitions(table).unwrap();

    let mut xpbd = Xpbd::new(&mesh, &soft(1e5)).unwrap();
    xpbd.set_collision_constraints(vec![contact.clone()]).unwrap();
    let table = xpbd.greedy_partitions().unwrap();
    xpbd.set_constraint_partitions(table).unwrap();
    assert!(separation(&xpbd, &contact) > 0.0);

    for _ in 0..3 {
        reference.step(0.01, 10, 1).unwrap();
        xpbd.step(0.01, 10, 1).unwrap();
    }

    assert_eq!(xpbd.positions(), reference.positions(), "Contact should not act");
    assert_eq!(xpbd.lagrange_multipliers(ConstraintKind::Collision), vec![0.0]);
    assert_eq!(xpbd.constraint_residuals(ConstraintKind::Collision), vec![0.0]);
    let drift = max_distance(&xpbd.positions(), &mesh_positions(&mesh));
    assert!(drift < 1e-4, "Bodies at rest drifted by {drift}");
}

#[test]
fn penetrating_contact_never_deepens() {
    let contact =
        CollisionConstraint::point_triangle(4, [0, 1, 2], 0.0, DEFAULT_COLLISION_COMPLIANCE);
    for push in [-50.0, 50.0] {
        let mut xpbd = Xpbd::new(&stacked_pair(-0.05), &ElasticMaterial::default()).unwrap();
        xpbd.set_collision_constraints(vec![contact.clone()]).unwrap();
        let table = xpbd.greedy_partitions().unwrap();
        assert_eq!(
            table.partitions().last(),
            Some(&vec![ConstraintId::collision(0)]),
            "The contact conflicts with both elements"
        );
        xpbd.set_constraint_partitions(table).unwrap();

        let mut forces = vec![Vec3::ZERO; 8];
        forces[4] = Vec3::new(0.0, 0.0, push);
        xpbd.set_external_forces(&forces).unwrap();

        let before = separation(&xpbd, &contact);
        assert!((before + 0.05).abs() < 1e-6);
        xpbd.step(0.01, 1, 1).unwrap();
        let after = separation(&xpbd, &contact);

        assert!(
            after >= before,
            "Penetration deepened from {before} to {after} (push {push})"
        );
        let lambda = xpbd.lagrange_multipliers(ConstraintKind::Collision)[0];
        assert!(lambda >= 0.0, "Contact multiplier went negative: {lambda}");
    }
}

#[test]
fn penetrating_point_point_contact_separates() {
    let mut xpbd = Xpbd::new(&stacked_pair(-0.05), &ElasticMaterial::default()).unwrap();
    // Apex of B and corner of A are about 0.357 apart
    let contact = CollisionConstraint::point_point(4, 0, 0.5, DEFAULT_COLLISION_COMPLIANCE);
    xpbd.set_collision_constraints(vec![contact.clone()]).unwrap();
    let table = xpbd.greedy_partitions().unwrap();
    assert_eq!(table.len(), 2, "Disjoint elements share a partition");
    xpbd.set_constraint_partitions(table).unwrap();

    let before = separation(&xpbd, &contact);
    assert!(before < -0.1, "Contact starts violated: {before}");
    xpbd.step(0.01, 4, 1).unwrap();
    let after = separation(&xpbd, &contact);

    assert!(after >= before, "Separation decreased from {before} to {after}");
    assert!(after > -1e-3, "Contact should be resolved, C = {after}");
    let lambda = xpbd.lagrange_multipliers(ConstraintKind::Collision)[0];
    assert!(lambda > 0.0, "Active contact has a positive multiplier: {lambda}");
}

#[test]
fn penetrating_edge_edge_contact_separates() {
    let mut xpbd = Xpbd::new(&crossed_pair(0.05), &ElasticMaterial::default()).unwrap();
    let contact = CollisionConstraint::edge_edge(
        [0, 1],
        [4, 5],
        [0.0, 0.0, 1.0],
        0.0,
        DEFAULT_COLLISION_COMPLIANCE,
    );
    xpbd.set_collision_constraints(vec![contact.clone()]).unwrap();
    let table = xpbd.greedy_partitions().unwrap();
    xpbd.set_constraint_partitions(table).unwrap();

    let before = separation(&xpbd, &contact);
    assert!((before + 0.05).abs() < 1e-6, "B's edge starts 0.05 above A's: {before}");
    xpbd.step(0.01, 4, 1).unwrap();
    let after = separation(&xpbd, &contact);

    assert!(after >= before, "Separation decreased from {before} to {after}");
    assert!(after > -1e-3, "Contact should be resolved, C = {after}");
    let lambda = xpbd.lagrange_multipliers(ConstraintKind::Collision)[0];
    assert!(lambda > 0.0, "Active contact has a positive multiplier: {lambda}");
    let x = xpbd.positions();
    assert!(x[0].z > 0.0 && x[4].z < 0.05, "Edges are pushed apart along +z");
}

#[test]
fn contacts_with_bad_indices_are_rejected() {
    let mut xpbd = Xpbd::new(&single_tetrahedron(1.0), &ElasticMaterial::default()).unwrap();
    let bad = CollisionConstraint::point_point(0, 9, 0.0, 0.0);
    assert!(xpbd.set_collision_constraints(vec![bad]).is_err());
    assert_eq!(xpbd.number_of_constraints(ConstraintKind::Collision), 0);
}

// ─── Partition Tests ──────────────────────────────────────────

#[test]
fn greedy_partitions_are_conflict_free() {
    let xpbd = pinned_beam(1e5, SolverConfig::default());
    let table = xpbd.greedy_partitions().unwrap();
    assert_eq!(
        table.constraint_count(),
        xpbd.number_of_constraints(ConstraintKind::StableNeoHookean) / 2
    );
    assert!(table.len() > 1, "Adjacent elements need different colors");
    xpbd.validate_partitions(&table).unwrap();
}

#[test]
fn conflicting_partition_is_rejected() {
    let mut xpbd = pinned_beam(1e5, SolverConfig::default());
    let installed = xpbd.partitions().clone();
    // Elements 0 and 1 come from the same cube and share its diagonal
    let err = xpbd
        .set_constraint_partitions(vec![vec![ConstraintId::elastic(0), ConstraintId::elastic(1)]])
        .unwrap_err();
    assert!(matches!(err, TesseraError::InvalidPartition(_)));
    assert_eq!(xpbd.partitions(), &installed, "Rejected table is not installed");
}

#[test]
fn duplicate_and_out_of_range_ids_are_rejected() {
    let mut xpbd = Xpbd::new(&single_tetrahedron(1.0), &ElasticMaterial::default()).unwrap();
    let duplicate = vec![vec![ConstraintId::elastic(0), ConstraintId::elastic(0)]];
    assert!(xpbd.set_constraint_partitions(duplicate).is_err());

    let out_of_range = vec![vec![ConstraintId::elastic(3)]];
    assert!(matches!(
        xpbd.set_constraint_partitions(out_of_range.clone()),
        Err(TesseraError::InvalidPartition(_))
    ));
    let unchecked = unsafe { xpbd.set_constraint_partitions_unchecked(out_of_range) };
    assert!(unchecked.is_err(), "Ranges are checked even on the unchecked path");

    let contact = vec![vec![ConstraintId::collision(0)]];
    assert!(xpbd.set_constraint_partitions(contact).is_err());
}

#[test]
fn stale_contact_partitions_fail_the_step() {
    let mut xpbd = Xpbd::new(&single_tetrahedron(1.0), &ElasticMaterial::default()).unwrap();
    xpbd.set_collision_constraints(vec![
        CollisionConstraint::point_point(0, 1, 0.0, 0.0),
        CollisionConstraint::point_point(2, 3, 0.0, 0.0),
    ])
    .unwrap();
    xpbd.set_constraint_partitions(vec![vec![
        ConstraintId::collision(0),
        ConstraintId::collision(1),
    ]])
    .unwrap();
    xpbd.step(0.01, 1, 1).unwrap();

    // Same ids, but the new contacts share particle 0
    xpbd.set_collision_constraints(vec![
        CollisionConstraint::point_point(0, 1, 0.0, 0.0),
        CollisionConstraint::point_point(0, 2, 0.0, 0.0),
    ])
    .unwrap();
    assert!(matches!(
        xpbd.step(0.01, 1, 1),
        Err(TesseraError::InvalidPartition(_))
    ));

    // Fewer contacts than the table references
    xpbd.set_collision_constraints(Vec::new()).unwrap();
    assert!(xpbd.step(0.01, 1, 1).is_err());

    xpbd.set_constraint_partitions(PartitionTable::default())
        .unwrap();
    xpbd.step(0.01, 1, 1).unwrap();
}

// ─── Scheduler Tests ──────────────────────────────────────────

#[test]
fn schedulers_visit_every_id_once() {
    let ids: Vec<ConstraintId> = (0..1000).map(ConstraintId::elastic).collect();
    let schedulers: Vec<Box<dyn Scheduler>> = vec![
        Box::new(SequentialScheduler),
        Box::new(ParallelScheduler::new()),
        Box::new(ParallelScheduler::with_threads(3).unwrap()),
    ];

    for scheduler in schedulers {
        let visits: Vec<AtomicUsize> = (0..ids.len()).map(|_| AtomicUsize::new(0)).collect();
        let kernel = |id: ConstraintId| {
            visits[id.index()].fetch_add(1, Ordering::Relaxed);
            id.index() % 10 == 0
        };
        let skipped = scheduler.run(&ids, &kernel);

        assert_eq!(skipped, 100, "{} miscounted skips", scheduler.name());
        assert!(
            visits.iter().all(|v| v.load(Ordering::Relaxed) == 1),
            "{} visited an id twice or never",
            scheduler.name()
        );
    }
}

#[test]
fn parallel_scheduler_thread_count() {
    let scheduler = ParallelScheduler::with_threads(2).unwrap();
    assert_eq!(scheduler.threads(), 2);
    assert_eq!(scheduler.name(), "parallel");
}

// ─── Config Tests ─────────────────────────────────────────────

#[test]
fn config_presets() {
    let config = SolverConfig::default();
    assert_eq!(config.scheduler, SchedulerKind::Parallel);
    assert_eq!(config.elastic_projection, ElasticProjection::Sequential);
    assert_eq!(config.zero_mass, ZeroMassPolicy::Pin);
    config.validate().unwrap();

    let debug = SolverConfig::debug();
    assert_eq!(debug.scheduler, SchedulerKind::Sequential);
    assert!(debug.report_residuals);

    let hq = SolverConfig::high_quality();
    assert!(hq.iterations > config.iterations);
    assert!(hq.substeps > config.substeps);
}

#[test]
fn config_validation() {
    let bad = SolverConfig {
        substeps: 0,
        ..Default::default()
    };
    assert!(bad.validate().is_err());
    let bad = SolverConfig {
        degenerate_epsilon: -1.0,
        ..Default::default()
    };
    assert!(bad.validate().is_err());

    let mesh = single_tetrahedron(1.0);
    let lame = [ElasticMaterial::default().lame().unwrap()];
    let bad = SolverConfig {
        degenerate_epsilon: f32::NAN,
        ..Default::default()
    };
    assert!(Xpbd::with_materials(&mesh, &lame, bad).is_err());
}

#[test]
fn config_serialization() {
    let config = SolverConfig::high_quality();
    let json = serde_json::to_string(&config).unwrap();
    let from_json: SolverConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(from_json, config);

    let text = toml::to_string(&SolverConfig::debug()).unwrap();
    let from_toml: SolverConfig = toml::from_str(&text).unwrap();
    assert_eq!(from_toml, SolverConfig::debug());
}

#[test]
fn set_config_switches_scheduler() {
    let mut xpbd = Xpbd::new(&single_tetrahedron(1.0), &ElasticMaterial::default()).unwrap();
    assert_eq!(xpbd.scheduler_name(), "parallel");
    xpbd.set_config(SolverConfig::debug()).unwrap();
    assert_eq!(xpbd.scheduler_name(), "sequential");
    assert_eq!(xpbd.config().iterations, 3);
}

// ─── Snapshot Tests ───────────────────────────────────────────

#[test]
fn snapshot_restores_trajectory() {
    let mut xpbd = pinned_beam(1e4, SolverConfig::default());
    let n = xpbd.number_of_particles();
    xpbd.set_external_forces(&gravity(n)).unwrap();
    for _ in 0..3 {
        xpbd.step(0.01, 10, 2).unwrap();
    }

    let bytes = xpbd.snapshot().to_bytes().unwrap();
    let snapshot = XpbdSnapshot::from_bytes(&bytes).unwrap();
    assert_eq!(snapshot.step, 3);
    assert_eq!(snapshot.particle_count(), n);

    let mut replay = pinned_beam(1e4, SolverConfig::default());
    replay.restore(&snapshot).unwrap();
    assert_eq!(replay.positions(), xpbd.positions());
    assert_eq!(replay.masses(), xpbd.masses());

    for _ in 0..3 {
        xpbd.step(0.01, 10, 2).unwrap();
        replay.step(0.01, 10, 2).unwrap();
    }
    assert_eq!(replay.positions(), xpbd.positions(), "Replay diverged");
    assert_eq!(replay.velocities(), xpbd.velocities());
}

#[test]
fn snapshot_with_wrong_dimensions_is_rejected() {
    let beam = pinned_beam(1e4, SolverConfig::default());
    let mut tet = Xpbd::new(&single_tetrahedron(1.0), &ElasticMaterial::default()).unwrap();
    let before = tet.positions();

    let err = tet.restore(&beam.snapshot()).unwrap_err();
    assert!(matches!(err, TesseraError::DimensionMismatch { .. }));
    assert_eq!(tet.positions(), before);

    assert!(matches!(
        XpbdSnapshot::from_bytes(&[1, 2, 3]),
        Err(TesseraError::Serialization(_))
    ));
}

// ─── Diagnostics Tests ────────────────────────────────────────

#[test]
fn multipliers_are_flat_per_kind() {
    let mut xpbd = pinned_beam(1e4, SolverConfig::default());
    let n = xpbd.number_of_particles();
    xpbd.set_external_forces(&gravity(n)).unwrap();
    xpbd.step(0.01, 5, 1).unwrap();

    let elements = xpbd.elasticity().len();
    let lambdas = xpbd.lagrange_multipliers(ConstraintKind::StableNeoHookean);
    assert_eq!(lambdas.len(), 2 * elements);
    assert!(lambdas.iter().any(|&l| l != 0.0), "Loaded beam has active multipliers");
    assert_eq!(
        xpbd.compliance(ConstraintKind::StableNeoHookean).len(),
        2 * elements
    );
    assert_eq!(
        xpbd.constraint_residuals(ConstraintKind::StableNeoHookean).len(),
        2 * elements
    );
    assert_eq!(xpbd.rest_deviation().len(), elements);
}

#[test]
fn telemetry_hook_receives_lifecycle_events() {
    let mut xpbd = pinned_beam(1e4, SolverConfig::debug());
    let sink = VecSink::new();
    let events = sink.events();
    let mut bus = EventBus::new();
    bus.add_sink(Box::new(sink));
    assert!(xpbd.set_hook(Box::new(TelemetryHook::new(bus))).is_none());

    xpbd.step(0.01, 2, 2).unwrap();
    xpbd.step(0.01, 2, 2).unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 10, "5 events per step: {events:?}");
    assert!(matches!(
        events[0].kind,
        EventKind::StepBegin {
            iterations: 2,
            substeps: 2,
            ..
        }
    ));
    assert!(matches!(events[1].kind, EventKind::SubstepEnd { substep: 0 }));
    assert!(matches!(events[2].kind, EventKind::SubstepEnd { substep: 1 }));
    assert!(matches!(
        events[3].kind,
        EventKind::Residual {
            violated_contacts: 0,
            ..
        }
    ));
    assert!(matches!(events[4].kind, EventKind::StepEnd { skipped: 0, .. }));
    assert_eq!(events[5].step, 1);
    assert!(xpbd.take_hook().is_some());
}
