//! Contact-neighbor rebuild cost under the adaptive schedule: the
//! `pipeline::rebuild_contact_neighbors` hot loop (§4.H).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::DVec3;
use peridem_core::particle::{GeometryHandle, MaterialHandle, Particle, ParticleId, ParticleKind, ReferenceParticleHandle, Transform};
use peridem_core::state::{ModelState, Nodes};
use peridem_core::{pipeline, NeighborManager};

/// `n` single-node particles scattered on a grid with spacing `spacing`,
/// each a separate zone so every pair is a candidate contact neighbor.
fn scattered_particles_state(n_per_axis: usize, spacing: f64) -> ModelState {
  let mut state = ModelState::new();
  let count = n_per_axis * n_per_axis * n_per_axis;
  state.nodes = Nodes::with_capacity(count);

  let mut pid = 0u32;
  for x in 0..n_per_axis {
    for y in 0..n_per_axis {
      for z in 0..n_per_axis {
        let p = DVec3::new(x as f64 * spacing, y as f64 * spacing, z as f64 * spacing);
        state.nodes.reference_position.push(p);
        state.nodes.position.push(p);
        state.nodes.displacement.push(DVec3::ZERO);
        state.nodes.velocity.push(DVec3::ZERO);
        state.nodes.force.push(DVec3::ZERO);
        state.nodes.volume.push(spacing.powi(3));
        state.nodes.fixity.push(0);
        state.nodes.weighted_volume.push(0.0);
        state.nodes.dilation.push(0.0);
        state.nodes.damage.push(0.0);
        state.nodes.particle_id.push(pid);
        state.nodes.velocity_magnitude.push(0.0);

        state.particles.push(Particle {
          id: ParticleId(pid),
          kind: ParticleKind::Particle,
          zone_id: 0,
          reference: ReferenceParticleHandle(0),
          geometry: GeometryHandle(0),
          transform: Transform::identity(),
          material: MaterialHandle(0),
          horizon: spacing,
          h: spacing,
          density: 1200.0,
          kn: 1.0e9,
          rc: 0.45 * spacing,
          all_dofs_constrained: false,
          compute_force: true,
          node_range: (pid as usize)..(pid as usize + 1),
        });
        pid += 1;
      }
    }
  }
  state.pd_neighbors = vec![smallvec::smallvec![]; count];
  state.contact_neighbors = vec![vec![]; count];
  state.wall_neighbors = vec![vec![]; count];
  state
}

fn bench_rebuild(c: &mut Criterion) {
  let mut group = c.benchmark_group("contact_rebuild");
  let spacing = 1.0;
  for &n in &[6usize, 10, 14] {
    let mut state = scattered_particles_state(n, spacing);
    let mgr = NeighborManager::new(50, 1.5, 0.5 * spacing);
    let label = format!("{}_particles", n * n * n);
    group.bench_with_input(BenchmarkId::new("grid", label), &n, |b, _| {
      b.iter(|| pipeline::rebuild_contact_neighbors(black_box(&mut state), black_box(&mgr)));
    });
  }
  group.finish();
}

criterion_group!(benches, bench_rebuild);
criterion_main!(benches);
