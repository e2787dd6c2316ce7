//! Direct-summation force evaluation benchmarks
//!
//! Measures one derivative evaluation of the gravity field for growing
//! planetesimal disks, with and without the gas nebula.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::hint::black_box;

use orrery::physics::acceleration::{AccelerationField, GravityField};
use orrery::physics::body::BodyType;
use orrery::physics::body_data::BodyData;
use orrery::physics::math::{GAUSS_K2, Scalar, TAU, Vector};
use orrery::physics::nebula::Nebula;

/// Sun plus `count` bodies on near-circular orbits between 1 and 5 AU.
fn disk(count: usize, seed: u64) -> BodyData {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut bodies = BodyData::with_capacity(count + 1);
    bodies.push(1, BodyType::CentralBody, 1.0, 0.00465, Vector::ZERO, Vector::ZERO);

    for i in 0..count {
        let r: Scalar = rng.random_range(1.0..5.0);
        let theta: Scalar = rng.random_range(0.0..TAU);
        let z: Scalar = rng.random_range(-0.01..0.01);
        let speed = libm::sqrt(GAUSS_K2 / r);

        let index = bodies.push(
            i as i64 + 2,
            BodyType::Planetesimal,
            rng.random_range(1e-12..1e-9),
            rng.random_range(1e-9..1e-7),
            Vector::new(r * theta.cos(), r * theta.sin(), z),
            Vector::new(-speed * theta.sin(), speed * theta.cos(), 0.0),
        );
        bodies.gamma_epstein[index] = 1.0e6;
    }

    bodies
}

fn bench_gravity_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("gravity_scaling");
    let field = GravityField::new();

    // Direct summation is O(n^2)
    for &count in &[10, 100, 500, 1_000] {
        let bodies = disk(count, 42);
        let mut dydt = vec![0.0; bodies.y.len()];

        group.throughput(Throughput::Elements((count * (count + 1) / 2) as u64));
        group.bench_with_input(BenchmarkId::new("bodies", count), &count, |b, _| {
            b.iter(|| {
                field.derivative(0.0, black_box(&bodies.y), &bodies, &mut dydt, None);
                black_box(&dydt);
            });
        });
    }

    group.finish();
}

fn bench_nearest_neighbour_tracking(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest_neighbour");
    let field = GravityField::new();
    let bodies = disk(500, 7);
    let mut dydt = vec![0.0; bodies.y.len()];
    let mut nearest = vec![0.0; bodies.len()];

    group.bench_function("without", |b| {
        b.iter(|| field.derivative(0.0, black_box(&bodies.y), &bodies, &mut dydt, None));
    });
    group.bench_function("with", |b| {
        b.iter(|| {
            field.derivative(
                0.0,
                black_box(&bodies.y),
                &bodies,
                &mut dydt,
                Some(&mut nearest),
            )
        });
    });

    group.finish();
}

fn bench_nebula_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("nebula_overhead");
    let bodies = disk(500, 11);
    let mut dydt = vec![0.0; bodies.y.len()];

    for (name, field) in [
        ("gravity", GravityField::new()),
        ("gravity_and_drag", GravityField::with_nebula(Nebula::default())),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| field.derivative(1.0, black_box(&bodies.y), &bodies, &mut dydt, None));
        });
    }

    group.finish();
}

criterion_group!(
    acceleration,
    bench_gravity_scaling,
    bench_nearest_neighbour_tracking,
    bench_nebula_overhead
);
criterion_main!(acceleration);
