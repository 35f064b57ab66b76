use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use static_hmc::adapt::DualAveraging;
use static_hmc::adaptive::AdaptiveHmc;
use static_hmc::hmc::UnitMetricHmc;
use static_hmc::model::{Rosenbrock2D, StandardNormal};

fn static_transition(c: &mut Criterion) {
    let mut group = c.benchmark_group("static_transition");
    for dim in [2usize, 10, 100] {
        let mut hmc = UnitMetricHmc::with_rng(StandardNormal::new(dim), SmallRng::seed_from_u64(0))
            .with_stepsize_and_t(0.1, 1.0)
            .expect("valid step size");
        let mut q = vec![0.5; dim];
        group.bench_with_input(BenchmarkId::from_parameter(dim), &dim, |b, _| {
            b.iter(|| black_box(hmc.sample(&mut q, &[]).expect("transition")))
        });
    }
    group.finish();
}

fn adaptive_transition(c: &mut Criterion) {
    let base = UnitMetricHmc::with_rng(
        Rosenbrock2D { a: 1.0, b: 10.0 },
        SmallRng::seed_from_u64(0),
    )
    .with_stepsize_and_t(0.02, 1.0)
    .expect("valid step size");
    let adapter = DualAveraging::new(0.8)
        .and_then(|a| a.with_initial_stepsize(0.02))
        .expect("valid adapter");
    let mut hmc = AdaptiveHmc::new(base, adapter);
    let mut q = vec![1.0, 1.0];

    c.bench_function("adaptive_transition/rosenbrock", |b| {
        b.iter(|| black_box(hmc.sample(&mut q, &[]).expect("transition")))
    });
}

criterion_group!(benches, static_transition, adaptive_transition);
criterion_main!(benches);
