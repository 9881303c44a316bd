//! Benchmarks for the Monte-Carlo trial loop
//!
//! ## Running Benchmarks
//!
//! ```bash
//! cargo bench -p sira-algo
//!
//! # Single group
//! cargo bench -p sira-algo -- evaluate_level
//!
//! # Compare against a saved baseline
//! cargo bench -p sira-algo -- --save-baseline my-baseline
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sira_algo::test_utils::parallel_supply_model;
use sira_algo::{HazardRange, MonteCarloAggregator, RestorationAxis, SampleDraws, SimulationParams};

const SUPPLY_COUNTS: &[usize] = &[2, 8, 32];
const NUM_SAMPLES: usize = 1_000;

fn params() -> SimulationParams {
    SimulationParams {
        hazard: HazardRange::new(0.1, 1.0, 0.1).unwrap(),
        num_samples: NUM_SAMPLES,
        seed: 0,
        restoration_axis: RestorationAxis::new(30.0, 1.0).unwrap(),
        restore_time_max: 300.0,
        required_time_threshold: 0.99,
    }
}

fn bench_evaluate_level(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate_level");
    group.sample_size(20);

    for &supplies in SUPPLY_COUNTS {
        let fractions = vec![1.0 / supplies as f64; supplies];
        let model = parallel_supply_model(&fractions).unwrap();
        let mc = MonteCarloAggregator::new(&model, params()).unwrap();
        let draws = SampleDraws::generate(NUM_SAMPLES, model.component_count(), 0);

        group.bench_with_input(BenchmarkId::from_parameter(supplies), &draws, |b, draws| {
            b.iter(|| mc.evaluate_level(black_box(0.4), draws).unwrap())
        });
    }
    group.finish();
}

fn bench_draw_generation(c: &mut Criterion) {
    c.bench_function("sample_draws_1000x100", |b| {
        b.iter(|| SampleDraws::generate(black_box(NUM_SAMPLES), 100, 0))
    });
}

criterion_group!(benches, bench_evaluate_level, bench_draw_generation);
criterion_main!(benches);
