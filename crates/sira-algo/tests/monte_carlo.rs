use sira_algo::stats::RunningStats;
use sira_algo::test_utils::{parallel_supply_model, two_node_model};
use sira_algo::{
    DamageStateSampler, FragilityEvaluator, HazardRange, MonteCarloAggregator, RestorationAxis,
    SampleDraws, SimulationParams,
};

fn params(num_samples: usize, seed: u64) -> SimulationParams {
    SimulationParams {
        hazard: HazardRange::new(0.1, 0.5, 0.2).unwrap(),
        num_samples,
        seed,
        restoration_axis: RestorationAxis::new(20.0, 1.0).unwrap(),
        restore_time_max: 300.0,
        required_time_threshold: 0.99,
    }
}

#[test]
fn test_median_intensity_fails_half_the_trials() {
    let model = two_node_model(0.3).unwrap();
    let mc = MonteCarloAggregator::new(&model, params(10_000, 42)).unwrap();
    let results = mc.run(&[0.3], 10_000).unwrap();
    let response = &results.responses[0];

    for component in &response.components {
        assert!(
            (component.failure_rate - 0.5).abs() < 0.03,
            "{} failure rate {}",
            component.component_id,
            component.failure_rate
        );
        assert_eq!(component.damage_state_counts.iter().sum::<usize>(), 10_000);
    }
    assert!((response.mean_economic_loss - 0.5).abs() < 0.02);
    assert!((response.expected_economic_loss - 0.5).abs() < 1e-9);
}

#[test]
fn test_standard_error_shrinks_with_sample_count() {
    let model = two_node_model(0.3).unwrap();
    let std_error = |num_samples: usize| {
        let mc = MonteCarloAggregator::new(&model, params(num_samples, 7)).unwrap();
        let response = mc.run(&[0.3], num_samples).unwrap().responses.remove(0);
        let mut stats = RunningStats::default();
        for loss in &response.economic_loss_samples {
            stats.push(*loss);
        }
        stats.std_error()
    };
    let small = std_error(100);
    let large = std_error(10_000);
    assert!(large < small / 3.0, "std error {large} vs {small}");
}

#[test]
fn test_results_repeat_for_a_fixed_seed() {
    let model = parallel_supply_model(&[0.5, 0.5, 0.5]).unwrap();
    let mc = MonteCarloAggregator::new(&model, params(500, 3)).unwrap();
    let first = mc.run_configured().unwrap();
    let second = mc.run_configured().unwrap();
    assert_eq!(first.draws, second.draws);
    for (a, b) in first.responses.iter().zip(&second.responses) {
        assert_eq!(a.economic_loss_samples, b.economic_loss_samples);
        assert_eq!(a.output_samples, b.output_samples);
        assert_eq!(a.mean_recovery_curve, b.mean_recovery_curve);
    }
}

#[cfg(feature = "parallel")]
#[test]
fn test_thread_count_does_not_change_results() {
    let model = parallel_supply_model(&[0.5, 0.5, 0.5]).unwrap();
    let mc = MonteCarloAggregator::new(&model, params(400, 5)).unwrap();
    let draws = SampleDraws::generate(400, model.component_count(), 5);

    let single = rayon::ThreadPoolBuilder::new()
        .num_threads(1)
        .build()
        .unwrap()
        .install(|| mc.evaluate_level(0.35, &draws).unwrap());
    let multi = rayon::ThreadPoolBuilder::new()
        .num_threads(4)
        .build()
        .unwrap()
        .install(|| mc.evaluate_level(0.35, &draws).unwrap());

    assert_eq!(single.mean_economic_loss, multi.mean_economic_loss);
    assert_eq!(single.mean_output, multi.mean_output);
    assert_eq!(single.system_damage_exceedance, multi.system_damage_exceedance);
}

#[test]
fn test_sampled_states_match_sampler() {
    let model = two_node_model(0.3).unwrap();
    let sampler = DamageStateSampler::new(FragilityEvaluator::new(model.fragilities()));
    let draws = SampleDraws::generate(2_000, model.component_count(), 17);
    let mc = MonteCarloAggregator::new(&model, params(2_000, 17)).unwrap();
    let response = mc.evaluate_level(0.25, &draws).unwrap();

    let expected_failures = (0..draws.num_samples)
        .filter(|&t| sampler.sample_damage_state("Feeder", 0.25, draws.get(t, 0)).unwrap() == 1)
        .count();
    let feeder = response.component("in").unwrap();
    assert_eq!(feeder.damage_state_counts[1], expected_failures);
}

#[test]
fn test_output_falls_as_hazard_rises() {
    let model = parallel_supply_model(&[0.5, 0.5]).unwrap();
    let mc = MonteCarloAggregator::new(&model, params(2_000, 1)).unwrap();
    let results = mc.run(&[0.05, 0.3, 1.5], 2_000).unwrap();
    let outputs: Vec<f64> = results.responses.iter().map(|r| r.mean_output).collect();
    assert!(outputs[0] > outputs[1] && outputs[1] > outputs[2], "{outputs:?}");
    assert!(outputs.iter().all(|&o| (0.0..=100.0).contains(&o)));
}
