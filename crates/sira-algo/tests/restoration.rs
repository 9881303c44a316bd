use sira_algo::restoration::Combinations;
use sira_algo::test_utils::{parallel_supply_model, two_commodity_model, two_line_model};
use sira_algo::{
    assign_streams, HazardRange, RepairSetResolver, RestorationAxis, RestorationParams,
    RestorationPrognosis, RestorationScheduler, SimulationParams, WeightCriterion,
};
use std::collections::HashSet;

fn simulation() -> SimulationParams {
    SimulationParams {
        hazard: HazardRange::new(0.1, 1.0, 0.1).unwrap(),
        num_samples: 100,
        seed: 21,
        restoration_axis: RestorationAxis::new(60.0, 1.0).unwrap(),
        restore_time_max: 300.0,
        required_time_threshold: 0.99,
    }
}

#[test]
fn test_two_tasks_on_one_stream() {
    let slots = assign_streams(&[(0, 3.0), (1, 5.0)], 1, 0.0);
    assert_eq!((slots[0].start, slots[0].end), (0.0, 3.0));
    assert_eq!((slots[1].start, slots[1].end), (3.0, 8.0));
    assert_eq!(slots.iter().map(|s| s.end).fold(0.0, f64::max), 8.0);
}

#[test]
fn test_three_supply_minimal_cover() {
    // any two of three half-capacity supplies restore the line
    let model = parallel_supply_model(&[0.5, 0.5, 0.5]).unwrap();
    let n = model.component_count();
    let resolver =
        RepairSetResolver::new(&model, WeightCriterion::Uniform, &vec![1.0; n], &vec![0.0; n])
            .unwrap();
    let plan = resolver.resolve(0);
    assert!(plan.feasible);

    let chosen = &plan.chosen_supplies["power"];
    let analytical_minimum = (1..=3)
        .find(|&k| Combinations::new(3, k).any(|subset| subset.len() as f64 * 0.5 >= 1.0))
        .unwrap();
    assert_eq!(chosen.len(), analytical_minimum);
    // supplies, transformers, junction, control building, output
    assert!(plan.nodes.len() >= 2 * analytical_minimum + 3);
    assert_eq!(plan.nodes.len(), 7);
}

#[test]
fn test_commodities_are_combined() {
    let model = two_commodity_model().unwrap();
    let n = model.component_count();
    let resolver =
        RepairSetResolver::new(&model, WeightCriterion::Uniform, &vec![1.0; n], &vec![0.0; n])
            .unwrap();
    let plan = resolver.resolve(0);
    assert_eq!(plan.chosen_supplies.len(), 2);
    assert_eq!(plan.nodes.len(), 5);
}

#[test]
fn test_schedules_never_overlap_or_repeat() {
    let model = parallel_supply_model(&[0.5, 0.5, 0.5, 0.5]).unwrap();
    let params = RestorationParams {
        scenario_hazards: vec![0.4, 0.8],
        stream_counts: vec![1, 2, 3],
        ..RestorationParams::default()
    };
    let report = RestorationPrognosis::new(&model, simulation(), params)
        .unwrap()
        .run_configured()
        .unwrap();

    for hazard in &report.hazards {
        for scenario in &hazard.scenarios {
            let ids: HashSet<&str> =
                scenario.tasks.iter().map(|t| t.component_id.as_str()).collect();
            assert_eq!(ids.len(), scenario.tasks.len());

            for stream in 0..scenario.streams {
                let mut intervals: Vec<(f64, f64)> = scenario
                    .tasks
                    .iter()
                    .filter(|t| t.stream == stream)
                    .map(|t| (t.start, t.end))
                    .collect();
                intervals.sort_by(|a, b| a.0.total_cmp(&b.0));
                for pair in intervals.windows(2) {
                    assert!(pair[0].1 <= pair[1].0 + 1e-9, "overlap on stream {stream}: {pair:?}");
                }
            }
            for task in &scenario.tasks {
                assert!(task.start >= 1.0);
                assert!(task.duration > 0.0);
            }
            let series = &scenario.capacity_series;
            assert!(series.windows(2).all(|w| w[1].capacity >= w[0].capacity));
            for point in series {
                assert_eq!(point.line_capacity.len(), scenario.lines.len());
                let total: f64 = point.line_capacity.iter().sum();
                assert!((total - point.capacity).abs() < 1e-12);
            }
        }
    }
    assert_eq!(report.line_times.len(), 2 * 3);
}

#[test]
fn test_priority_line_restores_first() {
    let model = two_line_model().unwrap();
    let n = model.component_count();
    let mut durations = vec![0.0; n];
    durations[model.network().index_of("a").unwrap().index()] = 3.0;
    durations[model.network().index_of("b").unwrap().index()] = 5.0;

    let plans = RepairSetResolver::new(&model, WeightCriterion::MinTime, &durations, &vec![0.0; n])
        .unwrap()
        .resolve_all();
    let outcome = RestorationScheduler::new(&model, 300.0, 1.0)
        .unwrap()
        .schedule(&plans, &durations, &vec![0.0; n], 1, 0.0)
        .unwrap();

    assert_eq!(outcome.lines[0].line, "o1");
    assert_eq!(outcome.lines[0].completion_time, 3.0);
    assert_eq!(outcome.lines[1].completion_time, 8.0);
    assert_eq!(outcome.schedule.makespan(), 8.0);
}
