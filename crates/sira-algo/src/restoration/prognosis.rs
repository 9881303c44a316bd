//! Restoration prognosis over scenario hazards and stream counts.

use super::repair_set::{RepairPlanReport, RepairSetResolver, WeightCriterion};
use super::schedule::{CapacityPoint, LineRestoration, RestorationScheduler, RestorationTask};
use crate::monte_carlo::{MonteCarloAggregator, SampleDraws, SimulationParams};
use crate::recovery::{
    component_type_criticality, ComponentRestoration, RecoveryEstimator, ReplacementPolicy,
    TypeCriticality,
};
use serde::{Deserialize, Serialize};
use sira_core::{SiraError, SiraResult, SystemModel};
use tracing::info;

/// Restoration run parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestorationParams {
    pub scenario_hazards: Vec<f64>,
    pub stream_counts: Vec<usize>,
    pub start_offset: f64,
    pub weight_criterion: WeightCriterion,
    pub replacement_policy: ReplacementPolicy,
    /// Recovery status at which a component counts as restored
    pub restoration_threshold: f64,
}

impl Default for RestorationParams {
    fn default() -> Self {
        Self {
            scenario_hazards: Vec::new(),
            stream_counts: vec![1],
            start_offset: 1.0,
            weight_criterion: WeightCriterion::default(),
            replacement_policy: ReplacementPolicy::default(),
            restoration_threshold: 0.98,
        }
    }
}

impl RestorationParams {
    pub fn validate(&self) -> SiraResult<()> {
        if let Some(h) = self.scenario_hazards.iter().find(|h| !(**h >= 0.0)) {
            return Err(SiraError::Validation(format!("scenario hazard {h} must be non-negative")));
        }
        if self.stream_counts.iter().any(|&s| s == 0) {
            return Err(SiraError::Validation("stream counts must be at least 1".into()));
        }
        if !(self.start_offset >= 0.0) {
            return Err(SiraError::Validation(format!(
                "start offset {} must be non-negative",
                self.start_offset
            )));
        }
        if !(self.restoration_threshold > 0.0 && self.restoration_threshold <= 1.0) {
            return Err(SiraError::Validation(format!(
                "restoration threshold {} outside (0, 1]",
                self.restoration_threshold
            )));
        }
        Ok(())
    }
}

/// Schedule and line completions for one stream count.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioRestoration {
    pub streams: usize,
    pub makespan: f64,
    pub tasks: Vec<RestorationTask>,
    pub lines: Vec<LineRestoration>,
    pub capacity_series: Vec<CapacityPoint>,
}

/// Everything computed at one scenario hazard.
#[derive(Debug, Clone, Serialize)]
pub struct HazardRestoration {
    pub hazard: f64,
    pub component_restoration: Vec<ComponentRestoration>,
    pub criticality: Vec<TypeCriticality>,
    pub repair_plans: Vec<RepairPlanReport>,
    pub scenarios: Vec<ScenarioRestoration>,
}

/// Row of the (hazard, streams, line) completion table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineRestorationTime {
    pub hazard: f64,
    pub streams: usize,
    pub line: String,
    pub completion_time: f64,
    pub feasible: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrognosisReport {
    pub hazards: Vec<HazardRestoration>,
    pub line_times: Vec<LineRestorationTime>,
}

impl PrognosisReport {
    pub fn line_time(
        &self,
        hazard: f64,
        streams: usize,
        line: &str,
    ) -> Option<&LineRestorationTime> {
        self.line_times
            .iter()
            .find(|r| (r.hazard - hazard).abs() < 1e-12 && r.streams == streams && r.line == line)
    }
}

pub struct RestorationPrognosis<'a> {
    aggregator: MonteCarloAggregator<'a>,
    params: RestorationParams,
}

impl<'a> RestorationPrognosis<'a> {
    pub fn new(
        model: &'a SystemModel,
        simulation: SimulationParams,
        params: RestorationParams,
    ) -> SiraResult<Self> {
        params.validate()?;
        Ok(Self {
            aggregator: MonteCarloAggregator::new(model, simulation)?,
            params,
        })
    }

    pub fn params(&self) -> &RestorationParams {
        &self.params
    }

    /// Prognosis for the configured scenario hazards and stream counts.
    pub fn run_configured(&self) -> SiraResult<PrognosisReport> {
        self.run(&self.params.scenario_hazards, &self.params.stream_counts)
    }

    pub fn run(
        &self,
        scenario_hazards: &[f64],
        stream_counts: &[usize],
    ) -> SiraResult<PrognosisReport> {
        let model = self.aggregator.model();
        let sim = self.aggregator.params();
        let draws = SampleDraws::generate(sim.num_samples, model.component_count(), sim.seed);
        self.run_with_draws(scenario_hazards, stream_counts, &draws)
    }

    pub fn run_with_draws(
        &self,
        scenario_hazards: &[f64],
        stream_counts: &[usize],
        draws: &SampleDraws,
    ) -> SiraResult<PrognosisReport> {
        if stream_counts.iter().any(|&s| s == 0) {
            return Err(SiraError::Validation("stream counts must be at least 1".into()));
        }
        let model = self.aggregator.model();
        let sim = self.aggregator.params();
        let estimator = RecoveryEstimator::new(
            model,
            sim.restoration_axis,
            self.params.restoration_threshold,
            sim.restore_time_max,
            self.params.replacement_policy,
        )?;
        let scheduler =
            RestorationScheduler::new(model, sim.restore_time_max, sim.restoration_axis.step)?;

        let mut hazards = Vec::with_capacity(scenario_hazards.len());
        let mut line_times = Vec::new();
        for &hazard in scenario_hazards {
            let response = self.aggregator.evaluate_level(hazard, draws)?;
            let component_restoration = estimator.estimate(hazard, &response);
            let durations: Vec<f64> = component_restoration
                .iter()
                .map(|r| r.restoration_time)
                .collect();
            let mean_loss: Vec<f64> = model
                .network()
                .components()
                .map(|(_, c)| response.component(&c.id).map(|r| r.loss_mean).unwrap_or(0.0))
                .collect();

            let resolver = RepairSetResolver::new(
                model,
                self.params.weight_criterion,
                &durations,
                &mean_loss,
            )?;
            let plans = resolver.resolve_all();

            let mut scenarios = Vec::with_capacity(stream_counts.len());
            for &streams in stream_counts {
                let outcome = scheduler.schedule(
                    &plans,
                    &durations,
                    &mean_loss,
                    streams,
                    self.params.start_offset,
                )?;
                for line in &outcome.lines {
                    line_times.push(LineRestorationTime {
                        hazard,
                        streams,
                        line: line.line.clone(),
                        completion_time: line.completion_time,
                        feasible: line.feasible,
                    });
                }
                info!(
                    hazard,
                    streams,
                    makespan = outcome.schedule.makespan(),
                    "restoration scenario scheduled"
                );
                scenarios.push(ScenarioRestoration {
                    streams,
                    makespan: outcome.schedule.makespan(),
                    tasks: outcome.schedule.tasks,
                    lines: outcome.lines,
                    capacity_series: outcome.capacity_series,
                });
            }

            hazards.push(HazardRestoration {
                hazard,
                criticality: component_type_criticality(model, &response, &component_restoration),
                component_restoration,
                repair_plans: plans.iter().map(|p| p.report(model)).collect(),
                scenarios,
            });
        }
        Ok(PrognosisReport { hazards, line_times })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hazard::{HazardRange, RestorationAxis};
    use crate::test_utils::two_line_model;

    fn simulation() -> SimulationParams {
        SimulationParams {
            hazard: HazardRange::new(0.1, 1.0, 0.1).unwrap(),
            num_samples: 40,
            seed: 9,
            restoration_axis: RestorationAxis::new(50.0, 1.0).unwrap(),
            restore_time_max: 300.0,
            required_time_threshold: 0.99,
        }
    }

    #[test]
    fn test_more_streams_never_finish_later() {
        let model = two_line_model().unwrap();
        let params = RestorationParams {
            scenario_hazards: vec![5.0],
            stream_counts: vec![1, 2],
            start_offset: 0.0,
            ..RestorationParams::default()
        };
        let prognosis = RestorationPrognosis::new(&model, simulation(), params).unwrap();
        let report = prognosis.run_configured().unwrap();

        // both breakers certainly fail; N(4, 1) first reaches 0.98 at t = 7
        let one = report.line_time(5.0, 1, "o2").unwrap();
        let two = report.line_time(5.0, 2, "o2").unwrap();
        assert_eq!(report.line_time(5.0, 1, "o1").unwrap().completion_time, 7.0);
        assert_eq!(one.completion_time, 14.0);
        assert_eq!(two.completion_time, 7.0);
        assert_eq!(report.hazards[0].scenarios.len(), 2);
        assert_eq!(report.line_times.len(), 4);
    }

    #[test]
    fn test_undamaged_facility_needs_no_repairs() {
        let model = two_line_model().unwrap();
        let params = RestorationParams {
            scenario_hazards: vec![0.0],
            ..RestorationParams::default()
        };
        let report = RestorationPrognosis::new(&model, simulation(), params)
            .unwrap()
            .run_configured()
            .unwrap();
        let scenario = &report.hazards[0].scenarios[0];
        assert!(scenario.tasks.is_empty());
        assert!(scenario.lines.iter().all(|l| l.completion_time == 0.0));
    }

    #[test]
    fn test_rejects_zero_stream_count() {
        let model = two_line_model().unwrap();
        let params = RestorationParams {
            stream_counts: vec![0],
            ..RestorationParams::default()
        };
        assert!(RestorationPrognosis::new(&model, simulation(), params).is_err());
    }
}
