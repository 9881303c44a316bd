//! Monte-Carlo damage simulation over a hazard sweep.
//!
//! One uniform draw per (trial, component) is generated up front and reused
//! at every hazard level, so curves across levels are coupled the same way
//! the reference tool couples them. Trials are independent: each worker gets
//! its own [`FlowScratch`] through `map_init`, outcomes are collected in
//! trial order and reduced sequentially, so the reported statistics are
//! identical with and without the `parallel` feature.

use crate::flow::{FlowCapacityModel, FlowScratch};
use crate::fragility::{
    exceedance_vector, log_degenerate_spreads, sample_from_exceedance, state_probabilities,
};
use crate::hazard::{HazardRange, RestorationAxis};
use crate::stats::{median, normal_cdf, RunningStats};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sira_core::{NodeIndex, SiraError, SiraResult, SystemModel};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Economic loss bounds separating system damage states DS0..DS4.
pub const SYSTEM_DAMAGE_BOUNDS: [f64; 5] = [0.01, 0.15, 0.4, 0.8, 1.0];

/// Names of the system damage states, aligned with the exceedance vector.
pub const SYSTEM_DAMAGE_STATES: [&str; 5] = [
    "DS0 None",
    "DS1 Slight",
    "DS2 Moderate",
    "DS3 Extensive",
    "DS4 Complete",
];

/// Scalar run parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    pub hazard: HazardRange,
    pub num_samples: usize,
    pub seed: u64,
    pub restoration_axis: RestorationAxis,
    /// Sentinel used when full recovery is never reached on the axis
    pub restore_time_max: f64,
    /// Normalised output that counts as "fully recovered"
    pub required_time_threshold: f64,
}

impl SimulationParams {
    pub fn validate(&self) -> SiraResult<()> {
        self.hazard.validate()?;
        if self.num_samples == 0 {
            return Err(SiraError::Validation("num_samples must be at least 1".into()));
        }
        if !(self.restore_time_max > 0.0) {
            return Err(SiraError::Validation(
                "restore_time_max must be positive".into(),
            ));
        }
        if !(self.required_time_threshold > 0.0 && self.required_time_threshold <= 1.0) {
            return Err(SiraError::Validation(format!(
                "required_time_threshold {} outside (0, 1]",
                self.required_time_threshold
            )));
        }
        Ok(())
    }
}

/// Trial x component matrix of uniform draws in `[0, 1)`, row-major by trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleDraws {
    pub num_samples: usize,
    pub num_components: usize,
    pub seed: u64,
    pub values: Vec<f64>,
}

impl SampleDraws {
    pub fn generate(num_samples: usize, num_components: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let values = (0..num_samples * num_components)
            .map(|_| rng.gen::<f64>())
            .collect();
        Self {
            num_samples,
            num_components,
            seed,
            values,
        }
    }

    pub fn trial(&self, trial: usize) -> &[f64] {
        let start = trial * self.num_components;
        &self.values[start..start + self.num_components]
    }

    pub fn get(&self, trial: usize, component: usize) -> f64 {
        self.values[trial * self.num_components + component]
    }
}

/// Per-component statistics at one hazard level (costed components only).
#[derive(Debug, Clone, Serialize)]
pub struct ComponentResponse {
    pub component_id: String,
    pub component_type: String,
    pub loss_mean: f64,
    pub loss_std: f64,
    pub func_mean: f64,
    pub func_std: f64,
    /// Fraction of trials ending in the terminal damage state
    pub failure_rate: f64,
    /// Trial count per damage state index
    pub damage_state_counts: Vec<usize>,
}

/// Per-type statistics: averages of the member components' statistics,
/// except `loss_tot` which is their sum.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentTypeResponse {
    pub component_type: String,
    pub component_count: usize,
    pub loss_mean: f64,
    pub loss_std: f64,
    pub loss_tot: f64,
    pub func_mean: f64,
    pub func_std: f64,
    pub failure_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineOutputResponse {
    pub line: String,
    pub mean_output: f64,
}

/// Aggregated response of the facility at one hazard intensity.
#[derive(Debug, Clone, Serialize)]
pub struct HazardResponse {
    pub intensity: f64,
    pub mean_economic_loss: f64,
    pub std_economic_loss: f64,
    /// Analytical expectation from state probabilities
    pub expected_economic_loss: f64,
    pub mean_output: f64,
    pub std_output: f64,
    pub mean_line_output: Vec<LineOutputResponse>,
    pub required_recovery_time: f64,
    /// Mean output over the restoration axis, normalised by nominal production
    pub mean_recovery_curve: Vec<f64>,
    /// P(system damage state >= DS_i), i = 0..4, from economic loss
    pub system_damage_exceedance: Vec<f64>,
    /// P(system damage state >= DS_i) from component-class failure fractions:
    /// the median over limited classes of each class's exceedance. Empty when
    /// no class of the facility has damage limits.
    pub class_failure_exceedance: Vec<f64>,
    /// Sampled damage state index per trial, per component
    #[serde(skip_serializing)]
    pub sampled_states: Vec<Vec<usize>>,
    #[serde(skip_serializing)]
    pub economic_loss_samples: Vec<f64>,
    #[serde(skip_serializing)]
    pub output_samples: Vec<f64>,
    pub components: Vec<ComponentResponse>,
    pub component_types: Vec<ComponentTypeResponse>,
}

impl HazardResponse {
    pub fn component(&self, id: &str) -> Option<&ComponentResponse> {
        self.components.iter().find(|c| c.component_id == id)
    }

    pub fn component_type(&self, name: &str) -> Option<&ComponentTypeResponse> {
        self.component_types.iter().find(|c| c.component_type == name)
    }
}

/// Results of a full hazard sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationResults {
    pub hazard_levels: Vec<f64>,
    pub time_axis: Vec<f64>,
    pub responses: Vec<HazardResponse>,
    #[serde(skip_serializing)]
    pub draws: SampleDraws,
}

struct TrialOutcome {
    states: Vec<usize>,
    loss: f64,
    output: f64,
    line_output: Vec<f64>,
    curve: Vec<f64>,
}

/// Values that depend on the hazard level but not on the trial.
struct LevelTables {
    /// Ascending exceedance vector per fragility table slot
    exceedance: Vec<Vec<f64>>,
    /// Recovery curve over the time axis per (slot, damage state)
    recovery: Vec<Vec<Vec<f64>>>,
}

/// Drives sampling, flow evaluation and reduction across hazard levels.
pub struct MonteCarloAggregator<'a> {
    model: &'a SystemModel,
    flow: FlowCapacityModel,
    params: SimulationParams,
    time_axis: Vec<f64>,
}

impl<'a> MonteCarloAggregator<'a> {
    pub fn new(model: &'a SystemModel, params: SimulationParams) -> SiraResult<Self> {
        params.validate()?;
        if !(model.nominal_production() > 0.0) {
            return Err(SiraError::Validation(
                "nominal production must be positive".into(),
            ));
        }
        log_degenerate_spreads(model.fragilities());
        let time_axis = params.restoration_axis.times();
        Ok(Self {
            model,
            flow: FlowCapacityModel::new(model),
            params,
            time_axis,
        })
    }

    pub fn model(&self) -> &'a SystemModel {
        self.model
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn time_axis(&self) -> &[f64] {
        &self.time_axis
    }

    pub fn flow(&self) -> &FlowCapacityModel {
        &self.flow
    }

    /// Sweep the configured hazard range with the configured sample count.
    pub fn run_configured(&self) -> SiraResult<SimulationResults> {
        let levels = self.params.hazard.levels();
        self.run(&levels, self.params.num_samples)
    }

    /// Simulate every level with `num_samples` trials drawn from the seed.
    pub fn run(&self, hazard_levels: &[f64], num_samples: usize) -> SiraResult<SimulationResults> {
        if num_samples == 0 {
            return Err(SiraError::Validation("num_samples must be at least 1".into()));
        }
        let draws =
            SampleDraws::generate(num_samples, self.model.component_count(), self.params.seed);
        self.run_with_draws(hazard_levels, draws)
    }

    /// Simulate every level reusing a pre-generated draw matrix.
    pub fn run_with_draws(
        &self,
        hazard_levels: &[f64],
        draws: SampleDraws,
    ) -> SiraResult<SimulationResults> {
        let mut responses = Vec::with_capacity(hazard_levels.len());
        for (idx, &intensity) in hazard_levels.iter().enumerate() {
            let response = self.evaluate_level(intensity, &draws)?;
            info!(
                level = idx + 1,
                of = hazard_levels.len(),
                intensity,
                mean_loss = response.mean_economic_loss,
                mean_output = response.mean_output,
                "hazard level simulated"
            );
            responses.push(response);
        }
        Ok(SimulationResults {
            hazard_levels: hazard_levels.to_vec(),
            time_axis: self.time_axis.clone(),
            responses,
            draws,
        })
    }

    /// Full response at one intensity.
    pub fn evaluate_level(
        &self,
        intensity: f64,
        draws: &SampleDraws,
    ) -> SiraResult<HazardResponse> {
        let n_components = self.model.component_count();
        if draws.num_components != n_components {
            return Err(SiraError::Simulation(format!(
                "draw matrix has {} components, facility has {}",
                draws.num_components, n_components
            )));
        }
        let num_samples = draws.num_samples;
        if num_samples == 0 {
            return Err(SiraError::Simulation("draw matrix is empty".into()));
        }

        let tables = self.level_tables(intensity);

        #[cfg(feature = "parallel")]
        let outcomes: Vec<TrialOutcome> = (0..num_samples)
            .into_par_iter()
            .map_init(
                || FlowScratch::new(&self.flow),
                |scratch, trial| self.run_trial(&tables, draws.trial(trial), scratch),
            )
            .collect();

        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<TrialOutcome> = {
            let mut scratch = FlowScratch::new(&self.flow);
            (0..num_samples)
                .map(|trial| self.run_trial(&tables, draws.trial(trial), &mut scratch))
                .collect()
        };

        debug!(intensity, trials = outcomes.len(), "reducing trial outcomes");
        Ok(self.reduce(intensity, &outcomes))
    }

    fn level_tables(&self, intensity: f64) -> LevelTables {
        let table = self.model.fragilities();
        let mut exceedance = Vec::with_capacity(table.len());
        let mut recovery = Vec::with_capacity(table.len());
        for (_, fragility) in table.iter() {
            exceedance.push(exceedance_vector(fragility, intensity));
            let curves = fragility
                .states()
                .iter()
                .enumerate()
                .map(|(index, state)| {
                    self.time_axis
                        .iter()
                        .map(|&t| {
                            if index == 0 {
                                return 1.0;
                            }
                            let cdf = normal_cdf(t, state.recovery.mean, state.recovery.std);
                            cdf + (1.0 - cdf) * state.functionality
                        })
                        .collect()
                })
                .collect();
            recovery.push(curves);
        }
        LevelTables {
            exceedance,
            recovery,
        }
    }

    fn run_trial(
        &self,
        tables: &LevelTables,
        draws: &[f64],
        scratch: &mut FlowScratch,
    ) -> TrialOutcome {
        let n = draws.len();
        let mut states = Vec::with_capacity(n);
        let mut functionality = Vec::with_capacity(n);
        let mut loss = 0.0;
        for (c, &draw) in draws.iter().enumerate() {
            let node = NodeIndex::new(c);
            let slot = self.model.type_slot(node);
            let state_index = sample_from_exceedance(&tables.exceedance[slot], draw);
            let state = self.model.type_fragility(node).state(state_index);
            if self.model.is_costed(node) {
                loss += state.damage_ratio * self.model.component(node).cost_fraction;
            }
            functionality.push(state.functionality);
            states.push(state_index);
        }

        let mut line_output = vec![0.0; self.flow.line_count()];
        let output = self.flow.evaluate(&functionality, scratch, &mut line_output);

        let mut step_lines = vec![0.0; self.flow.line_count()];
        let mut curve = Vec::with_capacity(self.time_axis.len());
        for k in 0..self.time_axis.len() {
            for (c, value) in functionality.iter_mut().enumerate() {
                let node = NodeIndex::new(c);
                *value = tables.recovery[self.model.type_slot(node)][states[c]][k];
            }
            curve.push(self.flow.evaluate(&functionality, scratch, &mut step_lines));
        }

        TrialOutcome {
            states,
            loss,
            output,
            line_output,
            curve,
        }
    }

    /// Costed members per component class that carries damage limits.
    fn class_groups(&self) -> Vec<(&[f64], Vec<usize>)> {
        let model = self.model;
        model
            .class_damage_limits()
            .iter()
            .filter_map(|(class, limits)| {
                let members: Vec<usize> = model
                    .costed_components()
                    .filter(|&node| model.component(node).component_class == *class)
                    .map(|node| node.index())
                    .collect();
                if members.is_empty() {
                    None
                } else {
                    Some((limits.as_slice(), members))
                }
            })
            .collect()
    }

    fn reduce(&self, intensity: f64, outcomes: &[TrialOutcome]) -> HazardResponse {
        let model = self.model;
        let n_trials = outcomes.len();
        let n_components = model.component_count();
        let nominal = self.flow.nominal_production();

        let mut loss_stats = RunningStats::default();
        let mut output_stats = RunningStats::default();
        let mut line_sums = vec![0.0; self.flow.line_count()];
        let mut curve_sums = vec![0.0; self.time_axis.len()];
        let mut system_exceed = [0usize; SYSTEM_DAMAGE_BOUNDS.len()];
        let mut comp_loss = vec![RunningStats::default(); n_components];
        let mut comp_func = vec![RunningStats::default(); n_components];
        let mut comp_failures = vec![0usize; n_components];
        let mut comp_counts: Vec<Vec<usize>> = (0..n_components)
            .map(|c| vec![0; model.type_fragility(NodeIndex::new(c)).len()])
            .collect();
        let class_groups = self.class_groups();
        let mut class_exceed = vec![[0usize; SYSTEM_DAMAGE_STATES.len()]; class_groups.len()];

        for outcome in outcomes {
            loss_stats.push(outcome.loss);
            output_stats.push(outcome.output);
            for (sum, value) in line_sums.iter_mut().zip(&outcome.line_output) {
                *sum += value;
            }
            for (sum, value) in curve_sums.iter_mut().zip(&outcome.curve) {
                *sum += value;
            }
            let system_state = SYSTEM_DAMAGE_BOUNDS
                .iter()
                .filter(|&&bound| outcome.loss > bound)
                .count();
            for (i, count) in system_exceed.iter_mut().enumerate() {
                if system_state >= i {
                    *count += 1;
                }
            }
            for (c, &state_index) in outcome.states.iter().enumerate() {
                let node = NodeIndex::new(c);
                let fragility = model.type_fragility(node);
                let state = fragility.state(state_index);
                comp_loss[c].push(state.damage_ratio * model.component(node).cost_fraction);
                comp_func[c].push(state.functionality);
                if state_index >= fragility.terminal_index() {
                    comp_failures[c] += 1;
                }
                comp_counts[c][state_index] += 1;
            }
            for ((limits, members), counts) in class_groups.iter().zip(class_exceed.iter_mut()) {
                let failed = members
                    .iter()
                    .filter(|&&c| {
                        let terminal = model.type_fragility(NodeIndex::new(c)).terminal_index();
                        outcome.states[c] >= terminal
                    })
                    .count();
                let fraction = failed as f64 / members.len() as f64;
                let class_state = limits.iter().filter(|&&limit| fraction > limit).count();
                for (d, count) in counts.iter_mut().enumerate() {
                    if class_state >= d {
                        *count += 1;
                    }
                }
            }
        }

        let trials = n_trials as f64;
        let mean_recovery_curve: Vec<f64> = curve_sums
            .iter()
            .map(|sum| sum / trials / nominal)
            .collect();
        let required_recovery_time = self
            .time_axis
            .iter()
            .zip(&mean_recovery_curve)
            .find(|(_, &value)| value > self.params.required_time_threshold)
            .map(|(&t, _)| t)
            .unwrap_or(self.params.restore_time_max);

        let mut expected_economic_loss = 0.0;
        for node in model.costed_components() {
            let fragility = model.type_fragility(node);
            let pb = state_probabilities(&exceedance_vector(fragility, intensity));
            let cost = model.component(node).cost_fraction;
            for (p, state) in pb.iter().zip(fragility.states()) {
                expected_economic_loss += p * state.damage_ratio * cost;
            }
        }

        let class_failure_exceedance: Vec<f64> = if class_exceed.is_empty() {
            Vec::new()
        } else {
            (0..SYSTEM_DAMAGE_STATES.len())
                .map(|d| {
                    let per_class: Vec<f64> = class_exceed
                        .iter()
                        .map(|counts| counts[d] as f64 / trials)
                        .collect();
                    median(&per_class).unwrap_or(0.0)
                })
                .collect()
        };

        let components: Vec<ComponentResponse> = model
            .costed_components()
            .map(|node| {
                let c = node.index();
                let component = model.component(node);
                ComponentResponse {
                    component_id: component.id.clone(),
                    component_type: component.component_type.clone(),
                    loss_mean: comp_loss[c].mean(),
                    loss_std: comp_loss[c].std(),
                    func_mean: comp_func[c].mean(),
                    func_std: comp_func[c].std(),
                    failure_rate: comp_failures[c] as f64 / trials,
                    damage_state_counts: comp_counts[c].clone(),
                }
            })
            .collect();

        let component_types = aggregate_by_type(&components);

        let mean_line_output = model
            .outputs()
            .iter()
            .zip(&line_sums)
            .map(|(line, sum)| LineOutputResponse {
                line: model.component(line.node).id.clone(),
                mean_output: sum / trials,
            })
            .collect();

        HazardResponse {
            intensity,
            mean_economic_loss: loss_stats.mean(),
            std_economic_loss: loss_stats.std(),
            expected_economic_loss,
            mean_output: output_stats.mean(),
            std_output: output_stats.std(),
            mean_line_output,
            required_recovery_time,
            mean_recovery_curve,
            system_damage_exceedance: system_exceed
                .iter()
                .map(|&count| count as f64 / trials)
                .collect(),
            class_failure_exceedance,
            sampled_states: outcomes.iter().map(|o| o.states.clone()).collect(),
            economic_loss_samples: outcomes.iter().map(|o| o.loss).collect(),
            output_samples: outcomes.iter().map(|o| o.output).collect(),
            components,
            component_types,
        }
    }
}

/// Type-level view: averages of member statistics, sorted by type name.
pub fn aggregate_by_type(components: &[ComponentResponse]) -> Vec<ComponentTypeResponse> {
    let mut groups: BTreeMap<&str, Vec<&ComponentResponse>> = BTreeMap::new();
    for component in components {
        groups
            .entry(component.component_type.as_str())
            .or_default()
            .push(component);
    }
    groups
        .into_iter()
        .map(|(name, members)| {
            let n = members.len() as f64;
            let mean_of =
                |f: fn(&ComponentResponse) -> f64| members.iter().map(|m| f(m)).sum::<f64>() / n;
            ComponentTypeResponse {
                component_type: name.to_string(),
                component_count: members.len(),
                loss_mean: mean_of(|m| m.loss_mean),
                loss_std: mean_of(|m| m.loss_std),
                loss_tot: members.iter().map(|m| m.loss_mean).sum(),
                func_mean: mean_of(|m| m.func_mean),
                func_std: mean_of(|m| m.func_std),
                failure_rate: mean_of(|m| m.failure_rate),
            }
        })
        .collect()
}
