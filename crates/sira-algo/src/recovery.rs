//! Component restoration-time estimates at a scenario hazard.
//!
//! For a component at intensity `h`, the aggregated recovery status is the
//! state-probability-weighted sum of the per-state normal recovery curves
//! (the zero-damage state counts as already recovered). The full restoration
//! time is the first point on the restoration axis where that status reaches
//! the threshold, rounded to whole time units.

use crate::fragility::{exceedance_vector, state_probabilities};
use crate::hazard::RestorationAxis;
use crate::monte_carlo::HazardResponse;
use crate::stats::normal_cdf;
use serde::{Deserialize, Serialize};
use sira_core::{NodeIndex, RecoveryParams, SiraError, SiraResult, SystemModel};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Which recovery parameters a damaged component uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementPolicy {
    /// Always the full-restoration parameters.
    #[default]
    FullOnly,
    /// Temporary-restoration parameters while intact spares of the same type
    /// remain available inside the facility.
    TemporaryWhenSpares,
}

/// Restoration estimate for one component.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentRestoration {
    #[serde(skip)]
    pub node: NodeIndex,
    pub component_id: String,
    pub component_type: String,
    pub restoration_time: f64,
    /// False when the threshold was never reached and the time was clamped
    pub reached: bool,
    pub used_temporary: bool,
}

/// Per-type criticality at a scenario hazard.
#[derive(Debug, Clone, Serialize)]
pub struct TypeCriticality {
    pub component_type: String,
    /// Sum of member mean losses (fraction of facility value)
    pub loss_tot: f64,
    pub loss_mean: f64,
    /// Mean cost fraction of the type's members
    pub type_value: f64,
    /// `loss_mean / type_value`
    pub loss_per_type: f64,
    pub failure_rate: f64,
    pub mean_restoration_time: f64,
}

pub struct RecoveryEstimator<'a> {
    model: &'a SystemModel,
    time_axis: Vec<f64>,
    threshold: f64,
    restore_time_max: f64,
    policy: ReplacementPolicy,
}

impl<'a> RecoveryEstimator<'a> {
    pub fn new(
        model: &'a SystemModel,
        axis: RestorationAxis,
        threshold: f64,
        restore_time_max: f64,
        policy: ReplacementPolicy,
    ) -> SiraResult<Self> {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(SiraError::Validation(format!(
                "restoration threshold {threshold} outside (0, 1]"
            )));
        }
        Ok(Self {
            model,
            time_axis: axis.times(),
            threshold,
            restore_time_max,
            policy,
        })
    }

    /// Aggregated recovery status of `node` at time `t` after an event of
    /// intensity `intensity`.
    pub fn recovery_status(&self, node: NodeIndex, intensity: f64, t: f64, temporary: bool) -> f64 {
        let fragility = self.model.type_fragility(node);
        let pb = state_probabilities(&exceedance_vector(fragility, intensity));
        pb.iter()
            .zip(fragility.states())
            .enumerate()
            .map(|(index, (p, state))| {
                if index == 0 {
                    return *p;
                }
                let params = recovery_params(state.recovery, state.temporary_recovery, temporary);
                p * normal_cdf(t, params.mean, params.std)
            })
            .sum()
    }

    /// Restoration times for every component, in component order.
    ///
    /// `response` supplies the per-type failure rates that determine spare
    /// availability under [`ReplacementPolicy::TemporaryWhenSpares`].
    pub fn estimate(&self, intensity: f64, response: &HazardResponse) -> Vec<ComponentRestoration> {
        let model = self.model;
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for (_, component) in model.network().components() {
            *counts.entry(component.component_type.as_str()).or_default() += 1;
        }
        let mut used: HashMap<&str, i64> = HashMap::new();

        model
            .network()
            .components()
            .map(|(node, component)| {
                let type_name = component.component_type.as_str();
                let use_count = used.entry(type_name).or_default();
                *use_count += 1;

                let spares = if model.is_costed(node) {
                    let failure_rate = response
                        .component_type(type_name)
                        .map(|t| t.failure_rate)
                        .unwrap_or(0.0);
                    let count = counts.get(type_name).copied().unwrap_or(0) as f64;
                    ((1.0 - failure_rate) * count).floor() as i64 - *use_count
                } else {
                    0
                };
                let temporary = self.policy == ReplacementPolicy::TemporaryWhenSpares
                    && model.is_costed(node)
                    && model.type_fragility(node).has_temporary_recovery()
                    && spares >= 1;

                let hit = self
                    .time_axis
                    .iter()
                    .find(|&&t| {
                        self.recovery_status(node, intensity, t, temporary) >= self.threshold
                    });
                let (restoration_time, reached) = match hit {
                    Some(&t) => (t.round(), true),
                    None => {
                        warn!(
                            component = %component.id,
                            intensity,
                            clamp = self.restore_time_max,
                            "restoration threshold not reached on the time axis"
                        );
                        (self.restore_time_max, false)
                    }
                };

                ComponentRestoration {
                    node,
                    component_id: component.id.clone(),
                    component_type: component.component_type.clone(),
                    restoration_time,
                    reached,
                    used_temporary: temporary,
                }
            })
            .collect()
    }
}

fn recovery_params(
    full: RecoveryParams,
    temporary: Option<RecoveryParams>,
    use_temporary: bool,
) -> RecoveryParams {
    match (use_temporary, temporary) {
        (true, Some(params)) => params,
        _ => full,
    }
}

/// Per costed type: losses, relative loss, failure rate and mean restoration
/// time, sorted by total loss (descending).
pub fn component_type_criticality(
    model: &SystemModel,
    response: &HazardResponse,
    restorations: &[ComponentRestoration],
) -> Vec<TypeCriticality> {
    let mut value: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for node in model.costed_components() {
        let component = model.component(node);
        let entry = value.entry(component.component_type.as_str()).or_default();
        entry.0 += component.cost_fraction;
        entry.1 += 1;
    }
    let mut times: HashMap<&str, (f64, usize)> = HashMap::new();
    for restoration in restorations {
        let entry = times.entry(restoration.component_type.as_str()).or_default();
        entry.0 += restoration.restoration_time;
        entry.1 += 1;
    }

    let mut rows: Vec<TypeCriticality> = response
        .component_types
        .iter()
        .map(|t| {
            let type_value = value
                .get(t.component_type.as_str())
                .map(|(sum, n)| sum / *n as f64)
                .unwrap_or(0.0);
            let mean_restoration_time = times
                .get(t.component_type.as_str())
                .map(|(sum, n)| sum / *n as f64)
                .unwrap_or(0.0);
            TypeCriticality {
                component_type: t.component_type.clone(),
                loss_tot: t.loss_tot,
                loss_mean: t.loss_mean,
                type_value,
                loss_per_type: if type_value > 0.0 {
                    t.loss_mean / type_value
                } else {
                    0.0
                },
                failure_rate: t.failure_rate,
                mean_restoration_time,
            }
        })
        .collect();
    rows.sort_by(|a, b| b.loss_tot.total_cmp(&a.loss_tot));
    rows
}
