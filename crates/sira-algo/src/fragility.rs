//! Fragility evaluation and damage-state sampling.
//!
//! The exceedance vector for a type holds one probability per non-zero damage
//! state, sorted ascending. Sampling is inverse-transform over that vector:
//! the damage index equals the number of entries strictly greater than the
//! uniform draw, so index 0 (no damage) is returned whenever the draw exceeds
//! every threshold.

use crate::stats::{is_degenerate, lognormal_cdf};
use sira_core::{FragilityFunction, FragilityTable, SiraResult, TypeFragility};
use tracing::debug;

/// Probability that a single damage state is reached or exceeded.
pub fn exceedance_probability(function: &FragilityFunction, intensity: f64) -> f64 {
    match *function {
        FragilityFunction::SingleMode { median, log_std } => {
            lognormal_cdf(intensity, median, log_std)
        }
        FragilityFunction::DualMode {
            scale,
            log_std_1,
            log_std_2,
            weight_1,
            weight_2,
            minimum,
        } => {
            let gate = if intensity > minimum { 1.0 } else { 0.0 };
            let mixture = weight_1 * lognormal_cdf(intensity, scale, log_std_1)
                + weight_2 * lognormal_cdf(intensity, scale, log_std_2);
            (mixture * gate).clamp(0.0, 1.0)
        }
    }
}

/// Exceedance probabilities of every non-zero state of a type, ascending.
pub fn exceedance_vector(fragility: &TypeFragility, intensity: f64) -> Vec<f64> {
    let mut pe: Vec<f64> = fragility.states()[1..]
        .iter()
        .map(|state| exceedance_probability(&state.fragility, intensity))
        .collect();
    pe.sort_by(|a, b| a.total_cmp(b));
    pe
}

/// Probability of being in each discrete state (index 0 = no damage) given
/// an ascending exceedance vector.
pub fn state_probabilities(exceedance: &[f64]) -> Vec<f64> {
    // most severe first
    let descending: Vec<f64> = exceedance.iter().rev().copied().collect();
    let mut pb = Vec::with_capacity(exceedance.len() + 1);
    match descending.first() {
        None => {
            pb.push(1.0);
            return pb;
        }
        Some(&least_severe) => pb.push(1.0 - least_severe),
    }
    for pair in descending.windows(2) {
        pb.push(pair[0] - pair[1]);
    }
    if let Some(&most_severe) = descending.last() {
        pb.push(most_severe);
    }
    pb
}

/// Inverse-transform sample over an ascending exceedance vector.
pub fn sample_from_exceedance(exceedance: &[f64], draw: f64) -> usize {
    exceedance.iter().filter(|&&pe| pe > draw).count()
}

/// Evaluates fragility curves by component type name.
#[derive(Debug, Clone, Copy)]
pub struct FragilityEvaluator<'a> {
    table: &'a FragilityTable,
}

impl<'a> FragilityEvaluator<'a> {
    pub fn new(table: &'a FragilityTable) -> Self {
        log_degenerate_spreads(table);
        Self { table }
    }

    /// Ascending exceedance probabilities for `component_type` at `intensity`.
    pub fn exceedance_probabilities(
        &self,
        component_type: &str,
        intensity: f64,
    ) -> SiraResult<Vec<f64>> {
        let fragility = self.table.require(component_type)?;
        Ok(exceedance_vector(fragility, intensity))
    }

    pub fn table(&self) -> &'a FragilityTable {
        self.table
    }
}

/// Draws a damage state from a uniform random value.
#[derive(Debug, Clone, Copy)]
pub struct DamageStateSampler<'a> {
    evaluator: FragilityEvaluator<'a>,
}

impl<'a> DamageStateSampler<'a> {
    pub fn new(evaluator: FragilityEvaluator<'a>) -> Self {
        Self { evaluator }
    }

    /// Damage state index in `0..=N` for a draw in `[0, 1)`.
    pub fn sample_damage_state(
        &self,
        component_type: &str,
        intensity: f64,
        draw: f64,
    ) -> SiraResult<usize> {
        let exceedance = self
            .evaluator
            .exceedance_probabilities(component_type, intensity)?;
        Ok(sample_from_exceedance(&exceedance, draw))
    }
}

pub(crate) fn log_degenerate_spreads(table: &FragilityTable) {
    for (type_name, fragility) in table.iter() {
        for state in &fragility.states()[1..] {
            if state.fragility.spreads().into_iter().any(is_degenerate) {
                debug!(
                    component_type = type_name,
                    damage_state = %state.name,
                    "fragility log-std below guard, clamped"
                );
            }
            if is_degenerate(state.recovery.std) {
                debug!(
                    component_type = type_name,
                    damage_state = %state.name,
                    "recovery std below guard, clamped"
                );
            }
        }
    }
}
