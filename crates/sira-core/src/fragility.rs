//! Damage states and fragility parameters per component type.
//!
//! Every [`TypeFragility`] carries a synthetic "no damage" state at index 0
//! (median `+inf`, functionality 1, damage ratio 0) followed by the configured
//! states in increasing severity. Evaluation of the curves lives in
//! `sira-algo`; this module only holds and validates the parameters.

use crate::error::{SiraError, SiraResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name given to the synthetic zero-damage state.
pub const NO_DAMAGE: &str = "DS0 None";

/// Fragility curve for one non-zero damage state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FragilityFunction {
    /// Lognormal CDF with the given median and log-standard-deviation.
    SingleMode { median: f64, log_std: f64 },
    /// Weighted mixture of two lognormal CDFs sharing one scale, gated so the
    /// state is unreachable at or below `minimum`.
    DualMode {
        scale: f64,
        log_std_1: f64,
        log_std_2: f64,
        weight_1: f64,
        weight_2: f64,
        minimum: f64,
    },
}

impl FragilityFunction {
    /// A curve that never exceeds (median at infinity).
    pub fn unreachable() -> Self {
        FragilityFunction::SingleMode {
            median: f64::INFINITY,
            log_std: 1.0,
        }
    }

    /// Spread parameters, used to detect degenerate (near-zero) values.
    pub fn spreads(&self) -> Vec<f64> {
        match *self {
            FragilityFunction::SingleMode { log_std, .. } => vec![log_std],
            FragilityFunction::DualMode {
                log_std_1,
                log_std_2,
                ..
            } => vec![log_std_1, log_std_2],
        }
    }

    fn validate(&self) -> Result<(), String> {
        match *self {
            FragilityFunction::SingleMode { median, log_std } => {
                if median.is_nan() || median <= 0.0 {
                    return Err(format!("median must be positive, got {median}"));
                }
                if !log_std.is_finite() || log_std < 0.0 {
                    return Err(format!("log_std must be finite and >= 0, got {log_std}"));
                }
            }
            FragilityFunction::DualMode {
                scale,
                log_std_1,
                log_std_2,
                weight_1,
                weight_2,
                minimum,
            } => {
                if !(scale > 0.0) {
                    return Err(format!("scale must be positive, got {scale}"));
                }
                for sigma in [log_std_1, log_std_2] {
                    if !sigma.is_finite() || sigma < 0.0 {
                        return Err(format!("log_std must be finite and >= 0, got {sigma}"));
                    }
                }
                for w in [weight_1, weight_2] {
                    if !(0.0..=1.0).contains(&w) {
                        return Err(format!("mixture weight {w} outside [0, 1]"));
                    }
                }
                if minimum.is_nan() {
                    return Err("minimum intensity is NaN".into());
                }
            }
        }
        Ok(())
    }
}

/// Normal recovery curve parameters (time units of the restoration axis).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecoveryParams {
    pub mean: f64,
    pub std: f64,
}

impl RecoveryParams {
    pub fn new(mean: f64, std: f64) -> Self {
        Self { mean, std }
    }
}

/// One damage state of a component type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageState {
    pub name: String,
    pub fragility: FragilityFunction,
    /// Repair cost as a fraction of the component's value
    pub damage_ratio: f64,
    /// Residual capability right after the event
    pub functionality: f64,
    pub recovery: RecoveryParams,
    /// Recovery with a temporary replacement, when one is defined
    pub temporary_recovery: Option<RecoveryParams>,
}

impl DamageState {
    /// The synthetic zero-damage state.
    pub fn none() -> Self {
        Self {
            name: NO_DAMAGE.to_string(),
            fragility: FragilityFunction::unreachable(),
            damage_ratio: 0.0,
            functionality: 1.0,
            recovery: RecoveryParams::new(f64::NEG_INFINITY, 1.0),
            temporary_recovery: None,
        }
    }
}

/// Ordered damage states for one component type, index 0 = no damage.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeFragility {
    states: Vec<DamageState>,
}

impl TypeFragility {
    /// Build from the non-zero states in increasing severity.
    pub fn new(states: Vec<DamageState>) -> SiraResult<Self> {
        if states.is_empty() {
            return Err(SiraError::Validation(
                "a component type needs at least one damage state".into(),
            ));
        }

        let mut previous_ratio = 0.0;
        for state in &states {
            if !(0.0..=1.0).contains(&state.damage_ratio) {
                return Err(SiraError::Validation(format!(
                    "damage state '{}': damage_ratio {} outside [0, 1]",
                    state.name, state.damage_ratio
                )));
            }
            if state.damage_ratio < previous_ratio {
                return Err(SiraError::Validation(format!(
                    "damage state '{}': damage_ratio decreases with severity",
                    state.name
                )));
            }
            previous_ratio = state.damage_ratio;

            if !(0.0..=1.0).contains(&state.functionality) {
                return Err(SiraError::Validation(format!(
                    "damage state '{}': functionality {} outside [0, 1]",
                    state.name, state.functionality
                )));
            }
            state
                .fragility
                .validate()
                .map_err(|msg| {
                    SiraError::Validation(format!("damage state '{}': {msg}", state.name))
                })?;

            let recoveries = std::iter::once(state.recovery).chain(state.temporary_recovery);
            for recovery in recoveries {
                if !recovery.mean.is_finite() || !recovery.std.is_finite() || recovery.std < 0.0 {
                    return Err(SiraError::Validation(format!(
                        "damage state '{}': invalid recovery parameters ({}, {})",
                        state.name, recovery.mean, recovery.std
                    )));
                }
            }
        }

        let mut all = Vec::with_capacity(states.len() + 1);
        all.push(DamageState::none());
        all.extend(states);
        Ok(Self { states: all })
    }

    /// All states including the synthetic one at index 0.
    pub fn states(&self) -> &[DamageState] {
        &self.states
    }

    pub fn state(&self, index: usize) -> &DamageState {
        &self.states[index]
    }

    /// Index of the most severe state.
    pub fn terminal_index(&self) -> usize {
        self.states.len() - 1
    }

    /// Number of states, including the zero-damage state.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Whether any state defines a temporary-restoration curve.
    pub fn has_temporary_recovery(&self) -> bool {
        self.states.iter().any(|s| s.temporary_recovery.is_some())
    }
}

/// Fragility entries keyed by component type, with stable integer slots.
#[derive(Debug, Clone, Default)]
pub struct FragilityTable {
    entries: Vec<(String, TypeFragility)>,
    lookup: HashMap<String, usize>,
}

impl FragilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        component_type: impl Into<String>,
        fragility: TypeFragility,
    ) -> SiraResult<usize> {
        let component_type = component_type.into();
        if self.lookup.contains_key(&component_type) {
            return Err(SiraError::Validation(format!(
                "duplicate fragility entry for type '{component_type}'"
            )));
        }
        let slot = self.entries.len();
        self.lookup.insert(component_type.clone(), slot);
        self.entries.push((component_type, fragility));
        Ok(slot)
    }

    pub fn get(&self, component_type: &str) -> Option<&TypeFragility> {
        self.slot(component_type).map(|slot| &self.entries[slot].1)
    }

    pub fn slot(&self, component_type: &str) -> Option<usize> {
        self.lookup.get(component_type).copied()
    }

    pub fn by_slot(&self, slot: usize) -> &TypeFragility {
        &self.entries[slot].1
    }

    pub fn type_name(&self, slot: usize) -> &str {
        &self.entries[slot].0
    }

    /// Look up a type, failing with a configuration error naming it.
    pub fn require(&self, component_type: &str) -> SiraResult<&TypeFragility> {
        self.get(component_type).ok_or_else(|| {
            SiraError::Config(format!(
                "component type '{component_type}' has no fragility entry"
            ))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypeFragility)> {
        self.entries.iter().map(|(name, f)| (name.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(name: &str, median: f64, ratio: f64, functionality: f64) -> DamageState {
        DamageState {
            name: name.into(),
            fragility: FragilityFunction::SingleMode {
                median,
                log_std: 0.5,
            },
            damage_ratio: ratio,
            functionality,
            recovery: RecoveryParams::new(10.0, 2.0),
            temporary_recovery: None,
        }
    }

    #[test]
    fn test_synthetic_zero_state() {
        let frag = TypeFragility::new(vec![state("DS1 Slight", 0.3, 0.05, 0.8)]).unwrap();
        assert_eq!(frag.len(), 2);
        assert_eq!(frag.terminal_index(), 1);
        assert_eq!(frag.state(0).name, NO_DAMAGE);
        assert_eq!(frag.state(0).functionality, 1.0);
        assert!(matches!(
            frag.state(0).fragility,
            FragilityFunction::SingleMode { median, .. } if median.is_infinite()
        ));
    }

    #[test]
    fn test_decreasing_damage_ratio_rejected() {
        let err = TypeFragility::new(vec![
            state("DS1", 0.3, 0.4, 0.5),
            state("DS2", 0.6, 0.2, 0.0),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("decreases"));
    }

    #[test]
    fn test_empty_states_rejected() {
        assert!(TypeFragility::new(Vec::new()).is_err());
    }

    #[test]
    fn test_negative_log_std_rejected() {
        let mut bad = state("DS1", 0.3, 0.1, 0.5);
        bad.fragility = FragilityFunction::SingleMode {
            median: 0.3,
            log_std: -0.1,
        };
        assert!(TypeFragility::new(vec![bad]).is_err());
    }

    #[test]
    fn test_missing_type_is_config_error() {
        let table = FragilityTable::new();
        let err = table.require("Boiler").unwrap_err();
        assert!(matches!(err, SiraError::Config(_)));
        assert!(err.to_string().contains("Boiler"));
    }

    #[test]
    fn test_table_slots_are_stable() {
        let mut table = FragilityTable::new();
        let frag = TypeFragility::new(vec![state("DS1", 0.3, 0.1, 0.5)]).unwrap();
        assert_eq!(table.insert("A", frag.clone()).unwrap(), 0);
        assert_eq!(table.insert("B", frag.clone()).unwrap(), 1);
        assert!(table.insert("A", frag).is_err());
        assert_eq!(table.slot("B"), Some(1));
        assert_eq!(table.type_name(0), "A");
    }

    #[test]
    fn test_dual_mode_deserializes_with_tag() {
        let json = r#"{"kind":"dual_mode","scale":0.25,"log_std_1":0.4,"log_std_2":0.6,
                       "weight_1":0.5,"weight_2":0.5,"minimum":0.1}"#;
        let f: FragilityFunction = serde_json::from_str(json).unwrap();
        assert!(matches!(f, FragilityFunction::DualMode { minimum, .. } if minimum == 0.1));
    }
}
