use anyhow::{anyhow, bail, Context, Result};
use sira_algo::{HazardRange, RestorationAxis, RestorationParams, SimulationParams};
use sira_core::{
    Component, Connection, DamageState, FacilityNetwork, FragilityFunction, FragilityTable,
    OutputLine, RecoveryParams, SupplyNode, SystemModel, TypeFragility,
};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use crate::spec::{
    load_spec_from_path, DamageStateSpec, FacilitySpec, FragilitySpec, SimulationSpec,
    TypeFragilitySpec,
};

/// A facility document turned into a validated model and run parameters.
#[derive(Debug, Clone)]
pub struct ResolvedFacility {
    pub name: String,
    pub model: SystemModel,
    pub simulation: SimulationParams,
    pub restoration: RestorationParams,
}

pub fn load_facility(path: &Path) -> Result<ResolvedFacility> {
    let spec = load_spec_from_path(path)?;
    let mut resolved = resolve_facility(&spec)
        .with_context(|| format!("resolving facility '{}'", path.display()))?;
    if spec.name.is_none() {
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            resolved.name = stem.to_string();
        }
    }
    Ok(resolved)
}

pub fn resolve_facility(spec: &FacilitySpec) -> Result<ResolvedFacility> {
    if spec.components.is_empty() {
        bail!("facility declares no components");
    }
    if spec.fragilities.is_empty() {
        bail!("facility declares no fragility entries");
    }

    let mut network = FacilityNetwork::new();
    for component in &spec.components {
        let mut built =
            Component::new(&component.id, &component.component_type, component.node_type)
                .with_cost_fraction(component.cost_fraction)
                .with_capacity(component.capacity);
        if let Some(class) = &component.component_class {
            built = built.with_class(class);
        }
        if let Some(cluster) = &component.node_cluster {
            built = built.with_cluster(cluster);
        }
        network
            .add_component(built)
            .with_context(|| format!("adding component '{}'", component.id))?;
    }
    for connection in &spec.connections {
        let mut built = Connection::new(connection.weight, connection.distance);
        if let Some(capacity) = connection.capacity {
            built = built.with_capacity(capacity);
        }
        network
            .connect(&connection.origin, &connection.destination, built)
            .with_context(|| {
                format!(
                    "connecting '{}' -> '{}'",
                    connection.origin, connection.destination
                )
            })?;
    }

    let mut fragilities = FragilityTable::new();
    for entry in &spec.fragilities {
        let fragility = resolve_type_fragility(entry)
            .with_context(|| format!("fragility of component type '{}'", entry.component_type))?;
        fragilities.insert(&entry.component_type, fragility)?;
    }

    let supplies = spec
        .supply
        .iter()
        .map(|s| {
            Ok(SupplyNode {
                node: network.require(&s.node).context("supply setup")?,
                capacity_fraction: s.capacity_fraction,
                commodity: s.commodity.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let outputs = spec
        .outputs
        .iter()
        .map(|o| {
            Ok(OutputLine {
                node: network.require(&o.node).context("output setup")?,
                production_capacity: o.production_capacity,
                capacity_fraction: o.capacity_fraction,
                priority: o.priority,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let uncosted: BTreeSet<String> = spec.uncosted_types.iter().cloned().collect();
    let model = SystemModel::new(network, fragilities, supplies, outputs, uncosted)?
        .with_class_damage_limits(spec.class_damage_limits.clone())
        .context("class damage limits")?;

    let simulation = resolve_simulation(&spec.simulation)?;
    let restoration = RestorationParams {
        scenario_hazards: spec.restoration.scenario_hazards.clone(),
        stream_counts: spec.restoration.stream_counts.clone(),
        start_offset: spec.restoration.start_offset,
        weight_criterion: spec.restoration.weight_criterion,
        replacement_policy: spec.restoration.replacement_policy,
        restoration_threshold: spec.simulation.restoration_threshold,
    };
    restoration.validate().context("restoration section")?;
    let mut seen = HashSet::new();
    if let Some(dup) = restoration.stream_counts.iter().find(|s| !seen.insert(**s)) {
        return Err(anyhow!("stream count {dup} listed twice"));
    }

    Ok(ResolvedFacility {
        name: spec.name.clone().unwrap_or_else(|| "facility".to_string()),
        model,
        simulation,
        restoration,
    })
}

fn resolve_simulation(spec: &SimulationSpec) -> Result<SimulationParams> {
    let params = SimulationParams {
        hazard: HazardRange::new(spec.hazard_min, spec.hazard_max, spec.hazard_step)
            .context("hazard range")?,
        num_samples: spec.num_samples,
        seed: spec.seed,
        restoration_axis: RestorationAxis::new(spec.restore_time_upper, spec.restore_time_step)
            .context("restoration time axis")?,
        restore_time_max: spec.restore_time_max,
        required_time_threshold: spec.required_time_threshold,
    };
    params.validate().context("simulation section")?;
    Ok(params)
}

fn resolve_type_fragility(entry: &TypeFragilitySpec) -> Result<TypeFragility> {
    if entry.damage_states.is_empty() {
        bail!("no damage states");
    }
    let states = entry
        .damage_states
        .iter()
        .map(resolve_damage_state)
        .collect::<Result<Vec<_>>>()?;
    Ok(TypeFragility::new(states)?)
}

fn resolve_damage_state(state: &DamageStateSpec) -> Result<DamageState> {
    let fragility = match state.fragility {
        FragilitySpec::SingleMode { median, log_std } => {
            FragilityFunction::SingleMode { median, log_std }
        }
        FragilitySpec::DualMode {
            scale,
            log_std_1,
            log_std_2,
            weight_1,
            weight_2,
            minimum,
        } => FragilityFunction::DualMode {
            scale,
            log_std_1,
            log_std_2,
            weight_1,
            weight_2,
            minimum,
        },
    };
    let temporary_recovery = match (state.temp_recovery_mean, state.temp_recovery_std) {
        (Some(mean), Some(std)) => Some(RecoveryParams::new(mean, std)),
        (None, None) => None,
        _ => bail!(
            "damage state '{}' sets only one of temp_recovery_mean / temp_recovery_std",
            state.name
        ),
    };
    Ok(DamageState {
        name: state.name.clone(),
        fragility,
        damage_ratio: state.damage_ratio,
        functionality: state.functionality,
        recovery: RecoveryParams::new(state.recovery_mean, state.recovery_std),
        temporary_recovery,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(text: &str) -> FacilitySpec {
        serde_yaml::from_str(text).unwrap()
    }

    const BASE: &str = r#"
name: substation
components:
  - {id: in, component_type: SYSTEM_INPUT, node_type: supply}
  - {id: tx, component_type: Transformer, node_type: transshipment, cost_fraction: 1.0}
  - {id: out, component_type: SYSTEM_OUTPUT, node_type: sink}
connections:
  - {origin: in, destination: tx}
  - {origin: tx, destination: out}
fragilities:
  - component_type: SYSTEM_INPUT
    damage_states:
      - {name: DS1, fragility: {kind: single_mode, median: .inf, log_std: 0.5}, damage_ratio: 0, functionality: 1, recovery_mean: 1, recovery_std: 1}
  - component_type: Transformer
    damage_states:
      - {name: DS1, fragility: {kind: single_mode, median: 0.2, log_std: 0.5}, damage_ratio: 0.1, functionality: 0.8, recovery_mean: 2, recovery_std: 1}
      - {name: DS2, fragility: {kind: single_mode, median: 0.5, log_std: 0.5}, damage_ratio: 1.0, functionality: 0.0, recovery_mean: 20, recovery_std: 5}
  - component_type: SYSTEM_OUTPUT
    damage_states:
      - {name: DS1, fragility: {kind: single_mode, median: .inf, log_std: 0.5}, damage_ratio: 0, functionality: 1, recovery_mean: 1, recovery_std: 1}
supply:
  - {node: in, capacity_fraction: 1.0, commodity: power}
outputs:
  - {node: out, production_capacity: 100, capacity_fraction: 1.0, priority: 1}
simulation: {hazard_min: 0.1, hazard_max: 0.5, hazard_step: 0.1, num_samples: 20, restore_time_upper: 100}
restoration: {scenario_hazards: [0.3], stream_counts: [1, 2]}
class_damage_limits:
  Transformer: [0.05, 0.40, 0.70, 0.99, 1.00]
"#;

    #[test]
    fn resolves_model_and_params() {
        let resolved = resolve_facility(&spec(BASE)).unwrap();
        assert_eq!(resolved.name, "substation");
        assert_eq!(resolved.model.component_count(), 3);
        let tx = resolved.model.network().require("tx").unwrap();
        assert_eq!(resolved.model.type_fragility(tx).len(), 3);
        assert_eq!(resolved.simulation.hazard.len(), 5);
        assert_eq!(resolved.restoration.stream_counts, vec![1, 2]);
        assert_eq!(resolved.restoration.restoration_threshold, 0.98);
        assert_eq!(resolved.model.class_damage_limits()["Transformer"][1], 0.40);
    }

    #[test]
    fn rejects_unordered_class_limits() {
        let text = BASE.replace("[0.05, 0.40, 0.70, 0.99, 1.00]", "[0.40, 0.05, 0.70, 0.99, 1.00]");
        let err = resolve_facility(&spec(&text)).unwrap_err();
        assert!(format!("{err:#}").contains("Transformer"), "{err:#}");
    }

    #[test]
    fn missing_fragility_names_the_type() {
        let text = BASE.replace("component_type: Transformer\n", "component_type: Breaker\n");
        let err = resolve_facility(&spec(&text)).unwrap_err();
        assert!(format!("{err:#}").contains("Transformer"), "{err:#}");
    }

    #[test]
    fn rejects_dangling_connection() {
        let text = BASE.replace(
            "{origin: tx, destination: out}",
            "{origin: tx, destination: nowhere}",
        );
        let err = resolve_facility(&spec(&text)).unwrap_err();
        assert!(format!("{err:#}").contains("nowhere"), "{err:#}");
    }

    #[test]
    fn rejects_decreasing_damage_ratio() {
        let text = BASE.replace(
            "damage_ratio: 1.0, functionality: 0.0",
            "damage_ratio: 0.05, functionality: 0.0",
        );
        assert!(resolve_facility(&spec(&text)).is_err());
    }

    #[test]
    fn rejects_zero_streams_and_bad_step() {
        let text = BASE.replace("stream_counts: [1, 2]", "stream_counts: [0]");
        assert!(resolve_facility(&spec(&text)).is_err());
        let text = BASE.replace("hazard_step: 0.1", "hazard_step: 0.0");
        assert!(resolve_facility(&spec(&text)).is_err());
        let text = BASE.replace("stream_counts: [1, 2]", "stream_counts: [2, 2]");
        assert!(resolve_facility(&spec(&text)).is_err());
    }

    #[test]
    fn rejects_cost_fractions_not_summing_to_one() {
        let text = BASE.replace("cost_fraction: 1.0", "cost_fraction: 0.7");
        assert!(resolve_facility(&spec(&text)).is_err());
    }
}
