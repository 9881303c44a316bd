use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sira_algo::{ReplacementPolicy, WeightCriterion};
use sira_core::NodeType;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// A complete facility document: network, fragility tables, setup and run
/// parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FacilitySpec {
    pub name: Option<String>,
    pub components: Vec<ComponentSpec>,
    #[serde(default)]
    pub connections: Vec<ConnectionSpec>,
    pub fragilities: Vec<TypeFragilitySpec>,
    pub supply: Vec<SupplySpec>,
    pub outputs: Vec<OutputSpec>,
    pub simulation: SimulationSpec,
    #[serde(default)]
    pub restoration: RestorationSpec,
    #[serde(default = "default_uncosted_types")]
    pub uncosted_types: Vec<String>,
    /// Failure-fraction limits per component class, one per system damage state
    #[serde(default)]
    pub class_damage_limits: BTreeMap<String, Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentSpec {
    pub id: String,
    pub component_type: String,
    pub component_class: Option<String>,
    #[serde(default)]
    pub cost_fraction: f64,
    pub node_type: NodeType,
    pub node_cluster: Option<String>,
    #[serde(default = "default_one")]
    pub capacity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSpec {
    pub origin: String,
    pub destination: String,
    pub capacity: Option<f64>,
    #[serde(default = "default_one")]
    pub weight: f64,
    #[serde(default = "default_one")]
    pub distance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeFragilitySpec {
    pub component_type: String,
    pub damage_states: Vec<DamageStateSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DamageStateSpec {
    pub name: String,
    pub fragility: FragilitySpec,
    pub damage_ratio: f64,
    pub functionality: f64,
    pub recovery_mean: f64,
    pub recovery_std: f64,
    pub temp_recovery_mean: Option<f64>,
    pub temp_recovery_std: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum FragilitySpec {
    SingleMode {
        median: f64,
        log_std: f64,
    },
    DualMode {
        #[serde(default = "default_dual_scale")]
        scale: f64,
        log_std_1: f64,
        log_std_2: f64,
        #[serde(default = "default_half")]
        weight_1: f64,
        #[serde(default = "default_half")]
        weight_2: f64,
        minimum: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupplySpec {
    pub node: String,
    pub capacity_fraction: f64,
    pub commodity: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSpec {
    pub node: String,
    pub production_capacity: f64,
    pub capacity_fraction: f64,
    pub priority: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationSpec {
    pub hazard_min: f64,
    pub hazard_max: f64,
    pub hazard_step: f64,
    pub num_samples: usize,
    #[serde(default)]
    pub seed: u64,
    pub restore_time_upper: f64,
    #[serde(default = "default_one")]
    pub restore_time_step: f64,
    #[serde(default = "default_restore_time_max")]
    pub restore_time_max: f64,
    #[serde(default = "default_restoration_threshold")]
    pub restoration_threshold: f64,
    #[serde(default = "default_required_time_threshold")]
    pub required_time_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RestorationSpec {
    #[serde(default)]
    pub scenario_hazards: Vec<f64>,
    #[serde(default = "default_stream_counts")]
    pub stream_counts: Vec<usize>,
    #[serde(default = "default_one")]
    pub start_offset: f64,
    #[serde(default)]
    pub weight_criterion: WeightCriterion,
    #[serde(default)]
    pub replacement_policy: ReplacementPolicy,
}

impl Default for RestorationSpec {
    fn default() -> Self {
        Self {
            scenario_hazards: Vec::new(),
            stream_counts: default_stream_counts(),
            start_offset: default_one(),
            weight_criterion: WeightCriterion::default(),
            replacement_policy: ReplacementPolicy::default(),
        }
    }
}

fn default_one() -> f64 {
    1.0
}

fn default_half() -> f64 {
    0.5
}

fn default_dual_scale() -> f64 {
    0.25
}

fn default_restore_time_max() -> f64 {
    300.0
}

fn default_restoration_threshold() -> f64 {
    0.98
}

fn default_required_time_threshold() -> f64 {
    0.99
}

fn default_stream_counts() -> Vec<usize> {
    vec![1]
}

fn default_uncosted_types() -> Vec<String> {
    ["CONN_NODE", "SYSTEM_INPUT", "SYSTEM_OUTPUT"]
        .into_iter()
        .map(String::from)
        .collect()
}

pub fn load_spec_from_path(path: &Path) -> Result<FacilitySpec> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading facility spec '{}'", path.display()))?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            serde_yaml::from_str(&data).context("parsing facility spec yaml")
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::from_str(&data).context("parsing facility spec json")
        }
        _ => serde_yaml::from_str(&data)
            .or_else(|_| serde_json::from_str(&data))
            .context("parsing facility spec"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
components:
  - {id: in, component_type: SYSTEM_INPUT, node_type: supply}
  - {id: out, component_type: SYSTEM_OUTPUT, node_type: sink}
connections:
  - {origin: in, destination: out}
fragilities:
  - component_type: SYSTEM_INPUT
    damage_states:
      - name: DS1 Complete
        fragility: {kind: dual_mode, log_std_1: 0.4, log_std_2: 0.6, minimum: 0.1}
        damage_ratio: 1.0
        functionality: 0.0
        recovery_mean: 5
        recovery_std: 1
supply:
  - {node: in, capacity_fraction: 1.0, commodity: power}
outputs:
  - {node: out, production_capacity: 10, capacity_fraction: 1.0, priority: 1}
simulation:
  hazard_min: 0.1
  hazard_max: 1.0
  hazard_step: 0.1
  num_samples: 10
  restore_time_upper: 50
"#;

    #[test]
    fn applies_defaults() {
        let spec: FacilitySpec = serde_yaml::from_str(MINIMAL).unwrap();
        assert_eq!(spec.uncosted_types.len(), 3);
        assert_eq!(spec.restoration.stream_counts, vec![1]);
        assert_eq!(spec.restoration.start_offset, 1.0);
        assert_eq!(spec.restoration.weight_criterion, WeightCriterion::MinCost);
        assert_eq!(spec.simulation.restoration_threshold, 0.98);
        assert_eq!(spec.simulation.required_time_threshold, 0.99);
        assert_eq!(spec.components[0].capacity, 1.0);
        assert!(spec.class_damage_limits.is_empty());
        match spec.fragilities[0].damage_states[0].fragility {
            FragilitySpec::DualMode {
                scale,
                weight_1,
                weight_2,
                ..
            } => {
                assert_eq!(scale, 0.25);
                assert_eq!((weight_1, weight_2), (0.5, 0.5));
            }
            other => panic!("unexpected fragility {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_keys() {
        let text = MINIMAL.replace("num_samples: 10", "num_samples: 10\n  samples_per_level: 4");
        assert!(serde_yaml::from_str::<FacilitySpec>(&text).is_err());
    }

    #[test]
    fn loads_json_without_extension() {
        let spec: FacilitySpec = serde_yaml::from_str(MINIMAL).unwrap();
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&spec).unwrap()).unwrap();
        let loaded = load_spec_from_path(file.path()).unwrap();
        assert_eq!(loaded.components.len(), 2);
    }
}
