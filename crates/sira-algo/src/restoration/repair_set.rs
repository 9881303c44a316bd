//! Minimal repair sets per output line.
//!
//! For every commodity feeding a line, supply subsets are enumerated by
//! increasing size (lexicographic within a size). A subset is feasible when
//! its capacity fractions cover the line's capacity fraction and every member
//! has a path to the line. Its repair set is the union of the members'
//! shortest paths plus the shortest paths from every dependency node to the
//! line. The smallest repair set wins; on equal size the first one found is
//! kept. Enumeration stops once no larger subset can beat the best set.

use super::combinations::Combinations;
use petgraph::algo::astar;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use sira_core::{NodeIndex, NodeType, SiraError, SiraResult, SupplyNode, SystemModel};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

const FRACTION_TOLERANCE: f64 = 1e-9;
/// Floor applied before inverting a restoration time or loss into a weight.
const MIN_WEIGHT_BASIS: f64 = 1e-9;

/// How edge weights are derived for repair-path selection. The weight of an
/// edge comes from its origin component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightCriterion {
    /// Every edge weighs 1 (fewest hops)
    Uniform,
    /// `1 / restoration time` of the origin
    MinTime,
    /// `1 / mean economic loss` of the origin
    #[default]
    MinCost,
}

/// Resolved repair set of one output line.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairPlan {
    /// Position in the model's priority-ordered output list
    pub line: usize,
    pub line_id: String,
    /// Every node the line needs repaired, sorted by index
    pub nodes: Vec<NodeIndex>,
    /// Nodes not already claimed by a higher-priority line
    pub claimed: Vec<NodeIndex>,
    /// Chosen supply ids per commodity
    pub chosen_supplies: BTreeMap<String, Vec<String>>,
    pub feasible: bool,
}

/// Id-based view of a [`RepairPlan`] for reports.
#[derive(Debug, Clone, Serialize)]
pub struct RepairPlanReport {
    pub line: String,
    pub feasible: bool,
    pub nodes: Vec<String>,
    pub claimed: Vec<String>,
    pub chosen_supplies: BTreeMap<String, Vec<String>>,
}

impl RepairPlan {
    pub fn report(&self, model: &SystemModel) -> RepairPlanReport {
        let ids = |nodes: &[NodeIndex]| {
            nodes
                .iter()
                .map(|&n| model.component(n).id.clone())
                .collect()
        };
        RepairPlanReport {
            line: self.line_id.clone(),
            feasible: self.feasible,
            nodes: ids(&self.nodes),
            claimed: ids(&self.claimed),
            chosen_supplies: self.chosen_supplies.clone(),
        }
    }
}

pub struct RepairSetResolver<'a> {
    model: &'a SystemModel,
    node_weight: Vec<f64>,
}

impl<'a> RepairSetResolver<'a> {
    /// `restoration_times` and `mean_loss` are indexed by component.
    pub fn new(
        model: &'a SystemModel,
        criterion: WeightCriterion,
        restoration_times: &[f64],
        mean_loss: &[f64],
    ) -> SiraResult<Self> {
        let n = model.component_count();
        if restoration_times.len() != n || mean_loss.len() != n {
            return Err(SiraError::Simulation(format!(
                "expected {n} restoration times and losses, got {} and {}",
                restoration_times.len(),
                mean_loss.len()
            )));
        }
        let node_weight = (0..n)
            .map(|c| match criterion {
                WeightCriterion::Uniform => 1.0,
                WeightCriterion::MinTime => 1.0 / restoration_times[c].max(MIN_WEIGHT_BASIS),
                WeightCriterion::MinCost => 1.0 / mean_loss[c].max(MIN_WEIGHT_BASIS),
            })
            .collect();
        Ok(Self { model, node_weight })
    }

    /// Shortest path (by origin-node weight) from `from` to `to`, if any.
    pub fn shortest_path(&self, from: NodeIndex, to: NodeIndex) -> Option<Vec<NodeIndex>> {
        astar(
            &self.model.network().graph,
            from,
            |n| n == to,
            |e| self.node_weight[e.source().index()],
            |_| 0.0,
        )
        .map(|(_, path)| path)
    }

    fn dependency_nodes(&self, line_node: NodeIndex) -> BTreeSet<NodeIndex> {
        let mut nodes = BTreeSet::new();
        for dep in self.model.network().nodes_of_type(NodeType::Dependency) {
            match self.shortest_path(dep, line_node) {
                Some(path) => nodes.extend(path),
                None => debug!(
                    dependency = %self.model.component(dep).id,
                    "dependency node has no path to output line"
                ),
            }
        }
        nodes
    }

    /// Smallest repair set for one commodity, with the chosen supplies.
    fn resolve_commodity(
        &self,
        line_node: NodeIndex,
        threshold: f64,
        supplies: &[&SupplyNode],
        dependency: &BTreeSet<NodeIndex>,
    ) -> Option<(BTreeSet<NodeIndex>, Vec<NodeIndex>)> {
        let paths: Vec<Option<Vec<NodeIndex>>> = supplies
            .iter()
            .map(|s| self.shortest_path(s.node, line_node))
            .collect();

        let mut best: Option<(BTreeSet<NodeIndex>, Vec<NodeIndex>)> = None;
        let mut best_len = usize::MAX;
        for size in 1..=supplies.len() {
            if dependency.len().max(size) >= best_len {
                break;
            }
            for subset in Combinations::new(supplies.len(), size) {
                let capacity: f64 = subset.iter().map(|&i| supplies[i].capacity_fraction).sum();
                if capacity + FRACTION_TOLERANCE < threshold {
                    continue;
                }
                let mut nodes = dependency.clone();
                let mut reachable = true;
                for &i in &subset {
                    match &paths[i] {
                        Some(path) => nodes.extend(path.iter().copied()),
                        None => {
                            reachable = false;
                            break;
                        }
                    }
                }
                if reachable && nodes.len() < best_len {
                    best_len = nodes.len();
                    best = Some((nodes, subset.iter().map(|&i| supplies[i].node).collect()));
                }
            }
        }
        best
    }

    /// Repair set of the output line at `line` (priority position), before
    /// cross-line deduplication.
    pub fn resolve(&self, line: usize) -> RepairPlan {
        let output = &self.model.outputs()[line];
        let line_id = self.model.component(output.node).id.clone();
        let dependency = self.dependency_nodes(output.node);

        let mut nodes = dependency.clone();
        let mut chosen_supplies = BTreeMap::new();
        let mut feasible = true;
        for (commodity, supplies) in self.model.commodities() {
            let resolved = self.resolve_commodity(
                output.node,
                output.capacity_fraction,
                &supplies,
                &dependency,
            );
            match resolved {
                Some((set, chosen)) => {
                    nodes.extend(set);
                    chosen_supplies.insert(
                        commodity.to_string(),
                        chosen
                            .iter()
                            .map(|&n| self.model.component(n).id.clone())
                            .collect(),
                    );
                }
                None => {
                    warn!(
                        line = %line_id,
                        commodity,
                        required = output.capacity_fraction,
                        "no supply subset can restore output line"
                    );
                    feasible = false;
                }
            }
        }

        let nodes: Vec<NodeIndex> = nodes.into_iter().collect();
        RepairPlan {
            line,
            line_id,
            claimed: nodes.clone(),
            nodes,
            chosen_supplies,
            feasible,
        }
    }

    /// Repair plans for every line in priority order; each component is
    /// claimed by the first line that needs it.
    pub fn resolve_all(&self) -> Vec<RepairPlan> {
        let mut claimed: BTreeSet<NodeIndex> = BTreeSet::new();
        (0..self.model.outputs().len())
            .map(|line| {
                let mut plan = self.resolve(line);
                plan.claimed.retain(|node| !claimed.contains(node));
                claimed.extend(plan.claimed.iter().copied());
                plan
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{parallel_supply_model, two_line_model};

    fn uniform(model: &SystemModel) -> RepairSetResolver<'_> {
        let n = model.component_count();
        RepairSetResolver::new(model, WeightCriterion::Uniform, &vec![1.0; n], &vec![0.0; n])
            .unwrap()
    }

    fn ids(model: &SystemModel, nodes: &[NodeIndex]) -> Vec<String> {
        let mut ids: Vec<String> = nodes.iter().map(|&n| model.component(n).id.clone()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_single_supply_suffices() {
        let model = parallel_supply_model(&[1.0, 1.0]).unwrap();
        let plan = uniform(&model).resolve(0);
        assert!(plan.feasible);
        assert_eq!(plan.chosen_supplies["power"], vec!["s0".to_string()]);
        assert_eq!(ids(&model, &plan.nodes), vec!["control", "j", "o", "s0", "t0"]);
    }

    #[test]
    fn test_needs_two_supplies() {
        let model = parallel_supply_model(&[0.5, 0.5, 0.5]).unwrap();
        let plan = uniform(&model).resolve(0);
        assert!(plan.feasible);
        assert_eq!(plan.chosen_supplies["power"], vec!["s0".to_string(), "s1".to_string()]);
        assert_eq!(plan.nodes.len(), 7);
    }

    #[test]
    fn test_infeasible_when_supplies_fall_short() {
        let model = parallel_supply_model(&[0.3, 0.3]).unwrap();
        let plan = uniform(&model).resolve(0);
        assert!(!plan.feasible);
        assert!(plan.chosen_supplies.is_empty());
    }

    fn diamond_model() -> SiraResult<SystemModel> {
        use crate::test_utils::single_state_type;
        use sira_core::{Component, Connection, FacilityNetwork, FragilityTable, OutputLine};

        let mut network = FacilityNetwork::new();
        network.add_component(Component::new("s", "SYSTEM_INPUT", NodeType::Supply))?;
        for id in ["x", "y"] {
            network.add_component(
                Component::new(id, "Breaker", NodeType::Transshipment).with_cost_fraction(0.5),
            )?;
        }
        network.add_component(Component::new("o", "SYSTEM_OUTPUT", NodeType::Sink))?;
        for (from, to) in [("s", "x"), ("s", "y"), ("x", "o"), ("y", "o")] {
            network.connect(from, to, Connection::new(1.0, 1.0))?;
        }
        let mut table = FragilityTable::new();
        table.insert("SYSTEM_INPUT", single_state_type(f64::INFINITY, 1.0)?)?;
        table.insert("Breaker", single_state_type(0.3, 4.0)?)?;
        table.insert("SYSTEM_OUTPUT", single_state_type(f64::INFINITY, 1.0)?)?;
        let supplies = vec![SupplyNode {
            node: network.require("s")?,
            capacity_fraction: 1.0,
            commodity: "power".into(),
        }];
        let outputs = vec![OutputLine {
            node: network.require("o")?,
            production_capacity: 10.0,
            capacity_fraction: 1.0,
            priority: 1,
        }];
        let uncosted = ["SYSTEM_INPUT", "SYSTEM_OUTPUT"].into_iter().map(String::from).collect();
        SystemModel::new(network, table, supplies, outputs, uncosted)
    }

    #[test]
    fn test_cost_weights_route_through_lossy_branch() {
        let model = diamond_model().unwrap();
        let x = model.network().index_of("x").unwrap();
        let y = model.network().index_of("y").unwrap();
        let mut loss = vec![0.0; model.component_count()];
        loss[x.index()] = 0.1;
        loss[y.index()] = 0.9;
        let times = vec![1.0; model.component_count()];

        let by_cost =
            RepairSetResolver::new(&model, WeightCriterion::MinCost, &times, &loss).unwrap();
        assert_eq!(ids(&model, &by_cost.resolve(0).nodes), vec!["o", "s", "y"]);

        let mut times = times;
        times[x.index()] = 20.0;
        let by_time =
            RepairSetResolver::new(&model, WeightCriterion::MinTime, &times, &loss).unwrap();
        assert_eq!(ids(&model, &by_time.resolve(0).nodes), vec!["o", "s", "x"]);
    }

    #[test]
    fn test_dedup_by_priority() {
        let model = two_line_model().unwrap();
        let plans = uniform(&model).resolve_all();
        assert_eq!(plans[0].line_id, "o1");
        assert_eq!(ids(&model, &plans[0].claimed), vec!["a", "o1", "s"]);
        assert_eq!(ids(&model, &plans[1].nodes), vec!["b", "o2", "s"]);
        assert_eq!(ids(&model, &plans[1].claimed), vec!["b", "o2"]);
    }

    #[test]
    fn test_weight_vectors_must_match() {
        let model = two_line_model().unwrap();
        assert!(RepairSetResolver::new(&model, WeightCriterion::Uniform, &[1.0], &[0.0]).is_err());
    }
}
