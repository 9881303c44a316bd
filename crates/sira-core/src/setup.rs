//! Supply/output setup and the validated facility model.

use crate::error::{SiraError, SiraResult};
use crate::fragility::{FragilityTable, TypeFragility};
use crate::{Component, FacilityNetwork, NodeIndex, NodeType};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Tolerance on the sum of costed component cost fractions.
const COST_FRACTION_TOLERANCE: f64 = 1e-6;

/// A supply node: where one commodity enters the facility.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplyNode {
    pub node: NodeIndex,
    /// Share of the line requirement this supply can cover on its own
    pub capacity_fraction: f64,
    pub commodity: String,
}

/// A production (output) line.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputLine {
    pub node: NodeIndex,
    /// Absolute production capacity; the facility's nominal production is the sum
    pub production_capacity: f64,
    /// Share of nominal production this line can deliver
    pub capacity_fraction: f64,
    /// Lower value = restored first
    pub priority: u32,
}

/// Network, fragility table and supply/output setup, checked for consistency.
///
/// Construction is the single gate for configuration mismatches: every
/// component type must have a fragility entry, every supply and output node
/// must exist with the right node type, and costed cost fractions must sum to 1.
#[derive(Debug, Clone)]
pub struct SystemModel {
    network: FacilityNetwork,
    fragilities: FragilityTable,
    supplies: Vec<SupplyNode>,
    outputs: Vec<OutputLine>,
    uncosted_types: BTreeSet<String>,
    type_slots: Vec<usize>,
    costed: Vec<bool>,
    class_damage_limits: BTreeMap<String, Vec<f64>>,
}

impl SystemModel {
    pub fn new(
        network: FacilityNetwork,
        fragilities: FragilityTable,
        supplies: Vec<SupplyNode>,
        mut outputs: Vec<OutputLine>,
        uncosted_types: BTreeSet<String>,
    ) -> SiraResult<Self> {
        if network.is_empty() {
            return Err(SiraError::Validation("facility has no components".into()));
        }

        let mut type_slots = Vec::with_capacity(network.len());
        for (_, component) in network.components() {
            fragilities.require(&component.component_type)?;
            // require() succeeded, so the slot exists
            type_slots.push(fragilities.slot(&component.component_type).unwrap_or_default());
        }

        if supplies.is_empty() {
            return Err(SiraError::Validation("no supply nodes configured".into()));
        }
        let mut seen = HashSet::new();
        for supply in &supplies {
            let component = checked_node(&network, supply.node, NodeType::Supply)?;
            if !seen.insert(supply.node) {
                return Err(SiraError::Validation(format!(
                    "supply node '{}' listed twice",
                    component.id
                )));
            }
            if !(0.0..=1.0).contains(&supply.capacity_fraction) {
                return Err(SiraError::Validation(format!(
                    "supply node '{}' capacity_fraction {} outside [0, 1]",
                    component.id, supply.capacity_fraction
                )));
            }
            if supply.commodity.trim().is_empty() {
                return Err(SiraError::Validation(format!(
                    "supply node '{}' has no commodity",
                    component.id
                )));
            }
        }

        if outputs.is_empty() {
            return Err(SiraError::Validation("no output lines configured".into()));
        }
        let mut seen = HashSet::new();
        for line in &outputs {
            let component = checked_node(&network, line.node, NodeType::Sink)?;
            if !seen.insert(line.node) {
                return Err(SiraError::Validation(format!(
                    "output node '{}' listed twice",
                    component.id
                )));
            }
            if !(line.capacity_fraction > 0.0 && line.capacity_fraction <= 1.0) {
                return Err(SiraError::Validation(format!(
                    "output node '{}' capacity_fraction {} outside (0, 1]",
                    component.id, line.capacity_fraction
                )));
            }
            if !(line.production_capacity >= 0.0) {
                return Err(SiraError::Validation(format!(
                    "output node '{}' production capacity must be non-negative",
                    component.id
                )));
            }
        }
        outputs.sort_by_key(|line| line.priority);

        let costed: Vec<bool> = network
            .components()
            .map(|(_, c)| !uncosted_types.contains(&c.component_type))
            .collect();
        let cost_sum: f64 = network
            .components()
            .filter(|(idx, _)| costed[idx.index()])
            .map(|(_, c)| c.cost_fraction)
            .sum();
        if (cost_sum - 1.0).abs() > COST_FRACTION_TOLERANCE {
            return Err(SiraError::Validation(format!(
                "costed component cost fractions sum to {cost_sum:.6}, expected 1"
            )));
        }

        Ok(Self {
            network,
            fragilities,
            supplies,
            outputs,
            uncosted_types,
            type_slots,
            costed,
            class_damage_limits: BTreeMap::new(),
        })
    }

    /// Attach failure-fraction limits per component class.
    ///
    /// A class whose share of failed members exceeds its `i`-th limit is in
    /// system damage state `i + 1` or worse. Limits must be non-decreasing
    /// and lie in [0, 1]. Classes absent from the facility are kept but never
    /// contribute.
    pub fn with_class_damage_limits(
        mut self,
        limits: BTreeMap<String, Vec<f64>>,
    ) -> SiraResult<Self> {
        for (class, bounds) in &limits {
            if bounds.is_empty() {
                return Err(SiraError::Validation(format!(
                    "class '{class}' has no damage limits"
                )));
            }
            if bounds.iter().any(|b| !(0.0..=1.0).contains(b)) {
                return Err(SiraError::Validation(format!(
                    "class '{class}' damage limits must lie in [0, 1]"
                )));
            }
            if bounds.windows(2).any(|w| w[1] < w[0]) {
                return Err(SiraError::Validation(format!(
                    "class '{class}' damage limits must be non-decreasing"
                )));
            }
        }
        self.class_damage_limits = limits;
        Ok(self)
    }

    pub fn network(&self) -> &FacilityNetwork {
        &self.network
    }

    pub fn fragilities(&self) -> &FragilityTable {
        &self.fragilities
    }

    pub fn supplies(&self) -> &[SupplyNode] {
        &self.supplies
    }

    /// Output lines in priority order.
    pub fn outputs(&self) -> &[OutputLine] {
        &self.outputs
    }

    pub fn uncosted_types(&self) -> &BTreeSet<String> {
        &self.uncosted_types
    }

    pub fn class_damage_limits(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.class_damage_limits
    }

    /// Sum of output line production capacities.
    pub fn nominal_production(&self) -> f64 {
        self.outputs.iter().map(|line| line.production_capacity).sum()
    }

    /// Supply nodes grouped by commodity, commodities in sorted order.
    pub fn commodities(&self) -> BTreeMap<&str, Vec<&SupplyNode>> {
        let mut groups: BTreeMap<&str, Vec<&SupplyNode>> = BTreeMap::new();
        for supply in &self.supplies {
            groups.entry(supply.commodity.as_str()).or_default().push(supply);
        }
        groups
    }

    pub fn component_count(&self) -> usize {
        self.network.len()
    }

    pub fn component(&self, node: NodeIndex) -> &Component {
        self.network.component(node)
    }

    pub fn is_costed(&self, node: NodeIndex) -> bool {
        self.costed[node.index()]
    }

    /// Costed components in index order.
    pub fn costed_components(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.network
            .graph
            .node_indices()
            .filter(move |&idx| self.costed[idx.index()])
    }

    /// Fragility table slot of a component's type.
    pub fn type_slot(&self, node: NodeIndex) -> usize {
        self.type_slots[node.index()]
    }

    pub fn type_fragility(&self, node: NodeIndex) -> &TypeFragility {
        self.fragilities.by_slot(self.type_slot(node))
    }

    pub fn output_line_of(&self, node: NodeIndex) -> Option<usize> {
        self.outputs.iter().position(|line| line.node == node)
    }
}

fn checked_node(
    network: &FacilityNetwork,
    node: NodeIndex,
    expected: NodeType,
) -> SiraResult<&Component> {
    if node.index() >= network.len() {
        return Err(SiraError::Network(format!(
            "node index {} out of range",
            node.index()
        )));
    }
    let component = network.component(node);
    if component.node_type != expected {
        return Err(SiraError::Validation(format!(
            "component '{}' is a {} node, expected {}",
            component.id,
            component.node_type.as_str(),
            expected.as_str()
        )));
    }
    Ok(component)
}
