//! # sira-core: Facility Network Model
//!
//! Data structures describing an infrastructure facility as a network of
//! interdependent components, together with the fragility and recovery tables
//! that drive seismic damage simulation.
//!
//! ## Design Philosophy
//!
//! A facility is modeled as a **directed graph** where:
//! - **Nodes**: [`Component`]s (transformers, breakers, junctions, supply and output markers)
//! - **Edges**: [`Connection`]s carrying capacity, weight and distance
//!
//! Components live in an index-stable arena: the petgraph [`NodeIndex`] of a
//! component is also its position in every per-component array used by the
//! simulation (draw matrices, functionality vectors, response tables). String
//! ids are resolved once, at construction.
//!
//! ## Quick Start
//!
//! ```rust
//! use sira_core::*;
//!
//! let mut network = FacilityNetwork::new();
//! network
//!     .add_component(Component::new("grid_in", "SYSTEM_INPUT", NodeType::Supply))
//!     .unwrap();
//! network
//!     .add_component(
//!         Component::new("tx_1", "Power Transformer", NodeType::Transshipment)
//!             .with_cost_fraction(1.0),
//!     )
//!     .unwrap();
//! network
//!     .add_component(Component::new("line_out", "SYSTEM_OUTPUT", NodeType::Sink))
//!     .unwrap();
//!
//! network.connect("grid_in", "tx_1", Connection::new(1.0, 1.0)).unwrap();
//! network.connect("tx_1", "line_out", Connection::new(1.0, 1.0)).unwrap();
//! assert_eq!(network.len(), 3);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Unified error type
//! - [`fragility`] - Damage states, fragility functions and the per-type table
//! - [`setup`] - Supply/output setup and the validated [`SystemModel`]
//! - [`graph_utils`] - Topological summaries (sources, reachability, components)

use petgraph::graph::{DiGraph, EdgeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

pub mod error;
pub mod fragility;
pub mod graph_utils;
pub mod setup;

pub use error::{SiraError, SiraResult};
pub use fragility::{
    DamageState, FragilityFunction, FragilityTable, RecoveryParams, TypeFragility, NO_DAMAGE,
};
pub use graph_utils::*;
pub use petgraph::graph::NodeIndex;
pub use setup::{OutputLine, SupplyNode, SystemModel};

/// Role a component plays in the flow network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// Entry point of a commodity (fuel, power, water) into the facility
    Supply,
    /// A component whose loss attenuates everything downstream of it
    Dependency,
    /// Pass-through component on a production path
    Transshipment,
    /// Terminal node, typically an output line marker
    Sink,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Supply => "supply",
            NodeType::Dependency => "dependency",
            NodeType::Transshipment => "transshipment",
            NodeType::Sink => "sink",
        }
    }
}

/// One physical component of the facility. Immutable once added to a network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Unique component id
    pub id: String,
    /// Fragility/recovery type (key into the [`FragilityTable`])
    pub component_type: String,
    /// Broader equipment class, used for grouping in reports
    pub component_class: String,
    /// Share of total facility value, in [0, 1]
    pub cost_fraction: f64,
    pub node_type: NodeType,
    pub node_cluster: Option<String>,
    /// Nominal throughput capacity (normalised, 1.0 by default)
    pub capacity: f64,
}

impl Component {
    pub fn new(
        id: impl Into<String>,
        component_type: impl Into<String>,
        node_type: NodeType,
    ) -> Self {
        let component_type = component_type.into();
        Self {
            id: id.into(),
            component_class: component_type.clone(),
            component_type,
            cost_fraction: 0.0,
            node_type,
            node_cluster: None,
            capacity: 1.0,
        }
    }

    pub fn with_cost_fraction(mut self, cost_fraction: f64) -> Self {
        self.cost_fraction = cost_fraction;
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.component_class = class.into();
        self
    }

    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.node_cluster = Some(cluster.into());
        self
    }

    pub fn with_capacity(mut self, capacity: f64) -> Self {
        self.capacity = capacity;
        self
    }
}

/// Directed link between two components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Explicit edge capacity; `None` inherits the origin component's capacity
    pub capacity: Option<f64>,
    pub weight: f64,
    pub distance: f64,
}

impl Connection {
    pub fn new(weight: f64, distance: f64) -> Self {
        Self {
            capacity: None,
            weight,
            distance,
        }
    }

    pub fn with_capacity(mut self, capacity: f64) -> Self {
        self.capacity = Some(capacity);
        self
    }
}

/// The component network (petgraph `DiGraph<Component, Connection>`).
///
/// Node indices are assigned in insertion order and never change, since
/// components are never removed.
#[derive(Debug, Clone, Default)]
pub struct FacilityNetwork {
    pub graph: DiGraph<Component, Connection>,
    lookup: HashMap<String, NodeIndex>,
}

impl FacilityNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component, rejecting duplicate ids.
    pub fn add_component(&mut self, component: Component) -> SiraResult<NodeIndex> {
        if component.id.trim().is_empty() {
            return Err(SiraError::Validation("component id cannot be empty".into()));
        }
        if self.lookup.contains_key(&component.id) {
            return Err(SiraError::Validation(format!(
                "duplicate component id '{}'",
                component.id
            )));
        }
        if !(0.0..=1.0).contains(&component.cost_fraction) {
            return Err(SiraError::Validation(format!(
                "component '{}' cost_fraction {} outside [0, 1]",
                component.id, component.cost_fraction
            )));
        }
        if !(component.capacity >= 0.0) {
            return Err(SiraError::Validation(format!(
                "component '{}' capacity must be non-negative",
                component.id
            )));
        }
        let id = component.id.clone();
        let idx = self.graph.add_node(component);
        self.lookup.insert(id, idx);
        Ok(idx)
    }

    /// Connect two existing components by id.
    pub fn connect(
        &mut self,
        origin: &str,
        destination: &str,
        connection: Connection,
    ) -> SiraResult<EdgeIndex> {
        let from = self.require(origin)?;
        let to = self.require(destination)?;
        if let Some(capacity) = connection.capacity {
            if !(capacity >= 0.0) {
                return Err(SiraError::Validation(format!(
                    "connection {origin} -> {destination} has negative capacity"
                )));
            }
        }
        Ok(self.graph.add_edge(from, to, connection))
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.lookup.get(id).copied()
    }

    /// Resolve an id, failing with a network error when it is unknown.
    pub fn require(&self, id: &str) -> SiraResult<NodeIndex> {
        self.index_of(id)
            .ok_or_else(|| SiraError::Network(format!("unknown component '{id}'")))
    }

    pub fn component(&self, idx: NodeIndex) -> &Component {
        &self.graph[idx]
    }

    pub fn components(&self) -> impl Iterator<Item = (NodeIndex, &Component)> {
        self.graph
            .node_indices()
            .map(move |idx| (idx, &self.graph[idx]))
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Capacity an edge carries when its origin is fully functional.
    pub fn nominal_capacity(&self, edge: EdgeIndex) -> f64 {
        let connection = &self.graph[edge];
        match connection.capacity {
            Some(capacity) => capacity,
            None => self
                .graph
                .edge_endpoints(edge)
                .map(|(origin, _)| self.graph[origin].capacity)
                .unwrap_or(0.0),
        }
    }

    pub fn nodes_of_type(&self, node_type: NodeType) -> Vec<NodeIndex> {
        self.components()
            .filter(|(_, c)| c.node_type == node_type)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Distinct component types present, in sorted order.
    pub fn component_types(&self) -> BTreeSet<&str> {
        self.graph
            .node_weights()
            .map(|c| c.component_type.as_str())
            .collect()
    }
}
