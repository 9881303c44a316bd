use crate::{FacilityNetwork, NodeIndex, NodeType, SystemModel};
use petgraph::algo::connected_components;
use petgraph::Direction;
use std::collections::{HashSet, VecDeque};

/// Topology summary printed by `sira inspect`.
#[derive(Debug)]
pub struct NetworkStats {
    pub node_count: usize,
    pub edge_count: usize,
    /// Weakly connected components
    pub connected_components: usize,
    pub max_in_degree: usize,
    pub max_out_degree: usize,
    /// Directed density, edges / (n * (n - 1))
    pub density: f64,
    /// Components with no incoming connection
    pub source_nodes: Vec<String>,
    /// Components with no outgoing connection
    pub sink_nodes: Vec<String>,
    pub supply_count: usize,
    pub sink_count: usize,
}

/// Degree, density and component counts for a facility network.
pub fn network_stats(network: &FacilityNetwork) -> NetworkStats {
    let graph = &network.graph;
    let node_count = graph.node_count();
    let edge_count = graph.edge_count();

    let mut max_in_degree = 0;
    let mut max_out_degree = 0;
    let mut source_nodes = Vec::new();
    let mut sink_nodes = Vec::new();
    for node in graph.node_indices() {
        let in_degree = graph.neighbors_directed(node, Direction::Incoming).count();
        let out_degree = graph.neighbors_directed(node, Direction::Outgoing).count();
        max_in_degree = max_in_degree.max(in_degree);
        max_out_degree = max_out_degree.max(out_degree);
        if in_degree == 0 {
            source_nodes.push(graph[node].id.clone());
        }
        if out_degree == 0 {
            sink_nodes.push(graph[node].id.clone());
        }
    }

    let density = if node_count < 2 {
        0.0
    } else {
        edge_count as f64 / (node_count as f64 * (node_count as f64 - 1.0))
    };

    NetworkStats {
        node_count,
        edge_count,
        connected_components: connected_components(graph),
        max_in_degree,
        max_out_degree,
        density,
        source_nodes,
        sink_nodes,
        supply_count: network.nodes_of_type(NodeType::Supply).len(),
        sink_count: network.nodes_of_type(NodeType::Sink).len(),
    }
}

/// Nodes reachable from `start` following edge direction (breadth-first).
pub fn reachable_from(network: &FacilityNetwork, start: NodeIndex) -> HashSet<NodeIndex> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(start);
    while let Some(node) = queue.pop_front() {
        if !visited.insert(node) {
            continue;
        }
        for neighbor in network.graph.neighbors_directed(node, Direction::Outgoing) {
            if !visited.contains(&neighbor) {
                queue.push_back(neighbor);
            }
        }
    }
    visited
}

/// Output lines that no supply node can reach, by component id.
pub fn unreachable_outputs(model: &SystemModel) -> Vec<String> {
    let mut reached = HashSet::new();
    for supply in model.supplies() {
        reached.extend(reachable_from(model.network(), supply.node));
    }
    model
        .outputs()
        .iter()
        .filter(|line| !reached.contains(&line.node))
        .map(|line| model.component(line.node).id.clone())
        .collect()
}
