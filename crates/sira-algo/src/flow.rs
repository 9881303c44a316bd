//! Functionality vector → output capacity, via max-flow.
//!
//! The model is built once per facility and is immutable afterwards. All
//! state that changes per evaluation (propagated functionality, edge
//! capacities, residual graph, BFS buffers) lives in a [`FlowScratch`] owned by
//! the caller, so concurrent trials each work on their own copy.
//!
//! Max-flow is Edmonds-Karp over a residual arc list: arc `2e` is edge `e`
//! forward, arc `2e + 1` its reverse.

use sira_core::{NodeType, SystemModel};
use std::collections::VecDeque;

const FLOW_EPS: f64 = 1e-12;
const NO_ARC: usize = usize::MAX;

#[derive(Debug, Clone)]
struct FlowEdge {
    origin: usize,
    destination: usize,
    nominal: f64,
}

#[derive(Debug, Clone)]
struct LineSetup {
    node: usize,
    capacity_fraction: f64,
    /// Per commodity: (supply node, supply capacity fraction)
    commodities: Vec<Vec<(usize, f64)>>,
}

/// Output of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemOutput {
    /// Achieved output per line, in priority order
    pub line_output: Vec<f64>,
    pub total: f64,
}

/// Per-evaluation mutable buffers.
#[derive(Debug, Clone, Default)]
pub struct FlowScratch {
    functionality: Vec<f64>,
    capacity: Vec<f64>,
    residual: Vec<f64>,
    parent: Vec<usize>,
    visited: Vec<bool>,
    queue: VecDeque<usize>,
}

impl FlowScratch {
    pub fn new(model: &FlowCapacityModel) -> Self {
        Self {
            functionality: vec![0.0; model.node_count],
            capacity: vec![0.0; model.edges.len()],
            residual: vec![0.0; model.edges.len() * 2],
            parent: vec![NO_ARC; model.node_count],
            visited: vec![false; model.node_count],
            queue: VecDeque::with_capacity(model.node_count),
        }
    }
}

/// Max-flow view of a facility.
#[derive(Debug, Clone)]
pub struct FlowCapacityModel {
    node_count: usize,
    edges: Vec<FlowEdge>,
    dependency: Vec<bool>,
    adjacency: Vec<Vec<usize>>,
    lines: Vec<LineSetup>,
    nominal_production: f64,
}

impl FlowCapacityModel {
    pub fn new(model: &SystemModel) -> Self {
        let network = model.network();
        let graph = &network.graph;
        let node_count = graph.node_count();

        let mut edges = Vec::with_capacity(graph.edge_count());
        let mut adjacency = vec![Vec::new(); node_count];
        for edge in graph.edge_indices() {
            let Some((origin, destination)) = graph.edge_endpoints(edge) else {
                continue;
            };
            let e = edges.len();
            adjacency[origin.index()].push(2 * e);
            adjacency[destination.index()].push(2 * e + 1);
            edges.push(FlowEdge {
                origin: origin.index(),
                destination: destination.index(),
                nominal: network.nominal_capacity(edge),
            });
        }

        let dependency = graph
            .node_weights()
            .map(|c| c.node_type == NodeType::Dependency)
            .collect();

        let commodities: Vec<Vec<(usize, f64)>> = model
            .commodities()
            .values()
            .map(|supplies| {
                supplies
                    .iter()
                    .map(|s| (s.node.index(), s.capacity_fraction))
                    .collect()
            })
            .collect();

        let lines = model
            .outputs()
            .iter()
            .map(|line| LineSetup {
                node: line.node.index(),
                capacity_fraction: line.capacity_fraction,
                commodities: commodities.clone(),
            })
            .collect();

        Self {
            node_count,
            edges,
            dependency,
            adjacency,
            lines,
            nominal_production: model.nominal_production(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn nominal_production(&self) -> f64 {
        self.nominal_production
    }

    /// Allocating convenience wrapper around [`Self::evaluate`].
    pub fn system_output(&self, functionality: &[f64]) -> SystemOutput {
        let mut scratch = FlowScratch::new(self);
        let mut line_output = vec![0.0; self.lines.len()];
        let total = self.evaluate(functionality, &mut scratch, &mut line_output);
        SystemOutput { line_output, total }
    }

    /// Write per-line output into `line_output` and return the total.
    ///
    /// `functionality` is indexed by component (node index) and is not
    /// modified; dependency attenuation happens on the scratch copy.
    pub fn evaluate(
        &self,
        functionality: &[f64],
        scratch: &mut FlowScratch,
        line_output: &mut [f64],
    ) -> f64 {
        scratch.functionality.clear();
        scratch.functionality.extend_from_slice(functionality);

        for (e, edge) in self.edges.iter().enumerate() {
            if self.dependency[edge.origin] {
                scratch.functionality[edge.destination] *= scratch.functionality[edge.origin];
            }
            scratch.capacity[e] = edge.nominal * scratch.functionality[edge.origin];
        }

        let mut total = 0.0;
        for (slot, line) in self.lines.iter().enumerate() {
            let mut available = f64::INFINITY;
            for supplies in &line.commodities {
                let mut commodity_flow = 0.0;
                for &(supply, fraction) in supplies {
                    if fraction > 0.0 {
                        commodity_flow += self.max_flow(supply, line.node, scratch) * fraction;
                    }
                }
                available = available.min(commodity_flow);
            }
            let achieved = available.min(line.capacity_fraction) * self.nominal_production;
            line_output[slot] = achieved;
            total += achieved;
        }
        total
    }

    fn arc_head(&self, arc: usize) -> usize {
        let edge = &self.edges[arc / 2];
        if arc % 2 == 0 {
            edge.destination
        } else {
            edge.origin
        }
    }

    /// Edmonds-Karp max-flow from `source` to `sink` under `scratch.capacity`.
    fn max_flow(&self, source: usize, sink: usize, scratch: &mut FlowScratch) -> f64 {
        if source == sink {
            return f64::INFINITY;
        }
        for (e, &capacity) in scratch.capacity.iter().enumerate() {
            scratch.residual[2 * e] = capacity;
            scratch.residual[2 * e + 1] = 0.0;
        }

        let mut total = 0.0;
        loop {
            scratch.visited.iter_mut().for_each(|v| *v = false);
            scratch.queue.clear();
            scratch.visited[source] = true;
            scratch.queue.push_back(source);

            'bfs: while let Some(u) = scratch.queue.pop_front() {
                for &arc in &self.adjacency[u] {
                    if scratch.residual[arc] <= FLOW_EPS {
                        continue;
                    }
                    let v = self.arc_head(arc);
                    if scratch.visited[v] {
                        continue;
                    }
                    scratch.visited[v] = true;
                    scratch.parent[v] = arc;
                    if v == sink {
                        break 'bfs;
                    }
                    scratch.queue.push_back(v);
                }
            }
            if !scratch.visited[sink] {
                break;
            }

            let mut bottleneck = f64::INFINITY;
            let mut v = sink;
            while v != source {
                let arc = scratch.parent[v];
                bottleneck = bottleneck.min(scratch.residual[arc]);
                v = self.arc_head(arc ^ 1);
            }
            let mut v = sink;
            while v != source {
                let arc = scratch.parent[v];
                scratch.residual[arc] -= bottleneck;
                scratch.residual[arc ^ 1] += bottleneck;
                v = self.arc_head(arc ^ 1);
            }
            total += bottleneck;
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{parallel_supply_model, two_commodity_model, two_node_model};

    #[test]
    fn test_intact_system_delivers_nominal() {
        let model = two_node_model(0.3).unwrap();
        let flow = FlowCapacityModel::new(&model);
        let out = flow.system_output(&[1.0, 1.0]);
        assert!((out.total - model.nominal_production()).abs() < 1e-12);
    }

    #[test]
    fn test_failed_supply_delivers_nothing() {
        let model = two_node_model(0.3).unwrap();
        let flow = FlowCapacityModel::new(&model);
        assert_eq!(flow.system_output(&[0.0, 1.0]).total, 0.0);
    }

    #[test]
    fn test_parallel_supplies_add_up() {
        let model = parallel_supply_model(&[0.5, 0.5]).unwrap();
        let flow = FlowCapacityModel::new(&model);
        let n = model.component_count();
        let full = flow.system_output(&vec![1.0; n]).total;

        let mut one_down = vec![1.0; n];
        let t0 = model.network().index_of("t0").unwrap().index();
        one_down[t0] = 0.0;
        let partial = flow.system_output(&one_down).total;
        assert!((partial - 0.5 * full).abs() < 1e-9);
    }

    #[test]
    fn test_line_capacity_fraction_caps_output() {
        let model = parallel_supply_model(&[0.8, 0.8]).unwrap();
        let flow = FlowCapacityModel::new(&model);
        let out = flow.system_output(&vec![1.0; model.component_count()]);
        assert!((out.total - model.nominal_production()).abs() < 1e-9);
    }

    #[test]
    fn test_dependency_attenuates_downstream() {
        let model = parallel_supply_model(&[1.0]).unwrap();
        let flow = FlowCapacityModel::new(&model);
        let mut f = vec![1.0; model.component_count()];
        let control = model.network().index_of("control").unwrap().index();
        f[control] = 0.5;
        let out = flow.system_output(&f);
        assert!((out.total - 0.5 * model.nominal_production()).abs() < 1e-9);
    }

    #[test]
    fn test_scarcest_commodity_limits_line() {
        let model = two_commodity_model().unwrap();
        let flow = FlowCapacityModel::new(&model);
        let mut f = vec![1.0; model.component_count()];
        let water = model.network().index_of("water_pump").unwrap().index();
        f[water] = 0.25;
        let out = flow.system_output(&f);
        assert!((out.total - 0.25 * model.nominal_production()).abs() < 1e-9);
    }

    #[test]
    fn test_output_monotone_in_functionality() {
        let model = parallel_supply_model(&[0.4, 0.3, 0.3]).unwrap();
        let flow = FlowCapacityModel::new(&model);
        let n = model.component_count();
        let base: Vec<f64> = (0..n).map(|i| 0.2 + 0.1 * (i % 5) as f64).collect();
        let base_total = flow.system_output(&base).total;
        for i in 0..n {
            for bump in [0.05, 0.3, 1.0] {
                let mut raised = base.clone();
                raised[i] = (raised[i] + bump).min(1.0);
                let total = flow.system_output(&raised).total;
                assert!(total + 1e-9 >= base_total, "component {i} bump {bump}");
                assert!(total <= model.nominal_production() + 1e-9);
            }
        }
    }

    #[test]
    fn test_scratch_is_reusable() {
        let model = parallel_supply_model(&[0.5, 0.5]).unwrap();
        let flow = FlowCapacityModel::new(&model);
        let mut scratch = FlowScratch::new(&flow);
        let mut lines = vec![0.0; flow.line_count()];
        let n = model.component_count();
        let a = flow.evaluate(&vec![1.0; n], &mut scratch, &mut lines);
        let b = flow.evaluate(&vec![0.0; n], &mut scratch, &mut lines);
        let c = flow.evaluate(&vec![1.0; n], &mut scratch, &mut lines);
        assert_eq!(a, c);
        assert_eq!(b, 0.0);
    }
}
