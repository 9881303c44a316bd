//! Toy facilities shared by unit tests, integration tests and benches.

use sira_core::{
    Component, Connection, DamageState, FacilityNetwork, FragilityFunction, FragilityTable,
    NodeType, OutputLine, RecoveryParams, SiraResult, SupplyNode, SystemModel, TypeFragility,
};
use std::collections::BTreeSet;

/// Single-mode damage state with log-std 0.5 and recovery N(5, 1).
pub fn damage_state(name: &str, median: f64, damage_ratio: f64, functionality: f64) -> DamageState {
    DamageState {
        name: name.to_string(),
        fragility: FragilityFunction::SingleMode {
            median,
            log_std: 0.5,
        },
        damage_ratio,
        functionality,
        recovery: RecoveryParams::new(5.0, 1.0),
        temporary_recovery: None,
    }
}

pub fn type_fragility(states: Vec<DamageState>) -> SiraResult<TypeFragility> {
    TypeFragility::new(states)
}

/// One complete-failure state at `median`, full repair after N(mean, 1).
pub fn single_state_type(median: f64, recovery_mean: f64) -> SiraResult<TypeFragility> {
    let mut state = damage_state("DS1 Complete", median, 1.0, 0.0);
    state.recovery = RecoveryParams::new(recovery_mean, 1.0);
    type_fragility(vec![state])
}

fn uncosted_defaults() -> BTreeSet<String> {
    ["CONN_NODE", "SYSTEM_INPUT", "SYSTEM_OUTPUT"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// One supply feeding one output directly; both costed at 0.5.
pub fn two_node_model(median: f64) -> SiraResult<SystemModel> {
    let mut network = FacilityNetwork::new();
    network
        .add_component(Component::new("in", "Feeder", NodeType::Supply).with_cost_fraction(0.5))?;
    network
        .add_component(Component::new("out", "Busbar", NodeType::Sink).with_cost_fraction(0.5))?;
    network.connect("in", "out", Connection::new(1.0, 1.0))?;

    let mut table = FragilityTable::new();
    table.insert("Feeder", single_state_type(median, 5.0)?)?;
    table.insert("Busbar", single_state_type(median, 5.0)?)?;

    let supplies = vec![SupplyNode {
        node: network.require("in")?,
        capacity_fraction: 1.0,
        commodity: "power".into(),
    }];
    let outputs = vec![OutputLine {
        node: network.require("out")?,
        production_capacity: 100.0,
        capacity_fraction: 1.0,
        priority: 1,
    }];
    SystemModel::new(network, table, supplies, outputs, BTreeSet::new())
}

/// `k` supplies `s{i}` each feeding transformer `t{i}`, merging at junction `j`
/// into output `o`. A control building (`control`, dependency) feeds `j`.
pub fn parallel_supply_model(fractions: &[f64]) -> SiraResult<SystemModel> {
    let mut network = FacilityNetwork::new();
    let cost = 1.0 / (fractions.len() + 1) as f64;
    for i in 0..fractions.len() {
        network.add_component(Component::new(format!("s{i}"), "SYSTEM_INPUT", NodeType::Supply))?;
        network.add_component(
            Component::new(format!("t{i}"), "Transformer", NodeType::Transshipment)
                .with_cost_fraction(cost),
        )?;
    }
    network.add_component(
        Component::new("control", "Control Building", NodeType::Dependency)
            .with_cost_fraction(cost),
    )?;
    network.add_component(Component::new("j", "CONN_NODE", NodeType::Transshipment))?;
    network.add_component(Component::new("o", "SYSTEM_OUTPUT", NodeType::Sink))?;

    for i in 0..fractions.len() {
        network.connect(&format!("s{i}"), &format!("t{i}"), Connection::new(1.0, 1.0))?;
        network.connect(&format!("t{i}"), "j", Connection::new(1.0, 1.0))?;
    }
    network.connect("control", "j", Connection::new(1.0, 1.0))?;
    network.connect("j", "o", Connection::new(1.0, 1.0))?;

    let mut table = FragilityTable::new();
    table.insert("SYSTEM_INPUT", single_state_type(f64::INFINITY, 1.0)?)?;
    table.insert("Transformer", single_state_type(0.3, 4.0)?)?;
    table.insert("Control Building", single_state_type(0.6, 6.0)?)?;
    table.insert("CONN_NODE", single_state_type(f64::INFINITY, 1.0)?)?;
    table.insert("SYSTEM_OUTPUT", single_state_type(f64::INFINITY, 1.0)?)?;

    let supplies = fractions
        .iter()
        .enumerate()
        .map(|(i, &capacity_fraction)| {
            Ok(SupplyNode {
                node: network.require(&format!("s{i}"))?,
                capacity_fraction,
                commodity: "power".into(),
            })
        })
        .collect::<SiraResult<Vec<_>>>()?;
    let outputs = vec![OutputLine {
        node: network.require("o")?,
        production_capacity: 100.0,
        capacity_fraction: 1.0,
        priority: 1,
    }];
    SystemModel::new(network, table, supplies, outputs, uncosted_defaults())
}

/// Power and water supplies both needed by a single output.
pub fn two_commodity_model() -> SiraResult<SystemModel> {
    let mut network = FacilityNetwork::new();
    network.add_component(Component::new("power_in", "SYSTEM_INPUT", NodeType::Supply))?;
    network.add_component(Component::new("water_in", "SYSTEM_INPUT", NodeType::Supply))?;
    network.add_component(
        Component::new("generator", "Generator", NodeType::Transshipment).with_cost_fraction(0.6),
    )?;
    network.add_component(
        Component::new("water_pump", "Pump", NodeType::Transshipment).with_cost_fraction(0.4),
    )?;
    network.add_component(Component::new("out", "SYSTEM_OUTPUT", NodeType::Sink))?;
    network.connect("power_in", "generator", Connection::new(1.0, 1.0))?;
    network.connect("water_in", "water_pump", Connection::new(1.0, 1.0))?;
    network.connect("generator", "out", Connection::new(1.0, 1.0))?;
    network.connect("water_pump", "out", Connection::new(1.0, 1.0))?;

    let mut table = FragilityTable::new();
    table.insert("SYSTEM_INPUT", single_state_type(f64::INFINITY, 1.0)?)?;
    table.insert("Generator", single_state_type(0.4, 8.0)?)?;
    table.insert("Pump", single_state_type(0.3, 3.0)?)?;
    table.insert("SYSTEM_OUTPUT", single_state_type(f64::INFINITY, 1.0)?)?;

    let supplies = vec![
        SupplyNode {
            node: network.require("power_in")?,
            capacity_fraction: 1.0,
            commodity: "power".into(),
        },
        SupplyNode {
            node: network.require("water_in")?,
            capacity_fraction: 1.0,
            commodity: "water".into(),
        },
    ];
    let outputs = vec![OutputLine {
        node: network.require("out")?,
        production_capacity: 50.0,
        capacity_fraction: 1.0,
        priority: 1,
    }];
    SystemModel::new(network, table, supplies, outputs, uncosted_defaults())
}

/// One supply `s` feeding two lines: `s -> a -> o1` (priority 1) and
/// `s -> b -> o2` (priority 2), each line half of production.
pub fn two_line_model() -> SiraResult<SystemModel> {
    let mut network = FacilityNetwork::new();
    network.add_component(Component::new("s", "SYSTEM_INPUT", NodeType::Supply))?;
    for id in ["a", "b"] {
        network.add_component(
            Component::new(id, "Breaker", NodeType::Transshipment).with_cost_fraction(0.5),
        )?;
    }
    network.add_component(Component::new("o1", "SYSTEM_OUTPUT", NodeType::Sink))?;
    network.add_component(Component::new("o2", "SYSTEM_OUTPUT", NodeType::Sink))?;
    network.connect("s", "a", Connection::new(1.0, 1.0))?;
    network.connect("s", "b", Connection::new(1.0, 1.0))?;
    network.connect("a", "o1", Connection::new(1.0, 1.0))?;
    network.connect("b", "o2", Connection::new(1.0, 1.0))?;

    let mut table = FragilityTable::new();
    table.insert("SYSTEM_INPUT", single_state_type(f64::INFINITY, 1.0)?)?;
    table.insert("Breaker", single_state_type(0.3, 4.0)?)?;
    table.insert("SYSTEM_OUTPUT", single_state_type(f64::INFINITY, 1.0)?)?;

    let supplies = vec![SupplyNode {
        node: network.require("s")?,
        capacity_fraction: 1.0,
        commodity: "power".into(),
    }];
    let outputs = vec![
        OutputLine {
            node: network.require("o2")?,
            production_capacity: 50.0,
            capacity_fraction: 0.5,
            priority: 2,
        },
        OutputLine {
            node: network.require("o1")?,
            production_capacity: 50.0,
            capacity_fraction: 0.5,
            priority: 1,
        },
    ];
    SystemModel::new(network, table, supplies, outputs, uncosted_defaults())
}

/// `count` interchangeable transformers `t{i}` in parallel between supply `s`
/// and output `o`. Complete failure at median 0.3; full repair N(5, 1),
/// temporary repair N(2, 0.5).
pub fn spares_model(count: usize) -> SiraResult<SystemModel> {
    let mut network = FacilityNetwork::new();
    network.add_component(Component::new("s", "SYSTEM_INPUT", NodeType::Supply))?;
    let cost = 1.0 / count as f64;
    for i in 0..count {
        network.add_component(
            Component::new(format!("t{i}"), "Transformer", NodeType::Transshipment)
                .with_cost_fraction(cost),
        )?;
    }
    network.add_component(Component::new("o", "SYSTEM_OUTPUT", NodeType::Sink))?;
    for i in 0..count {
        network.connect("s", &format!("t{i}"), Connection::new(1.0, 1.0))?;
        network.connect(&format!("t{i}"), "o", Connection::new(1.0, 1.0))?;
    }

    let mut state = damage_state("DS1 Complete", 0.3, 1.0, 0.0);
    state.temporary_recovery = Some(RecoveryParams::new(2.0, 0.5));
    let mut table = FragilityTable::new();
    table.insert("SYSTEM_INPUT", single_state_type(f64::INFINITY, 1.0)?)?;
    table.insert("Transformer", type_fragility(vec![state])?)?;
    table.insert("SYSTEM_OUTPUT", single_state_type(f64::INFINITY, 1.0)?)?;

    let supplies = vec![SupplyNode {
        node: network.require("s")?,
        capacity_fraction: 1.0,
        commodity: "power".into(),
    }];
    let outputs = vec![OutputLine {
        node: network.require("o")?,
        production_capacity: 100.0,
        capacity_fraction: 1.0,
        priority: 1,
    }];
    SystemModel::new(network, table, supplies, outputs, uncosted_defaults())
}
