use anyhow::Result;
use sira_core::{network_stats, unreachable_outputs};
use sira_scenarios::load_facility;
use std::path::Path;

pub fn handle(facility: &Path) -> Result<()> {
    let resolved = load_facility(facility)?;
    let model = &resolved.model;
    let stats = network_stats(model.network());

    println!("Facility {}:", resolved.name);
    println!("  Nodes         : {}", stats.node_count);
    println!("  Edges         : {}", stats.edge_count);
    println!("  Components    : {}", stats.connected_components);
    println!(
        "  Degree [in/out max]: {}/{}",
        stats.max_in_degree, stats.max_out_degree
    );
    println!("  Density       : {:.4}", stats.density);
    println!("  Supply nodes  : {}", stats.supply_count);
    println!("  Output lines  : {}", stats.sink_count);
    println!("  Source nodes  : {}", stats.source_nodes.join(", "));
    let commodities: Vec<&str> = model.commodities().keys().copied().collect();
    println!("  Commodities   : {}", commodities.join(", "));
    println!("  Nominal output: {:.2}", model.nominal_production());

    let unreachable = unreachable_outputs(model);
    if unreachable.is_empty() {
        println!("All output lines reachable from supply.");
    } else {
        println!("Unreachable output lines: {}", unreachable.join(", "));
    }
    Ok(())
}
