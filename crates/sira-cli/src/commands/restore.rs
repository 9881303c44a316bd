use anyhow::{Context, Result};
use sira_algo::RestorationPrognosis;
use sira_scenarios::{load_facility, write_json};
use std::io::{self, Write};
use std::path::Path;
use tabwriter::TabWriter;
use tracing::{info, warn};

pub fn handle(facility: &Path, out: &Path, hazards: &[f64], streams: &[usize]) -> Result<()> {
    let mut resolved = load_facility(facility)?;
    if !hazards.is_empty() {
        resolved.restoration.scenario_hazards = hazards.to_vec();
    }
    if !streams.is_empty() {
        resolved.restoration.stream_counts = streams.to_vec();
    }
    if resolved.restoration.scenario_hazards.is_empty() {
        warn!("no scenario hazards configured; the prognosis will be empty");
    }
    info!(
        facility = %resolved.name,
        hazards = ?resolved.restoration.scenario_hazards,
        streams = ?resolved.restoration.stream_counts,
        "starting restoration prognosis"
    );

    let prognosis = RestorationPrognosis::new(
        &resolved.model,
        resolved.simulation.clone(),
        resolved.restoration.clone(),
    )
    .context("configuring restoration prognosis")?;
    let report = prognosis.run_configured()?;
    write_json(&out.join("restoration_prognosis.json"), &report)?;

    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "HAZARD\tSTREAMS\tLINE\tRESTORED AT\tFEASIBLE")?;
    for row in &report.line_times {
        writeln!(
            writer,
            "{:.3}\t{}\t{}\t{:.0}\t{}",
            row.hazard, row.streams, row.line, row.completion_time, row.feasible
        )?;
    }
    writer.flush()?;
    Ok(())
}
