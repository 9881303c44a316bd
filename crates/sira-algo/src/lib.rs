//! # sira-algo: Seismic Resilience Simulation
//!
//! Monte-Carlo damage simulation and restoration planning for facilities
//! described by [`sira_core::SystemModel`].
//!
//! ## Pipeline
//!
//! | Stage | Type | Output |
//! |-------|------|--------|
//! | Fragility | [`FragilityEvaluator`] | exceedance probability per damage state |
//! | Sampling | [`DamageStateSampler`] | damage state index per draw |
//! | Flow | [`FlowCapacityModel`] | output per line from component functionality |
//! | Aggregation | [`MonteCarloAggregator`] | loss, output and recovery statistics per hazard level |
//! | Repair sets | [`RepairSetResolver`] | minimal component sets restoring each output line |
//! | Scheduling | [`RestorationScheduler`] | multi-stream schedule and restored-capacity series |
//!
//! [`RestorationPrognosis`] chains restoration-time estimation, repair-set
//! resolution and scheduling for a list of scenario hazards and stream counts.
//!
//! ## Parallelism
//!
//! With the default `parallel` feature, trials of a hazard level run on the
//! rayon pool. Each worker owns a [`FlowScratch`]; outcomes are reduced in
//! trial order, so results do not depend on thread count.
//!
//! ## Example
//!
//! ```ignore
//! use sira_algo::{MonteCarloAggregator, SimulationParams};
//!
//! let aggregator = MonteCarloAggregator::new(&model, params)?;
//! let results = aggregator.run_configured()?;
//! for response in &results.responses {
//!     println!("{:.2} g: loss {:.3}", response.intensity, response.mean_economic_loss);
//! }
//! ```

pub mod flow;
pub mod fragility;
pub mod hazard;
pub mod monte_carlo;
pub mod recovery;
pub mod restoration;
pub mod stats;
pub mod test_utils;

pub use flow::{FlowCapacityModel, FlowScratch, SystemOutput};
pub use fragility::{
    exceedance_probability, exceedance_vector, sample_from_exceedance, state_probabilities,
    DamageStateSampler, FragilityEvaluator,
};
pub use hazard::{HazardRange, RestorationAxis};
pub use monte_carlo::{
    aggregate_by_type, ComponentResponse, ComponentTypeResponse, HazardResponse,
    LineOutputResponse, MonteCarloAggregator, SampleDraws, SimulationParams, SimulationResults,
    SYSTEM_DAMAGE_BOUNDS, SYSTEM_DAMAGE_STATES,
};
pub use recovery::{
    component_type_criticality, ComponentRestoration, RecoveryEstimator, ReplacementPolicy,
    TypeCriticality,
};
pub use restoration::{
    assign_streams, CapacityPoint, HazardRestoration, LineRestoration, LineRestorationTime,
    PrognosisReport, RepairPlan, RepairPlanReport, RepairSetResolver, RestorationParams,
    RestorationPrognosis, RestorationScheduler, RestorationTask, ScenarioRestoration, Schedule,
    ScheduleOutcome, WeightCriterion,
};
