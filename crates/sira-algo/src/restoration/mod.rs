//! Repair-set resolution and restoration scheduling.

mod combinations;
pub mod prognosis;
pub mod repair_set;
pub mod schedule;

pub use combinations::Combinations;
pub use prognosis::{
    HazardRestoration, LineRestorationTime, PrognosisReport, RestorationParams,
    RestorationPrognosis, ScenarioRestoration,
};
pub use repair_set::{RepairPlan, RepairPlanReport, RepairSetResolver, WeightCriterion};
pub use schedule::{
    assign_streams, CapacityPoint, LineRestoration, RestorationScheduler, RestorationTask,
    Schedule, ScheduleOutcome, StreamSlot,
};
