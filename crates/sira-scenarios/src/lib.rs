pub mod output;
pub mod resolve;
pub mod spec;

pub use output::{read_json, write_json};
pub use resolve::{load_facility, resolve_facility, ResolvedFacility};
pub use spec::{
    load_spec_from_path, ComponentSpec, ConnectionSpec, DamageStateSpec, FacilitySpec,
    FragilitySpec, OutputSpec, RestorationSpec, SimulationSpec, SupplySpec, TypeFragilitySpec,
};
