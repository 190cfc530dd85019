//! Bundle model: simple and composite bundles, their published state and
//! the collection they live in.

mod factory;
mod model;
mod set;
mod status;

pub use factory::build_bundles;
pub use model::{Bundle, BundleKind, BundleState, InclusionScope};
pub use set::BundleSet;
pub use status::{BundleProcessingStatus, ProcessingPhase};
