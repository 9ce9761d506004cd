//! Applications: versioned sets of services with per-service deployment information.

mod application_composer;
mod store;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use application_composer::*;
pub use store::*;
