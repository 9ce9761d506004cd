//! Wiring of the core components and persistence of their contents.

mod instance;
mod snapshot;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use instance::*;
pub use snapshot::*;
