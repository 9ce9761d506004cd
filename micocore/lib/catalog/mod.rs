//! The versioned service catalog and its dependency graph.

mod graph;
mod service_catalog;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use graph::*;
pub use service_catalog::*;
