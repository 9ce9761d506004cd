//! Reconciliation of desired deployment configuration with live cluster state.

mod metrics;
mod reconciler;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use metrics::*;
pub use reconciler::*;
