//! Tracking of asynchronous build and deploy operations.

mod tracker;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use tracker::*;
