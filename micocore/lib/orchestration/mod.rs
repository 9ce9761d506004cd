//! The contract this core consumes from the container-orchestration platform, plus an in-process
//! implementation backed by static cluster facts.

mod client;
mod static_client;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use client::*;
pub use static_client::*;
