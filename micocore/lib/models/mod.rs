//! Data model for services, applications, background jobs and status snapshots.

mod application;
mod identity;
mod job;
mod patch;
mod service;
mod status;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use application::*;
pub use identity::*;
pub use job::*;
pub use patch::*;
pub use service::*;
pub use status::*;
