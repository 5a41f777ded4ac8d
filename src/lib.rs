//! fleetcmp library
//!
//! Finds the cheapest EC2 instance type, or fleet of instances, that meets a
//! set of CPU, memory, network and storage constraints using the public
//! on-demand, reserved and spot price documents.

pub mod catalog;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod fetch;
pub mod fleet;
pub mod freshness;
pub mod merge;
pub mod pipeline;
pub mod region;
pub mod render;
pub mod retry;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use catalog::{Catalog, Instance, SpotCatalog};
pub use error::{FleetError, Result};
pub use fleet::{Candidate, Constraints, FleetSize};
