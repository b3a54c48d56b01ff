//! Construction-site fatality risk prediction.
//!
//! Selections for project scale, facility type, and work type are validated against the
//! encoder vocabularies, turned into an (injury type, cause material) prediction by the
//! configured strategy, and scored against the historical risk table.

pub mod config;
pub mod error;
pub mod resources;
pub mod telemetry;
pub mod workflows;
