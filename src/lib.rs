/// Expose all controller components used by main
pub mod controller;
pub use crate::controller::*;

pub mod apis;
pub mod bolt;
pub mod config;
pub mod defaults;
pub mod errors;
pub use errors::{Error, Result};
#[cfg(test)]
pub mod fixtures;
/// Metrics
mod metrics;
pub use metrics::Metrics;
pub mod resources;
/// Log and trace integrations
pub mod telemetry;
pub mod topology;
pub mod upgrade;
pub mod validation;
pub mod version;

pub mod controllers;

pub const RESTARTED_AT: &str = "kubectl.kubernetes.io/restartedAt";
