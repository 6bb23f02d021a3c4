//! Data source interface for the polling agent
//!
//! A data source is the request/response collaborator that knows the live
//! state of a middleware community. The polling agent only ever asks it three
//! things: whether it is connected, the current values of all variables, and
//! the process topology (who subscribes to and publishes what).
//!
//! # Implementations
//!
//! - [`SimulatedSource`] - Deterministic synthetic community for running
//!   without a live middleware (feature `simulated-source`)
//! - [`JsonFileSource`] - Reads a JSON dump written by an external tool
//!
//! Connectivity is reported as a boolean; a disconnected source is simply
//! skipped by the poller.

pub mod json_file;
#[cfg(feature = "simulated-source")]
pub mod simulated;

pub use json_file::{CommunityDump, JsonFileSource};
#[cfg(feature = "simulated-source")]
pub use simulated::{SimulatedHandle, SimulatedSource};

use crate::config::SourceConfig;
use crate::error::{Result, ScopeError};
use crate::types::{ProcessEntry, VariableEntry};

/// Request/response collaborator queried by the polling agent
///
/// Implementations must be `Send` so the agent can own them on its thread.
#[cfg_attr(test, mockall::automock)]
pub trait DataSource: Send {
    /// Non-blocking connectivity check
    fn is_connected(&self) -> bool;

    /// All current variable values
    fn fetch_values(&mut self) -> Result<Vec<VariableEntry>>;

    /// Subscriptions and publications per process
    fn fetch_topology(&mut self) -> Result<Vec<ProcessEntry>>;

    /// Short description for logs
    fn describe(&self) -> String {
        "data source".to_string()
    }
}

/// Build the data source selected by the configuration
pub fn from_config(config: &SourceConfig) -> Result<Box<dyn DataSource>> {
    match config {
        #[cfg(feature = "simulated-source")]
        SourceConfig::Simulated { community } => {
            Ok(Box::new(SimulatedSource::new(community.clone())))
        }
        #[cfg(not(feature = "simulated-source"))]
        SourceConfig::Simulated { .. } => Err(ScopeError::Config(
            "simulated source requires the 'simulated-source' feature".to_string(),
        )),
        SourceConfig::JsonFile { path } => {
            if !path.exists() {
                return Err(ScopeError::Config(format!(
                    "JSON source file {} does not exist",
                    path.display()
                )));
            }
            Ok(Box::new(JsonFileSource::new(path)))
        }
    }
}
