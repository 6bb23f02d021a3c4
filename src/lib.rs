//! # Scope-RS: Live Variable Inspector
//!
//! A live inspector for the variables published on a marine-robotics
//! publish/subscribe community. A background polling agent asks a data source
//! for current values and for the process topology, and merges the answers
//! into a shared registry. The foreground scope pane reads the registry,
//! applies the operator's filter mask and drives Tab-autocompletion of
//! variable names.
//!
//! ## Architecture
//!
//! - **Registry**: Mutex-guarded table of variables and processes, with a
//!   masked enumeration rebuilt on every change
//! - **Poller**: Thread that queries a [`source::DataSource`] on a fixed
//!   cadence and reports through a crossbeam channel
//! - **Pane**: Event handlers for operator input, autocomplete and the mask
//! - **Sources**: Simulated community and JSON dump reader
//!
//! ## Configuration
//!
//! Settings are read from `scope.toml` in the platform config directory
//! under `dev.scope-rs`:
//!
//! - **Linux**: `~/.config/dev.scope-rs/`
//! - **macOS**: `~/Library/Application Support/dev.scope-rs/`
//! - **Windows**: `%APPDATA%\dev.scope-rs\`
//!
//! ## Example
//!
//! ```ignore
//! use scope_rs::{
//!     config::ScopeConfig,
//!     pane::{Key, ScopeEvent, ScopePane},
//!     poller::PollingAgent,
//!     registry::VariableRegistry,
//!     source,
//! };
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ScopeConfig::load_or_default("scope.toml");
//!     let registry = VariableRegistry::shared();
//!
//!     let source = source::from_config(&config.source)?;
//!     let poller = PollingAgent::new(source, registry.clone(), config.polling.clone()).spawn()?;
//!
//!     let mut pane = ScopePane::new(registry, &config);
//!     pane.type_text("NAV_");
//!     for update in pane.handle(ScopeEvent::Key(Key::Tab { shift: false })) {
//!         println!("{:?}", update);
//!     }
//!
//!     poller.stop()?;
//!     Ok(())
//! }
//! ```

pub mod autocomplete;
pub mod config;
pub mod error;
pub mod filter;
pub mod pane;
pub mod poller;
pub mod registry;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use autocomplete::{AutocompleteEngine, Completion};
pub use config::ScopeConfig;
pub use error::{Result, ScopeError};
pub use filter::FilterMask;
pub use pane::{PaneUpdate, ScopeEvent, ScopePane};
pub use poller::{PollerHandle, PollingAgent};
pub use registry::{SharedRegistry, VariableRegistry};
pub use types::{Variable, VariableEntry, VariableValue};
