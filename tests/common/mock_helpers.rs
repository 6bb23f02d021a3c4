//! Data source helpers for polling tests

use scope_rs::config::PollingConfig;
use scope_rs::error::{Result, ScopeError};
use scope_rs::source::DataSource;
use scope_rs::types::{ProcessEntry, VariableEntry};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

#[cfg(feature = "simulated-source")]
use scope_rs::source::{SimulatedHandle, SimulatedSource};

/// Fast polling cadence for threaded tests
pub fn fast_polling() -> PollingConfig {
    PollingConfig {
        interval_ms: 5,
        topology_every: 5,
    }
}

#[cfg(feature = "simulated-source")]
pub fn create_test_simulated_source() -> (SimulatedSource, SimulatedHandle) {
    let source = SimulatedSource::new("test");
    let handle = source.handle();
    (source, handle)
}

/// Request counters shared with a [`ScriptedSource`]
#[derive(Debug, Default)]
pub struct ScriptedCounters {
    pub value_requests: AtomicU64,
    pub topology_requests: AtomicU64,
    pub connected: AtomicBool,
}

/// Source that replays fixed answers and counts requests
pub struct ScriptedSource {
    values: Vec<VariableEntry>,
    topology: Vec<ProcessEntry>,
    counters: Arc<ScriptedCounters>,
}

impl ScriptedSource {
    pub fn new(values: Vec<VariableEntry>, topology: Vec<ProcessEntry>) -> Self {
        let counters = ScriptedCounters::default();
        counters.connected.store(true, Ordering::SeqCst);
        Self {
            values,
            topology,
            counters: Arc::new(counters),
        }
    }

    pub fn counters(&self) -> Arc<ScriptedCounters> {
        self.counters.clone()
    }
}

impl DataSource for ScriptedSource {
    fn is_connected(&self) -> bool {
        self.counters.connected.load(Ordering::SeqCst)
    }

    fn fetch_values(&mut self) -> Result<Vec<VariableEntry>> {
        if !self.is_connected() {
            return Err(ScopeError::Disconnected);
        }
        self.counters.value_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.values.clone())
    }

    fn fetch_topology(&mut self) -> Result<Vec<ProcessEntry>> {
        if !self.is_connected() {
            return Err(ScopeError::Disconnected);
        }
        self.counters.topology_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.topology.clone())
    }

    fn describe(&self) -> String {
        "scripted source".to_string()
    }
}
