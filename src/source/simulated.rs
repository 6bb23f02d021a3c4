//! Simulated community for running without a live middleware
//!
//! Generates a small, deterministic marine vehicle community: a navigation
//! process, a helm, a logger and a viewer. Values advance by one step per
//! value request rather than by wall-clock time, so tests can predict them.
//!
//! # Fault Injection
//!
//! A [`SimulatedHandle`] obtained from [`SimulatedSource::handle`] can flip
//! connectivity and make either request kind fail, from any thread, while the
//! source is owned by the polling agent.
//!
//! # Enabling
//!
//! Only available with the `simulated-source` feature (on by default).

use super::DataSource;
use crate::error::{Result, ScopeError};
use crate::types::{ProcessEntry, ValueKind, VariableEntry, VariableValue};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Simulated seconds per value request
const STEP_SECS: f64 = 0.25;

/// How a simulated variable evolves
#[derive(Debug, Clone, PartialEq)]
pub enum SignalPattern {
    /// Fixed value
    Constant(f64),
    /// Sine wave
    Sine {
        frequency: f64,
        amplitude: f64,
        offset: f64,
    },
    /// Counter that wraps at `max`
    Counter { step: f64, max: f64 },
    /// Cycles through strings, one per `period` requests
    Text {
        values: Vec<&'static str>,
        period: u64,
    },
    /// Known to the community but never written
    Pending(ValueKind),
}

impl SignalPattern {
    fn sample(&self, step: u64) -> Option<VariableValue> {
        let t = step as f64 * STEP_SECS;
        match self {
            SignalPattern::Constant(v) => Some(VariableValue::Double(*v)),
            SignalPattern::Sine {
                frequency,
                amplitude,
                offset,
            } => Some(VariableValue::Double(
                offset + amplitude * (2.0 * std::f64::consts::PI * frequency * t).sin(),
            )),
            SignalPattern::Counter { step: inc, max } => {
                let value = (step as f64 * inc) % max;
                Some(VariableValue::Double(value))
            }
            SignalPattern::Text { values, period } => {
                if values.is_empty() {
                    return None;
                }
                let idx = (step / (*period).max(1)) as usize % values.len();
                Some(VariableValue::String(values[idx].to_string()))
            }
            SignalPattern::Pending(_) => None,
        }
    }

    fn kind(&self) -> ValueKind {
        match self {
            SignalPattern::Text { .. } => ValueKind::String,
            SignalPattern::Pending(kind) => *kind,
            _ => ValueKind::Double,
        }
    }
}

/// One simulated variable
#[derive(Debug, Clone)]
pub struct SimulatedVariable {
    pub name: &'static str,
    pub owner: &'static str,
    pub pattern: SignalPattern,
}

#[derive(Debug)]
struct SimControl {
    connected: AtomicBool,
    fail_values: AtomicBool,
    fail_topology: AtomicBool,
}

/// Cross-thread control over a [`SimulatedSource`]
#[derive(Debug, Clone)]
pub struct SimulatedHandle {
    control: Arc<SimControl>,
}

impl SimulatedHandle {
    pub fn set_connected(&self, connected: bool) {
        self.control.connected.store(connected, Ordering::SeqCst);
    }

    pub fn fail_values(&self, fail: bool) {
        self.control.fail_values.store(fail, Ordering::SeqCst);
    }

    pub fn fail_topology(&self, fail: bool) {
        self.control.fail_topology.store(fail, Ordering::SeqCst);
    }
}

/// Deterministic synthetic community
#[derive(Debug)]
pub struct SimulatedSource {
    community: String,
    variables: Vec<SimulatedVariable>,
    topology: Vec<ProcessEntry>,
    step: u64,
    control: Arc<SimControl>,
}

impl SimulatedSource {
    /// A source with the default vehicle community
    pub fn new(community: impl Into<String>) -> Self {
        let variables = default_variables();
        let topology = default_topology();
        Self::with_community(community, variables, topology)
    }

    /// A source with an explicit variable set and topology
    pub fn with_community(
        community: impl Into<String>,
        variables: Vec<SimulatedVariable>,
        topology: Vec<ProcessEntry>,
    ) -> Self {
        Self {
            community: community.into(),
            variables,
            topology,
            step: 0,
            control: Arc::new(SimControl {
                connected: AtomicBool::new(true),
                fail_values: AtomicBool::new(false),
                fail_topology: AtomicBool::new(false),
            }),
        }
    }

    /// Handle for toggling connectivity and failures from another thread
    pub fn handle(&self) -> SimulatedHandle {
        SimulatedHandle {
            control: self.control.clone(),
        }
    }

    /// Number of value requests served
    pub fn steps(&self) -> u64 {
        self.step
    }
}

impl DataSource for SimulatedSource {
    fn is_connected(&self) -> bool {
        self.control.connected.load(Ordering::SeqCst)
    }

    fn fetch_values(&mut self) -> Result<Vec<VariableEntry>> {
        if !self.is_connected() {
            return Err(ScopeError::Disconnected);
        }
        if self.control.fail_values.load(Ordering::SeqCst) {
            return Err(ScopeError::Source("simulated value request failure".into()));
        }

        self.step += 1;
        let time = self.step as f64 * STEP_SECS;
        let entries = self
            .variables
            .iter()
            .map(|var| VariableEntry {
                name: var.name.to_string(),
                kind: var.pattern.kind(),
                value: var.pattern.sample(self.step),
                source: var.owner.to_string(),
                community: Some(self.community.clone()),
                time,
            })
            .collect();
        Ok(entries)
    }

    fn fetch_topology(&mut self) -> Result<Vec<ProcessEntry>> {
        if !self.is_connected() {
            return Err(ScopeError::Disconnected);
        }
        if self.control.fail_topology.load(Ordering::SeqCst) {
            return Err(ScopeError::Source(
                "simulated topology request failure".into(),
            ));
        }
        Ok(self.topology.clone())
    }

    fn describe(&self) -> String {
        format!("simulated community '{}'", self.community)
    }
}

fn default_variables() -> Vec<SimulatedVariable> {
    vec![
        SimulatedVariable {
            name: "NAV_X",
            owner: "PNAV",
            pattern: SignalPattern::Sine {
                frequency: 0.05,
                amplitude: 120.0,
                offset: 0.0,
            },
        },
        SimulatedVariable {
            name: "NAV_Y",
            owner: "PNAV",
            pattern: SignalPattern::Sine {
                frequency: 0.05,
                amplitude: 80.0,
                offset: -40.0,
            },
        },
        SimulatedVariable {
            name: "NAV_SPEED",
            owner: "PNAV",
            pattern: SignalPattern::Constant(1.5),
        },
        SimulatedVariable {
            name: "NAV_HEADING",
            owner: "PNAV",
            pattern: SignalPattern::Counter {
                step: 2.0,
                max: 360.0,
            },
        },
        SimulatedVariable {
            name: "NAV_DEPTH",
            owner: "PNAV",
            pattern: SignalPattern::Constant(0.0),
        },
        SimulatedVariable {
            name: "DESIRED_HEADING",
            owner: "PHELM",
            pattern: SignalPattern::Counter {
                step: 2.0,
                max: 360.0,
            },
        },
        SimulatedVariable {
            name: "DESIRED_SPEED",
            owner: "PHELM",
            pattern: SignalPattern::Constant(1.5),
        },
        SimulatedVariable {
            name: "IVPHELM_STATE",
            owner: "PHELM",
            pattern: SignalPattern::Text {
                values: vec!["PARK", "DRIVE"],
                period: 20,
            },
        },
        SimulatedVariable {
            name: "PLOGGER_STATUS",
            owner: "PLOGGER",
            pattern: SignalPattern::Text {
                values: vec!["logging"],
                period: 1,
            },
        },
        SimulatedVariable {
            name: "DEPLOY",
            owner: "PMARINEVIEWER",
            pattern: SignalPattern::Pending(ValueKind::String),
        },
        SimulatedVariable {
            name: "RETURN",
            owner: "PMARINEVIEWER",
            pattern: SignalPattern::Pending(ValueKind::String),
        },
    ]
}

fn default_topology() -> Vec<ProcessEntry> {
    vec![
        ProcessEntry::new(
            "PHELM",
            ["NAV_X", "NAV_Y", "NAV_SPEED", "NAV_HEADING", "DEPLOY", "RETURN"],
            ["DESIRED_HEADING", "DESIRED_SPEED", "IVPHELM_STATE"],
        ),
        ProcessEntry::new(
            "PNAV",
            Vec::<String>::new(),
            ["NAV_X", "NAV_Y", "NAV_SPEED", "NAV_HEADING", "NAV_DEPTH"],
        ),
        ProcessEntry::new("PLOGGER", ["*"], ["PLOGGER_STATUS"]),
        ProcessEntry::new(
            "PMARINEVIEWER",
            ["NAV_X", "NAV_Y", "NAV_HEADING"],
            ["DEPLOY", "RETURN"],
        ),
    ]
}
