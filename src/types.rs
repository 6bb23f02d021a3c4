//! Core data types for scope-rs
//!
//! This module contains the fundamental data structures shared by the
//! registry, the polling agent and the data sources.
//!
//! # Main Types
//!
//! - [`ValueKind`] - The value types a middleware variable can carry
//! - [`VariableValue`] - A concrete value (double, string or binary blob)
//! - [`Variable`] - A registry entry: last known value, owning process, timestamps
//! - [`VariableEntry`] - One row of a value snapshot as delivered by a data source
//! - [`ProcessInfo`] / [`ProcessEntry`] - Per-process topology (subscriptions/publications)
//! - [`RegistryStats`] - Counters describing the registry contents
//!
//! # Pending Variables
//!
//! A variable whose existence is known but whose value has not arrived yet is
//! *pending*: its `value` is `None`. Pending variables are hidden from the
//! masked enumeration unless pending display is switched on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The type of value a variable carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// 64-bit floating point
    #[default]
    Double,
    /// UTF-8 string
    String,
    /// Opaque binary payload
    Binary,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueKind::Double => write!(f, "double"),
            ValueKind::String => write!(f, "string"),
            ValueKind::Binary => write!(f, "binary"),
        }
    }
}

/// A concrete variable value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Double(f64),
    String(String),
    Binary(Vec<u8>),
}

impl VariableValue {
    /// The kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            VariableValue::Double(_) => ValueKind::Double,
            VariableValue::String(_) => ValueKind::String,
            VariableValue::Binary(_) => ValueKind::Binary,
        }
    }

    /// Numeric view of the value, if it is a double
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            VariableValue::Double(v) => Some(*v),
            _ => None,
        }
    }
}

impl std::fmt::Display for VariableValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VariableValue::Double(v) => write!(f, "{}", v),
            VariableValue::String(s) => write!(f, "\"{}\"", s),
            VariableValue::Binary(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

/// A variable held by the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Variable name (unique key, case preserved)
    pub name: String,
    /// Declared value type
    pub kind: ValueKind,
    /// Last known value (`None` while pending)
    pub value: Option<VariableValue>,
    /// Name of the process that last wrote this variable
    pub source: String,
    /// Community the write originated from, if reported
    #[serde(default)]
    pub community: Option<String>,
    /// Source timestamp of the last write, in seconds
    pub time: f64,
    /// Local time the last snapshot carrying this variable was applied
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Variable {
    /// Whether the value of this variable has not arrived yet
    pub fn is_pending(&self) -> bool {
        self.value.is_none()
    }

    /// Time since the last update, if the variable has been updated
    pub fn age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.updated_at.map(|at| now - at)
    }

    /// Value formatted for display (`-` while pending)
    pub fn display_value(&self) -> String {
        match &self.value {
            Some(value) => value.to_string(),
            None => "-".to_string(),
        }
    }
}

/// One row of a value snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableEntry {
    pub name: String,
    pub kind: ValueKind,
    #[serde(default)]
    pub value: Option<VariableValue>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub community: Option<String>,
    #[serde(default)]
    pub time: f64,
}

impl VariableEntry {
    /// A double-valued entry
    pub fn double(name: impl Into<String>, value: f64, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ValueKind::Double,
            value: Some(VariableValue::Double(value)),
            source: source.into(),
            community: None,
            time: 0.0,
        }
    }

    /// A string-valued entry
    pub fn string(
        name: impl Into<String>,
        value: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: ValueKind::String,
            value: Some(VariableValue::String(value.into())),
            source: source.into(),
            community: None,
            time: 0.0,
        }
    }

    /// An entry for a variable whose value has not arrived yet
    pub fn pending(name: impl Into<String>, kind: ValueKind, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            value: None,
            source: source.into(),
            community: None,
            time: 0.0,
        }
    }

    /// Set the source timestamp
    pub fn with_time(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    /// Set the originating community
    pub fn with_community(mut self, community: impl Into<String>) -> Self {
        self.community = Some(community.into());
        self
    }

    /// Kind carried by the value, or the declared kind for pending entries
    pub fn effective_kind(&self) -> ValueKind {
        self.value.as_ref().map(VariableValue::kind).unwrap_or(self.kind)
    }
}

/// Per-process topology record held by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    /// Process name (unique key)
    pub name: String,
    /// Variables this process subscribes to
    pub subscribes: BTreeSet<String>,
    /// Variables this process publishes
    pub publishes: BTreeSet<String>,
    /// Whether variables owned by this process are shown
    pub visible: bool,
}

impl ProcessInfo {
    /// A newly observed process: no topology yet, shown
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subscribes: BTreeSet::new(),
            publishes: BTreeSet::new(),
            visible: true,
        }
    }
}

/// One row of a process topology snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessEntry {
    pub process: String,
    #[serde(default)]
    pub subscribes: Vec<String>,
    #[serde(default)]
    pub publishes: Vec<String>,
}

impl ProcessEntry {
    pub fn new(
        process: impl Into<String>,
        subscribes: impl IntoIterator<Item = impl Into<String>>,
        publishes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            process: process.into(),
            subscribes: subscribes.into_iter().map(Into::into).collect(),
            publishes: publishes.into_iter().map(Into::into).collect(),
        }
    }
}

/// Counters describing the registry contents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Variables held, regardless of mask
    pub total_variables: usize,
    /// Variables visible under the active mask
    pub visible_variables: usize,
    /// Variables still awaiting their first value
    pub pending_variables: usize,
    /// Known processes
    pub processes: usize,
    /// Processes currently hidden
    pub hidden_processes: usize,
    /// Value snapshots committed since creation
    pub snapshots_applied: u64,
    /// Value snapshots rejected for type conflicts
    pub snapshots_rejected: u64,
    /// Current generation
    pub generation: u64,
}
