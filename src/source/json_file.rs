//! JSON dump data source
//!
//! Reads a community dump written by an external bridge process. The file is
//! re-read on every request so the writer can refresh it in place. A missing
//! file counts as "not connected".
//!
//! ```json
//! {
//!   "values": [
//!     { "name": "NAV_X", "kind": "double", "value": 12.5, "source": "PNAV", "time": 1.0 },
//!     { "name": "DEPLOY", "kind": "string", "source": "PHELM" }
//!   ],
//!   "processes": [
//!     { "process": "PHELM", "subscribes": ["NAV_X"], "publishes": ["DESIRED_HEADING"] }
//!   ]
//! }
//! ```

use super::DataSource;
use crate::error::{Result, ResultExt, ScopeError};
use crate::types::{ProcessEntry, VariableEntry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk layout of a community dump
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunityDump {
    #[serde(default)]
    pub values: Vec<VariableEntry>,
    #[serde(default)]
    pub processes: Vec<ProcessEntry>,
}

impl CommunityDump {
    /// Write the dump as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Data source backed by a JSON dump file
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<CommunityDump> {
        if !self.path.exists() {
            return Err(ScopeError::Disconnected);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let dump: CommunityDump = serde_json::from_str(&content)
            .map_err(ScopeError::from)
            .with_context(|| format!("Malformed dump {}", self.path.display()))?;
        Ok(dump)
    }
}

impl DataSource for JsonFileSource {
    fn is_connected(&self) -> bool {
        self.path.exists()
    }

    fn fetch_values(&mut self) -> Result<Vec<VariableEntry>> {
        Ok(self.read()?.values)
    }

    fn fetch_topology(&mut self) -> Result<Vec<ProcessEntry>> {
        Ok(self.read()?.processes)
    }

    fn describe(&self) -> String {
        format!("JSON dump {}", self.path.display())
    }
}
