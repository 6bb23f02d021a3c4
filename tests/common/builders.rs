//! Test data builders for creating test objects

use scope_rs::registry::{SharedRegistry, VariableRegistry};
use scope_rs::types::{ProcessEntry, ValueKind, VariableEntry, VariableValue};

/// Builder for snapshot entries
pub struct EntryBuilder {
    name: String,
    kind: ValueKind,
    value: Option<VariableValue>,
    source: String,
    time: f64,
}

impl EntryBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ValueKind::Double,
            value: Some(VariableValue::Double(0.0)),
            source: "PTEST".to_string(),
            time: 0.0,
        }
    }

    pub fn double(mut self, value: f64) -> Self {
        self.kind = ValueKind::Double;
        self.value = Some(VariableValue::Double(value));
        self
    }

    pub fn string(mut self, value: &str) -> Self {
        self.kind = ValueKind::String;
        self.value = Some(VariableValue::String(value.to_string()));
        self
    }

    pub fn pending(mut self, kind: ValueKind) -> Self {
        self.kind = kind;
        self.value = None;
        self
    }

    pub fn source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    pub fn time(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    pub fn build(self) -> VariableEntry {
        VariableEntry {
            name: self.name,
            kind: self.kind,
            value: self.value,
            source: self.source,
            community: None,
            time: self.time,
        }
    }
}

/// Builder for a populated shared registry
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<VariableEntry>,
    processes: Vec<ProcessEntry>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, entry: VariableEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Add double variables owned by `source`, one per name
    pub fn doubles(mut self, source: &str, names: &[&str]) -> Self {
        for name in names {
            self.entries
                .push(EntryBuilder::new(name).source(source).double(1.0).build());
        }
        self
    }

    pub fn process(mut self, process: &str, subscribes: &[&str], publishes: &[&str]) -> Self {
        self.processes.push(ProcessEntry::new(
            process,
            subscribes.iter().copied(),
            publishes.iter().copied(),
        ));
        self
    }

    pub fn build(self) -> SharedRegistry {
        let registry = VariableRegistry::shared();
        registry
            .apply_snapshot(self.entries)
            .expect("builder snapshot must be consistent");
        if !self.processes.is_empty() {
            registry.apply_process_info(self.processes);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_builder() {
        let entry = EntryBuilder::new("DEPLOY")
            .source("PHELM")
            .pending(ValueKind::String)
            .build();

        assert_eq!(entry.name, "DEPLOY");
        assert_eq!(entry.source, "PHELM");
        assert_eq!(entry.kind, ValueKind::String);
        assert!(entry.value.is_none());
    }
}
