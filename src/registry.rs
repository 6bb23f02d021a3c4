//! Live variable registry
//!
//! The registry is the single piece of mutable state shared between the
//! polling agent (writer) and the scope pane (reader and mask owner). All of
//! its state sits behind one coarse [`Mutex`], so a reader either sees the
//! registry before a write or after it, never part-way through.
//!
//! # Semantics
//!
//! - Value snapshots are **merged**: variables missing from a snapshot keep
//!   their last value until [`VariableRegistry::clear`].
//! - A snapshot containing a type conflict is rejected as a whole and leaves
//!   the registry untouched.
//! - Enumeration (`get`, `num_variables`, `visible_view`) only covers
//!   variables admitted by the active [`FilterMask`]. The visible index is
//!   rebuilt from scratch after every committed change and the generation
//!   counter is bumped, so indices are stable between two changes.
//!
//! # Example
//!
//! ```
//! use scope_rs::registry::VariableRegistry;
//! use scope_rs::types::VariableEntry;
//!
//! let registry = VariableRegistry::new();
//! registry
//!     .apply_snapshot(vec![VariableEntry::double("NAV_X", 12.0, "PNAV")])
//!     .unwrap();
//! assert_eq!(registry.num_variables(), 1);
//! ```

use crate::error::{Result, ScopeError};
use crate::filter::FilterMask;
use crate::types::{ProcessEntry, ProcessInfo, RegistryStats, Variable, VariableEntry};
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Registry handle shared between the polling agent and the pane
pub type SharedRegistry = Arc<VariableRegistry>;

/// A consistent copy of the masked enumeration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryView {
    /// Generation the copy was taken at
    pub generation: u64,
    /// Visible variables in enumeration order
    pub variables: Vec<Variable>,
}

#[derive(Debug, Default)]
struct RegistryState {
    variables: BTreeMap<String, Variable>,
    processes: BTreeMap<String, ProcessInfo>,
    show_pending: bool,
    text_filter: String,
    mask: FilterMask,
    /// Names admitted by `mask`, in enumeration order
    visible: Vec<String>,
    generation: u64,
    snapshots_applied: u64,
    snapshots_rejected: u64,
}

impl RegistryState {
    /// Recompute the mask and visible index, then advance the generation
    fn commit(&mut self) {
        self.mask = FilterMask::derive(&self.processes, self.show_pending, &self.text_filter);
        let mask = &self.mask;
        self.visible = self
            .variables
            .values()
            .filter(|v| mask.admits(v))
            .map(|v| v.name.clone())
            .collect();
        self.generation += 1;
    }

    fn observe_process(&mut self, name: &str) -> &mut ProcessInfo {
        self.processes
            .entry(name.to_string())
            .or_insert_with(|| ProcessInfo::new(name))
    }

    /// Check a snapshot for type conflicts without touching any state
    fn validate(&self, entries: &[VariableEntry]) -> Result<()> {
        let mut seen: HashMap<&str, crate::types::ValueKind> = HashMap::new();
        for entry in entries {
            let incoming = entry.effective_kind();

            if incoming != entry.kind {
                return Err(ScopeError::TypeConflict {
                    name: entry.name.clone(),
                    existing: entry.kind,
                    incoming,
                });
            }

            if let Some(&earlier) = seen.get(entry.name.as_str()) {
                if earlier != incoming {
                    return Err(ScopeError::TypeConflict {
                        name: entry.name.clone(),
                        existing: earlier,
                        incoming,
                    });
                }
            }
            seen.insert(&entry.name, incoming);

            if let Some(existing) = self.variables.get(&entry.name) {
                if !existing.is_pending() && existing.kind != incoming {
                    return Err(ScopeError::TypeConflict {
                        name: entry.name.clone(),
                        existing: existing.kind,
                        incoming,
                    });
                }
            }
        }
        Ok(())
    }
}

/// In-memory table of named variables and per-process topology
#[derive(Debug, Default)]
pub struct VariableRegistry {
    state: Mutex<RegistryState>,
}

impl VariableRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry behind an `Arc`
    pub fn shared() -> SharedRegistry {
        Arc::new(Self::new())
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        // State is only mutated after validation succeeds, so a panic in
        // another holder cannot leave it half-written.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ==================== Writes ====================

    /// Merge a value snapshot into the registry
    ///
    /// New variables are added, known ones take the snapshot's value, source
    /// and time, and variables absent from the snapshot are left alone. A
    /// pending entry never erases a value that has already arrived. On a
    /// type conflict nothing is applied.
    pub fn apply_snapshot(&self, entries: Vec<VariableEntry>) -> Result<()> {
        let mut state = self.lock();

        if let Err(e) = state.validate(&entries) {
            state.snapshots_rejected += 1;
            tracing::warn!("Rejected value snapshot of {} entries: {}", entries.len(), e);
            return Err(e);
        }

        let now = Utc::now();
        let count = entries.len();
        for entry in entries {
            if !entry.source.is_empty() {
                state.observe_process(&entry.source);
            }

            let kind = entry.effective_kind();
            match state.variables.get_mut(&entry.name) {
                Some(existing) => {
                    if entry.value.is_none() && !existing.is_pending() {
                        continue;
                    }
                    existing.kind = kind;
                    existing.value = entry.value;
                    if !entry.source.is_empty() {
                        existing.source = entry.source;
                    }
                    if entry.community.is_some() {
                        existing.community = entry.community;
                    }
                    existing.time = entry.time;
                    existing.updated_at = Some(now);
                }
                None => {
                    let variable = Variable {
                        name: entry.name.clone(),
                        kind,
                        value: entry.value,
                        source: entry.source,
                        community: entry.community,
                        time: entry.time,
                        updated_at: Some(now),
                    };
                    state.variables.insert(entry.name, variable);
                }
            }
        }

        state.snapshots_applied += 1;
        state.commit();
        tracing::trace!(
            "Applied value snapshot: {} entries, generation {}",
            count,
            state.generation
        );
        Ok(())
    }

    /// Create or update process topology records
    ///
    /// Subscription and publication sets are replaced by the snapshot's.
    /// Processes already known keep their visibility flag; new ones are shown.
    pub fn apply_process_info(&self, entries: Vec<ProcessEntry>) {
        let mut state = self.lock();
        for entry in entries {
            let info = state.observe_process(&entry.process);
            info.subscribes = entry.subscribes.into_iter().collect();
            info.publishes = entry.publishes.into_iter().collect();
        }
        state.commit();
        tracing::trace!(
            "Applied process topology: {} processes, generation {}",
            state.processes.len(),
            state.generation
        );
    }

    /// Remove every variable (process records are kept)
    pub fn clear(&self) {
        let mut state = self.lock();
        state.variables.clear();
        state.commit();
    }

    /// Remove every variable and process and restore default mask settings
    pub fn reset(&self) {
        let mut state = self.lock();
        let generation = state.generation;
        let applied = state.snapshots_applied;
        let rejected = state.snapshots_rejected;
        *state = RegistryState {
            generation,
            snapshots_applied: applied,
            snapshots_rejected: rejected,
            ..Default::default()
        };
        state.commit();
    }

    // ==================== Mask ====================

    /// Hide exactly the given processes and show every other known process
    ///
    /// Processes named here that have not been observed yet are recorded as
    /// hidden so they stay masked when they first appear.
    pub fn set_mask<I, S>(&self, hidden: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let hidden: BTreeSet<String> = hidden.into_iter().map(Into::into).collect();
        let mut state = self.lock();
        for name in &hidden {
            state.observe_process(name);
        }
        for info in state.processes.values_mut() {
            info.visible = !hidden.contains(&info.name);
        }
        state.commit();
    }

    /// Show or hide variables that are still awaiting their first value
    pub fn show_pending(&self, show: bool) {
        let mut state = self.lock();
        state.show_pending = show;
        state.commit();
    }

    /// Set the case-insensitive substring filter over variable names
    pub fn set_text_filter(&self, text: &str) {
        let mut state = self.lock();
        state.text_filter = text.to_string();
        state.commit();
    }

    /// Flip a process between shown and hidden, returning the new visibility
    pub fn toggle_process_visibility(&self, process: &str) -> Result<bool> {
        let mut state = self.lock();
        let info = state
            .processes
            .get_mut(process)
            .ok_or_else(|| ScopeError::NotFound(format!("process '{}'", process)))?;
        info.visible = !info.visible;
        let visible = info.visible;
        state.commit();
        Ok(visible)
    }

    /// The active mask
    pub fn mask(&self) -> FilterMask {
        self.lock().mask.clone()
    }

    // ==================== Reads ====================

    /// Visible variable at `index` in the current generation
    pub fn get(&self, index: usize) -> Option<Variable> {
        let state = self.lock();
        state
            .visible
            .get(index)
            .and_then(|name| state.variables.get(name))
            .cloned()
    }

    /// Number of variables visible under the active mask
    pub fn num_variables(&self) -> usize {
        self.lock().visible.len()
    }

    /// Look up a variable by exact name, ignoring the mask
    pub fn variable(&self, name: &str) -> Option<Variable> {
        self.lock().variables.get(name).cloned()
    }

    /// Copy of the whole masked enumeration taken under one lock
    pub fn visible_view(&self) -> RegistryView {
        let state = self.lock();
        RegistryView {
            generation: state.generation,
            variables: state
                .visible
                .iter()
                .filter_map(|name| state.variables.get(name))
                .cloned()
                .collect(),
        }
    }

    /// Names searchable by autocomplete
    ///
    /// Honours hidden processes and the pending setting, but not the text
    /// filter: the text filter is driven by the autocomplete input itself.
    pub fn completion_names(&self) -> Vec<String> {
        let state = self.lock();
        state
            .variables
            .values()
            .filter(|v| state.mask.admits_owner(v))
            .map(|v| v.name.clone())
            .collect()
    }

    /// Known process names, ordered
    pub fn processes(&self) -> Vec<String> {
        self.lock().processes.keys().cloned().collect()
    }

    /// Known process names with their visibility flags, ordered
    pub fn process_list(&self) -> Vec<(String, bool)> {
        self.lock()
            .processes
            .values()
            .map(|p| (p.name.clone(), p.visible))
            .collect()
    }

    /// Visibility of a process, if it is known
    pub fn is_process_visible(&self, process: &str) -> Option<bool> {
        self.lock().processes.get(process).map(|p| p.visible)
    }

    /// Subscriptions and publications of a process
    pub fn proc_info(&self, process: &str) -> Result<(Vec<String>, Vec<String>)> {
        let state = self.lock();
        let info = state
            .processes
            .get(process)
            .ok_or_else(|| ScopeError::NotFound(format!("process '{}'", process)))?;
        Ok((
            info.subscribes.iter().cloned().collect(),
            info.publishes.iter().cloned().collect(),
        ))
    }

    /// Current generation; advances on every committed change
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Counters describing the registry contents
    pub fn stats(&self) -> RegistryStats {
        let state = self.lock();
        RegistryStats {
            total_variables: state.variables.len(),
            visible_variables: state.visible.len(),
            pending_variables: state.variables.values().filter(|v| v.is_pending()).count(),
            processes: state.processes.len(),
            hidden_processes: state.mask.hidden_processes().len(),
            snapshots_applied: state.snapshots_applied,
            snapshots_rejected: state.snapshots_rejected,
            generation: state.generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ValueKind, VariableValue};

    fn nav_registry() -> VariableRegistry {
        let registry = VariableRegistry::new();
        registry
            .apply_snapshot(vec![
                VariableEntry::double("NAV_X", 10.0, "PNAV"),
                VariableEntry::double("NAV_Y", -4.0, "PNAV"),
                VariableEntry::double("NAV_SPEED", 1.5, "PNAV"),
                VariableEntry::double("DESIRED_HEADING", 90.0, "PHELM"),
            ])
            .unwrap();
        registry
    }

    #[test]
    fn test_apply_snapshot_adds_variables() {
        let registry = nav_registry();
        assert_eq!(registry.num_variables(), 4);
        assert_eq!(registry.processes(), vec!["PHELM", "PNAV"]);
        assert_eq!(
            registry.variable("NAV_X").unwrap().value,
            Some(VariableValue::Double(10.0))
        );
    }

    #[test]
    fn test_snapshot_merges() {
        let registry = nav_registry();
        registry
            .apply_snapshot(vec![VariableEntry::double("NAV_X", 11.0, "PNAV")])
            .unwrap();

        assert_eq!(registry.num_variables(), 4);
        assert_eq!(
            registry.variable("NAV_X").unwrap().value,
            Some(VariableValue::Double(11.0))
        );
        assert_eq!(
            registry.variable("NAV_Y").unwrap().value,
            Some(VariableValue::Double(-4.0))
        );
    }

    #[test]
    fn test_type_conflict_rejects_whole_snapshot() {
        let registry = nav_registry();
        let before = registry.visible_view();

        let result = registry.apply_snapshot(vec![
            VariableEntry::double("NAV_Y", 99.0, "PNAV"),
            VariableEntry::string("NAV_X", "bad", "PNAV"),
        ]);

        assert!(matches!(result, Err(ScopeError::TypeConflict { .. })));
        assert_eq!(registry.visible_view(), before);
        assert_eq!(registry.stats().snapshots_rejected, 1);
    }

    #[test]
    fn test_conflict_within_snapshot() {
        let registry = VariableRegistry::new();
        let result = registry.apply_snapshot(vec![
            VariableEntry::double("DEPLOY", 1.0, "PHELM"),
            VariableEntry::string("DEPLOY", "true", "PHELM"),
        ]);
        assert!(result.is_err());
        assert_eq!(registry.stats().total_variables, 0);
    }

    #[test]
    fn test_value_contradicting_declared_kind() {
        let registry = VariableRegistry::new();
        let mut entry = VariableEntry::double("NAV_X", 1.0, "PNAV");
        entry.kind = ValueKind::String;
        assert!(registry.apply_snapshot(vec![entry]).is_err());
    }

    #[test]
    fn test_pending_variable_may_change_kind() {
        let registry = VariableRegistry::new();
        registry
            .apply_snapshot(vec![VariableEntry::pending("DEPLOY", ValueKind::Double, "PHELM")])
            .unwrap();
        registry
            .apply_snapshot(vec![VariableEntry::string("DEPLOY", "true", "PHELM")])
            .unwrap();
        assert_eq!(registry.variable("DEPLOY").unwrap().kind, ValueKind::String);
    }

    #[test]
    fn test_pending_entry_does_not_erase_value() {
        let registry = nav_registry();
        registry
            .apply_snapshot(vec![VariableEntry::pending("NAV_X", ValueKind::Double, "PNAV")])
            .unwrap();
        assert!(!registry.variable("NAV_X").unwrap().is_pending());
    }

    #[test]
    fn test_pending_hidden_unless_shown() {
        let registry = nav_registry();
        registry
            .apply_snapshot(vec![VariableEntry::pending("DEPLOY", ValueKind::String, "PHELM")])
            .unwrap();
        assert_eq!(registry.num_variables(), 4);

        registry.show_pending(true);
        assert_eq!(registry.num_variables(), 5);

        registry.show_pending(false);
        assert_eq!(registry.num_variables(), 4);
    }

    #[test]
    fn test_mask_hides_process_even_while_snapshots_continue() {
        let registry = nav_registry();
        registry.set_mask(["PHELM"]);
        assert_eq!(registry.num_variables(), 3);

        registry
            .apply_snapshot(vec![
                VariableEntry::double("DESIRED_HEADING", 180.0, "PHELM"),
                VariableEntry::double("DESIRED_SPEED", 2.0, "PHELM"),
            ])
            .unwrap();
        assert_eq!(registry.num_variables(), 3);
        for i in 0..registry.num_variables() {
            assert_ne!(registry.get(i).unwrap().source, "PHELM");
        }
        assert_eq!(registry.stats().total_variables, 5);

        registry.set_mask(Vec::<String>::new());
        assert_eq!(registry.num_variables(), 5);
    }

    #[test]
    fn test_mask_for_unseen_process_sticks() {
        let registry = VariableRegistry::new();
        registry.set_mask(["PLOGGER"]);
        registry
            .apply_snapshot(vec![VariableEntry::double("LOG_RATE", 5.0, "PLOGGER")])
            .unwrap();
        assert_eq!(registry.num_variables(), 0);
        assert_eq!(registry.is_process_visible("PLOGGER"), Some(false));
    }

    #[test]
    fn test_get_matches_count_and_order() {
        let registry = nav_registry();
        let names: Vec<String> = (0..registry.num_variables())
            .map(|i| registry.get(i).unwrap().name)
            .collect();
        assert_eq!(names, vec!["DESIRED_HEADING", "NAV_SPEED", "NAV_X", "NAV_Y"]);
        assert!(registry.get(registry.num_variables()).is_none());
    }

    #[test]
    fn test_clear_then_mask_leaves_empty() {
        let registry = nav_registry();
        registry.clear();
        registry.set_mask(["PNAV"]);
        assert_eq!(registry.num_variables(), 0);
        assert!(registry.get(0).is_none());
        // Process records survive a clear
        assert_eq!(registry.processes().len(), 2);
    }

    #[test]
    fn test_reset_wipes_processes() {
        let registry = nav_registry();
        registry.reset();
        assert!(registry.processes().is_empty());
        assert_eq!(registry.stats().total_variables, 0);
    }

    #[test]
    fn test_process_info_preserves_visibility() {
        let registry = nav_registry();
        registry.set_mask(["PHELM"]);
        registry.apply_process_info(vec![
            ProcessEntry::new("PHELM", ["NAV_X", "NAV_Y"], ["DESIRED_HEADING"]),
            ProcessEntry::new("PMARINEVIEWER", ["NAV_X"], Vec::<String>::new()),
        ]);

        assert_eq!(registry.is_process_visible("PHELM"), Some(false));
        assert_eq!(registry.is_process_visible("PMARINEVIEWER"), Some(true));

        let (subs, pubs) = registry.proc_info("PHELM").unwrap();
        assert_eq!(subs, vec!["NAV_X", "NAV_Y"]);
        assert_eq!(pubs, vec!["DESIRED_HEADING"]);
    }

    #[test]
    fn test_proc_info_unknown_process() {
        let registry = nav_registry();
        let err = registry.proc_info("PNOBODY").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_toggle_process_visibility() {
        let registry = nav_registry();
        assert_eq!(registry.toggle_process_visibility("PNAV").unwrap(), false);
        assert_eq!(registry.num_variables(), 1);
        assert_eq!(registry.toggle_process_visibility("PNAV").unwrap(), true);
        assert_eq!(registry.num_variables(), 4);
        assert!(registry.toggle_process_visibility("PNOBODY").is_err());
    }

    #[test]
    fn test_text_filter_affects_enumeration_not_completion() {
        let registry = nav_registry();
        registry.set_text_filter("nav_");
        assert_eq!(registry.num_variables(), 3);
        assert_eq!(registry.completion_names().len(), 4);
    }

    #[test]
    fn test_generation_advances() {
        let registry = VariableRegistry::new();
        let g0 = registry.generation();
        registry
            .apply_snapshot(vec![VariableEntry::double("NAV_X", 1.0, "PNAV")])
            .unwrap();
        let g1 = registry.generation();
        assert!(g1 > g0);

        let _ = registry.apply_snapshot(vec![VariableEntry::string("NAV_X", "x", "PNAV")]);
        assert_eq!(registry.generation(), g1);
    }

    #[test]
    fn test_stats() {
        let registry = nav_registry();
        registry.set_mask(["PHELM"]);
        let stats = registry.stats();
        assert_eq!(stats.total_variables, 4);
        assert_eq!(stats.visible_variables, 3);
        assert_eq!(stats.processes, 2);
        assert_eq!(stats.hidden_processes, 1);
        assert_eq!(stats.snapshots_applied, 1);
    }

    use proptest::prelude::*;

    fn entry_strategy() -> impl Strategy<Value = VariableEntry> {
        (
            prop::sample::select(vec!["NAV_X", "NAV_Y", "NAV_SPEED", "DEPTH", "DEPLOY"]),
            -1000.0f64..1000.0,
            prop::sample::select(vec!["PNAV", "PHELM", "IVPHELM"]),
        )
            .prop_map(|(name, value, source)| VariableEntry::double(name, value, source))
    }

    proptest! {
        #[test]
        fn test_latest_snapshot_wins(
            snapshots in prop::collection::vec(prop::collection::vec(entry_strategy(), 0..8), 1..10)
        ) {
            let registry = VariableRegistry::new();
            let mut expected: BTreeMap<String, f64> = BTreeMap::new();

            for snapshot in snapshots {
                for entry in &snapshot {
                    if let Some(VariableValue::Double(v)) = entry.value {
                        expected.insert(entry.name.clone(), v);
                    }
                }
                registry.apply_snapshot(snapshot).unwrap();

                // Property: every variable seen so far holds its latest value
                for (name, value) in &expected {
                    let var = registry.variable(name).unwrap();
                    prop_assert_eq!(var.value, Some(VariableValue::Double(*value)));
                }
                prop_assert_eq!(registry.stats().total_variables, expected.len());
            }
        }

        #[test]
        fn test_mask_count_matches_definition(
            snapshot in prop::collection::vec(entry_strategy(), 0..20),
            hidden in prop::collection::btree_set(
                prop::sample::select(vec!["PNAV", "PHELM", "IVPHELM"]), 0..3),
        ) {
            let mut last_source: BTreeMap<String, String> = BTreeMap::new();
            for entry in &snapshot {
                last_source.insert(entry.name.clone(), entry.source.clone());
            }

            let registry = VariableRegistry::new();
            registry.apply_snapshot(snapshot).unwrap();
            registry.set_mask(hidden.iter().copied());
            let count = registry.num_variables();

            let expected = last_source
                .values()
                .filter(|source| !hidden.contains(source.as_str()))
                .count();
            prop_assert_eq!(count, expected);

            let mut direct = 0;
            for i in 0..count {
                let var = registry.get(i).unwrap();
                prop_assert!(!hidden.contains(var.source.as_str()));
                direct += 1;
            }
            prop_assert_eq!(direct, count);

            // Property: reapplying the same mask is idempotent
            registry.set_mask(hidden.iter().copied());
            prop_assert_eq!(registry.num_variables(), count);
        }
    }
}
