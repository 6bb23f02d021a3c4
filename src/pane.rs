//! Scope pane: operator input, autocomplete and mask control
//!
//! The pane owns the foreground side of the scope. It receives operator
//! events (keys, clipboard, focus, process clicks, refresh ticks), runs them
//! through a per-pane [`HandlerTable`], and returns [`PaneUpdate`]s telling
//! the display collaborator what to change. It never renders anything itself.
//!
//! # Event Routing
//!
//! Each [`EventKind`] maps to one boxed handler closure. The defaults are
//! installed by [`ScopePane::new`]; a host may replace any of them with
//! [`ScopePane::handlers_mut`]. Handlers receive the pane state mutably, so
//! there is no process-wide callback state.
//!
//! # Autocomplete Protocol
//!
//! - An unshifted Tab triggers [`AutocompleteEngine::trigger`].
//! - Any other key, a cut, a paste, focus loss, or a mask change forgets the
//!   previous trigger.
//! - After each trigger or edit the input text becomes the live text filter.

use crate::autocomplete::{AutocompleteEngine, Completion};
use crate::config::ScopeConfig;
use crate::error::Result;
use crate::registry::{RegistryView, SharedRegistry};
use std::collections::HashMap;

/// Keys the input field reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Tab { shift: bool },
    Char(char),
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
    Enter,
    Escape,
}

/// Operator and timer events delivered to the pane
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeEvent {
    /// Key pressed in the input field
    Key(Key),
    /// Input text cut to the clipboard
    Cut,
    /// Clipboard text pasted at the cursor
    Paste(String),
    /// Input field lost focus
    FocusLost,
    /// Process list entry clicked; `modified` toggles its visibility
    ProcessClicked { process: String, modified: bool },
    /// Pending-variable display switched
    ShowPending(bool),
    /// Periodic redraw tick
    Refresh,
}

/// Identifies which handler an event is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Key,
    Cut,
    Paste,
    FocusLost,
    ProcessClicked,
    ShowPending,
    Refresh,
}

impl ScopeEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ScopeEvent::Key(_) => EventKind::Key,
            ScopeEvent::Cut => EventKind::Cut,
            ScopeEvent::Paste(_) => EventKind::Paste,
            ScopeEvent::FocusLost => EventKind::FocusLost,
            ScopeEvent::ProcessClicked { .. } => EventKind::ProcessClicked,
            ScopeEvent::ShowPending(_) => EventKind::ShowPending,
            ScopeEvent::Refresh => EventKind::Refresh,
        }
    }
}

/// Changes the display collaborator should apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaneUpdate {
    /// Replace the input text and place the cursor (in characters)
    SetInput { text: String, cursor: usize },
    /// Show the suggestion list below the input field
    ShowSuggestions(Vec<String>),
    /// Hide the suggestion list
    HideSuggestions,
    /// Audible or visual alert
    Alert,
    /// Show the topology of the focused process
    ProcessFocused {
        process: String,
        subscribes: Vec<String>,
        publishes: Vec<String>,
    },
    /// Update the checkmark of a process
    ProcessVisibility { process: String, visible: bool },
    /// The variable grid must be re-read
    Redraw,
}

/// Topology of the process selected for inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusedProcess {
    pub name: String,
    pub subscribes: Vec<String>,
    pub publishes: Vec<String>,
}

/// Handler bound to one event kind
pub type Handler = Box<dyn FnMut(&mut PaneState, &ScopeEvent) -> Vec<PaneUpdate> + Send>;

/// Per-pane routing table from event kinds to handlers
#[derive(Default)]
pub struct HandlerTable {
    handlers: HashMap<EventKind, Handler>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the standard scope behaviour for every event kind
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.register(EventKind::Key, |state, event| match event {
            ScopeEvent::Key(key) => state.on_key(*key),
            _ => Vec::new(),
        });
        table.register(EventKind::Cut, |state, _| state.on_cut());
        table.register(EventKind::Paste, |state, event| match event {
            ScopeEvent::Paste(text) => state.on_paste(text),
            _ => Vec::new(),
        });
        table.register(EventKind::FocusLost, |state, _| state.on_focus_lost());
        table.register(EventKind::ProcessClicked, |state, event| match event {
            ScopeEvent::ProcessClicked { process, modified } => {
                state.on_process_clicked(process, *modified)
            }
            _ => Vec::new(),
        });
        table.register(EventKind::ShowPending, |state, event| match event {
            ScopeEvent::ShowPending(show) => state.set_show_pending(*show),
            _ => Vec::new(),
        });
        table.register(EventKind::Refresh, |state, _| state.on_refresh());
        table
    }

    /// Bind a handler, replacing any previous one for the same kind
    pub fn register<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&mut PaneState, &ScopeEvent) -> Vec<PaneUpdate> + Send + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
    }

    /// Remove the handler for a kind, leaving events of that kind ignored
    pub fn unregister(&mut self, kind: EventKind) -> bool {
        self.handlers.remove(&kind).is_some()
    }

    pub fn is_registered(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Route an event to its handler
    pub fn dispatch(&mut self, state: &mut PaneState, event: &ScopeEvent) -> Vec<PaneUpdate> {
        match self.handlers.get_mut(&event.kind()) {
            Some(handler) => handler(state, event),
            None => {
                tracing::trace!("No handler for {:?}", event.kind());
                Vec::new()
            }
        }
    }
}

/// Mutable state of a scope pane, handed to handlers
pub struct PaneState {
    registry: SharedRegistry,
    engine: AutocompleteEngine,
    truncation_marker: String,
    input: String,
    /// Cursor position in characters
    cursor: usize,
    suggestions: Option<Vec<String>>,
    focused: Option<FocusedProcess>,
    last_generation: u64,
}

impl PaneState {
    fn new(registry: SharedRegistry, config: &ScopeConfig) -> Self {
        Self {
            registry,
            engine: AutocompleteEngine::new(config.autocomplete.clone()),
            truncation_marker: config.autocomplete.truncation_marker.clone(),
            input: String::new(),
            cursor: 0,
            suggestions: None,
            focused: None,
            last_generation: 0,
        }
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &AutocompleteEngine {
        &self.engine
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn suggestions(&self) -> Option<&[String]> {
        self.suggestions.as_deref()
    }

    pub fn focused_process(&self) -> Option<&FocusedProcess> {
        self.focused.as_ref()
    }

    // ==================== Input ====================

    fn byte_offset(&self, chars: usize) -> usize {
        self.input
            .char_indices()
            .nth(chars)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }

    fn char_len(&self) -> usize {
        self.input.chars().count()
    }

    fn input_update(&self) -> PaneUpdate {
        PaneUpdate::SetInput {
            text: self.input.clone(),
            cursor: self.cursor,
        }
    }

    /// Forget the last autocomplete trigger and close an open suggestion list
    fn invalidate(&mut self, updates: &mut Vec<PaneUpdate>) {
        self.engine.invalidate();
        if self.suggestions.take().is_some() {
            updates.push(PaneUpdate::HideSuggestions);
        }
    }

    pub fn on_key(&mut self, key: Key) -> Vec<PaneUpdate> {
        if key == (Key::Tab { shift: false }) {
            return self.autocomplete();
        }

        let mut updates = Vec::new();
        self.invalidate(&mut updates);

        let before = self.input.clone();
        let moved = match key {
            Key::Char(c) => {
                let at = self.byte_offset(self.cursor);
                self.input.insert(at, c);
                self.cursor += 1;
                true
            }
            Key::Backspace if self.cursor > 0 => {
                let at = self.byte_offset(self.cursor - 1);
                self.input.remove(at);
                self.cursor -= 1;
                true
            }
            Key::Delete if self.cursor < self.char_len() => {
                let at = self.byte_offset(self.cursor);
                self.input.remove(at);
                true
            }
            Key::Left if self.cursor > 0 => {
                self.cursor -= 1;
                true
            }
            Key::Right if self.cursor < self.char_len() => {
                self.cursor += 1;
                true
            }
            Key::Home => {
                self.cursor = 0;
                true
            }
            Key::End => {
                self.cursor = self.char_len();
                true
            }
            Key::Enter => {
                self.apply_input_filter(&mut updates);
                false
            }
            _ => false,
        };

        if moved {
            updates.push(self.input_update());
        }
        if self.input != before {
            self.apply_input_filter(&mut updates);
        }
        updates
    }

    /// Make the input text the live name filter
    fn apply_input_filter(&mut self, updates: &mut Vec<PaneUpdate>) {
        self.registry.set_text_filter(&self.input);
        updates.push(self.redraw());
    }

    pub fn on_cut(&mut self) -> Vec<PaneUpdate> {
        let mut updates = Vec::new();
        self.invalidate(&mut updates);
        self.input.clear();
        self.cursor = 0;
        updates.push(self.input_update());
        self.apply_input_filter(&mut updates);
        updates
    }

    pub fn on_paste(&mut self, text: &str) -> Vec<PaneUpdate> {
        let mut updates = Vec::new();
        self.invalidate(&mut updates);
        // Single-line field
        let text: String = text.chars().filter(|c| !c.is_control()).collect();
        let at = self.byte_offset(self.cursor);
        self.input.insert_str(at, &text);
        self.cursor += text.chars().count();
        updates.push(self.input_update());
        if !text.is_empty() {
            self.apply_input_filter(&mut updates);
        }
        updates
    }

    pub fn on_focus_lost(&mut self) -> Vec<PaneUpdate> {
        let mut updates = Vec::new();
        self.invalidate(&mut updates);
        updates
    }

    // ==================== Autocomplete ====================

    /// Run one autocomplete trigger against the current input
    pub fn autocomplete(&mut self) -> Vec<PaneUpdate> {
        let names = self.registry.completion_names();
        let completion = self.engine.trigger(&self.input, &names);
        let mut updates = Vec::new();

        match completion {
            Completion::NoMatch { alert } => {
                if alert {
                    updates.push(PaneUpdate::Alert);
                }
                if self.suggestions.take().is_some() {
                    updates.push(PaneUpdate::HideSuggestions);
                }
            }
            Completion::Replace { text } => {
                self.input = text;
                self.cursor = self.char_len();
                updates.push(self.input_update());
                if self.suggestions.take().is_some() {
                    updates.push(PaneUpdate::HideSuggestions);
                }
            }
            Completion::Suggest {
                mut entries,
                truncated,
                ..
            } => {
                if truncated {
                    entries.push(self.truncation_marker.clone());
                }
                self.suggestions = Some(entries.clone());
                updates.push(PaneUpdate::ShowSuggestions(entries));
            }
        }

        self.registry.set_text_filter(&self.input);
        self.last_generation = self.registry.generation();
        updates.push(PaneUpdate::Redraw);
        updates
    }

    // ==================== Mask ====================

    /// Flip a process between shown and hidden
    pub fn toggle_process_visibility(&mut self, process: &str) -> Result<Vec<PaneUpdate>> {
        let visible = self.registry.toggle_process_visibility(process)?;
        tracing::debug!(
            "Process {} is now {}",
            process,
            if visible { "shown" } else { "hidden" }
        );
        let mut updates = Vec::new();
        self.invalidate(&mut updates);
        updates.push(PaneUpdate::ProcessVisibility {
            process: process.to_string(),
            visible,
        });
        updates.push(self.redraw());
        Ok(updates)
    }

    /// Show or hide variables that have no value yet
    pub fn set_show_pending(&mut self, show: bool) -> Vec<PaneUpdate> {
        self.registry.show_pending(show);
        let mut updates = Vec::new();
        self.invalidate(&mut updates);
        updates.push(self.redraw());
        updates
    }

    /// Replace the substring filter over variable names
    pub fn set_text_filter(&mut self, text: &str) -> Vec<PaneUpdate> {
        self.registry.set_text_filter(text);
        let mut updates = Vec::new();
        self.invalidate(&mut updates);
        updates.push(self.redraw());
        updates
    }

    fn redraw(&mut self) -> PaneUpdate {
        self.last_generation = self.registry.generation();
        PaneUpdate::Redraw
    }

    // ==================== Processes ====================

    pub fn on_process_clicked(&mut self, process: &str, modified: bool) -> Vec<PaneUpdate> {
        if modified {
            return match self.toggle_process_visibility(process) {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::debug!("Cannot toggle {}: {}", process, e);
                    Vec::new()
                }
            };
        }
        self.focus_process(process)
    }

    /// Select a process for inspection; an unknown process leaves the prior display
    pub fn focus_process(&mut self, process: &str) -> Vec<PaneUpdate> {
        match self.registry.proc_info(process) {
            Ok((subscribes, publishes)) => {
                let focused = FocusedProcess {
                    name: process.to_string(),
                    subscribes,
                    publishes,
                };
                let update = focused_update(&focused);
                self.focused = Some(focused);
                vec![update]
            }
            Err(e) => {
                tracing::debug!("Keeping prior process display: {}", e);
                Vec::new()
            }
        }
    }

    // ==================== Refresh ====================

    /// Cooperative refresh tick: report what changed since the last one
    pub fn on_refresh(&mut self) -> Vec<PaneUpdate> {
        let mut updates = Vec::new();

        let generation = self.registry.generation();
        if generation == self.last_generation {
            return updates;
        }
        self.last_generation = generation;

        if let Some(focused) = &self.focused {
            if let Ok((subscribes, publishes)) = self.registry.proc_info(&focused.name) {
                if subscribes != focused.subscribes || publishes != focused.publishes {
                    let refreshed = FocusedProcess {
                        name: focused.name.clone(),
                        subscribes,
                        publishes,
                    };
                    updates.push(focused_update(&refreshed));
                    self.focused = Some(refreshed);
                }
            }
        }

        updates.push(PaneUpdate::Redraw);
        updates
    }
}

fn focused_update(focused: &FocusedProcess) -> PaneUpdate {
    PaneUpdate::ProcessFocused {
        process: focused.name.clone(),
        subscribes: focused.subscribes.clone(),
        publishes: focused.publishes.clone(),
    }
}

/// The scope pane: state plus its handler table
pub struct ScopePane {
    state: PaneState,
    handlers: HandlerTable,
}

impl ScopePane {
    /// Create a pane over a registry and apply the configured initial mask
    pub fn new(registry: SharedRegistry, config: &ScopeConfig) -> Self {
        registry.set_mask(config.filter.hidden_processes.iter().cloned());
        registry.show_pending(config.filter.show_pending);
        Self {
            state: PaneState::new(registry, config),
            handlers: HandlerTable::with_defaults(),
        }
    }

    /// Deliver an event
    pub fn handle(&mut self, event: ScopeEvent) -> Vec<PaneUpdate> {
        self.handlers.dispatch(&mut self.state, &event)
    }

    /// Type `text` at the cursor, one key per character
    pub fn type_text(&mut self, text: &str) -> Vec<PaneUpdate> {
        text.chars()
            .flat_map(|c| self.handle(ScopeEvent::Key(Key::Char(c))))
            .collect()
    }

    pub fn handlers_mut(&mut self) -> &mut HandlerTable {
        &mut self.handlers
    }

    pub fn state(&self) -> &PaneState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut PaneState {
        &mut self.state
    }

    pub fn input(&self) -> &str {
        self.state.input()
    }

    pub fn suggestions(&self) -> Option<&[String]> {
        self.state.suggestions()
    }

    /// Masked variable enumeration for the grid
    pub fn grid(&self) -> RegistryView {
        self.state.registry.visible_view()
    }

    /// Processes with their visibility checkmarks
    pub fn process_list(&self) -> Vec<(String, bool)> {
        self.state.registry.process_list()
    }

    pub fn focused_process(&self) -> Option<&FocusedProcess> {
        self.state.focused_process()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::VariableRegistry;
    use crate::types::{ProcessEntry, ValueKind, VariableEntry};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const TAB: ScopeEvent = ScopeEvent::Key(Key::Tab { shift: false });

    fn pane() -> ScopePane {
        let registry = VariableRegistry::shared();
        registry
            .apply_snapshot(vec![
                VariableEntry::double("NAV_X", 10.0, "PNAV"),
                VariableEntry::double("NAV_Y", -4.0, "PNAV"),
                VariableEntry::double("NAV_SPEED", 1.5, "PNAV"),
                VariableEntry::double("DESIRED_HEADING", 90.0, "PHELM"),
            ])
            .unwrap();
        registry.apply_process_info(vec![ProcessEntry::new(
            "PHELM",
            ["NAV_X", "NAV_Y"],
            ["DESIRED_HEADING"],
        )]);
        ScopePane::new(registry, &ScopeConfig::default())
    }

    #[test]
    fn test_tab_suggests_for_shared_prefix() {
        let mut pane = pane();
        pane.type_text("NAV_");
        let updates = pane.handle(TAB);

        assert!(updates.contains(&PaneUpdate::ShowSuggestions(vec![
            "NAV_SPEED".into(),
            "NAV_X".into(),
            "NAV_Y".into()
        ])));
        assert!(!updates
            .iter()
            .any(|u| matches!(u, PaneUpdate::SetInput { .. })));
        assert_eq!(pane.input(), "NAV_");
        // Input becomes the live filter
        assert_eq!(pane.grid().variables.len(), 3);
    }

    #[test]
    fn test_tab_completes_and_moves_cursor() {
        let mut pane = pane();
        pane.type_text("de");
        let updates = pane.handle(TAB);
        assert!(updates.contains(&PaneUpdate::SetInput {
            text: "DESIRED_HEADING".into(),
            cursor: 15
        }));
        assert_eq!(pane.state().cursor(), 15);
        assert!(pane.suggestions().is_none());
    }

    #[test]
    fn test_keystroke_hides_suggestions_and_resets_state() {
        let mut pane = pane();
        pane.type_text("NAV_");
        pane.handle(TAB);
        assert!(pane.suggestions().is_some());

        let updates = pane.handle(ScopeEvent::Key(Key::Char('X')));
        assert!(updates.contains(&PaneUpdate::HideSuggestions));
        assert!(pane.state().engine().state().is_empty());
        assert_eq!(pane.input(), "NAV_X");
    }

    #[test]
    fn test_shift_tab_does_not_complete() {
        let mut pane = pane();
        pane.type_text("de");
        pane.handle(ScopeEvent::Key(Key::Tab { shift: true }));
        assert_eq!(pane.input(), "de");
    }

    #[test]
    fn test_no_match_alerts_once() {
        let mut pane = pane();
        pane.type_text("ZZZ");
        assert!(pane.handle(TAB.clone()).contains(&PaneUpdate::Alert));
        assert!(!pane.handle(TAB).contains(&PaneUpdate::Alert));
        assert_eq!(pane.input(), "ZZZ");
    }

    #[test]
    fn test_edits_follow_into_text_filter() {
        let mut pane = pane();
        pane.type_text("NAV_");
        pane.handle(TAB);
        assert_eq!(pane.grid().variables.len(), 3);

        let updates = pane.handle(ScopeEvent::Cut);
        assert!(updates.contains(&PaneUpdate::Redraw));
        assert_eq!(pane.grid().variables.len(), 4);

        pane.type_text("DES");
        let names: Vec<String> = pane.grid().variables.into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["DESIRED_HEADING"]);

        pane.handle(ScopeEvent::Key(Key::Backspace));
        pane.handle(ScopeEvent::Key(Key::Backspace));
        pane.handle(ScopeEvent::Key(Key::Backspace));
        assert_eq!(pane.grid().variables.len(), 4);

        pane.handle(ScopeEvent::Paste("nav_x".into()));
        assert_eq!(pane.grid().variables.len(), 1);

        // Cursor moves leave the filter alone
        let updates = pane.handle(ScopeEvent::Key(Key::Home));
        assert!(!updates.contains(&PaneUpdate::Redraw));
    }

    #[test]
    fn test_editing_keys() {
        let mut pane = pane();
        pane.type_text("NAVX");
        pane.handle(ScopeEvent::Key(Key::Left));
        pane.handle(ScopeEvent::Key(Key::Char('_')));
        assert_eq!(pane.input(), "NAV_X");

        pane.handle(ScopeEvent::Key(Key::Home));
        pane.handle(ScopeEvent::Key(Key::Delete));
        assert_eq!(pane.input(), "AV_X");

        pane.handle(ScopeEvent::Key(Key::End));
        pane.handle(ScopeEvent::Key(Key::Backspace));
        assert_eq!(pane.input(), "AV_");
        assert_eq!(pane.state().cursor(), 3);
    }

    #[test]
    fn test_cut_and_paste() {
        let mut pane = pane();
        pane.type_text("junk");
        pane.handle(ScopeEvent::Cut);
        assert_eq!(pane.input(), "");

        pane.handle(ScopeEvent::Paste("NAV_\n".into()));
        assert_eq!(pane.input(), "NAV_");
        assert_eq!(pane.state().cursor(), 4);
    }

    #[test]
    fn test_focus_lost_hides_suggestions() {
        let mut pane = pane();
        pane.type_text("NAV_");
        pane.handle(TAB);
        let updates = pane.handle(ScopeEvent::FocusLost);
        assert_eq!(updates, vec![PaneUpdate::HideSuggestions]);
    }

    #[test]
    fn test_process_click_focuses() {
        let mut pane = pane();
        let updates = pane.handle(ScopeEvent::ProcessClicked {
            process: "PHELM".into(),
            modified: false,
        });
        assert_eq!(
            updates,
            vec![PaneUpdate::ProcessFocused {
                process: "PHELM".into(),
                subscribes: vec!["NAV_X".into(), "NAV_Y".into()],
                publishes: vec!["DESIRED_HEADING".into()],
            }]
        );

        // Unknown process keeps the prior display
        let updates = pane.handle(ScopeEvent::ProcessClicked {
            process: "PNOBODY".into(),
            modified: false,
        });
        assert!(updates.is_empty());
        assert_eq!(pane.focused_process().unwrap().name, "PHELM");
    }

    #[test]
    fn test_modified_click_toggles_visibility() {
        let mut pane = pane();
        let updates = pane.handle(ScopeEvent::ProcessClicked {
            process: "PHELM".into(),
            modified: true,
        });
        assert!(updates.contains(&PaneUpdate::ProcessVisibility {
            process: "PHELM".into(),
            visible: false
        }));
        assert_eq!(pane.grid().variables.len(), 3);
        assert!(pane.process_list().contains(&("PHELM".to_string(), false)));

        // Hidden variables are not offered for completion
        pane.type_text("DES");
        assert!(pane.handle(TAB).contains(&PaneUpdate::Alert));
    }

    #[test]
    fn test_show_pending_event() {
        let mut pane = pane();
        pane.state()
            .registry()
            .apply_snapshot(vec![VariableEntry::pending("DEPLOY", ValueKind::String, "PHELM")])
            .unwrap();
        assert_eq!(pane.grid().variables.len(), 4);

        pane.handle(ScopeEvent::ShowPending(true));
        assert_eq!(pane.grid().variables.len(), 5);
    }

    #[test]
    fn test_refresh_only_redraws_on_change() {
        let mut pane = pane();
        assert!(pane.handle(ScopeEvent::Refresh).contains(&PaneUpdate::Redraw));
        assert!(pane.handle(ScopeEvent::Refresh).is_empty());

        pane.state()
            .registry()
            .apply_snapshot(vec![VariableEntry::double("NAV_X", 11.0, "PNAV")])
            .unwrap();
        assert_eq!(pane.handle(ScopeEvent::Refresh), vec![PaneUpdate::Redraw]);
    }

    #[test]
    fn test_refresh_updates_focused_topology() {
        let mut pane = pane();
        pane.state_mut().focus_process("PHELM");
        pane.handle(ScopeEvent::Refresh);

        pane.state().registry().apply_process_info(vec![ProcessEntry::new(
            "PHELM",
            ["NAV_X", "NAV_Y", "NAV_SPEED"],
            ["DESIRED_HEADING"],
        )]);
        let updates = pane.handle(ScopeEvent::Refresh);
        assert!(matches!(
            &updates[0],
            PaneUpdate::ProcessFocused { subscribes, .. } if subscribes.len() == 3
        ));
    }

    #[test]
    fn test_custom_handler_replaces_default() {
        let mut pane = pane();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        pane.handlers_mut().register(EventKind::Refresh, move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
            Vec::new()
        });

        pane.handle(ScopeEvent::Refresh);
        pane.handle(ScopeEvent::Refresh);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(pane.handlers_mut().unregister(EventKind::Cut));
        pane.type_text("NAV");
        pane.handle(ScopeEvent::Cut);
        assert_eq!(pane.input(), "NAV");
    }

    #[test]
    fn test_initial_mask_from_config() {
        let registry = VariableRegistry::shared();
        registry
            .apply_snapshot(vec![
                VariableEntry::double("NAV_X", 1.0, "PNAV"),
                VariableEntry::double("LOG_RATE", 5.0, "PLOGGER"),
            ])
            .unwrap();
        let mut config = ScopeConfig::default();
        config.filter.hidden_processes = vec!["PLOGGER".to_string()];

        let pane = ScopePane::new(registry, &config);
        assert_eq!(pane.grid().variables.len(), 1);
    }
}
