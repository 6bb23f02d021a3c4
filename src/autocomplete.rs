//! Tab-driven prefix autocomplete over variable names
//!
//! The engine runs once per explicit trigger (an unshifted Tab). Given the
//! text typed so far and the names currently searchable, it decides whether
//! to rewrite the input, show a list of suggestions, or signal that nothing
//! matches.
//!
//! Comparison is always case-insensitive (names are uppercased for
//! comparison) while the text written back keeps the case of the registered
//! names. Matching is a pure prefix test.
//!
//! # Decision
//!
//! 1. No candidates: [`Completion::NoMatch`]. The alert flag is raised only
//!    when the failing prefix differs from the last failing prefix, or when
//!    a trigger has found candidates since that failure.
//! 2. The longest common prefix of the candidates is longer than the input,
//!    or equal to it except for case: [`Completion::Replace`] with the LCP.
//! 3. A single candidate: [`Completion::Replace`] with that name.
//! 4. Otherwise: [`Completion::Suggest`] with at most `max_suggestions`
//!    entries in sorted order, plus a truncation marker when more exist.

use crate::config::AutocompleteConfig;
use std::cmp::Ordering;

/// Outcome of one autocomplete trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Nothing starts with the prefix; the input is left untouched
    NoMatch {
        /// Whether the operator should be alerted
        alert: bool,
    },
    /// Replace the input with `text` and move the cursor to its end
    Replace {
        text: String,
    },
    /// Show a suggestion list; the input is left untouched
    Suggest {
        /// Suggestions in sorted order, capped
        entries: Vec<String>,
        /// Whether candidates were dropped by the cap
        truncated: bool,
        /// Whether the same prefix produced the same candidates on the previous trigger
        repeated: bool,
    },
}

impl Completion {
    /// The text the input should hold after this completion, if it changes
    pub fn replacement(&self) -> Option<&str> {
        match self {
            Completion::Replace { text } => Some(text),
            _ => None,
        }
    }
}

/// What the previous trigger saw
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutocompleteState {
    /// Uppercased prefix of the last trigger
    pub prefix: String,
    /// Sorted candidate set of the last trigger
    pub candidates: Vec<String>,
}

impl AutocompleteState {
    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty() && self.candidates.is_empty()
    }
}

/// Incremental prefix autocomplete
#[derive(Debug, Clone)]
pub struct AutocompleteEngine {
    config: AutocompleteConfig,
    state: AutocompleteState,
    /// Uppercased prefix of the last trigger that found no candidates.
    /// Survives [`AutocompleteEngine::invalidate`] so that retyping a known
    /// dead prefix does not alert again.
    last_no_match: Option<String>,
}

impl Default for AutocompleteEngine {
    fn default() -> Self {
        Self::new(AutocompleteConfig::default())
    }
}

impl AutocompleteEngine {
    pub fn new(config: AutocompleteConfig) -> Self {
        Self {
            config,
            state: AutocompleteState::default(),
            last_no_match: None,
        }
    }

    pub fn config(&self) -> &AutocompleteConfig {
        &self.config
    }

    /// State remembered from the last trigger
    pub fn state(&self) -> &AutocompleteState {
        &self.state
    }

    /// Forget the last trigger (keystroke, cut, paste, focus loss, filter change)
    pub fn invalidate(&mut self) {
        self.state = AutocompleteState::default();
    }

    /// Run one autocomplete trigger
    pub fn trigger<S: AsRef<str>>(&mut self, input: &str, names: &[S]) -> Completion {
        let normalized = input.to_uppercase();

        let mut candidates: Vec<String> = names
            .iter()
            .map(|name| name.as_ref())
            .filter(|name| name.to_uppercase().starts_with(&normalized))
            .map(str::to_string)
            .collect();

        if candidates.is_empty() {
            let alert = self.last_no_match.as_deref() != Some(normalized.as_str());
            if alert {
                tracing::debug!("No variable starts with '{}'", input);
            }
            self.last_no_match = Some(normalized);
            self.invalidate();
            return Completion::NoMatch { alert };
        }

        // A match ends the no-match run; the next failure alerts again
        self.last_no_match = None;
        sort_candidates(&mut candidates);
        let lcp = longest_common_prefix(&candidates);

        let completion = if lcp.chars().count() > input.chars().count()
            || (lcp != input && eq_ignore_case(&lcp, input))
        {
            Completion::Replace { text: lcp }
        } else if candidates.len() == 1 {
            Completion::Replace {
                text: candidates[0].clone(),
            }
        } else {
            let repeated =
                self.state.prefix == normalized && self.state.candidates == candidates;
            let max = self.config.max_suggestions;
            Completion::Suggest {
                entries: candidates.iter().take(max).cloned().collect(),
                truncated: candidates.len() > max,
                repeated,
            }
        };

        self.state = AutocompleteState {
            prefix: match completion.replacement() {
                Some(text) => text.to_uppercase(),
                None => normalized,
            },
            candidates,
        };
        completion
    }
}

/// Case-insensitive character equality
fn eq_char_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_uppercase().eq(b.to_uppercase())
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars().count() == b.chars().count()
        && a.chars().zip(b.chars()).all(|(x, y)| eq_char_ignore_case(x, y))
}

/// Case-insensitive ordering; names equal except for case sort shorter first
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_uppercase()
        .cmp(&b.to_uppercase())
        .then_with(|| a.len().cmp(&b.len()))
}

/// Sort candidates case-insensitively (stable for exact ties)
pub fn sort_candidates(candidates: &mut [String]) {
    candidates.sort_by(|a, b| compare_names(a, b));
}

/// Longest prefix shared by all names, compared case-insensitively
///
/// The returned text takes its case from the first name. Stops as soon as the
/// running prefix becomes empty.
pub fn longest_common_prefix<S: AsRef<str>>(names: &[S]) -> String {
    let Some(first) = names.first() else {
        return String::new();
    };
    let first = first.as_ref();
    let mut len = first.chars().count();

    for name in &names[1..] {
        if len == 0 {
            break;
        }
        len = first
            .chars()
            .zip(name.as_ref().chars())
            .take(len)
            .take_while(|(a, b)| eq_char_ignore_case(*a, *b))
            .count();
    }

    first.chars().take(len).collect()
}
