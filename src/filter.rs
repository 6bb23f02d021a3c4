//! Visibility mask applied to registry enumeration
//!
//! A [`FilterMask`] combines three inputs:
//!
//! - the set of hidden processes, derived from [`ProcessInfo::visible`]
//! - whether pending variables (no value yet) are shown
//! - a free-text, case-insensitive substring filter over variable names
//!
//! The mask is never patched in place. Whenever any input changes the owner
//! derives a fresh mask with [`FilterMask::derive`] and rebuilds its visible
//! index from it.

use crate::types::{ProcessInfo, Variable};
use std::collections::{BTreeMap, BTreeSet};

/// Derived visibility state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterMask {
    hidden: BTreeSet<String>,
    show_pending: bool,
    text_filter: String,
    /// Uppercased copy of `text_filter` used for matching
    text_upper: String,
}

impl FilterMask {
    /// Derive a mask from process visibility flags and the operator-set fields
    pub fn derive(
        processes: &BTreeMap<String, ProcessInfo>,
        show_pending: bool,
        text_filter: &str,
    ) -> Self {
        let hidden = processes
            .values()
            .filter(|p| !p.visible)
            .map(|p| p.name.clone())
            .collect();
        Self {
            hidden,
            show_pending,
            text_filter: text_filter.to_string(),
            text_upper: text_filter.to_uppercase(),
        }
    }

    /// Processes whose variables are masked out
    pub fn hidden_processes(&self) -> &BTreeSet<String> {
        &self.hidden
    }

    pub fn show_pending(&self) -> bool {
        self.show_pending
    }

    pub fn text_filter(&self) -> &str {
        &self.text_filter
    }

    /// Whether the variable passes the process and pending parts of the mask
    pub fn admits_owner(&self, variable: &Variable) -> bool {
        if self.hidden.contains(&variable.source) {
            return false;
        }
        self.show_pending || !variable.is_pending()
    }

    /// Whether the variable passes the whole mask, text filter included
    pub fn admits(&self, variable: &Variable) -> bool {
        self.admits_owner(variable) && self.matches_text(&variable.name)
    }

    /// Case-insensitive substring test against the text filter
    pub fn matches_text(&self, name: &str) -> bool {
        self.text_upper.is_empty() || name.to_uppercase().contains(&self.text_upper)
    }
}
