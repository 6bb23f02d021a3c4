//! Error handling for scope-rs
//!
//! This module defines the crate error type and a Result alias used by the
//! registry, the polling agent and the data sources.

use crate::types::ValueKind;
use thiserror::Error;

/// Main error type for scope operations
#[derive(Error, Debug)]
pub enum ScopeError {
    /// A snapshot named a variable with a type that contradicts what is known
    #[error("Type conflict for '{name}': registered as {existing}, snapshot carries {incoming}")]
    TypeConflict {
        name: String,
        existing: ValueKind,
        incoming: ValueKind,
    },

    /// Lookup of an unknown process or variable
    #[error("Not found: {0}")]
    NotFound(String),

    /// The data source failed to answer a request
    #[error("Data source error: {0}")]
    Source(String),

    /// The data source is not connected
    #[error("Data source is not connected")]
    Disconnected,

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ScopeError>,
    },
}

impl ScopeError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ScopeError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error (or the error it wraps) is a `NotFound`
    pub fn is_not_found(&self) -> bool {
        match self {
            ScopeError::NotFound(_) => true,
            ScopeError::WithContext { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for ScopeError {
    fn from(err: serde_json::Error) -> Self {
        ScopeError::Serialization(err.to_string())
    }
}

/// Result type alias for scope operations
pub type Result<T> = std::result::Result<T, ScopeError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
