//! Error handling for RouterView-RS
//!
//! This module defines the crate error type and a Result alias used
//! throughout the data core.
//!
//! Lookup failures ([`RouterViewError::NotFound`], [`RouterViewError::OutOfBounds`],
//! [`RouterViewError::KeyNotFound`]) are ordinary outcomes while a table is still
//! filling in; callers are expected to handle them locally (e.g. render an empty cell).

use thiserror::Error;

/// Main error type for RouterView-RS operations
#[derive(Error, Debug)]
pub enum RouterViewError {
    /// Dialing the device failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// The device rejected the credentials
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The initial snapshot query failed
    #[error("Snapshot error for {path}: {message}")]
    Snapshot { path: String, message: String },

    /// Opening the update stream failed
    #[error("Subscribe error for {path}: {message}")]
    Subscribe { path: String, message: String },

    /// No row or item with that identifier
    #[error("Not found: {0}")]
    NotFound(String),

    /// Positional access past the end of a list
    #[error("Index {index} out of bounds (length {len})")]
    OutOfBounds { index: usize, len: usize },

    /// A row has no property with that name
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Mutation of a read-only observable
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// Malformed discovery datagram
    #[error("Decode error: {0}")]
    Decode(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<RouterViewError>,
    },
}

impl RouterViewError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        RouterViewError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this is one of the expected lookup misses
    pub fn is_lookup_miss(&self) -> bool {
        match self {
            RouterViewError::NotFound(_)
            | RouterViewError::OutOfBounds { .. }
            | RouterViewError::KeyNotFound(_) => true,
            RouterViewError::WithContext { source, .. } => source.is_lookup_miss(),
            _ => false,
        }
    }
}

/// Result type alias for RouterView-RS operations
pub type Result<T> = std::result::Result<T, RouterViewError>;

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
