//! Error handling for the formatter layer
//!
//! Decoders use [`Result`] internally. Public provider entry points never let a
//! [`FormatterError`] escape; they log it and fall back to an "absent" child or an
//! `<error>` summary instead.

use thiserror::Error;

/// Main error type for formatter operations
#[derive(Error, Debug)]
pub enum FormatterError {
    /// A named member does not exist on the inspected type
    #[error("No field '{field}' on type {type_name}")]
    MissingField { type_name: String, field: String },

    /// A type lookup by name returned nothing
    #[error("Type not found: {0}")]
    MissingType(String),

    /// A value was used in a way its type does not allow
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Errors related to memory access
    #[error("Memory access error at address 0x{address:08X}: {message}")]
    MemoryAccess { address: u64, message: String },

    /// A count, capacity or link read from memory cannot be trusted
    #[error("Corrupt layout: {0}")]
    CorruptLayout(String),

    /// A bounded walk ran out of steps
    #[error("Traversal exceeded {0} steps")]
    StepBudgetExceeded(usize),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to snapshot files
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<FormatterError>,
    },
}

impl FormatterError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        FormatterError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a missing field error
    pub fn missing_field(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        FormatterError::MissingField {
            type_name: type_name.into(),
            field: field.into(),
        }
    }
}

/// Result type alias for formatter operations
pub type Result<T> = std::result::Result<T, FormatterError>;

/// Wraps the error of a failed step with what was being decoded
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}
