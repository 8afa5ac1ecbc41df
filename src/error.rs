//! Error types for the police-stops reporting core.
//!
//! Defines the error enum shared by the catalog, the report executor and the
//! database layer. Every store-level failure is converted into one of these
//! variants at the point of execution.

use thiserror::Error;

/// Main error type for reporting operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// The requested catalog key does not exist.
    #[error("Report not found: {0}")]
    NotFound(String),

    /// A bound parameter is missing, unknown, or has the wrong type.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The backing store rejected or failed to run a query
    /// (unreachable store, syntax error, missing column, timeout).
    #[error("Query execution error: {0}")]
    QueryExecution(String),

    /// The connection pool could not be established.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration errors (invalid config file, bad table name, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// User-supplied form input failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A catalog definition failed static validation.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReportError {
    /// Creates a not-found error for the given catalog key.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    /// Creates an invalid-parameter error with the given message.
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Creates a query execution error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryExecution(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an invalid-input error with the given message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Creates a catalog validation error with the given message.
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Not Found",
            Self::InvalidParameter(_) => "Invalid Parameter",
            Self::QueryExecution(_) => "Query Error",
            Self::Connection(_) => "Connection Error",
            Self::Config(_) => "Configuration Error",
            Self::InvalidInput(_) => "Invalid Input",
            Self::Catalog(_) => "Catalog Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns true if the failure is confined to a single report request.
    ///
    /// Request-scoped failures never stop subsequent reports from running.
    pub fn is_request_scoped(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::InvalidParameter(_) | Self::QueryExecution(_)
        )
    }
}

/// Result type alias using ReportError.
pub type Result<T> = std::result::Result<T, ReportError>;
