//! Error types.
//!
//! Drivers report native failures as [`DriverError`], keeping the engine's own
//! error code. Higher layers may wrap a driver error once inside a
//! [`QueryError`] (as its `source`); classification code looks through that
//! single level of wrapping to reach the native code.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug)]
pub enum Error {
    /// Connecting to or talking with the database failed.
    Connection(ConnectionError),
    /// A dialect-neutral query failure.
    Query(QueryError),
    /// A raw failure reported by a driver, with its native error code.
    Driver(DriverError),
    /// Entity mapping metadata is inconsistent. Never retryable.
    Metadata(MetadataError),
    /// An entity could not be found in, or keyed into, the identity map.
    Identity(IdentityError),
    /// A value could not be converted to its column type.
    Conversion(ConversionError),
    /// Anything else.
    Custom(String),
}

impl Error {
    /// Shorthand for a metadata invariant violation.
    pub fn metadata(entity: &'static str, message: impl Into<String>) -> Self {
        Error::Metadata(MetadataError {
            entity,
            message: message.into(),
        })
    }

    /// Shorthand for an identity map failure.
    pub fn identity(entity: &'static str, message: impl Into<String>) -> Self {
        Error::Identity(IdentityError {
            entity,
            message: message.into(),
        })
    }

    /// Whether this error signals broken mapping metadata.
    pub fn is_metadata(&self) -> bool {
        matches!(self, Error::Metadata(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "connection error: {e}"),
            Error::Query(e) => write!(f, "query error: {e}"),
            Error::Driver(e) => write!(f, "driver error: {e}"),
            Error::Metadata(e) => write!(f, "metadata error: {e}"),
            Error::Identity(e) => write!(f, "identity error: {e}"),
            Error::Conversion(e) => write!(f, "conversion error: {e}"),
            Error::Custom(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e
                .source
                .as_deref()
                .map(|s| s as &(dyn std::error::Error + 'static)),
            Error::Query(e) => e
                .source
                .as_deref()
                .map(|s| s as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl From<DriverError> for Error {
    fn from(e: DriverError) -> Self {
        Error::Driver(e)
    }
}

// ============================================================================
// Connection errors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    Connect,
    Authentication,
    Closed,
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

// ============================================================================
// Query errors
// ============================================================================

/// Dialect-neutral classification of a failed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// A unique or primary key constraint rejected the row.
    UniqueViolation,
    /// A NOT NULL constraint rejected the row.
    NotNullViolation,
    /// A foreign key constraint rejected the row.
    ForeignKeyViolation,
    /// Some other integrity constraint.
    Constraint,
    Syntax,
    Deadlock,
    Timeout,
    Cancelled,
    /// Unclassified database failure.
    Database,
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    pub sqlstate: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl QueryError {
    pub fn new(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            sql: None,
            sqlstate: None,
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    #[must_use]
    pub fn with_sqlstate(mut self, sqlstate: impl Into<String>) -> Self {
        self.sqlstate = Some(sqlstate.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        if let Some(state) = &self.sqlstate {
            write!(f, " (SQLSTATE {state})")?;
        }
        Ok(())
    }
}

// ============================================================================
// Driver errors
// ============================================================================

/// The engine-specific code attached to a driver failure.
///
/// MySQL and SQLite report numeric codes (SQLite's extended result codes),
/// PostgreSQL reports a five character SQLSTATE.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NativeErrorCode {
    Numeric(i64),
    SqlState(String),
}

impl fmt::Display for NativeErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeErrorCode::Numeric(code) => write!(f, "{code}"),
            NativeErrorCode::SqlState(state) => f.write_str(state),
        }
    }
}

/// A failure as reported by the driver, before any translation.
#[derive(Debug, Clone)]
pub struct DriverError {
    pub dialect: Dialect,
    pub code: NativeErrorCode,
    pub message: String,
}

impl DriverError {
    pub fn new(dialect: Dialect, code: NativeErrorCode, message: impl Into<String>) -> Self {
        Self {
            dialect,
            code,
            message: message.into(),
        }
    }

    /// The SQLSTATE if the native code is one.
    pub fn sqlstate(&self) -> Option<&str> {
        match &self.code {
            NativeErrorCode::SqlState(state) => Some(state),
            NativeErrorCode::Numeric(_) => None,
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {}] {}", self.dialect, self.code, self.message)
    }
}

impl std::error::Error for DriverError {}

// ============================================================================
// Mapping errors
// ============================================================================

#[derive(Debug)]
pub struct MetadataError {
    pub entity: &'static str,
    pub message: String,
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.entity, self.message)
    }
}

#[derive(Debug)]
pub struct IdentityError {
    pub entity: &'static str,
    pub message: String,
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.entity, self.message)
    }
}

#[derive(Debug)]
pub struct ConversionError {
    pub expected: String,
    pub found: &'static str,
    pub message: String,
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot bind {} as {}: {}",
            self.found, self.expected, self.message
        )
    }
}
