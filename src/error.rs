//! Error taxonomy.
//!
//! - [`IndexError`] - target-column specs that do not fit a schema
//! - [`SchemaError`] - schemas or rows a filter cannot work with
//! - [`ProtocolError`] - filter operations called out of lifecycle order
//! - [`FilterError`] - everything a [`crate::filter::Filter`] can report
//! - [`DriverError`] - top-level run failures
//!
//! None of these are retriable: they describe bad configuration or bad call
//! ordering, and abort the run.

use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// Target index errors
// =============================================================================

/// A target-column spec or index does not fit the schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// The spec is not `first`, `last` or an in-range non-negative integer.
    #[error("invalid target index '{spec}' for {columns} column(s)")]
    InvalidIndex { spec: String, columns: usize },

    /// A numeric index outside `[0, columns)`.
    #[error("target index {index} out of range for {columns} column(s)")]
    OutOfRange { index: usize, columns: usize },
}

// =============================================================================
// Schema errors
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The filter's options do not fit the input schema.
    #[error("schema rejected: {0}")]
    Rejected(String),

    /// A row does not have one value per column.
    #[error("row has {found} value(s), schema has {expected} column(s)")]
    RowWidth { expected: usize, found: usize },
}

// =============================================================================
// Lifecycle errors
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("filter has not negotiated an input schema yet")]
    NotNegotiated,

    #[error("no filtered row available")]
    NoRowAvailable,

    /// Options can only be changed before negotiation.
    #[error("filter options must be set before negotiation")]
    AlreadyNegotiated,
}

// =============================================================================
// Filter errors
// =============================================================================

#[derive(Debug, Error)]
pub enum FilterError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("unknown filter '{name}' (available: {available})")]
    UnknownFilter { name: String, available: String },

    #[error("invalid option for {filter}: {message}")]
    InvalidOption { filter: String, message: String },
}

impl FilterError {
    pub fn invalid_option(filter: &str, message: impl Into<String>) -> Self {
        FilterError::InvalidOption {
            filter: filter.to_string(),
            message: message.into(),
        }
    }

    /// Errors that stem from how the filter was configured rather than from
    /// the data it was given.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            FilterError::UnknownFilter { .. } | FilterError::InvalidOption { .. }
        )
    }
}

// =============================================================================
// Driver errors (top-level)
// =============================================================================

#[derive(Debug, Error)]
pub enum DriverError {
    /// Bad or missing arguments, raised before any file is opened.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    Index(#[from] IndexError),

    #[error("{0}")]
    Filter(#[from] FilterError),

    #[error("{}: {source:#}", path.display())]
    Io {
        path: PathBuf,
        source: anyhow::Error,
    },
}

impl DriverError {
    pub fn io(path: impl Into<PathBuf>, source: anyhow::Error) -> Self {
        DriverError::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit status: configuration problems use 2, like a usage error.
    pub fn exit_code(&self) -> i32 {
        match self {
            DriverError::Configuration(_) => 2,
            DriverError::Filter(e) if e.is_configuration() => 2,
            _ => 1,
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

pub type FilterResult<T> = Result<T, FilterError>;

pub type DriverResult<T> = Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_converts_into_filter_error() {
        let err: FilterError = ProtocolError::NotNegotiated.into();
        assert!(matches!(
            err,
            FilterError::Protocol(ProtocolError::NotNegotiated)
        ));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_index_error_message() {
        let err = IndexError::InvalidIndex {
            spec: "7".into(),
            columns: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("'7'"));
        assert!(msg.contains("3 column"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(DriverError::Configuration("x".into()).exit_code(), 2);
        let unknown = FilterError::UnknownFilter {
            name: "Nope".into(),
            available: "AllFilter".into(),
        };
        assert_eq!(DriverError::from(unknown).exit_code(), 2);
        assert_eq!(
            DriverError::from(IndexError::OutOfRange {
                index: 4,
                columns: 2
            })
            .exit_code(),
            1
        );
    }
}
