//! Export error types
//!
//! Every failure aborts the export: there is no local recovery and no retry.
//! Each variant carries enough context (category, entity name, offending value)
//! to diagnose the problem from the message alone.

use std::io;

use thiserror::Error;

use crate::category::Category;

/// Error type for all export operations
#[derive(Error, Debug)]
pub enum ExportError {
    /// An exclusive identity was registered twice
    #[error("duplicate {category} identity '{key}'")]
    DuplicateIdentity {
        /// Category the key was registered in
        category: Category,
        /// The repeated source key or constant name
        key: String,
    },

    /// A copy or content alias names an origin that is not registered
    #[error("{category} '{name}' refers to origin '{origin}' which is not registered")]
    UnresolvedOrigin {
        /// Category of the alias
        category: Category,
        /// Host name of the alias
        name: String,
        /// Name or key of the missing origin
        origin: String,
    },

    /// The patch pass would write a table of a different size than was reserved
    #[error(
        "{category} table size mismatch: reserved {reserved_rows} rows / {reserved_bytes} bytes, \
         now {actual_rows} rows / {actual_bytes} bytes"
    )]
    TableSizeMismatch {
        /// Category whose table changed
        category: Category,
        /// Rows written by the reserve pass
        reserved_rows: usize,
        /// Rows the table would now contain
        actual_rows: usize,
        /// Bytes written by the reserve pass
        reserved_bytes: u64,
        /// Bytes the table would now occupy
        actual_bytes: u64,
    },

    /// Axis values were requested for a reserved shader variant
    #[error("shader variant {code} is reserved and has no axis decomposition")]
    ReservedAxisMisuse {
        /// The reserved variant code
        code: u64,
    },

    /// An axis ordinal (or a whole variant code) is out of range
    #[error("value {value} is out of range for {axis} (must be below {limit})")]
    InvalidAxisValue {
        /// Axis name
        axis: &'static str,
        /// Offending ordinal
        value: u64,
        /// Exclusive upper bound (the axis sentinel)
        limit: u64,
    },

    /// The scene walker rejected host data
    #[error("malformed source data in '{object}': {reason}")]
    MalformedSourceData {
        /// Host object name
        object: String,
        /// What is wrong with it
        reason: String,
    },

    /// The body of an alias was written directly
    #[error("{category} '{name}' is an alias and has no body of its own")]
    AliasBodyWrite {
        /// Category of the alias
        category: Category,
        /// Host name of the alias
        name: String,
    },

    /// The offset-table state machine was driven out of order
    #[error("{category} table: cannot {operation} while {state}")]
    TableOrder {
        /// Category of the table
        category: Category,
        /// Requested operation
        operation: &'static str,
        /// Current state
        state: &'static str,
    },

    /// An external baking tool failed
    #[error("external tool '{tool}' failed: {reason}")]
    ExternalTool {
        /// Program path
        tool: String,
        /// Exit status or spawn failure
        reason: String,
    },

    /// A container read back from disk is not well formed
    #[error("malformed container: {0}")]
    Format(String),

    /// Stream or file failure
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ExportError {
    /// Shorthand for [`ExportError::MalformedSourceData`]
    pub fn malformed(object: impl Into<String>, reason: impl Into<String>) -> Self {
        ExportError::MalformedSourceData {
            object: object.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_identity_display() {
        let err = ExportError::DuplicateIdentity {
            category: Category::Camera,
            key: "camera-perspective-main".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("camera"));
        assert!(msg.contains("camera-perspective-main"));
    }

    #[test]
    fn test_table_size_mismatch_display() {
        let err = ExportError::TableSizeMismatch {
            category: Category::Mesh,
            reserved_rows: 2,
            actual_rows: 3,
            reserved_bytes: 60,
            actual_bytes: 90,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("mesh"));
        assert!(msg.contains("2 rows"));
        assert!(msg.contains("3 rows"));
    }

    #[test]
    fn test_malformed_helper() {
        let err = ExportError::malformed("mesh-basic-A", "is not triangulated");
        match err {
            ExportError::MalformedSourceData { object, reason } => {
                assert_eq!(object, "mesh-basic-A");
                assert_eq!(reason, "is not triangulated");
            }
            _ => panic!("Expected MalformedSourceData variant"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::WriteZero, "disk full");
        let err: ExportError = io_err.into();
        assert!(matches!(err, ExportError::Io(_)));
        assert!(format!("{}", err).contains("disk full"));
    }
}
