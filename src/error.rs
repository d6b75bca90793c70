//! Error types for vlndata.

use std::path::PathBuf;

/// Result type alias for vlndata operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in vlndata operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        /// The path where the error occurred, if known.
        path: Option<PathBuf>,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Arrow error while decoding or converting column data.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error while reading a container file.
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// JSON error while reading a configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Row index out of bounds.
    #[error("Index {index} out of bounds for {len} rows")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// The number of rows available.
        len: usize,
    },

    /// Column not found in a frame or group.
    #[error("Column '{name}' not found")]
    ColumnNotFound {
        /// The name of the missing column.
        name: String,
    },

    /// Group not found in a dataset grouping.
    #[error("Group '{name}' not found")]
    GroupNotFound {
        /// The name of the missing group.
        name: String,
    },

    /// Columns of one frame disagree on the number of rows.
    #[error("Column '{column}' has {actual} rows, expected {expected}")]
    RowCountMismatch {
        /// The offending column.
        column: String,
        /// Row count fixed by the first column.
        expected: usize,
        /// Row count of the offending column.
        actual: usize,
    },

    /// Vlarray columns merged into one group are not length-aligned.
    #[error(
        "Vlarray '{column}' in group '{group}' at row {index} has length {actual}, expected {expected}"
    )]
    LengthMismatch {
        /// The group being extracted.
        group: String,
        /// The misaligned column.
        column: String,
        /// The row index.
        index: usize,
        /// Reference length from the first column of the group.
        expected: usize,
        /// Length of the misaligned column.
        actual: usize,
    },

    /// A transform was applied before being bound to a dataset.
    #[error("Transform '{name}' is not bound to a dataset")]
    UnboundTransform {
        /// The transform name.
        name: String,
    },

    /// Per-row arrays cannot be combined into one batch.
    #[error("Shape mismatch: {message}")]
    ShapeMismatch {
        /// Description of the mismatch.
        message: String,
    },

    /// Column holds a different kind of value than requested.
    #[error("Column '{column}' is not a {expected} column")]
    KindMismatch {
        /// The column name.
        column: String,
        /// The requested kind.
        expected: &'static str,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// Parse error.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parse error.
        message: String,
    },
}

impl Error {
    /// Create an I/O error with a path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            path: Some(path.into()),
            source,
        }
    }

    /// Create an index out of bounds error.
    pub fn index_out_of_bounds(index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds { index, len }
    }

    /// Create a column not found error.
    pub fn column_not_found(name: impl Into<String>) -> Self {
        Self::ColumnNotFound { name: name.into() }
    }

    /// Create a group not found error.
    pub fn group_not_found(name: impl Into<String>) -> Self {
        Self::GroupNotFound { name: name.into() }
    }

    /// Create an unbound transform error.
    pub fn unbound_transform(name: impl Into<String>) -> Self {
        Self::UnboundTransform { name: name.into() }
    }

    /// Create a shape mismatch error.
    pub fn shape_mismatch(message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }
}
