//! Error types for the encoding engine.
//!
//! Every failure is fatal for the run: there is no retry and no skip mode,
//! because the sampler's stream and the file offsets cannot be rolled back.
//! The only tolerated value failure (a malformed `float` token) never reaches
//! this type; the codec substitutes `0.0` instead.

use std::collections::TryReserveError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a single CSV token could not be encoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The token is not a literal of the expected kind
    #[error("cannot parse {token:?} as {ty}")]
    Unparseable { ty: &'static str, token: String },

    /// The literal parsed but does not fit the column type
    #[error("{token:?} is out of range for {ty}")]
    OutOfRange { ty: &'static str, token: String },

    /// The label is not part of the column's vocabulary
    #[error("unknown label {token:?} for vocabulary '{vocabulary}'")]
    UnknownLabel { vocabulary: String, token: String },

    /// A stored column's token is not valid UTF-8
    #[error("{token:?} is not valid UTF-8 text for {ty}")]
    NotUtf8 { ty: String, token: String },
}

/// Errors raised while validating, counting, encoding or reading column files.
#[derive(Debug, Error)]
pub enum Error {
    /// Any file system operation failed
    #[error("{op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV input has no header line at all
    #[error("{}: missing header line", path.display())]
    MissingHeader { path: PathBuf },

    /// A header token differs from the schema's column name
    #[error("{}: header mismatch for column {column}: expected {expected:?}, got {found:?}", path.display())]
    HeaderMismatch {
        path: PathBuf,
        column: usize,
        expected: String,
        found: String,
    },

    /// The header has fewer columns than the schema
    #[error("{}: header contains {found} columns, expected {expected}", path.display())]
    HeaderTooShort {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    /// The header has more columns than the schema
    #[error("{}: header contains more columns than expected ({expected}), first extra is {extra:?}", path.display())]
    HeaderTooLong {
        path: PathBuf,
        expected: usize,
        extra: String,
    },

    /// A data line has the wrong number of fields
    #[error("line contains {found} fields, expected {expected}")]
    FieldCount { expected: usize, found: usize },

    /// A field could not be encoded by its column's codec
    #[error("column {column} ({name}): {source}")]
    Value {
        column: usize,
        name: String,
        #[source]
        source: ValueError,
    },

    /// A staging array could not be allocated
    #[error("failed to allocate {bytes} bytes for a staging array: {source}")]
    Alloc {
        bytes: usize,
        #[source]
        source: TryReserveError,
    },

    /// Wraps a per-line failure with its location
    #[error("{}:{line}: {source}", path.display())]
    AtLine {
        path: PathBuf,
        line: u64,
        #[source]
        source: Box<Error>,
    },

    /// More data records arrived than the pre-flight count announced
    #[error("input holds more records than the {expected} announced by pre-flight")]
    RecordOverflow { expected: u64 },

    /// Fewer data records arrived than the pre-flight count announced
    #[error("pre-flight announced {expected} records but {actual} were encoded")]
    RecordCountMismatch { expected: u64, actual: u64 },

    /// Configuration values that cannot drive a run
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A schema file or schema definition is malformed
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// A file is not a valid column file
    #[error("{}: not a column file: {reason}", path.display())]
    Format { path: PathBuf, reason: String },
}

impl Error {
    /// Create an Io error for `op` on `path`
    #[inline]
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Attach a file/line location to this error
    #[inline]
    pub fn at_line(self, path: impl Into<PathBuf>, line: u64) -> Self {
        Self::AtLine {
            path: path.into(),
            line,
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any `AtLine` wrappers
    pub fn root(&self) -> &Error {
        match self {
            Self::AtLine { source, .. } => source.root(),
            other => other,
        }
    }

    /// True for header and field-count violations
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self.root(),
            Self::MissingHeader { .. }
                | Self::HeaderMismatch { .. }
                | Self::HeaderTooShort { .. }
                | Self::HeaderTooLong { .. }
                | Self::FieldCount { .. }
        )
    }

    /// True for token-level codec failures
    pub fn is_value_error(&self) -> bool {
        matches!(self.root(), Self::Value { .. })
    }
}
