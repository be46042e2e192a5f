//! Error types returned by index construction, queries and dataset loading.

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the crate reports to its caller.
///
/// Nothing is retried or swallowed internally: queries are pure, so a failed
/// call can only succeed again with different input.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The record set handed to the index builder is empty or malformed.
    #[error("cannot build spatial index: {0}")]
    Construction(String),

    /// The caller's coordinates cannot be normalized into numeric pairs.
    #[error("invalid coordinate input: {0}")]
    InvalidCoordinate(String),

    /// A query parameter or adapter option is out of range or unrecognized.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A row of the gazetteer source file could not be parsed.
    #[error("invalid gazetteer data at line {line}: {message}")]
    Parse {
        /// 1-based line number, the header being line 1
        line: usize,
        /// What was wrong with the line
        message: String,
    },

    /// The binary snapshot could not be encoded or decoded.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// Reading a dataset or snapshot from disk failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` when the failure was caused by the shape or content of
    /// the coordinates passed to a query, as opposed to a bad option or dataset.
    ///
    /// ```
    /// use geocity::Error;
    ///
    /// assert!(Error::InvalidCoordinate("ragged".into()).is_input_error());
    /// assert!(!Error::InvalidArgument("k = 0".into()).is_input_error());
    /// ```
    pub fn is_input_error(&self) -> bool {
        matches!(self, Error::InvalidCoordinate(_))
    }
}

impl From<bincode::error::EncodeError> for Error {
    fn from(err: bincode::error::EncodeError) -> Self {
        Error::Snapshot(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for Error {
    fn from(err: bincode::error::DecodeError) -> Self {
        Error::Snapshot(err.to_string())
    }
}
