use std::fmt;

use thiserror::Error;

use crate::Encoding;

/// Core error type for column encoding and decoding
#[derive(Error, Debug)]
pub enum ParquetError {
    /// Corrupt or mismatched page data
    #[error("Decoding error: {0}")]
    Decoding(#[from] DecodingError),

    /// Invalid reader/writer/predicate configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Arrow errors from Arrow operations
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    /// Errors surfaced by the parquet-rs crate
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Type conversion errors
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Invalid argument errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unsupported operation errors
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Internal errors that shouldn't happen
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for column operations
pub type Result<T> = std::result::Result<T, ParquetError>;

impl ParquetError {
    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        ParquetError::Configuration(msg.into())
    }

    /// Create a new conversion error
    pub fn conversion<S: Into<String>>(msg: S) -> Self {
        ParquetError::Conversion(msg.into())
    }

    /// Create a new invalid argument error
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        ParquetError::InvalidArgument(msg.into())
    }

    /// Create a new unsupported operation error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        ParquetError::Unsupported(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        ParquetError::Internal(msg.into())
    }

    /// Create a new decoding error at `offset`
    pub fn decoding<S: Into<String>>(offset: usize, operation: &'static str, msg: S) -> Self {
        ParquetError::Decoding(DecodingError::new(offset, operation, msg))
    }

    /// Tag a decoding error with the encoding that raised it; other kinds
    /// pass through unchanged
    pub fn with_encoding(self, encoding: Encoding) -> Self {
        match self {
            ParquetError::Decoding(inner) => ParquetError::Decoding(inner.with_encoding(encoding)),
            other => other,
        }
    }

    /// Returns the decoding details when this is a decoding failure
    pub fn as_decoding(&self) -> Option<&DecodingError> {
        match self {
            ParquetError::Decoding(e) => Some(e),
            _ => None,
        }
    }
}

/// Failure to decode a page.
///
/// Always fatal to the page being decoded. `offset` is the absolute position
/// in the page buffer where the failure was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodingError {
    pub offset: usize,
    pub encoding: Option<Encoding>,
    pub operation: &'static str,
    pub message: String,
}

impl DecodingError {
    pub fn new<S: Into<String>>(offset: usize, operation: &'static str, message: S) -> Self {
        Self {
            offset,
            encoding: None,
            operation,
            message: message.into(),
        }
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        // the innermost codec wins
        if self.encoding.is_none() {
            self.encoding = Some(encoding);
        }
        self
    }
}

impl fmt::Display for DecodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not {} at offset {}", self.operation, self.offset)?;
        if let Some(encoding) = self.encoding {
            write!(f, " ({})", encoding)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for DecodingError {}

/// Extension trait to add encoding context to decoding errors
pub trait ErrorContext<T> {
    /// Tag a decoding error with the encoding that raised it
    fn in_encoding(self, encoding: Encoding) -> Result<T>;

    /// Add context with a closure that's only called on error
    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, f: F) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<ParquetError>,
{
    fn in_encoding(self, encoding: Encoding) -> Result<T> {
        self.map_err(|e| e.into().with_encoding(encoding))
    }

    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, f: F) -> Result<T> {
        self.map_err(|e| match e.into() {
            ParquetError::Decoding(mut inner) => {
                inner.message = format!("{}: {}", f().into(), inner.message);
                ParquetError::Decoding(inner)
            }
            other => ParquetError::Internal(format!("{}: {}", f().into(), other)),
        })
    }
}
