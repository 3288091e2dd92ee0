//! Error types for stratakv.
//!
//! Every public operation returns [`Result`]. The set of [`ErrorKind`]s is
//! closed: backends map whatever their engine reports onto one of these
//! kinds and never drop an engine error on the floor.

use std::fmt;
use std::io;

use thiserror::Error;

/// The closed set of failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The requested key, collection or database does not exist.
    NotFound,
    /// The collection or database being created is already present.
    Exists,
    /// Bad argument, or an operation the current mode does not permit.
    Invalid,
    /// Filesystem or engine I/O failure.
    IoError,
    /// The engine does not support the operation.
    NotImplemented,
    /// Catch-all for everything else (corruption, aborts, timeouts, ...).
    Failure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::Exists => "already exists",
            ErrorKind::Invalid => "invalid",
            ErrorKind::IoError => "I/O error",
            ErrorKind::NotImplemented => "not implemented",
            ErrorKind::Failure => "failure",
        };
        f.write_str(name)
    }
}

/// The main error type for stratakv operations.
///
/// Carries the [`ErrorKind`], a human-readable message, and, when the
/// engine supplied one, the engine's own diagnostic string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}{}", DetailSuffix(.detail))]
pub struct Error {
    kind: ErrorKind,
    message: String,
    detail: Option<String>,
}

struct DetailSuffix<'a>(&'a Option<String>);

impl fmt::Display for DetailSuffix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(detail) if !detail.is_empty() => write!(f, " ({})", detail),
            _ => Ok(()),
        }
    }
}

impl Error {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    /// Attaches a diagnostic string (usually the engine's own text).
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Shorthand for an [`ErrorKind::NotFound`] error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Shorthand for an [`ErrorKind::Exists`] error.
    pub fn exists(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Exists, message)
    }

    /// Shorthand for an [`ErrorKind::Invalid`] error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Invalid, message)
    }

    /// Shorthand for an [`ErrorKind::IoError`] error.
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IoError, message)
    }

    /// Shorthand for an [`ErrorKind::NotImplemented`] error.
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotImplemented, message)
    }

    /// Shorthand for an [`ErrorKind::Failure`] error.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Failure, message)
    }

    /// The failure category.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The engine diagnostic, if any.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// True for [`ErrorKind::NotFound`].
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    /// True for [`ErrorKind::Exists`].
    pub fn is_exists(&self) -> bool {
        self.kind == ErrorKind::Exists
    }

    /// True for [`ErrorKind::Invalid`].
    pub fn is_invalid(&self) -> bool {
        self.kind == ErrorKind::Invalid
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.kind().to_string()).with_detail(err.to_string())
    }
}

/// A specialized `Result` type for stratakv operations.
pub type Result<T> = std::result::Result<T, Error>;
