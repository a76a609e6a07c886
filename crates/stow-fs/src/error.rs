//! Error types for store operations.
//!
//! Every failure a [`Store`](crate::Store) reports is a [`PathError`]: the
//! operation that failed, the name it was asked about, and a [`Cause`]. The
//! cause is classified into an [`ErrorKind`] so callers can branch on
//! "does not exist" or "permission denied" the same way for every backend.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::limit::SizeError;

/// The store operation an error belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Open,
    Sub,
    Stat,
    Put,
    Remove,
}

impl Op {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Sub => "sub",
            Self::Stat => "stat",
            Self::Put => "put",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend-agnostic classification of a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The named file does not exist.
    NotExist,
    /// A file with that name already exists.
    Exist,
    /// The operation is not permitted.
    Permission,
    /// The request was malformed (bad name, bad seek).
    Invalid,
    /// The file or connection has been closed.
    Closed,
    /// The file exceeds a configured size limit.
    TooLarge,
    /// Anything not covered above.
    Other,
}

impl From<io::ErrorKind> for ErrorKind {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => Self::NotExist,
            io::ErrorKind::AlreadyExists => Self::Exist,
            io::ErrorKind::PermissionDenied => Self::Permission,
            io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => Self::Invalid,
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset => Self::Closed,
            _ => Self::Other,
        }
    }
}

/// The underlying reason a store operation failed.
#[derive(Debug, Error)]
pub enum Cause {
    #[error("file does not exist")]
    NotExist,

    #[error("file already exists")]
    Exist,

    #[error("permission denied")]
    Permission,

    #[error("invalid argument")]
    Invalid,

    #[error("file already closed")]
    Closed,

    /// Raised by [`Limit`](crate::Limit).
    #[error(transparent)]
    TooLarge(SizeError),

    /// A native error from the backend that has no closer classification,
    /// or whose message is worth keeping.
    #[error(transparent)]
    Io(io::Error),
}

impl Cause {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotExist => ErrorKind::NotExist,
            Self::Exist => ErrorKind::Exist,
            Self::Permission => ErrorKind::Permission,
            Self::Invalid => ErrorKind::Invalid,
            Self::Closed => ErrorKind::Closed,
            Self::TooLarge(_) => ErrorKind::TooLarge,
            Self::Io(err) => err.kind().into(),
        }
    }
}

impl From<io::Error> for Cause {
    /// Reduce a native error to its root cause.
    ///
    /// Errors that map onto a known kind become the bare kind, so a
    /// `NotFound` from local disk and one from a remote session compare
    /// equal. Unclassified errors keep the original `io::Error`.
    fn from(err: io::Error) -> Self {
        match ErrorKind::from(err.kind()) {
            ErrorKind::NotExist => Self::NotExist,
            ErrorKind::Exist => Self::Exist,
            ErrorKind::Permission => Self::Permission,
            ErrorKind::Invalid => Self::Invalid,
            ErrorKind::Closed => Self::Closed,
            ErrorKind::TooLarge | ErrorKind::Other => Self::Io(err),
        }
    }
}

/// A failed store operation on a named file.
#[derive(Debug, Error)]
#[error("{op} {path}: {cause}")]
pub struct PathError {
    pub op: Op,
    pub path: String,
    #[source]
    pub cause: Cause,
}

impl PathError {
    pub fn new(op: Op, path: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Self {
            op,
            path: path.into(),
            cause: cause.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.cause.kind()
    }
}

/// Errors from this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A store operation failed.
    #[error(transparent)]
    Path(#[from] PathError),

    /// I/O on a caller-supplied file failed before any store operation ran.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A store chain could not be built from its configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Shorthand for `Error::Path(PathError::new(..))`.
    pub fn path(op: Op, path: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Self::Path(PathError::new(op, path, cause))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Path(err) => err.kind(),
            Self::Io(err) => err.kind().into(),
            Self::Config(_) => ErrorKind::Invalid,
        }
    }

    /// The failed operation, if this is a store error.
    pub fn op(&self) -> Option<Op> {
        match self {
            Self::Path(err) => Some(err.op),
            _ => None,
        }
    }

    pub fn is_not_exist(&self) -> bool {
        self.kind() == ErrorKind::NotExist
    }
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_reduce_to_root_cause() {
        let cause = Cause::from(io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(cause, Cause::NotExist));

        let cause = Cause::from(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(cause, Cause::Permission));

        let cause = Cause::from(io::Error::from(io::ErrorKind::BrokenPipe));
        assert_eq!(cause.kind(), ErrorKind::Closed);
    }

    #[test]
    fn unclassified_io_error_keeps_message() {
        let cause = Cause::from(io::Error::new(io::ErrorKind::Other, "disk on fire"));
        assert_eq!(cause.kind(), ErrorKind::Other);
        assert_eq!(cause.to_string(), "disk on fire");
    }

    #[test]
    fn path_error_display() {
        let err = Error::path(Op::Stat, "report.pdf", Cause::NotExist);
        assert_eq!(err.to_string(), "stat report.pdf: file does not exist");
        assert_eq!(err.op(), Some(Op::Stat));
        assert!(err.is_not_exist());
    }

    #[test]
    fn size_error_surfaces_as_too_large() {
        let err = Error::path(Op::Put, "big.bin", Cause::TooLarge(SizeError { size: 1024 }));
        assert_eq!(err.kind(), ErrorKind::TooLarge);
        assert_eq!(err.to_string(), "put big.bin: file too large, cannot exceed 1 KB");
    }

    #[test]
    fn bare_io_error_has_no_op() {
        let err = Error::from(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert_eq!(err.op(), None);
        assert_eq!(err.kind(), ErrorKind::Other);
    }
}
