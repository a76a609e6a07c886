use std::sync::Arc;

use crate::error::Result;
use crate::file::{File, FileInfo};

/// A place files can be put into and read back out of.
///
/// Backends ([`OsStore`](crate::OsStore), [`NullStore`](crate::NullStore),
/// remote sessions) and policy decorators ([`Hash`](crate::Hash),
/// [`Limit`](crate::Limit), ...) all implement this trait, so decorators
/// can be stacked over any backend.
///
/// All implementations must satisfy these invariants:
/// - Errors are reported as [`PathError`](crate::PathError) carrying the
///   operation and the requested name, never as a bare backend error.
/// - `put` stores the file under the name its own `stat` reports and
///   returns the stored copy positioned at offset 0.
/// - `sub` leaves `self` untouched and carries every policy of `self` into
///   the returned store.
/// - Nothing is retried internally.
pub trait Store: Send + Sync {
    /// Open the named file for reading.
    fn open(&self, name: &str) -> Result<Box<dyn File>>;

    /// A store scoped to the child namespace `dir`, created if missing.
    fn sub(&self, dir: &str) -> Result<Box<dyn Store>>;

    /// Metadata for the named file.
    fn stat(&self, name: &str) -> Result<FileInfo>;

    /// Persist `file` under the name reported by its `stat`.
    fn put(&self, file: Box<dyn File>) -> Result<Box<dyn File>>;

    /// Remove the named file.
    fn remove(&self, name: &str) -> Result<()>;
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        (**self).open(name)
    }

    fn sub(&self, dir: &str) -> Result<Box<dyn Store>> {
        (**self).sub(dir)
    }

    fn stat(&self, name: &str) -> Result<FileInfo> {
        (**self).stat(name)
    }

    fn put(&self, file: Box<dyn File>) -> Result<Box<dyn File>> {
        (**self).put(file)
    }

    fn remove(&self, name: &str) -> Result<()> {
        (**self).remove(name)
    }
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        (**self).open(name)
    }

    fn sub(&self, dir: &str) -> Result<Box<dyn Store>> {
        (**self).sub(dir)
    }

    fn stat(&self, name: &str) -> Result<FileInfo> {
        (**self).stat(name)
    }

    fn put(&self, file: Box<dyn File>) -> Result<Box<dyn File>> {
        (**self).put(file)
    }

    fn remove(&self, name: &str) -> Result<()> {
        (**self).remove(name)
    }
}
