use tracing::debug;

use crate::error::{Cause, Error, Op, Result};
use crate::file::{File, FileInfo};
use crate::traits::Store;

const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Render a byte count in binary units, truncating at each step.
///
/// `32 << 20` renders as `"32 MB"`, `1536` as `"1 KB"`.
pub fn human_size(mut n: u64) -> String {
    let mut unit = 0;
    while n >= 1024 && unit < UNITS.len() - 1 {
        n /= 1024;
        unit += 1;
    }
    format!("{n} {}", UNITS[unit])
}

/// A file was larger than a [`Limit`] allows. `size` is the limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("file too large, cannot exceed {}", human_size(self.size))]
pub struct SizeError {
    pub size: u64,
}

/// Rejects any file larger than a fixed number of bytes.
///
/// The check uses the size the file reports about itself and happens before
/// the inner store is touched, so a rejected file is never partially written.
#[derive(Debug)]
pub struct Limit<S> {
    inner: S,
    limit: u64,
}

impl<S: Store> Limit<S> {
    pub fn new(inner: S, limit: u64) -> Self {
        Self { inner, limit }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Store> Store for Limit<S> {
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        self.inner.open(name)
    }

    fn sub(&self, dir: &str) -> Result<Box<dyn Store>> {
        let sub = self.inner.sub(dir)?;
        Ok(Box::new(Limit::new(sub, self.limit)))
    }

    fn stat(&self, name: &str) -> Result<FileInfo> {
        self.inner.stat(name)
    }

    fn put(&self, mut file: Box<dyn File>) -> Result<Box<dyn File>> {
        let info = file.stat()?;

        if info.size > self.limit {
            debug!(name = %info.name, size = info.size, limit = self.limit, "rejected oversize put");
            return Err(Error::path(
                Op::Put,
                info.name,
                Cause::TooLarge(SizeError { size: self.limit }),
            ));
        }
        self.inner.put(file)
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.inner.remove(name)
    }
}
