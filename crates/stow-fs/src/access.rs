//! Capability restriction: stores that only allow reading or only writing.
//!
//! Blocked operations fail with [`ErrorKind::Permission`](crate::ErrorKind)
//! without ever reaching the inner store.

use crate::error::{Cause, Error, Op, Result};
use crate::file::{File, FileInfo};
use crate::traits::Store;

fn denied(op: Op, name: impl Into<String>) -> Error {
    Error::path(op, name, Cause::Permission)
}

/// Files can be put, but never opened, stat-ed, or removed.
#[derive(Debug)]
pub struct WriteOnly<S> {
    inner: S,
}

impl<S: Store> WriteOnly<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Store> Store for WriteOnly<S> {
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        Err(denied(Op::Open, name))
    }

    fn sub(&self, dir: &str) -> Result<Box<dyn Store>> {
        let sub = self.inner.sub(dir)?;
        Ok(Box::new(WriteOnly::new(sub)))
    }

    fn stat(&self, name: &str) -> Result<FileInfo> {
        Err(denied(Op::Stat, name))
    }

    fn put(&self, file: Box<dyn File>) -> Result<Box<dyn File>> {
        self.inner.put(file)
    }

    fn remove(&self, name: &str) -> Result<()> {
        Err(denied(Op::Remove, name))
    }
}

/// Files can be opened and stat-ed, but never put or removed.
#[derive(Debug)]
pub struct ReadOnly<S> {
    inner: S,
}

impl<S: Store> ReadOnly<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Store> Store for ReadOnly<S> {
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        self.inner.open(name)
    }

    fn sub(&self, dir: &str) -> Result<Box<dyn Store>> {
        let sub = self.inner.sub(dir)?;
        Ok(Box::new(ReadOnly::new(sub)))
    }

    fn stat(&self, name: &str) -> Result<FileInfo> {
        self.inner.stat(name)
    }

    fn put(&self, mut file: Box<dyn File>) -> Result<Box<dyn File>> {
        let name = file.stat()?.name;
        Err(denied(Op::Put, name))
    }

    fn remove(&self, name: &str) -> Result<()> {
        Err(denied(Op::Remove, name))
    }
}
