use tracing::debug;

use crate::error::{Cause, Error, ErrorKind, Op, Result};
use crate::file::{File, FileInfo};
use crate::traits::Store;

/// Refuses to overwrite: a `put` for a name that already exists fails with
/// [`ErrorKind::Exist`].
///
/// The existence check and the write are two separate calls on the inner
/// store. Two concurrent puts of the same name can both pass the check.
#[derive(Debug)]
pub struct Unique<S> {
    inner: S,
}

impl<S: Store> Unique<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Store> Store for Unique<S> {
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        self.inner.open(name)
    }

    fn sub(&self, dir: &str) -> Result<Box<dyn Store>> {
        let sub = self.inner.sub(dir)?;
        Ok(Box::new(Unique::new(sub)))
    }

    fn stat(&self, name: &str) -> Result<FileInfo> {
        self.inner.stat(name)
    }

    fn put(&self, mut file: Box<dyn File>) -> Result<Box<dyn File>> {
        let name = file.stat()?.name;

        match self.inner.stat(&name) {
            Err(err) if err.kind() == ErrorKind::NotExist => self.inner.put(file),
            Err(err) => Err(err),
            Ok(_) => {
                debug!(name = %name, "rejected put of existing name");
                Err(Error::path(Op::Put, name, Cause::Exist))
            }
        }
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.inner.remove(name)
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::access::WriteOnly;
    use crate::file::MemFile;
    use crate::null::NullStore;
    use crate::os::OsStore;

    fn mem(name: &str, data: &[u8]) -> Box<dyn File> {
        Box::new(MemFile::new(name, data.to_vec(), SystemTime::now()))
    }

    #[test]
    fn second_put_of_same_name_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = Unique::new(OsStore::new(dir.path()));

        store.put(mem("a.txt", b"first")).unwrap();

        let err = store.put(mem("a.txt", b"second")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Exist);
        assert_eq!(err.op(), Some(Op::Put));
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"first");

        store.put(mem("b.txt", b"third")).unwrap();
    }

    #[test]
    fn null_store_always_reports_existing() {
        // NullStore fabricates every stat, so nothing is ever unique.
        let store = Unique::new(NullStore);
        assert_eq!(store.put(mem("x", b"")).unwrap_err().kind(), ErrorKind::Exist);
    }

    #[test]
    fn other_stat_errors_propagate() {
        let store = Unique::new(WriteOnly::new(NullStore));
        let err = store.put(mem("x", b"")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert_eq!(err.op(), Some(Op::Stat));
    }

    #[test]
    fn sub_keeps_uniqueness() {
        let dir = tempfile::tempdir().unwrap();
        let store = Unique::new(OsStore::new(dir.path()));
        let sub = store.sub("nested").unwrap();

        sub.put(mem("a.txt", b"1")).unwrap();
        assert_eq!(sub.put(mem("a.txt", b"2")).unwrap_err().kind(), ErrorKind::Exist);
        // A different namespace, so the same name is fine at the top level.
        store.put(mem("a.txt", b"3")).unwrap();
    }
}
