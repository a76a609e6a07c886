use tracing::trace;

use crate::error::Result;
use crate::file::{File, FileInfo, MemFile};
use crate::traits::Store;

/// A store that keeps nothing and fabricates empty files on demand.
///
/// Every `open` and `stat` succeeds with an empty file of the requested
/// name. `put` discards the content but echoes back the name and
/// modification time of what it was given. Useful for exercising
/// decorators without touching the disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullStore;

impl NullStore {
    pub fn new() -> Self {
        Self
    }
}

impl Store for NullStore {
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        Ok(Box::new(MemFile::empty(name)))
    }

    fn sub(&self, _dir: &str) -> Result<Box<dyn Store>> {
        Ok(Box::new(*self))
    }

    fn stat(&self, name: &str) -> Result<FileInfo> {
        Ok(MemFile::empty(name).info())
    }

    fn put(&self, mut file: Box<dyn File>) -> Result<Box<dyn File>> {
        let info = file.stat()?;
        trace!(name = %info.name, size = info.size, "discarding put");
        Ok(Box::new(MemFile::new(info.name, Vec::new(), info.modified)))
    }

    fn remove(&self, _name: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::time::{Duration, SystemTime};

    use super::*;

    #[test]
    fn open_fabricates_empty_file() {
        let mut f = NullStore.open("anything").unwrap();
        let info = f.stat().unwrap();
        assert_eq!(info.name, "anything");
        assert_eq!(info.size, 0);

        let mut buf = Vec::new();
        assert_eq!(f.read_to_end(&mut buf).unwrap(), 0);
    }

    #[test]
    fn put_keeps_name_and_mtime_but_no_bytes() {
        let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let input = MemFile::new("photo.jpg", vec![1, 2, 3], modified);

        let mut stored = NullStore.put(Box::new(input)).unwrap();
        let info = stored.stat().unwrap();
        assert_eq!(info.name, "photo.jpg");
        assert_eq!(info.modified, modified);
        assert_eq!(info.size, 0);
    }

    #[test]
    fn sub_and_remove_always_succeed() {
        let sub = NullStore.sub("deep/down").unwrap();
        assert_eq!(sub.stat("x").unwrap().name, "x");
        NullStore.remove("never-existed").unwrap();
    }
}
