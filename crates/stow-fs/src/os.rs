use std::fs;
use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Cause, Error, Op, Result};
use crate::file::{base_name, File, FileInfo, OsFile};
use crate::name::segments;
use crate::traits::Store;

/// Mode for directories created by [`OsStore::sub`].
#[cfg(unix)]
const SUB_DIR_MODE: u32 = 0o750;

/// A store rooted at a directory on the local filesystem.
#[derive(Clone, Debug)]
pub struct OsStore {
    root: PathBuf,
}

impl OsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join `name` onto the root. Names containing `..` are refused.
    fn resolve(&self, op: Op, name: &str) -> Result<PathBuf> {
        let segs = segments(name).ok_or_else(|| Error::path(op, name, Cause::Invalid))?;
        Ok(segs.iter().fold(self.root.clone(), |path, seg| path.join(seg)))
    }

    /// Like [`resolve`](Self::resolve), but the name must point below the root.
    fn resolve_file(&self, op: Op, name: &str) -> Result<PathBuf> {
        let path = self.resolve(op, name)?;
        if path == self.root {
            return Err(Error::path(op, name, Cause::Invalid));
        }
        Ok(path)
    }
}

fn create_dir_all(path: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(SUB_DIR_MODE);
    }
    builder.create(path)
}

impl Store for OsStore {
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        let path = self.resolve_file(Op::Open, name)?;
        let file = OsFile::open(path).map_err(|e| Error::path(Op::Open, name, e))?;
        Ok(Box::new(file))
    }

    fn sub(&self, dir: &str) -> Result<Box<dyn Store>> {
        let path = self.resolve(Op::Sub, dir)?;
        create_dir_all(&path).map_err(|e| Error::path(Op::Sub, dir, e))?;
        debug!(dir = %path.display(), "opened sub-store");
        Ok(Box::new(Self::new(path)))
    }

    fn stat(&self, name: &str) -> Result<FileInfo> {
        let path = self.resolve_file(Op::Stat, name)?;
        let meta = fs::metadata(&path).map_err(|e| Error::path(Op::Stat, name, e))?;
        Ok(FileInfo::from_metadata(base_name(&path), &meta))
    }

    fn put(&self, mut file: Box<dyn File>) -> Result<Box<dyn File>> {
        let name = file.stat()?.name;
        let path = self.resolve_file(Op::Put, &name)?;

        let put_err = |e: io::Error| Error::path(Op::Put, name.as_str(), e);

        let mut dst = OsFile::create(&path).map_err(put_err)?;
        let written = io::copy(&mut file, &mut dst).map_err(put_err)?;
        dst.seek(SeekFrom::Start(0)).map_err(put_err)?;

        debug!(name = %name, bytes = written, path = %path.display(), "stored file");
        Ok(Box::new(dst))
    }

    fn remove(&self, name: &str) -> Result<()> {
        let path = self.resolve_file(Op::Remove, name)?;
        fs::remove_file(&path).map_err(|e| Error::path(Op::Remove, name, e))
    }
}
