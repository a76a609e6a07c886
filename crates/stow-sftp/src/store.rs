use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use stow_fs::name::segments;
use stow_fs::{Cause, Error, File, FileInfo, Op, Result, Store};
use tracing::debug;

use crate::session::{Attrs, Session};

fn base_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

fn info(name: &str, attrs: &Attrs) -> FileInfo {
    FileInfo {
        name: name.to_string(),
        size: attrs.size,
        mode: attrs.perm & 0o7777,
        modified: attrs.modified(),
        is_dir: attrs.is_dir,
    }
}

/// A store whose files live behind a remote [`Session`].
///
/// Every operation is a round trip over the shared session. Nothing is
/// retried: if the connection drops, calls fail with
/// [`ErrorKind::Closed`](stow_fs::ErrorKind::Closed).
pub struct SftpStore<S: Session> {
    session: Arc<S>,
    dir: String,
}

impl<S: Session> SftpStore<S> {
    pub fn new(session: Arc<S>, dir: impl Into<String>) -> Self {
        Self {
            session,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &str {
        &self.dir
    }

    pub fn session(&self) -> &Arc<S> {
        &self.session
    }

    /// Remote path for `name`. Names containing `..` are refused.
    fn path(&self, op: Op, name: &str) -> Result<String> {
        let segs = segments(name).ok_or_else(|| Error::path(op, name, Cause::Invalid))?;
        Ok(segs
            .iter()
            .fold(self.dir.clone(), |dir, seg| self.session.join(&dir, seg)))
    }

    fn file_path(&self, op: Op, name: &str) -> Result<String> {
        let path = self.path(op, name)?;
        if path == self.dir {
            return Err(Error::path(op, name, Cause::Invalid));
        }
        Ok(path)
    }
}

impl<S: Session> Clone for SftpStore<S> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            dir: self.dir.clone(),
        }
    }
}

impl<S: Session> fmt::Debug for SftpStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SftpStore").field("dir", &self.dir).finish()
    }
}

impl<S: Session + 'static> Store for SftpStore<S> {
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        let path = self.file_path(Op::Open, name)?;
        let handle = self
            .session
            .open(&path)
            .map_err(|e| Error::path(Op::Open, name, e))?;
        Ok(Box::new(SftpFile::new(Arc::clone(&self.session), path, handle)))
    }

    fn sub(&self, dir: &str) -> Result<Box<dyn Store>> {
        let path = self.path(Op::Sub, dir)?;
        self.session
            .mkdir_all(&path)
            .map_err(|e| Error::path(Op::Sub, dir, e))?;
        debug!(dir = %path, "opened remote sub-store");
        Ok(Box::new(Self::new(Arc::clone(&self.session), path)))
    }

    fn stat(&self, name: &str) -> Result<FileInfo> {
        let path = self.file_path(Op::Stat, name)?;
        let attrs = self
            .session
            .stat(&path)
            .map_err(|e| Error::path(Op::Stat, name, e))?;
        Ok(info(base_name(&path), &attrs))
    }

    fn put(&self, mut file: Box<dyn File>) -> Result<Box<dyn File>> {
        let name = file.stat()?.name;
        let path = self.file_path(Op::Put, &name)?;

        let put_err = |e: io::Error| Error::path(Op::Put, name.as_str(), e);

        let mut dst = self.session.create(&path).map_err(put_err)?;
        let written = io::copy(&mut file, &mut dst).map_err(put_err)?;
        dst.seek(SeekFrom::Start(0)).map_err(put_err)?;

        debug!(name = %name, bytes = written, path = %path, "stored remote file");
        Ok(Box::new(SftpFile::new(Arc::clone(&self.session), path, dst)))
    }

    fn remove(&self, name: &str) -> Result<()> {
        let path = self.file_path(Op::Remove, name)?;
        self.session
            .remove(&path)
            .map_err(|e| Error::path(Op::Remove, name, e))
    }
}

/// An open remote file.
pub struct SftpFile<S: Session> {
    session: Arc<S>,
    path: String,
    handle: S::Handle,
}

impl<S: Session> SftpFile<S> {
    fn new(session: Arc<S>, path: String, handle: S::Handle) -> Self {
        Self {
            session,
            path,
            handle,
        }
    }

    /// Full remote path of the file.
    pub fn remote_path(&self) -> &str {
        &self.path
    }
}

impl<S: Session> fmt::Debug for SftpFile<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SftpFile").field("path", &self.path).finish()
    }
}

impl<S: Session> Read for SftpFile<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.handle.read(buf)
    }
}

impl<S: Session> Seek for SftpFile<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.handle.seek(pos)
    }
}

impl<S: Session> File for SftpFile<S> {
    fn stat(&mut self) -> io::Result<FileInfo> {
        let attrs = self.session.fstat(&mut self.handle)?;
        Ok(info(base_name(&self.path), &attrs))
    }
}
