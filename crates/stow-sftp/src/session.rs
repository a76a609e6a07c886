//! The [`Session`] trait: the handful of remote filesystem calls a
//! [`SftpStore`](crate::SftpStore) needs.

use std::io::{self, Read, Seek, Write};
use std::time::{Duration, SystemTime};

/// Attributes of a remote path, as reported by the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Attrs {
    pub size: u64,
    pub perm: u32,
    /// Seconds since the Unix epoch.
    pub mtime: u64,
    pub is_dir: bool,
}

impl Attrs {
    pub fn modified(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(self.mtime)
    }
}

/// An established connection to a remote filesystem.
///
/// Paths are absolute or relative remote paths using `/` as separator.
/// Implementations report failures as `io::Error`s whose kind reflects the
/// remote status (`NotFound`, `PermissionDenied`, `NotConnected` for a dead
/// link, ...).
pub trait Session: Send + Sync {
    /// An open remote file.
    type Handle: Read + Write + Seek + Send + 'static;

    /// Open an existing file for reading.
    fn open(&self, path: &str) -> io::Result<Self::Handle>;

    /// Create or truncate a file, opened for reading and writing.
    fn create(&self, path: &str) -> io::Result<Self::Handle>;

    fn stat(&self, path: &str) -> io::Result<Attrs>;

    /// Attributes of an already open file.
    fn fstat(&self, handle: &mut Self::Handle) -> io::Result<Attrs>;

    /// Create a single directory. Fails if the parent is missing.
    fn mkdir(&self, path: &str) -> io::Result<()>;

    /// Remove a file.
    fn remove(&self, path: &str) -> io::Result<()>;

    /// Join `name` onto `dir` with remote path semantics.
    fn join(&self, dir: &str, name: &str) -> String {
        join(dir, name)
    }

    /// Create `path` and any missing parents. Existing directories are fine;
    /// an existing non-directory is an error.
    fn mkdir_all(&self, path: &str) -> io::Result<()> {
        match self.stat(path) {
            Ok(attrs) if attrs.is_dir => return Ok(()),
            Ok(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{path}: not a directory"),
                ))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }

        let trimmed = path.trim_end_matches('/');
        if let Some(idx) = trimmed.rfind('/') {
            let parent = &trimmed[..idx];
            if !parent.is_empty() {
                self.mkdir_all(parent)?;
            }
        }

        match self.mkdir(trimmed) {
            Ok(()) => Ok(()),
            // Lost a race with another creator; fine as long as it is a directory.
            Err(err) => match self.stat(trimmed) {
                Ok(attrs) if attrs.is_dir => Ok(()),
                _ => Err(err),
            },
        }
    }
}

/// POSIX-style join that never produces doubled separators.
pub fn join(dir: &str, name: &str) -> String {
    let name = name.trim_start_matches('/');
    if dir.is_empty() {
        return name.to_string();
    }
    if name.is_empty() {
        return dir.to_string();
    }
    format!("{}/{}", dir.trim_end_matches('/'), name)
}
