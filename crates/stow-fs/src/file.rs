//! The [`File`] contract and the concrete files the crate hands out.
//!
//! - [`MemFile`] -- bytes held in memory
//! - [`OsFile`] -- an open file on local disk, with its path
//! - [`Renamed`] -- any file reporting a different name (see [`rename`])

use std::fmt;
use std::fs;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Mode reported for files that only exist in memory.
pub const MEM_FILE_MODE: u32 = 0o400;

/// A single stored object: readable, seekable, and able to describe itself.
///
/// A `File` is owned by whoever created it. Passing one to
/// [`Store::put`](crate::Store::put) consumes it; the store hands back a new
/// `File` for the persisted copy.
pub trait File: Read + Seek + Send + fmt::Debug {
    /// Snapshot the file's metadata.
    fn stat(&mut self) -> io::Result<FileInfo>;

    /// Location on local disk, for files that have one.
    fn path(&self) -> Option<&Path> {
        None
    }

    /// Release the file. Dropping has the same effect but swallows errors.
    fn close(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}

/// Metadata captured when a file was stat-ed. Not updated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub mode: u32,
    pub modified: SystemTime,
    pub is_dir: bool,
}

impl FileInfo {
    /// Build info for a regular in-memory file.
    pub fn regular(name: impl Into<String>, size: u64, modified: SystemTime) -> Self {
        Self {
            name: name.into(),
            size,
            mode: MEM_FILE_MODE,
            modified,
            is_dir: false,
        }
    }

    /// Build info from native filesystem metadata.
    pub fn from_metadata(name: impl Into<String>, meta: &fs::Metadata) -> Self {
        Self {
            name: name.into(),
            size: meta.len(),
            mode: permission_bits(meta),
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            is_dir: meta.is_dir(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

#[cfg(unix)]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o666
    }
}

/// Final path component as a string, or the whole path if there is none.
pub(crate) fn base_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}

/// A file held entirely in memory.
pub struct MemFile {
    name: String,
    data: Cursor<Vec<u8>>,
    modified: SystemTime,
}

impl MemFile {
    pub fn new(name: impl Into<String>, data: Vec<u8>, modified: SystemTime) -> Self {
        Self {
            name: name.into(),
            data: Cursor::new(data),
            modified,
        }
    }

    /// An empty file stamped with the current time.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new(), SystemTime::now())
    }

    pub fn len(&self) -> u64 {
        self.data.get_ref().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.get_ref().is_empty()
    }

    pub fn info(&self) -> FileInfo {
        FileInfo::regular(self.name.clone(), self.len(), self.modified)
    }
}

impl Read for MemFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.data.read(buf)
    }
}

impl Seek for MemFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.data.seek(pos)
    }
}

impl File for MemFile {
    fn stat(&mut self) -> io::Result<FileInfo> {
        Ok(self.info())
    }
}

impl fmt::Debug for MemFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemFile")
            .field("name", &self.name)
            .field("len", &self.len())
            .field("position", &self.data.position())
            .finish()
    }
}

/// An open file on local disk.
#[derive(Debug)]
pub struct OsFile {
    path: PathBuf,
    file: fs::File,
    writable: bool,
}

impl OsFile {
    /// Open an existing file read-only.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = fs::File::open(&path)?;
        Ok(Self {
            path,
            file,
            writable: false,
        })
    }

    /// Create or truncate a file, opened for reading and writing.
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        Ok(Self {
            path,
            file,
            writable: true,
        })
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn into_inner(self) -> fs::File {
        self.file
    }
}

impl Read for OsFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for OsFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for OsFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl File for OsFile {
    fn stat(&mut self) -> io::Result<FileInfo> {
        let meta = self.file.metadata()?;
        Ok(FileInfo::from_metadata(base_name(&self.path), &meta))
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    /// Flushes written data to disk. Read-only handles are just released.
    fn close(self: Box<Self>) -> io::Result<()> {
        if self.writable {
            self.file.sync_all()?;
        }
        Ok(())
    }
}

/// A file that reports a different name than the one it was created with.
#[derive(Debug)]
pub struct Renamed {
    inner: Box<dyn File>,
    name: String,
}

impl Renamed {
    pub fn into_inner(self) -> Box<dyn File> {
        self.inner
    }
}

/// Relabel `file` as `name` without copying any bytes.
///
/// Useful when something that already implements [`File`] has to be stored
/// under another name.
pub fn rename(file: Box<dyn File>, name: impl Into<String>) -> Box<dyn File> {
    Box::new(Renamed {
        inner: file,
        name: name.into(),
    })
}

impl Read for Renamed {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Seek for Renamed {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl File for Renamed {
    fn stat(&mut self) -> io::Result<FileInfo> {
        let mut info = self.inner.stat()?;
        info.name.clone_from(&self.name);
        Ok(info)
    }

    fn path(&self) -> Option<&Path> {
        self.inner.path()
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn read_all(file: &mut dyn File) -> Vec<u8> {
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).unwrap();
        buf
    }

    #[test]
    fn mem_file_reports_its_size() {
        let mut f = MemFile::new("notes.txt", b"hello".to_vec(), SystemTime::now());
        let info = f.stat().unwrap();
        assert_eq!(info.name, "notes.txt");
        assert_eq!(info.size, 5);
        assert_eq!(info.mode, MEM_FILE_MODE);
        assert!(!info.is_dir);
        assert_eq!(read_all(&mut f), b"hello");
    }

    #[test]
    fn mem_file_seeks_back() {
        let mut f = MemFile::new("a", b"abcdef".to_vec(), SystemTime::now());
        assert_eq!(read_all(&mut f), b"abcdef");
        f.seek(SeekFrom::Start(2)).unwrap();
        assert_eq!(read_all(&mut f), b"cdef");
    }

    #[test]
    fn mem_file_rejects_negative_seek() {
        let mut f = MemFile::empty("a");
        let err = f.seek(SeekFrom::Current(-1)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn os_file_stat_uses_base_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let mut f = OsFile::create(&path).unwrap();
        f.write_all(b"1234").unwrap();
        let info = f.stat().unwrap();
        assert_eq!(info.name, "data.bin");
        assert_eq!(info.size, 4);
        assert_eq!(f.path(), Some(path.as_path()));
    }

    #[test]
    fn close_syncs_only_writable_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("closing.bin");

        let mut written = OsFile::create(&path).unwrap();
        assert!(written.is_writable());
        written.write_all(b"persisted").unwrap();
        Box::new(written).close().unwrap();

        let read_only = OsFile::open(&path).unwrap();
        assert!(!read_only.is_writable());
        Box::new(read_only).close().unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"persisted");
    }

    #[test]
    fn renamed_keeps_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orig");
        fs::write(&path, b"x").unwrap();
        let f = rename(Box::new(OsFile::open(&path).unwrap()), "other");
        assert_eq!(f.path(), Some(path.as_path()));
    }

    proptest! {
        #[test]
        fn rename_changes_only_the_name(data in proptest::collection::vec(any::<u8>(), 0..2048), name in "[a-z0-9]{1,16}") {
            let modified = SystemTime::now();
            let mut original = MemFile::new("original", data.clone(), modified);
            let before = original.stat().unwrap();

            let mut renamed = rename(Box::new(original), name.clone());
            let after = renamed.stat().unwrap();

            prop_assert_eq!(&after.name, &name);
            prop_assert_eq!(after.size, before.size);
            prop_assert_eq!(after.mode, before.mode);
            prop_assert_eq!(after.modified, before.modified);
            prop_assert_eq!(read_all(renamed.as_mut()), data);
        }
    }
}
