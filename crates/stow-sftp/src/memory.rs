//! In-process [`Session`] for tests and embedding.
//!
//! [`MemorySession`] keeps a tree of directories and files in memory and
//! behaves like a remote server would: missing parents are errors, files
//! are truncated on create, and after [`MemorySession::disconnect`] every
//! call (including reads on already open handles) fails with
//! `NotConnected`.

use std::collections::{HashMap, HashSet};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::session::{Attrs, Session};

const FILE_PERM: u32 = 0o644;
const DIR_PERM: u32 = 0o755;

fn poisoned<T>(e: PoisonError<T>) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("lock poisoned: {e}"))
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Canonical form: rooted, no empty or `.` segments, no trailing slash.
fn normalize(path: &str) -> String {
    let segs: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    format!("/{}", segs.join("/"))
}

fn parent(path: &str) -> Option<&str> {
    match path.rfind('/') {
        Some(0) if path.len() > 1 => Some("/"),
        Some(0) | None => None,
        Some(idx) => Some(&path[..idx]),
    }
}

#[derive(Debug, Default)]
struct Contents {
    bytes: Vec<u8>,
    mtime: u64,
}

#[derive(Debug)]
struct Link {
    connected: AtomicBool,
}

impl Link {
    fn check(&self) -> io::Result<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::NotConnected, "connection lost"))
        }
    }
}

/// A remote filesystem held in memory.
#[derive(Debug)]
pub struct MemorySession {
    files: RwLock<HashMap<String, Arc<Mutex<Contents>>>>,
    dirs: RwLock<HashSet<String>>,
    link: Arc<Link>,
}

impl MemorySession {
    /// A session with only the root directory.
    pub fn new() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            dirs: RwLock::new(HashSet::from(["/".to_string()])),
            link: Arc::new(Link {
                connected: AtomicBool::new(true),
            }),
        }
    }

    /// Drop the simulated connection. Nothing reconnects it.
    pub fn disconnect(&self) {
        self.link.connected.store(false, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.link.connected.load(Ordering::SeqCst)
    }

    /// Snapshot of a file's bytes, bypassing the connection state.
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        let files = self.files.read().ok()?;
        let file = files.get(&normalize(path))?;
        let contents = file.lock().ok()?;
        Some(contents.bytes.clone())
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.dirs
            .read()
            .map(|dirs| dirs.contains(&normalize(path)))
            .unwrap_or(false)
    }

    fn require_parent(&self, path: &str) -> io::Result<()> {
        let Some(parent) = parent(path) else {
            return Ok(());
        };
        let dirs = self.dirs.read().map_err(poisoned)?;
        if dirs.contains(parent) {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{parent}: no such directory"),
            ))
        }
    }

    fn handle(&self, contents: Arc<Mutex<Contents>>) -> MemoryHandle {
        MemoryHandle {
            contents,
            pos: 0,
            link: Arc::clone(&self.link),
        }
    }
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{path}: no such file"))
}

fn is_a_directory(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{path}: is a directory"))
}

impl Session for MemorySession {
    type Handle = MemoryHandle;

    fn open(&self, path: &str) -> io::Result<MemoryHandle> {
        self.link.check()?;
        let path = normalize(path);
        let files = self.files.read().map_err(poisoned)?;
        match files.get(&path) {
            Some(contents) => Ok(self.handle(Arc::clone(contents))),
            None if self.is_dir(&path) => Err(is_a_directory(&path)),
            None => Err(not_found(&path)),
        }
    }

    fn create(&self, path: &str) -> io::Result<MemoryHandle> {
        self.link.check()?;
        let path = normalize(path);
        if self.is_dir(&path) {
            return Err(is_a_directory(&path));
        }
        self.require_parent(&path)?;

        let mut files = self.files.write().map_err(poisoned)?;
        let contents = files
            .entry(path)
            .or_insert_with(|| Arc::new(Mutex::new(Contents::default())));
        {
            let mut c = contents.lock().map_err(poisoned)?;
            c.bytes.clear();
            c.mtime = now_secs();
        }
        Ok(self.handle(Arc::clone(contents)))
    }

    fn stat(&self, path: &str) -> io::Result<Attrs> {
        self.link.check()?;
        let path = normalize(path);
        if self.is_dir(&path) {
            return Ok(Attrs {
                size: 0,
                perm: DIR_PERM,
                mtime: 0,
                is_dir: true,
            });
        }
        let files = self.files.read().map_err(poisoned)?;
        let contents = files.get(&path).ok_or_else(|| not_found(&path))?;
        let c = contents.lock().map_err(poisoned)?;
        Ok(Attrs {
            size: c.bytes.len() as u64,
            perm: FILE_PERM,
            mtime: c.mtime,
            is_dir: false,
        })
    }

    fn fstat(&self, handle: &mut MemoryHandle) -> io::Result<Attrs> {
        self.link.check()?;
        let c = handle.contents.lock().map_err(poisoned)?;
        Ok(Attrs {
            size: c.bytes.len() as u64,
            perm: FILE_PERM,
            mtime: c.mtime,
            is_dir: false,
        })
    }

    fn mkdir(&self, path: &str) -> io::Result<()> {
        self.link.check()?;
        let path = normalize(path);
        self.require_parent(&path)?;
        if self.files.read().map_err(poisoned)?.contains_key(&path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{path}: file exists"),
            ));
        }
        let mut dirs = self.dirs.write().map_err(poisoned)?;
        if !dirs.insert(path.clone()) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{path}: directory exists"),
            ));
        }
        Ok(())
    }

    fn remove(&self, path: &str) -> io::Result<()> {
        self.link.check()?;
        let path = normalize(path);
        if self.is_dir(&path) {
            return Err(is_a_directory(&path));
        }
        let mut files = self.files.write().map_err(poisoned)?;
        files.remove(&path).map(|_| ()).ok_or_else(|| not_found(&path))
    }
}

/// An open file on a [`MemorySession`].
#[derive(Debug)]
pub struct MemoryHandle {
    contents: Arc<Mutex<Contents>>,
    pos: u64,
    link: Arc<Link>,
}

impl Read for MemoryHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.link.check()?;
        let c = self.contents.lock().map_err(poisoned)?;
        let len = c.bytes.len() as u64;
        if self.pos >= len {
            return Ok(0);
        }
        let start = self.pos as usize;
        let n = buf.len().min(c.bytes.len() - start);
        buf[..n].copy_from_slice(&c.bytes[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Write for MemoryHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.link.check()?;
        let mut c = self.contents.lock().map_err(poisoned)?;
        let start = self.pos as usize;
        let end = start + buf.len();
        if c.bytes.len() < end {
            c.bytes.resize(end, 0);
        }
        c.bytes[start..end].copy_from_slice(buf);
        c.mtime = now_secs();
        self.pos = end as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.link.check()
    }
}

impl Seek for MemoryHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.link.check()?;
        let len = self.contents.lock().map_err(poisoned)?.bytes.len() as i128;
        let target = match pos {
            SeekFrom::Start(n) => n as i128,
            SeekFrom::End(off) => len + off as i128,
            SeekFrom::Current(off) => self.pos as i128 + off as i128,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative position",
            ));
        }
        self.pos = target as u64;
        Ok(self.pos)
    }
}
