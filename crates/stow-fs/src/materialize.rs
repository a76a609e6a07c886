//! Turning an arbitrary byte stream into a [`File`].
//!
//! Small streams are kept in memory. Streams larger than the memory ceiling
//! are spooled into a fresh `fs-file-*` directory under the system temp
//! root; [`cleanup`] recognises those directories and removes them.

use std::any::Any;
use std::env;
use std::fs;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use std::time::SystemTime;

use tracing::debug;

use crate::file::{rename, File, MemFile, OsFile};
use crate::name::segments;

/// Memory ceiling used by [`read_file`]: 32 MiB.
pub const DEFAULT_MAX_MEMORY: u64 = 32 << 20;

/// Prefix of every scratch directory created by the materializer.
pub const SCRATCH_PREFIX: &str = "fs-file-";

/// Name of the spooled copy when the requested name has no usable last
/// segment (empty, or containing `..`).
const SPOOL_FALLBACK: &str = "spool";

/// Read `reader` into a file named `name`, keeping at most `max_memory`
/// bytes in memory.
///
/// If `reader` is already an [`OsFile`] it is relabeled and returned as is.
/// Use [`read_stream_max`] for readers that borrow.
pub fn read_file_max<R>(name: &str, reader: R, max_memory: u64) -> io::Result<Box<dyn File>>
where
    R: Read + 'static,
{
    let mut slot = Some(reader);
    if let Some(disk) = (&mut slot as &mut dyn Any)
        .downcast_mut::<Option<OsFile>>()
        .and_then(Option::take)
    {
        return Ok(read_os_file(name, disk));
    }

    match slot {
        Some(mut reader) => materialize(name, &mut reader, max_memory),
        None => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "reader already consumed",
        )),
    }
}

/// [`read_file_max`] with [`DEFAULT_MAX_MEMORY`].
pub fn read_file<R>(name: &str, reader: R) -> io::Result<Box<dyn File>>
where
    R: Read + 'static,
{
    read_file_max(name, reader, DEFAULT_MAX_MEMORY)
}

/// Like [`read_file_max`], but for any reader, including borrowed ones.
/// The stream is always buffered; nothing is relabeled.
pub fn read_stream_max<R: Read>(
    name: &str,
    mut reader: R,
    max_memory: u64,
) -> io::Result<Box<dyn File>> {
    materialize(name, &mut reader, max_memory)
}

/// Relabel a file already on local disk as `name` without copying it.
pub fn read_os_file(name: &str, file: OsFile) -> Box<dyn File> {
    rename(Box::new(file), name)
}

/// Local file name for the spooled copy of `name`. Always a single plain
/// segment, so the copy cannot land outside its scratch directory.
fn spool_name(name: &str) -> &str {
    segments(name)
        .and_then(|segs| segs.last().copied())
        .unwrap_or(SPOOL_FALLBACK)
}

/// Buffer `reader` into memory or a scratch directory.
pub(crate) fn materialize(
    name: &str,
    reader: &mut dyn Read,
    max_memory: u64,
) -> io::Result<Box<dyn File>> {
    let mut buf = Vec::new();
    let n = (&mut *reader)
        .take(max_memory.saturating_add(1))
        .read_to_end(&mut buf)? as u64;

    if n <= max_memory {
        return Ok(Box::new(MemFile::new(name, buf, SystemTime::now())));
    }

    // The directory is deleted on drop unless we make it to `keep`, so a
    // failed copy leaves nothing behind.
    let dir = tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .tempdir()?;

    let mut file = OsFile::create(dir.path().join(spool_name(name)))?;
    let written = io::copy(&mut Cursor::new(buf).chain(reader), &mut file)?;
    file.seek(SeekFrom::Start(0))?;

    let dir = dir.keep();
    debug!(name, bytes = written, dir = %dir.display(), "spooled file to disk");
    Ok(rename(Box::new(file), name))
}

/// Whether `dir` is a scratch directory created by the materializer.
pub fn is_scratch_dir(dir: &Path) -> bool {
    is_scratch_dir_in(dir, &env::temp_dir())
}

fn is_scratch_dir_in(dir: &Path, temp_root: &Path) -> bool {
    let Some(parent) = dir.parent() else {
        return false;
    };
    if parent != temp_root {
        return false;
    }
    dir.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_prefix(SCRATCH_PREFIX))
        .is_some_and(|rest| !rest.is_empty())
}

/// Delete `file`'s scratch directory if it was spooled to disk by the
/// materializer. Files anywhere else are left alone.
pub fn cleanup(file: &dyn File) -> io::Result<()> {
    match file.path() {
        Some(path) => cleanup_path(path),
        None => Ok(()),
    }
}

pub(crate) fn cleanup_path(path: &Path) -> io::Result<()> {
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    if !is_scratch_dir(dir) {
        return Ok(());
    }
    match fs::remove_dir_all(dir) {
        Ok(()) => {
            debug!(dir = %dir.display(), "removed scratch directory");
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}
