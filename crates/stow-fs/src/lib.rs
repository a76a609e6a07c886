//! Composable "put a file, get a file back" storage.
//!
//! A [`Store`] is anything a [`File`] can be put into and read back out of.
//! Backends persist bytes; decorators wrap any store to add a policy and
//! delegate everything else, so policies stack without knowing about each
//! other:
//!
//! ```no_run
//! use stow_fs::{hash, read_file, Hash, Limit, OsStore, Store, Unique, WriteOnly};
//!
//! # fn main() -> stow_fs::Result<()> {
//! let store = WriteOnly::new(Limit::new(
//!     Hash::new(Unique::new(OsStore::new("/srv/uploads")), hash::sha256),
//!     32 << 20,
//! ));
//!
//! let upload = read_file("avatar.png", std::io::stdin())?;
//! let stored = store.put(upload)?;
//! # drop(stored);
//! # Ok(())
//! # }
//! ```
//!
//! # Backends
//!
//! - [`OsStore`] -- a directory on local disk
//! - [`NullStore`] -- keeps nothing, fabricates empty files (tests)
//! - remote sessions live in the `stow-sftp` crate
//!
//! # Decorators
//!
//! - [`Hash`] -- stores each file under the hex digest of its contents
//! - [`Limit`] -- rejects files over a byte limit
//! - [`Unique`] -- rejects names that already exist
//! - [`ReadOnly`] / [`WriteOnly`] -- capability restriction
//!
//! # Design Rules
//!
//! 1. Every store error is a [`PathError`] naming the operation and file.
//! 2. `sub` carries every policy of the parent into the child store.
//! 3. Decorators never write on rejection and hold no file contents.
//! 4. Nothing is retried; every failure goes back to the caller.

pub mod access;
pub mod config;
pub mod error;
pub mod file;
pub mod hash;
pub mod limit;
pub mod materialize;
pub mod name;
pub mod null;
pub mod os;
pub mod traits;
pub mod unique;

// Re-export primary types at crate root for ergonomic imports.
pub use access::{ReadOnly, WriteOnly};
pub use config::{Access, StoreConfig};
pub use error::{Cause, Error, ErrorKind, Op, PathError, Result};
pub use file::{rename, File, FileInfo, MemFile, OsFile};
pub use hash::{Algorithm, Digester, Hash};
pub use limit::{human_size, Limit, SizeError};
pub use materialize::{
    cleanup, read_file, read_file_max, read_os_file, read_stream_max, DEFAULT_MAX_MEMORY,
};
pub use null::NullStore;
pub use os::OsStore;
pub use traits::Store;
pub use unique::Unique;
