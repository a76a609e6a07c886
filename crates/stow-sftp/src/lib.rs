//! SFTP backend for `stow-fs`.
//!
//! [`SftpStore`] implements [`stow_fs::Store`] on top of any [`Session`]:
//! a minimal set of remote filesystem calls (open, create, stat, mkdir,
//! remove). Two sessions ship with the crate:
//!
//! - [`MemorySession`] -- an in-process remote for tests and embedding
//! - `ssh2::Sftp` -- a real SSH connection (feature `ssh2`)
//!
//! The store never reconnects. A dropped connection surfaces as
//! [`stow_fs::ErrorKind::Closed`] on every subsequent call, and callers
//! are expected to build a new session.

pub mod memory;
pub mod session;
#[cfg(feature = "ssh2")]
pub mod ssh;
pub mod store;

pub use memory::{MemoryHandle, MemorySession};
pub use session::{join, Attrs, Session};
#[cfg(feature = "ssh2")]
pub use ssh::{connect, Auth};
pub use store::{SftpFile, SftpStore};
