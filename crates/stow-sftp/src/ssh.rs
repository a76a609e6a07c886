//! [`Session`] over a real SSH connection via `ssh2`.

use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;

use ssh2::{ErrorCode, FileStat, OpenFlags, OpenType, Sftp};
use tracing::debug;

use crate::session::{Attrs, Session};

/// Mode for directories created over SFTP.
const DIR_MODE: i32 = 0o750;
/// Mode for files created over SFTP.
const FILE_MODE: i32 = 0o644;

// SFTP status codes (draft-ietf-secsh-filexfer-02 and later).
const FX_NO_SUCH_FILE: i32 = 2;
const FX_PERMISSION_DENIED: i32 = 3;
const FX_BAD_MESSAGE: i32 = 5;
const FX_NO_CONNECTION: i32 = 6;
const FX_CONNECTION_LOST: i32 = 7;
const FX_NO_SUCH_PATH: i32 = 10;
const FX_FILE_ALREADY_EXISTS: i32 = 11;

/// How to authenticate the SSH session.
#[derive(Clone, Copy, Debug)]
pub enum Auth<'a> {
    Password(&'a str),
    KeyFile {
        private_key: &'a Path,
        passphrase: Option<&'a str>,
    },
    Agent,
}

/// Open an SSH connection to `addr`, authenticate, and start SFTP.
pub fn connect(addr: impl ToSocketAddrs, user: &str, auth: Auth<'_>) -> io::Result<Sftp> {
    let tcp = TcpStream::connect(addr)?;
    let mut session = ssh2::Session::new().map_err(to_io)?;
    session.set_tcp_stream(tcp);
    session.handshake().map_err(to_io)?;

    match auth {
        Auth::Password(password) => session.userauth_password(user, password),
        Auth::KeyFile {
            private_key,
            passphrase,
        } => session.userauth_pubkey_file(user, None, private_key, passphrase),
        Auth::Agent => session.userauth_agent(user),
    }
    .map_err(to_io)?;

    if !session.authenticated() {
        return Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("ssh authentication failed for {user}"),
        ));
    }

    debug!(user, "ssh session established");
    session.sftp().map_err(to_io)
}

/// Map SFTP status codes onto `io::ErrorKind`s the store layer understands.
fn to_io(err: ssh2::Error) -> io::Error {
    let kind = match err.code() {
        ErrorCode::SFTP(FX_NO_SUCH_FILE | FX_NO_SUCH_PATH) => io::ErrorKind::NotFound,
        ErrorCode::SFTP(FX_PERMISSION_DENIED) => io::ErrorKind::PermissionDenied,
        ErrorCode::SFTP(FX_FILE_ALREADY_EXISTS) => io::ErrorKind::AlreadyExists,
        ErrorCode::SFTP(FX_BAD_MESSAGE) => io::ErrorKind::InvalidData,
        ErrorCode::SFTP(FX_NO_CONNECTION | FX_CONNECTION_LOST) => io::ErrorKind::NotConnected,
        _ => return io::Error::from(err),
    };
    io::Error::new(kind, err)
}

fn attrs(stat: &FileStat) -> Attrs {
    Attrs {
        size: stat.size.unwrap_or(0),
        perm: stat.perm.unwrap_or(0),
        mtime: stat.mtime.unwrap_or(0),
        is_dir: stat.is_dir(),
    }
}

impl Session for Sftp {
    type Handle = ssh2::File;

    fn open(&self, path: &str) -> io::Result<ssh2::File> {
        Sftp::open(self, Path::new(path)).map_err(to_io)
    }

    fn create(&self, path: &str) -> io::Result<ssh2::File> {
        self.open_mode(
            Path::new(path),
            OpenFlags::READ | OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE,
            FILE_MODE,
            OpenType::File,
        )
        .map_err(to_io)
    }

    fn stat(&self, path: &str) -> io::Result<Attrs> {
        Sftp::stat(self, Path::new(path))
            .map(|stat| attrs(&stat))
            .map_err(to_io)
    }

    fn fstat(&self, handle: &mut ssh2::File) -> io::Result<Attrs> {
        handle.stat().map(|stat| attrs(&stat)).map_err(to_io)
    }

    fn mkdir(&self, path: &str) -> io::Result<()> {
        Sftp::mkdir(self, Path::new(path), DIR_MODE).map_err(to_io)
    }

    fn remove(&self, path: &str) -> io::Result<()> {
        self.unlink(Path::new(path)).map_err(to_io)
    }
}
