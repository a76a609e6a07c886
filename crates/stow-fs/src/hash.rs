//! Content addressing: store every file under the digest of its bytes.

use std::fmt;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Op, Result};
use crate::file::{rename, File, FileInfo};
use crate::materialize::{cleanup_path, materialize, DEFAULT_MAX_MEMORY};
use crate::traits::Store;

/// Name the input is buffered under while it is being hashed.
const SCRATCH_NAME: &str = "hash.put";

/// An incremental hash function.
pub trait Digester: Send {
    fn update(&mut self, data: &[u8]);

    /// Consume the digester and return the raw digest bytes.
    fn finalize(self: Box<Self>) -> Vec<u8>;
}

impl Digester for sha2::Sha256 {
    fn update(&mut self, data: &[u8]) {
        sha2::Digest::update(self, data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        sha2::Digest::finalize(*self).to_vec()
    }
}

impl Digester for blake3::Hasher {
    fn update(&mut self, data: &[u8]) {
        blake3::Hasher::update(self, data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        blake3::Hasher::finalize(&self).as_bytes().to_vec()
    }
}

/// Constructor for a fresh digester, called once per `put`.
pub type Mechanism = fn() -> Box<dyn Digester>;

/// SHA-256 mechanism.
pub fn sha256() -> Box<dyn Digester> {
    Box::new(<sha2::Sha256 as sha2::Digest>::new())
}

/// BLAKE3 mechanism.
pub fn blake3() -> Box<dyn Digester> {
    Box::new(blake3::Hasher::new())
}

/// The built-in hash mechanisms, selectable by name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    #[default]
    Sha256,
    Blake3,
}

impl Algorithm {
    pub fn mechanism(self) -> Mechanism {
        match self {
            Self::Sha256 => sha256,
            Self::Blake3 => blake3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(Error::Config(format!("unknown hash algorithm: {other}"))),
        }
    }
}

/// Passes reads through while feeding every byte to a digester.
struct HashingReader<'a, R> {
    inner: R,
    digest: &'a mut dyn Digester,
}

impl<R: Read> Read for HashingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.digest.update(&buf[..n]);
        Ok(n)
    }
}

/// Stores each file under the lowercase hex digest of its contents.
///
/// The name a caller gives a file is ignored: whatever is `put` comes back
/// named after its hash. The input is read exactly once, buffered (in memory
/// or a scratch directory) while it is hashed, and the buffered copy is
/// what the inner store receives.
pub struct Hash<S> {
    inner: S,
    mech: Mechanism,
}

impl<S: Store> Hash<S> {
    pub fn new(inner: S, mech: Mechanism) -> Self {
        Self { inner, mech }
    }

    pub fn with_algorithm(inner: S, algorithm: Algorithm) -> Self {
        Self::new(inner, algorithm.mechanism())
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S> fmt::Debug for Hash<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hash").finish_non_exhaustive()
    }
}

impl<S: Store> Store for Hash<S> {
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        self.inner.open(name)
    }

    fn sub(&self, dir: &str) -> Result<Box<dyn Store>> {
        let sub = self.inner.sub(dir)?;
        Ok(Box::new(Hash::new(sub, self.mech)))
    }

    fn stat(&self, name: &str) -> Result<FileInfo> {
        self.inner.stat(name)
    }

    fn put(&self, mut file: Box<dyn File>) -> Result<Box<dyn File>> {
        let name = file.stat()?.name;

        let mut digest = (self.mech)();
        let buffered = {
            let mut tee = HashingReader {
                inner: &mut file,
                digest: digest.as_mut(),
            };
            materialize(SCRATCH_NAME, &mut tee, DEFAULT_MAX_MEMORY)
        };
        drop(file);
        let buffered = buffered.map_err(|e| Error::path(Op::Put, name.as_str(), e))?;

        let hash = hex::encode(digest.finalize());
        let scratch = buffered.path().map(Path::to_path_buf);
        debug!(name = %name, hash = %hash, "content addressed");

        let stored = self.inner.put(rename(buffered, hash));

        if let Some(path) = scratch {
            if let Err(err) = cleanup_path(&path) {
                warn!(path = %path.display(), error = %err, "failed to remove hash scratch copy");
            }
        }
        stored
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.inner.remove(name)
    }
}
