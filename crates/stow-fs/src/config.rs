//! Declarative description of a store chain.
//!
//! ```toml
//! root = "/srv/uploads"
//! sub = "avatars"
//! hash = "sha256"
//! limit = 33554432
//! unique = true
//! access = "write-only"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::access::{ReadOnly, WriteOnly};
use crate::error::{Error, Result};
use crate::hash::{Algorithm, Hash};
use crate::limit::Limit;
use crate::os::OsStore;
use crate::traits::Store;
use crate::unique::Unique;

/// Which operations the outermost layer of a chain allows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Access {
    #[default]
    ReadWrite,
    ReadOnly,
    WriteOnly,
}

impl Access {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadWrite => "read-write",
            Self::ReadOnly => "read-only",
            Self::WriteOnly => "write-only",
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Access {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "read-write" | "rw" => Ok(Self::ReadWrite),
            "read-only" | "ro" => Ok(Self::ReadOnly),
            "write-only" | "wo" => Ok(Self::WriteOnly),
            other => Err(Error::Config(format!("unknown access mode: {other}"))),
        }
    }
}

/// A local root directory plus the policies to layer over it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Directory backing the store.
    pub root: PathBuf,
    /// Child namespace to scope the finished chain to.
    #[serde(default)]
    pub sub: Option<String>,
    /// Store files under their content digest.
    #[serde(default)]
    pub hash: Option<Algorithm>,
    /// Maximum file size in bytes.
    #[serde(default)]
    pub limit: Option<u64>,
    /// Refuse to overwrite existing names.
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub access: Access,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            sub: None,
            hash: None,
            limit: None,
            unique: false,
            access: Access::ReadWrite,
        }
    }
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read a TOML config file. A relative `root` is taken relative to the
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&text)?;
        if config.root.is_relative() {
            if let Some(dir) = path.parent() {
                config.root = dir.join(&config.root);
            }
        }
        Ok(config)
    }

    /// Build the chain over an [`OsStore`] at `root`.
    pub fn build(&self) -> Result<Box<dyn Store>> {
        self.build_over(OsStore::new(&self.root))
    }

    /// Layer the configured policies over `inner`.
    ///
    /// Innermost first: `Unique`, `Hash`, `Limit`, then the access
    /// restriction. Uniqueness is therefore checked against the digest name,
    /// and oversize files are rejected before anything is hashed. `sub` is
    /// applied last so the child store carries every policy.
    pub fn build_over<S: Store + 'static>(&self, inner: S) -> Result<Box<dyn Store>> {
        let mut store: Box<dyn Store> = Box::new(inner);

        if self.unique {
            store = Box::new(Unique::new(store));
        }
        if let Some(algorithm) = self.hash {
            store = Box::new(Hash::with_algorithm(store, algorithm));
        }
        if let Some(limit) = self.limit {
            store = Box::new(Limit::new(store, limit));
        }
        store = match self.access {
            Access::ReadWrite => store,
            Access::ReadOnly => Box::new(ReadOnly::new(store)),
            Access::WriteOnly => Box::new(WriteOnly::new(store)),
        };

        if let Some(dir) = &self.sub {
            store = store.sub(dir)?;
        }

        debug!(
            root = %self.root.display(),
            sub = ?self.sub,
            hash = ?self.hash,
            limit = ?self.limit,
            unique = self.unique,
            access = %self.access,
            "built store chain"
        );
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::error::{ErrorKind, Op};
    use crate::file::{File, MemFile};

    fn mem(name: &str, data: &[u8]) -> Box<dyn File> {
        Box::new(MemFile::new(name, data.to_vec(), SystemTime::now()))
    }

    #[test]
    fn default_config() {
        let c = StoreConfig::default();
        assert_eq!(c.root, PathBuf::from("."));
        assert!(c.sub.is_none());
        assert!(c.hash.is_none());
        assert!(c.limit.is_none());
        assert!(!c.unique);
        assert_eq!(c.access, Access::ReadWrite);
    }

    #[test]
    fn parses_toml() {
        let c = StoreConfig::from_toml_str(
            r#"
            root = "/srv/uploads"
            sub = "avatars"
            hash = "blake3"
            limit = 1024
            unique = true
            access = "write-only"
            "#,
        )
        .unwrap();
        assert_eq!(c.root, PathBuf::from("/srv/uploads"));
        assert_eq!(c.sub.as_deref(), Some("avatars"));
        assert_eq!(c.hash, Some(Algorithm::Blake3));
        assert_eq!(c.limit, Some(1024));
        assert!(c.unique);
        assert_eq!(c.access, Access::WriteOnly);
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = StoreConfig::from_toml_str("root = \".\"\ncolour = \"blue\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn load_resolves_relative_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stow.toml");
        std::fs::write(&path, "root = \"data\"\n").unwrap();
        let c = StoreConfig::load(&path).unwrap();
        assert_eq!(c.root, dir.path().join("data"));
    }

    #[test]
    fn access_parses() {
        assert_eq!("ro".parse::<Access>().unwrap(), Access::ReadOnly);
        assert_eq!("write-only".parse::<Access>().unwrap(), Access::WriteOnly);
        assert!("sideways".parse::<Access>().is_err());
    }

    #[test]
    fn full_chain_hashes_limits_and_dedups() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            root: dir.path().to_path_buf(),
            sub: Some("blobs".into()),
            hash: Some(Algorithm::Sha256),
            limit: Some(16),
            unique: true,
            access: Access::ReadWrite,
        };
        let store = config.build().unwrap();

        let mut stored = store.put(mem("a.txt", b"hello world")).unwrap();
        let digest = stored.stat().unwrap().name;
        assert!(dir.path().join("blobs").join(&digest).is_file());

        // Same content under another name hashes to the same digest.
        let err = store.put(mem("b.txt", b"hello world")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Exist);

        let err = store.put(mem("c.txt", &[0u8; 17])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooLarge);
    }

    #[test]
    fn write_only_chain() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StoreConfig::new(dir.path());
        config.access = Access::WriteOnly;
        let store = config.build().unwrap();

        store.put(mem("a", b"1")).unwrap();
        let err = store.open("a").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert_eq!(err.op(), Some(Op::Open));
    }
}
