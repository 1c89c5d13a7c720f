use std::{fmt::Debug, io, ops::Deref, path::PathBuf};

use crate::hash::ModuleHash;

/// A handle to a cache of compiled WebAssembly modules.
///
/// ## Assumptions
///
/// Implementations can assume that keys are unique and that using the same
/// key to load or save will always refer to the "same" module. Artifact
/// bytes are opaque: their format belongs to whichever runtime serialized
/// them, not to the cache.
pub trait CompilationCache: Debug + Send + Sync {
    /// Load a previously saved artifact.
    ///
    /// Returns [`CacheError::NotFound`] on a miss.
    fn load(&self, key: ModuleHash) -> Result<Vec<u8>, CacheError>;

    /// Save a serialized artifact under `key`.
    fn save(&self, key: ModuleHash, serialized: &[u8]) -> Result<(), CacheError>;

    /// Release any resources held by the cache (open files, indexes).
    ///
    /// Must be called exactly once during host shutdown. A disk-backed
    /// cache may report an error flushing its state; callers should log it
    /// but need not treat it as fatal.
    fn close(&self) -> Result<(), CacheError>;
}

impl<D, C> CompilationCache for D
where
    D: Deref<Target = C> + Debug + Send + Sync,
    C: CompilationCache + ?Sized,
{
    fn load(&self, key: ModuleHash) -> Result<Vec<u8>, CacheError> {
        (**self).load(key)
    }

    fn save(&self, key: ModuleHash, serialized: &[u8]) -> Result<(), CacheError> {
        (**self).save(key, serialized)
    }

    fn close(&self) -> Result<(), CacheError> {
        (**self).close()
    }
}

/// Errors reported by [`CompilationCache`] implementations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The artifact was not found.
    #[error("Not found")]
    NotFound,
    /// A key could not be parsed as a module hash.
    #[error("Invalid cache key `{key}`: {reason}")]
    InvalidKey {
        /// The offending key.
        key: String,
        /// Why it was rejected.
        reason: String,
    },
    /// The cache root exists but is not a directory.
    #[error("`{}` exists and is not a directory", path.display())]
    NotADirectory {
        /// The offending path.
        path: PathBuf,
    },
    /// An underlying I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Any other error from an external cache implementation.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}
