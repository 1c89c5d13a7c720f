use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::{
    hash::ModuleHash,
    types::{CacheError, CompilationCache},
};

/// A [`CompilationCache`] that saves artifacts to a folder on disk, one
/// file per module hash.
///
/// Artifacts survive process restarts. The bytes in each file are whatever
/// the runtime produced when serializing the module; this cache never
/// inspects them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemCache {
    cache_dir: PathBuf,
}

impl FileSystemCache {
    /// Opens a cache rooted at `cache_dir`, creating the directory if it
    /// does not exist.
    ///
    /// Fails if the path exists and is not a directory, or if it cannot be
    /// created.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let cache_dir = cache_dir.into();

        match fs::metadata(&cache_dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(CacheError::NotADirectory { path: cache_dir }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(&cache_dir)?;
            }
            Err(e) => return Err(e.into()),
        }

        Ok(FileSystemCache { cache_dir })
    }

    /// The directory artifacts are stored under.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn path(&self, key: ModuleHash) -> PathBuf {
        self.cache_dir.join(key.to_string()).with_extension("bin")
    }
}

impl CompilationCache for FileSystemCache {
    fn load(&self, key: ModuleHash) -> Result<Vec<u8>, CacheError> {
        match fs::read(self.path(key)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(CacheError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: ModuleHash, serialized: &[u8]) -> Result<(), CacheError> {
        let path = self.path(key);

        // The root may have been removed behind our back (cache cleaners).
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                tracing::warn!(
                    dir = %parent.display(),
                    error = &e as &dyn std::error::Error,
                    "Unable to create the cache dir",
                );
            }
        }

        fs::write(&path, serialized)?;

        Ok(())
    }

    fn close(&self) -> Result<(), CacheError> {
        // No descriptors are held open between operations.
        Ok(())
    }
}
