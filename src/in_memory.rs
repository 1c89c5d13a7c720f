use dashmap::DashMap;

use crate::{
    hash::ModuleHash,
    types::{CacheError, CompilationCache},
};

/// A [`CompilationCache`] based on a <code>[DashMap]<[ModuleHash], [Vec]<[u8]>></code>.
///
/// Its contents are lost when the process exits; the resolver hands it out
/// as the safe fallback when a persistent cache cannot be set up.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCache {
    modules: DashMap<ModuleHash, Vec<u8>>,
}

impl InMemoryCache {
    /// Creates an empty cache.
    pub fn new() -> InMemoryCache {
        InMemoryCache::default()
    }
}

impl CompilationCache for InMemoryCache {
    fn load(&self, key: ModuleHash) -> Result<Vec<u8>, CacheError> {
        self.modules
            .get(&key)
            .map(|m| m.value().clone())
            .ok_or(CacheError::NotFound)
    }

    fn save(&self, key: ModuleHash, serialized: &[u8]) -> Result<(), CacheError> {
        self.modules.insert(key, serialized.to_vec());

        Ok(())
    }

    fn close(&self) -> Result<(), CacheError> {
        self.modules.clear();

        Ok(())
    }
}
