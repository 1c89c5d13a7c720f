use std::{fmt, str::FromStr};

use crate::types::CacheError;

/// The hash of a wasm module.
///
/// Used as a key when loading and storing artifacts in a
/// [`CompilationCache`](crate::CompilationCache).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ModuleHash([u8; 32]);

impl ModuleHash {
    /// Creates a hash from raw digest bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hash a wasm module.
    ///
    /// # Note:
    /// This does no verification that the supplied data is, in fact, a wasm
    /// module.
    pub fn generate(wasm: &[u8]) -> Self {
        let hash = blake3::hash(wasm);
        Self::new(hash.into())
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ModuleHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for ModuleHash {
    type Err = CacheError;

    /// Parses the hexadecimal representation produced by [`Display`](fmt::Display).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| CacheError::InvalidKey {
            key: s.to_string(),
            reason: e.to_string(),
        })?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| CacheError::InvalidKey {
            key: s.to_string(),
            reason: "keys must decode to exactly 32 bytes".to_string(),
        })?;
        Ok(Self(bytes))
    }
}
