//! The `wasm-module-cache` crate provides the necessary abstractions for a
//! host embedding a WebAssembly runtime to cache compiled modules between
//! process runs.
//!
//! The entry point is [`persistent`] (or [`PersistentCacheBuilder`] when the
//! defaults need adjusting): it resolves an OS-appropriate cache directory,
//! creates it if absent, and returns a [`CompilationCache`] rooted there. If
//! any of those steps fail, it silently degrades to an [`InMemoryCache`] —
//! persistence is a best-effort optimization and never a reason to fail the
//! host's startup.
//!
//! ```no_run
//! use wasm_module_cache::{ModuleHash, persistent};
//!
//! let cache = persistent("my-host");
//! let wasm = b"\0asm...";
//! let key = ModuleHash::generate(wasm);
//! if cache.load(key).is_err() {
//!     // compile the module, then:
//!     let artifact = b"serialized artifact";
//!     let _ = cache.save(key, artifact);
//! }
//! cache.close().unwrap();
//! ```

#![deny(missing_docs, trivial_numeric_casts, unused_extern_crates)]
#![warn(unused_import_braces)]

mod filesystem;
mod hash;
mod in_memory;
mod resolver;
mod types;

pub use crate::filesystem::FileSystemCache;
pub use crate::hash::ModuleHash;
pub use crate::in_memory::InMemoryCache;
pub use crate::resolver::{
    BuiltinProvider, CacheEnv, CacheProvider, FallbackReason, OsEnv, PersistentCacheBuilder,
    persistent,
};
pub use crate::types::{CacheError, CompilationCache};
