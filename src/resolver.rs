use std::{
    fmt::{self, Debug},
    io,
    path::{Path, PathBuf},
};

use crate::{
    filesystem::FileSystemCache,
    in_memory::InMemoryCache,
    types::{CacheError, CompilationCache},
};

/// Resolves the platform directories a persistent cache may live under.
///
/// Production code uses [`OsEnv`]; tests substitute their own
/// implementation so the fallback chain can be exercised without touching
/// the real OS configuration.
pub trait CacheEnv: Debug {
    /// The OS-designated base directory for per-user cache data.
    fn user_cache_dir(&self) -> Option<PathBuf>;

    /// The user's home directory.
    fn user_home_dir(&self) -> Option<PathBuf>;
}

/// A [`CacheEnv`] backed by the operating system's conventions.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEnv;

impl CacheEnv for OsEnv {
    fn user_cache_dir(&self) -> Option<PathBuf> {
        dirs::cache_dir()
    }

    fn user_home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }
}

/// Constructs the cache implementations the resolver hands out.
///
/// Hosts that bring their own cache (a runtime's native compilation cache,
/// say) can implement this to have the resolution and fallback policy drive
/// it instead of the built-in ones.
pub trait CacheProvider: Debug {
    /// A cache whose contents live for the duration of the process.
    fn in_memory(&self) -> Box<dyn CompilationCache>;

    /// A cache persisted under `path`. Construction may fail, e.g. on
    /// corrupt existing cache state or an unsupported filesystem.
    fn on_disk(&self, path: &Path) -> Result<Box<dyn CompilationCache>, CacheError>;
}

/// The crate's own cache implementations: [`InMemoryCache`] and
/// [`FileSystemCache`].
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinProvider;

impl CacheProvider for BuiltinProvider {
    fn in_memory(&self) -> Box<dyn CompilationCache> {
        Box::new(InMemoryCache::new())
    }

    fn on_disk(&self, path: &Path) -> Result<Box<dyn CompilationCache>, CacheError> {
        Ok(Box::new(FileSystemCache::new(path)?))
    }
}

/// Why the resolver abandoned persistence and fell back to memory.
#[derive(Debug)]
#[non_exhaustive]
pub enum FallbackReason {
    /// Neither the user cache directory nor the home directory could be
    /// determined.
    CacheRootUnresolvable,
    /// The target cache directory could not be created.
    DirectoryCreationFailed {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying error.
        error: io::Error,
    },
    /// The disk-backed cache could not be constructed at the resolved path.
    CacheConstructionFailed {
        /// The cache root construction was attempted at.
        path: PathBuf,
        /// The underlying error.
        error: CacheError,
    },
}

type FallbackHook = Box<dyn Fn(&FallbackReason) + Send + Sync>;

/// Builds a [`CompilationCache`] that prefers disk persistence and degrades
/// to memory on any failure.
///
/// [`build()`](PersistentCacheBuilder::build) never fails: persistence is a
/// best-effort optimization, not a correctness requirement of the host.
pub struct PersistentCacheBuilder {
    app_name: String,
    env: Box<dyn CacheEnv>,
    provider: Box<dyn CacheProvider>,
    on_fallback: Option<FallbackHook>,
}

impl Debug for PersistentCacheBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentCacheBuilder")
            .field("app_name", &self.app_name)
            .field("env", &self.env)
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

impl PersistentCacheBuilder {
    /// Starts a builder for `app_name`.
    ///
    /// The name is only used as a path segment under the platform cache
    /// root; callers are responsible for supplying something safe for the
    /// target filesystem.
    pub fn new(app_name: impl Into<String>) -> Self {
        PersistentCacheBuilder {
            app_name: app_name.into(),
            env: Box::new(OsEnv),
            provider: Box::new(BuiltinProvider),
            on_fallback: None,
        }
    }

    /// Overrides how platform directories are resolved.
    pub fn with_env(mut self, env: impl CacheEnv + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Overrides the cache implementations handed out.
    pub fn with_provider(mut self, provider: impl CacheProvider + 'static) -> Self {
        self.provider = Box::new(provider);
        self
    }

    /// Registers a callback invoked when persistence is abandoned.
    ///
    /// Purely observational: the builder still returns a working in-memory
    /// cache afterwards.
    pub fn on_fallback(mut self, hook: impl Fn(&FallbackReason) + Send + Sync + 'static) -> Self {
        self.on_fallback = Some(Box::new(hook));
        self
    }

    /// Resolves the cache directory and returns a cache handle.
    ///
    /// Prefers a disk-backed cache rooted at `<cache root>/<app>/wasm`
    /// (e.g. `~/.cache/<app>/wasm` on Linux), trying `<home>/.cache` when
    /// the platform cache root is unknown. Every failure along the way is
    /// absorbed and answered with an in-memory cache instead; nothing is
    /// retried.
    pub fn build(self) -> Box<dyn CompilationCache> {
        let root = match self.env.user_cache_dir() {
            Some(dir) => dir,
            None => match self.env.user_home_dir() {
                Some(home) => home.join(".cache"),
                None => return self.fall_back(FallbackReason::CacheRootUnresolvable),
            },
        };

        let path = root.join(&self.app_name).join("wasm");

        if let Err(error) = create_cache_dir(&path) {
            return self.fall_back(FallbackReason::DirectoryCreationFailed { path, error });
        }

        match self.provider.on_disk(&path) {
            Ok(cache) => cache,
            Err(error) => self.fall_back(FallbackReason::CacheConstructionFailed { path, error }),
        }
    }

    fn fall_back(&self, reason: FallbackReason) -> Box<dyn CompilationCache> {
        tracing::warn!(
            app_name = %self.app_name,
            ?reason,
            "Persistent module cache unavailable, falling back to memory",
        );

        if let Some(hook) = &self.on_fallback {
            hook(&reason);
        }

        self.provider.in_memory()
    }
}

/// Returns a compilation cache for `app_name`, persisted on disk whenever
/// that is achievable and held in memory otherwise.
///
/// Shorthand for [`PersistentCacheBuilder::new(app_name).build()`](PersistentCacheBuilder).
pub fn persistent(app_name: impl Into<String>) -> Box<dyn CompilationCache> {
    PersistentCacheBuilder::new(app_name).build()
}

#[cfg(unix)]
fn create_cache_dir(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o755)
        .create(path)
}

#[cfg(not(unix))]
fn create_cache_dir(path: &Path) -> io::Result<()> {
    std::fs::create_dir_all(path)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tempfile::TempDir;

    use super::*;
    use crate::hash::ModuleHash;

    #[derive(Debug)]
    struct FakeEnv {
        cache: Option<PathBuf>,
        home: Option<PathBuf>,
    }

    impl CacheEnv for FakeEnv {
        fn user_cache_dir(&self) -> Option<PathBuf> {
            self.cache.clone()
        }

        fn user_home_dir(&self) -> Option<PathBuf> {
            self.home.clone()
        }
    }

    fn recording_hook() -> (Arc<Mutex<Vec<String>>>, impl Fn(&FallbackReason) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let hook = {
            let seen = Arc::clone(&seen);
            move |reason: &FallbackReason| seen.lock().unwrap().push(format!("{reason:?}"))
        };
        (seen, hook)
    }

    #[test]
    fn disk_backed_when_cache_root_resolves() {
        let temp = TempDir::new().unwrap();
        let (seen, hook) = recording_hook();

        let cache = PersistentCacheBuilder::new("myapp")
            .with_env(FakeEnv {
                cache: Some(temp.path().to_path_buf()),
                home: None,
            })
            .on_fallback(hook)
            .build();

        let dir = temp.path().join("myapp").join("wasm");
        assert!(dir.is_dir());
        assert!(seen.lock().unwrap().is_empty());

        // Artifacts actually land on disk.
        let key = ModuleHash::generate(b"\0asm");
        cache.save(key, b"artifact").unwrap();
        assert!(dir.join(key.to_string()).with_extension("bin").exists());
        cache.close().unwrap();
    }

    #[test]
    fn home_dot_cache_when_cache_root_is_unknown() {
        let temp = TempDir::new().unwrap();

        let cache = PersistentCacheBuilder::new("myapp")
            .with_env(FakeEnv {
                cache: None,
                home: Some(temp.path().to_path_buf()),
            })
            .build();

        assert!(temp.path().join(".cache").join("myapp").join("wasm").is_dir());
        cache.close().unwrap();
    }

    #[test]
    fn memory_fallback_when_no_directory_resolves() {
        let (seen, hook) = recording_hook();

        let cache = PersistentCacheBuilder::new("myapp")
            .with_env(FakeEnv {
                cache: None,
                home: None,
            })
            .on_fallback(hook)
            .build();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), ["CacheRootUnresolvable"]);

        // The handle still works, in memory.
        let key = ModuleHash::generate(b"\0asm");
        assert!(matches!(cache.load(key), Err(CacheError::NotFound)));
        cache.save(key, b"artifact").unwrap();
        assert_eq!(cache.load(key).unwrap(), b"artifact");
        cache.close().unwrap();
    }

    #[test]
    fn memory_fallback_when_target_path_is_a_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("myapp"), b"occupied").unwrap();
        let (seen, hook) = recording_hook();

        let cache = PersistentCacheBuilder::new("myapp")
            .with_env(FakeEnv {
                cache: Some(temp.path().to_path_buf()),
                home: None,
            })
            .on_fallback(hook)
            .build();

        assert!(seen.lock().unwrap()[0].starts_with("DirectoryCreationFailed"));
        cache.save(ModuleHash::generate(b"\0asm"), b"artifact").unwrap();
        cache.close().unwrap();
    }

    #[test]
    fn memory_fallback_when_disk_cache_construction_fails() {
        #[derive(Debug)]
        struct CorruptDiskProvider;

        impl CacheProvider for CorruptDiskProvider {
            fn in_memory(&self) -> Box<dyn CompilationCache> {
                Box::new(InMemoryCache::new())
            }

            fn on_disk(&self, _path: &Path) -> Result<Box<dyn CompilationCache>, CacheError> {
                Err(CacheError::Other("corrupt cache index".into()))
            }
        }

        let temp = TempDir::new().unwrap();
        let (seen, hook) = recording_hook();

        let cache = PersistentCacheBuilder::new("myapp")
            .with_env(FakeEnv {
                cache: Some(temp.path().to_path_buf()),
                home: None,
            })
            .with_provider(CorruptDiskProvider)
            .on_fallback(hook)
            .build();

        assert!(seen.lock().unwrap()[0].starts_with("CacheConstructionFailed"));
        let key = ModuleHash::generate(b"\0asm");
        cache.save(key, b"artifact").unwrap();
        assert_eq!(cache.load(key).unwrap(), b"artifact");
        cache.close().unwrap();
    }
}
