//! Cache store: shader identifier -> (fingerprint, shared module).
//!
//! Readers and the single writer (the scanner) share one `RwLock`. A replace
//! swaps the whole entry while holding the write lock, so `get` sees either
//! the old pair or the new pair, never a mix.
//!
//! Writes are crate-private, so a stash handed out to callers cannot be
//! populated with a module that does not match its fingerprint:
//!
//! ```compile_fail
//! use shader_stash::{Fingerprint, HeadlessDevice, HeadlessModule, NagaCompiler, ShaderKind, ShaderStash};
//! use std::path::Path;
//!
//! let stash = ShaderStash::new(HeadlessDevice, NagaCompiler::new(), "shaders");
//! stash.store().upsert(
//!     "a.frag",
//!     Fingerprint::of(b"unrelated"),
//!     HeadlessModule {
//!         label: "a.frag".to_string(),
//!         kind: ShaderKind::Fragment,
//!         entry_point: "main".to_string(),
//!         wgsl_len: 0,
//!     },
//!     Path::new("a.frag"),
//! );
//! ```

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use xxhash_rust::xxh3::xxh3_64;

/// Content hash used to decide whether a shader needs recompiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub fn of(contents: &[u8]) -> Self {
        Self(xxh3_64(contents))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// One cached compiled shader.
pub struct ShaderEntry<M> {
    pub fingerprint: Fingerprint,
    pub module: Arc<M>,
    /// File the module was last compiled from.
    pub path: PathBuf,
}

impl<M> Clone for ShaderEntry<M> {
    fn clone(&self) -> Self {
        Self {
            fingerprint: self.fingerprint,
            module: Arc::clone(&self.module),
            path: self.path.clone(),
        }
    }
}

impl<M> fmt::Debug for ShaderEntry<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderEntry")
            .field("fingerprint", &self.fingerprint)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Result of [`ShaderStore::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Added,
    Updated,
}

/// Thread-safe map of compiled shaders keyed by file name.
pub struct ShaderStore<M> {
    entries: RwLock<HashMap<String, ShaderEntry<M>>>,
}

impl<M> Default for ShaderStore<M> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<M> fmt::Debug for ShaderStore<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderStore")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl<M> ShaderStore<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached module for `identifier`. Never compiles anything.
    pub fn get(&self, identifier: &str) -> Option<Arc<M>> {
        self.entries
            .read()
            .get(identifier)
            .map(|entry| Arc::clone(&entry.module))
    }

    /// Snapshot of the whole entry for `identifier`.
    pub fn entry(&self, identifier: &str) -> Option<ShaderEntry<M>> {
        self.entries.read().get(identifier).cloned()
    }

    pub fn fingerprint(&self, identifier: &str) -> Option<Fingerprint> {
        self.entries
            .read()
            .get(identifier)
            .map(|entry| entry.fingerprint)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.read().contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Insert a new entry or replace the existing one for `identifier`.
    ///
    /// The previous module is released by the store; holders of earlier
    /// `get` results keep it alive.
    pub(crate) fn upsert(
        &self,
        identifier: &str,
        fingerprint: Fingerprint,
        module: M,
        path: &Path,
    ) -> Upsert {
        let entry = ShaderEntry {
            fingerprint,
            module: Arc::new(module),
            path: path.to_path_buf(),
        };

        let mut entries = self.entries.write();
        match entries.get_mut(identifier) {
            Some(existing) => {
                if existing.path != path {
                    log::debug!(
                        "Shader '{}' from {} replaces the entry compiled from {}",
                        identifier,
                        path.display(),
                        existing.path.display()
                    );
                }
                *existing = entry;
                Upsert::Updated
            }
            None => {
                entries.insert(identifier.to_string(), entry);
                Upsert::Added
            }
        }
    }
}
