//! Change-detection scanner.
//!
//! One call to [`Scanner::scan`] is one full pass over the shader directory:
//!
//! 1. Walk the tree and keep regular files modified at or after the baseline.
//! 2. Read and fingerprint each candidate.
//! 3. Skip files whose fingerprint matches the cached entry; compile the rest
//!    and insert or replace their entry.
//! 4. Return the completion time as the next baseline.
//!
//! Files that vanish or cannot be read are skipped and picked up again on a
//! later pass. Compiler and device failures (panics included) are logged,
//! collected into the report, and leave the cached entry alone.

use crate::compiler::ShaderCompiler;
use crate::device::ShaderDevice;
use crate::error::{CompileError, DeviceError, StashError, panic_message};
use crate::kind::ExtensionTable;
use crate::store::{Fingerprint, ShaderStore, Upsert};
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Outcome of one scan pass.
#[derive(Debug)]
pub struct ScanReport {
    /// Baseline the scan started from.
    pub since: SystemTime,
    /// Time the scan completed; the baseline for the next pass.
    pub next_baseline: SystemTime,
    /// Identifiers inserted for the first time.
    pub added: Vec<String>,
    /// Identifiers whose entry was replaced.
    pub updated: Vec<String>,
    /// Candidates whose content matched the cached fingerprint.
    pub unchanged: usize,
    /// Candidates that could not be read this pass.
    pub skipped: usize,
    /// Per-file compile / device failures.
    pub failures: Vec<StashError>,
}

impl ScanReport {
    fn new(since: SystemTime) -> Self {
        Self {
            since,
            next_baseline: since,
            added: Vec::new(),
            updated: Vec::new(),
            unchanged: 0,
            skipped: 0,
            failures: Vec::new(),
        }
    }

    /// Number of shaders compiled and stored by this pass.
    pub fn compiled(&self) -> usize {
        self.added.len() + self.updated.len()
    }

    /// True when no file failed to compile.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Scans one directory tree with one compiler.
#[derive(Debug)]
pub struct Scanner<C> {
    root: PathBuf,
    compiler: C,
    extensions: ExtensionTable,
}

impl<C> Scanner<C> {
    pub fn new(root: impl Into<PathBuf>, compiler: C, extensions: ExtensionTable) -> Self {
        Self {
            root: root.into(),
            compiler,
            extensions,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl<C: ShaderCompiler> Scanner<C> {
    /// Run one pass, compiling new or changed files modified at or after `since`.
    pub fn scan<D: ShaderDevice>(
        &self,
        since: SystemTime,
        device: &D,
        store: &ShaderStore<D::Module>,
    ) -> ScanReport {
        let mut report = ScanReport::new(since);

        for path in self.candidates(since) {
            self.process_file(&path, device, store, &mut report);
        }

        report.next_baseline = SystemTime::now();
        log::trace!(
            "Scan of {} done: {} added, {} updated, {} unchanged, {} skipped, {} failed",
            self.root.display(),
            report.added.len(),
            report.updated.len(),
            report.unchanged,
            report.skipped,
            report.failures.len()
        );
        report
    }

    /// Regular files under the root modified at or after `since`, in file-name
    /// order within each directory.
    fn candidates(&self, since: SystemTime) -> impl Iterator<Item = PathBuf> + '_ {
        WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::debug!("Skipping unreadable directory entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(move |entry| {
                let modified = entry.metadata().ok().and_then(|m| m.modified().ok());
                match modified {
                    Some(modified) if modified >= since => Some(entry.into_path()),
                    Some(_) => None,
                    None => {
                        log::debug!(
                            "Skipping {}: modification time unavailable",
                            entry.path().display()
                        );
                        None
                    }
                }
            })
    }

    fn process_file<D: ShaderDevice>(
        &self,
        path: &Path,
        device: &D,
        store: &ShaderStore<D::Module>,
        report: &mut ScanReport,
    ) {
        let Some(identifier) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return;
        };

        let contents = match fs::read(path) {
            Ok(contents) => contents,
            Err(e) => {
                log::debug!("Skipping {} this cycle: {}", path.display(), e);
                report.skipped += 1;
                return;
            }
        };

        let fingerprint = Fingerprint::of(&contents);
        if store.fingerprint(&identifier) == Some(fingerprint) {
            log::trace!("Shader {} unchanged ({})", identifier, fingerprint);
            report.unchanged += 1;
            return;
        }

        let module = match self.build_module(&identifier, path, contents, device) {
            Ok(module) => module,
            Err(e) => {
                log::error!("{}", e);
                report.failures.push(e);
                return;
            }
        };

        match store.upsert(&identifier, fingerprint, module, path) {
            Upsert::Added => {
                log::info!("Added new {} shader", path.display());
                report.added.push(identifier);
            }
            Upsert::Updated => {
                log::info!("Updated {} shader", path.display());
                report.updated.push(identifier);
            }
        }
    }

    fn build_module<D: ShaderDevice>(
        &self,
        identifier: &str,
        path: &Path,
        contents: Vec<u8>,
        device: &D,
    ) -> Result<D::Module, StashError> {
        let source = String::from_utf8(contents).map_err(|_| StashError::Compile {
            file: identifier.to_string(),
            source: CompileError::InvalidUtf8 {
                name: identifier.to_string(),
            },
        })?;

        let kind = self.extensions.kind_for_path(path);
        let ir = panic::catch_unwind(AssertUnwindSafe(|| {
            self.compiler.compile(&source, kind, identifier)
        }))
        .unwrap_or_else(|payload| {
            Err(CompileError::Panicked {
                name: identifier.to_string(),
                message: panic_message(payload.as_ref()),
            })
        })
        .map_err(|source| StashError::Compile {
            file: identifier.to_string(),
            source,
        })?;

        panic::catch_unwind(AssertUnwindSafe(|| device.create_shader_module(&ir)))
            .unwrap_or_else(|payload| {
                Err(DeviceError::Panicked {
                    name: identifier.to_string(),
                    message: panic_message(payload.as_ref()),
                })
            })
            .map_err(|source| StashError::Device {
                file: identifier.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ShaderIr;
    use crate::device::HeadlessDevice;
    use shader_stash_config::ShaderKind;
    use std::time::UNIX_EPOCH;
    use tempfile::TempDir;

    /// Compiler that accepts anything except sources containing "error",
    /// and panics on sources containing "panic".
    struct EchoCompiler;

    impl ShaderCompiler for EchoCompiler {
        fn compile(
            &self,
            source: &str,
            kind: ShaderKind,
            name: &str,
        ) -> Result<ShaderIr, CompileError> {
            if source.contains("panic") {
                panic!("compiler crashed on {name}");
            }
            if source.contains("error") {
                return Err(CompileError::GlslParse {
                    name: name.to_string(),
                    details: "  syntax error".to_string(),
                });
            }
            Ok(ShaderIr {
                name: name.to_string(),
                kind,
                entry_point: Some("main".to_string()),
                wgsl: source.to_string(),
            })
        }
    }

    fn scanner(dir: &TempDir) -> Scanner<EchoCompiler> {
        Scanner::new(dir.path(), EchoCompiler, ExtensionTable::default())
    }

    #[test]
    fn test_missing_root_is_an_empty_scan() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let scanner = Scanner::new(
            temp_dir.path().join("nope"),
            EchoCompiler,
            ExtensionTable::default(),
        );
        let store = ShaderStore::new();

        let report = scanner.scan(UNIX_EPOCH, &HeadlessDevice, &store);
        assert_eq!(report.compiled(), 0);
        assert!(report.is_clean());
        assert!(store.is_empty());
    }

    #[test]
    fn test_nested_files_keyed_by_file_name() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(temp_dir.path().join("post/fx")).expect("mkdir");
        fs::write(temp_dir.path().join("post/fx/bloom.comp"), "bloom").expect("write");
        fs::write(temp_dir.path().join("quad.vert"), "quad").expect("write");

        let store = ShaderStore::new();
        let report = scanner(&temp_dir).scan(UNIX_EPOCH, &HeadlessDevice, &store);

        assert_eq!(report.added.len(), 2);
        let bloom = store.get("bloom.comp").expect("bloom compiled");
        assert_eq!(bloom.kind, ShaderKind::Compute);
        let quad = store.get("quad.vert").expect("quad compiled");
        assert_eq!(quad.kind, ShaderKind::Vertex);
    }

    #[test]
    fn test_non_utf8_source_is_a_compile_failure() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("bad.frag"), [0xff, 0xfe, 0x00]).expect("write");

        let store = ShaderStore::new();
        let report = scanner(&temp_dir).scan(UNIX_EPOCH, &HeadlessDevice, &store);

        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0],
            StashError::Compile {
                source: CompileError::InvalidUtf8 { .. },
                ..
            }
        ));
        assert!(!store.contains("bad.frag"));
    }

    #[test]
    fn test_compiler_panic_fails_only_that_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("a.frag"), "panic now").expect("write");
        fs::write(temp_dir.path().join("b.frag"), "fine").expect("write");

        let store = ShaderStore::new();
        let report = scanner(&temp_dir).scan(UNIX_EPOCH, &HeadlessDevice, &store);

        assert_eq!(report.added, vec!["b.frag".to_string()]);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            &report.failures[0],
            StashError::Compile {
                file,
                source: CompileError::Panicked { message, .. },
            } if file == "a.frag" && message == "compiler crashed on a.frag"
        ));
        assert!(!store.contains("a.frag"));
    }

    #[test]
    fn test_failed_recompile_keeps_previous_entry() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("a.frag");
        fs::write(&path, "good").expect("write");

        let scanner = scanner(&temp_dir);
        let store = ShaderStore::new();
        scanner.scan(UNIX_EPOCH, &HeadlessDevice, &store);
        let before = store.fingerprint("a.frag").expect("entry");

        fs::write(&path, "error here").expect("write");
        let report = scanner.scan(UNIX_EPOCH, &HeadlessDevice, &store);

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].file(), Some("a.frag"));
        assert_eq!(store.fingerprint("a.frag"), Some(before));
        assert_eq!(store.get("a.frag").expect("entry").wgsl_len, "good".len());
    }

    #[test]
    fn test_next_baseline_is_after_since() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store: ShaderStore<_> = ShaderStore::new();
        let since = SystemTime::now();
        let report = scanner(&temp_dir).scan(since, &HeadlessDevice, &store);
        assert!(report.next_baseline >= since);
        assert_eq!(report.since, since);
    }
}
