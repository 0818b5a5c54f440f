//! Shared integration test helpers for shader-stash.
//!
//! Provides a counting compiler and device so tests can observe exactly how
//! often the stash recompiles, plus helpers for writing shader files with
//! pinned modification times.
//!
//! Include this module at the top of each test file that needs it:
//!
//! ```ignore
//! mod common;
//! use common::{CountingCompiler, CountingDevice, ShaderDir};
//! ```
//!
//! The `#[allow(dead_code)]` attribute suppresses warnings when only a subset
//! of helpers are used per file.

#![allow(dead_code)]

use filetime::FileTime;
use parking_lot::Mutex;
use shader_stash::compiler::extract_stage_pragma;
use shader_stash::{
    CompileError, DeviceError, ShaderCompiler, ShaderDevice, ShaderIr, ShaderKind, ShaderStash,
    StashEvent,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant, SystemTime};
use tempfile::TempDir;

/// Sources containing this marker fail to compile.
pub const COMPILE_ERROR_MARKER: &str = "#error";

/// Sources containing this marker make the compiler panic.
pub const COMPILER_PANIC_MARKER: &str = "// compiler-panic";

/// Sources containing this marker compile but the device rejects them.
pub const DEVICE_ERROR_MARKER: &str = "// device-reject";

pub const RED_FRAGMENT: &str = "#version 450
layout(location = 0) out vec4 outColor;
void main() {
    outColor = vec4(1.0, 0.0, 0.0, 1.0);
}
";

pub const GREEN_FRAGMENT: &str = "#version 450
layout(location = 0) out vec4 outColor;
void main() {
    outColor = vec4(0.0, 1.0, 0.0, 1.0);
}
";

pub const QUAD_VERTEX: &str = "#version 450
layout(location = 0) in vec2 position;
void main() {
    gl_Position = vec4(position, 0.0, 1.0);
}
";

pub const PRAGMA_FRAGMENT: &str = "#version 450
#pragma shader_stage(fragment)
layout(location = 0) out vec4 outColor;
void main() {
    outColor = vec4(0.0, 0.0, 1.0, 1.0);
}
";

/// GLSL that naga rejects.
pub const BROKEN_VERTEX: &str = "#version 450
void main( {
    gl_Position = vec4(0.0);
";

/// Compiler that records every invocation.
///
/// Compilation succeeds unless the source contains [`COMPILE_ERROR_MARKER`]
/// (returns an error) or [`COMPILER_PANIC_MARKER`] (panics).
/// The generated "IR" is the source text itself, so tests can check which
/// version of a file a module was built from.
#[derive(Debug, Default)]
pub struct CountingCompiler {
    calls: AtomicUsize,
    compiled: Mutex<Vec<(String, ShaderKind)>>,
}

impl CountingCompiler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(name, requested kind)` for every call, in order.
    pub fn compiled(&self) -> Vec<(String, ShaderKind)> {
        self.compiled.lock().clone()
    }

    pub fn calls_for(&self, name: &str) -> usize {
        self.compiled
            .lock()
            .iter()
            .filter(|(compiled, _)| compiled == name)
            .count()
    }
}

impl ShaderCompiler for CountingCompiler {
    fn compile(
        &self,
        source: &str,
        kind: ShaderKind,
        name: &str,
    ) -> Result<ShaderIr, CompileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.compiled.lock().push((name.to_string(), kind));

        if source.contains(COMPILER_PANIC_MARKER) {
            panic!("compiler crashed on {name}");
        }
        if source.contains(COMPILE_ERROR_MARKER) {
            return Err(CompileError::GlslParse {
                name: name.to_string(),
                details: "  error directive".to_string(),
            });
        }

        let kind = match kind {
            ShaderKind::InferFromSource => extract_stage_pragma(source).0.ok_or_else(|| {
                CompileError::StageNotInferred {
                    name: name.to_string(),
                }
            })?,
            explicit => explicit,
        };

        Ok(ShaderIr {
            name: name.to_string(),
            kind,
            entry_point: Some("main".to_string()),
            wgsl: source.to_string(),
        })
    }
}

/// Module produced by [`CountingDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestModule {
    pub name: String,
    pub kind: ShaderKind,
    pub source: String,
}

/// Device that records every module it creates.
#[derive(Debug, Default)]
pub struct CountingDevice {
    created: AtomicUsize,
}

impl CountingDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl ShaderDevice for CountingDevice {
    type Module = TestModule;

    fn create_shader_module(&self, ir: &ShaderIr) -> Result<Self::Module, DeviceError> {
        if ir.wgsl.contains(DEVICE_ERROR_MARKER) {
            return Err(DeviceError::ModuleCreation {
                name: ir.name.clone(),
                details: "rejected by test device".to_string(),
            });
        }

        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(TestModule {
            name: ir.name.clone(),
            kind: ir.kind,
            source: ir.wgsl.clone(),
        })
    }
}

/// Temporary shader directory.
///
/// The `TempDir` is removed when this value is dropped, so keep it alive for
/// the whole test.
pub struct ShaderDir {
    temp_dir: TempDir,
}

impl ShaderDir {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a shader relative to the directory root, creating parents.
    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create shader subdirectory");
        }
        fs::write(&path, contents).expect("Failed to write shader");
        path
    }

    /// Rewrite a shader and move its modification time into the future so
    /// the next scan sees it regardless of filesystem timestamp resolution.
    pub fn edit(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.write(relative, contents);
        set_mtime_from_now(&path, Duration::from_secs(60), true);
        path
    }

    /// Rewrite a shader but leave its modification time well in the past,
    /// so baseline filtering hides the change.
    pub fn edit_in_past(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.write(relative, contents);
        set_mtime_from_now(&path, Duration::from_secs(3600), false);
        path
    }
}

/// Shift a file's modification time by `offset` relative to now.
pub fn set_mtime_from_now(path: &Path, offset: Duration, future: bool) {
    let now = SystemTime::now();
    let target = if future { now + offset } else { now - offset };
    filetime::set_file_mtime(path, FileTime::from_system_time(target))
        .expect("Failed to set file mtime");
}

/// Wait for an event matching `predicate`, discarding others.
pub fn wait_for_event<D, C, F>(
    stash: &ShaderStash<D, C>,
    timeout: Duration,
    mut predicate: F,
) -> Option<StashEvent>
where
    D: ShaderDevice + 'static,
    C: ShaderCompiler + 'static,
    F: FnMut(&StashEvent) -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.checked_duration_since(Instant::now())?;
        let event = stash.recv_event_timeout(remaining)?;
        if predicate(&event) {
            return Some(event);
        }
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
