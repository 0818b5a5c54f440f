//! The shader stash: cache store + scanner + watcher.
//!
//! ```no_run
//! use shader_stash::{HeadlessDevice, NagaCompiler, ShaderStashBuilder};
//! use std::time::Duration;
//!
//! let stash = ShaderStashBuilder::new("assets/shaders")
//!     .scan_interval(Duration::from_millis(250))
//!     .build(HeadlessDevice, NagaCompiler::new())
//!     .expect("stash");
//!
//! stash.set_hot_reload(true).expect("watcher");
//! if let Some(module) = stash.get("quad.vert") {
//!     println!("quad.vert entry point: {}", module.entry_point);
//! }
//! ```

use crate::compiler::{NagaCompiler, ShaderCompiler};
use crate::device::ShaderDevice;
use crate::error::StashError;
use crate::kind::ExtensionTable;
use crate::scanner::{ScanReport, Scanner};
use crate::store::ShaderStore;
use crate::watcher::Watcher;
use parking_lot::Mutex;
use shader_stash_config::{ShaderKind, StashConfig, defaults};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Smallest pause between watcher scans.
pub const MIN_SCAN_INTERVAL: Duration = Duration::from_millis(1);

/// Default number of undelivered events a stash keeps.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Notification published after each scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StashEvent {
    /// A shader was compiled and cached for the first time.
    Added { identifier: String },
    /// A cached shader was recompiled and replaced.
    Updated { identifier: String },
    /// Compiling a shader or creating its module failed.
    Failed { identifier: String, message: String },
}

impl StashEvent {
    pub fn identifier(&self) -> &str {
        match self {
            StashEvent::Added { identifier }
            | StashEvent::Updated { identifier }
            | StashEvent::Failed { identifier, .. } => identifier,
        }
    }
}

struct StashInner<D: ShaderDevice, C> {
    device: D,
    scanner: Scanner<C>,
    store: ShaderStore<D::Module>,
    /// Baseline for the next scan. Held for the whole scan so only one
    /// scan (watcher or foreground) writes to the store at a time.
    baseline: Mutex<SystemTime>,
    scan_interval: Mutex<Duration>,
    events: SyncSender<StashEvent>,
}

impl<D: ShaderDevice, C: ShaderCompiler> StashInner<D, C> {
    fn scan_once(&self) -> ScanReport {
        let mut baseline = self.baseline.lock();
        let report = self.scanner.scan(*baseline, &self.device, &self.store);
        *baseline = report.next_baseline;
        self.publish(&report);
        report
    }

    fn publish(&self, report: &ScanReport) {
        let added = report.added.iter().map(|identifier| StashEvent::Added {
            identifier: identifier.clone(),
        });
        let updated = report.updated.iter().map(|identifier| StashEvent::Updated {
            identifier: identifier.clone(),
        });
        let failed = report.failures.iter().map(|e| StashEvent::Failed {
            identifier: e.file().unwrap_or_default().to_string(),
            message: e.to_string(),
        });

        for event in added.chain(updated).chain(failed) {
            match self.events.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(event)) => {
                    log::debug!("Event queue full, dropping {:?}", event);
                }
                // The receiver lives as long as the stash itself
                Err(TrySendError::Disconnected(_)) => {}
            }
        }
    }
}

/// Live cache of compiled shader modules for one directory tree.
///
/// `get` is a pure read and may be called from any thread while the watcher
/// is scanning. Dropping the stash stops the watcher.
pub struct ShaderStash<D: ShaderDevice, C = NagaCompiler> {
    inner: Arc<StashInner<D, C>>,
    watcher: Watcher,
    events: Mutex<Receiver<StashEvent>>,
}

impl<D: ShaderDevice, C> std::fmt::Debug for ShaderStash<D, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderStash")
            .field("shader_dir", &self.inner.scanner.root())
            .field("shaders", &self.inner.store.len())
            .field("hot_reload", &self.watcher.is_active())
            .finish_non_exhaustive()
    }
}

impl<D, C> ShaderStash<D, C>
where
    D: ShaderDevice + 'static,
    C: ShaderCompiler + 'static,
{
    /// Stash with default interval and extension table, hot reload off.
    pub fn new(device: D, compiler: C, shader_dir: impl Into<PathBuf>) -> Self {
        Self::with_scanner(
            device,
            Scanner::new(shader_dir, compiler, ExtensionTable::default()),
            Duration::from_millis(defaults::scan_interval_ms()),
            DEFAULT_EVENT_CAPACITY,
        )
    }

    fn with_scanner(
        device: D,
        scanner: Scanner<C>,
        scan_interval: Duration,
        event_capacity: usize,
    ) -> Self {
        let (tx, rx) = sync_channel(event_capacity);
        Self {
            inner: Arc::new(StashInner {
                device,
                scanner,
                store: ShaderStore::new(),
                baseline: Mutex::new(UNIX_EPOCH),
                scan_interval: Mutex::new(scan_interval.max(MIN_SCAN_INTERVAL)),
                events: tx,
            }),
            watcher: Watcher::new("shader-stash-watch"),
            events: Mutex::new(rx),
        }
    }

    /// Cached module for a shader file name, or `None` if it was never
    /// compiled successfully.
    pub fn get(&self, identifier: &str) -> Option<Arc<D::Module>> {
        self.inner.store.get(identifier)
    }

    /// Read-only access to the underlying store.
    pub fn store(&self) -> &ShaderStore<D::Module> {
        &self.inner.store
    }

    pub fn device(&self) -> &D {
        &self.inner.device
    }

    pub fn shader_dir(&self) -> &Path {
        self.inner.scanner.root()
    }

    pub fn scan_interval(&self) -> Duration {
        *self.inner.scan_interval.lock()
    }

    /// Change the pause between scans, clamped to [`MIN_SCAN_INTERVAL`]. A
    /// running watcher uses the new value from its next sleep on.
    pub fn set_scan_interval(&self, interval: Duration) -> &Self {
        *self.inner.scan_interval.lock() = interval.max(MIN_SCAN_INTERVAL);
        self
    }

    /// Whether the background watcher is running.
    pub fn hot_reload(&self) -> bool {
        self.watcher.is_active()
    }

    /// Enable or disable the background watcher.
    ///
    /// Enabling an active watcher and disabling an idle one are no-ops.
    /// Disabling blocks until the watcher thread has exited.
    pub fn set_hot_reload(&self, enabled: bool) -> Result<&Self, StashError> {
        if enabled {
            let inner = Arc::clone(&self.inner);
            let interval_inner = Arc::clone(&self.inner);
            let started = self
                .watcher
                .start(
                    move || {
                        inner.scan_once();
                    },
                    move || *interval_inner.scan_interval.lock(),
                )
                .map_err(StashError::Spawn)?;
            if started {
                log::info!(
                    "Shader hot reload: watching {} every {:?}",
                    self.shader_dir().display(),
                    self.scan_interval()
                );
            }
        } else if self.watcher.stop() {
            log::info!(
                "Shader hot reload: stopped watching {}",
                self.shader_dir().display()
            );
        }
        Ok(self)
    }

    /// Run one scan on the calling thread.
    ///
    /// Serialized with the watcher: if a background scan is in progress this
    /// waits for it, then scans from the baseline it left behind.
    pub fn scan_now(&self) -> ScanReport {
        self.inner.scan_once()
    }

    /// Next pending event (non-blocking).
    ///
    /// Undrained events are capped (see [`ShaderStashBuilder::event_capacity`]);
    /// events published while the queue is full are dropped.
    pub fn try_recv_event(&self) -> Option<StashEvent> {
        self.events.lock().try_recv().ok()
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<StashEvent> {
        self.events.lock().recv_timeout(timeout).ok()
    }
}

impl<D: ShaderDevice, C> Drop for ShaderStash<D, C> {
    fn drop(&mut self) {
        self.watcher.stop();
    }
}

/// Builder for [`ShaderStash`].
#[derive(Debug, Clone)]
pub struct ShaderStashBuilder {
    shader_dir: PathBuf,
    scan_interval: Duration,
    hot_reload: bool,
    extensions: ExtensionTable,
    event_capacity: usize,
}

impl ShaderStashBuilder {
    /// Builder with default settings for `shader_dir`.
    pub fn new(shader_dir: impl Into<PathBuf>) -> Self {
        Self {
            shader_dir: shader_dir.into(),
            scan_interval: Duration::from_millis(defaults::scan_interval_ms()),
            hot_reload: defaults::hot_reload(),
            extensions: ExtensionTable::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Builder initialised from a loaded configuration.
    pub fn from_config(config: &StashConfig) -> Self {
        let mut extensions = ExtensionTable::default();
        for (ext, kind) in &config.extensions {
            extensions.insert(ext.as_str(), *kind);
        }
        Self {
            shader_dir: config.shader_dir.clone(),
            scan_interval: config.scan_interval(),
            hot_reload: config.hot_reload,
            extensions,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    pub fn shader_dir(mut self, shader_dir: impl Into<PathBuf>) -> Self {
        self.shader_dir = shader_dir.into();
        self
    }

    pub fn scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }

    /// Start the watcher as part of `build`.
    pub fn hot_reload(mut self, enabled: bool) -> Self {
        self.hot_reload = enabled;
        self
    }

    /// Number of undelivered events to keep. With `0`, an event is only
    /// delivered to a caller already blocked in `recv_event_timeout`.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Map an extra file extension to a shader kind.
    pub fn extension(mut self, extension: impl Into<String>, kind: ShaderKind) -> Self {
        self.extensions.insert(extension, kind);
        self
    }

    /// Build the stash, starting the watcher if hot reload was requested.
    pub fn build<D, C>(self, device: D, compiler: C) -> Result<ShaderStash<D, C>, StashError>
    where
        D: ShaderDevice + 'static,
        C: ShaderCompiler + 'static,
    {
        let scanner = Scanner::new(self.shader_dir, compiler, self.extensions);
        let stash = ShaderStash::with_scanner(
            device,
            scanner,
            self.scan_interval,
            self.event_capacity,
        );
        if self.hot_reload {
            stash.set_hot_reload(true)?;
        }
        Ok(stash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessDevice;

    #[test]
    fn test_builder_defaults() {
        let builder = ShaderStashBuilder::new("/tmp/shaders");
        assert_eq!(builder.shader_dir, PathBuf::from("/tmp/shaders"));
        assert_eq!(builder.scan_interval, Duration::from_secs(1));
        assert!(!builder.hot_reload);
    }

    #[test]
    fn test_builder_from_config() {
        let config = StashConfig::from_yaml(
            "shader_dir: assets\nscan_interval_ms: 20\nextensions:\n  vs: vertex\n",
        )
        .expect("config");
        let builder = ShaderStashBuilder::from_config(&config);
        assert_eq!(builder.shader_dir, PathBuf::from("assets"));
        assert_eq!(builder.scan_interval, Duration::from_millis(20));
        assert_eq!(
            builder.extensions.kind_for_extension("vs"),
            ShaderKind::Vertex
        );
    }

    #[test]
    fn test_zero_scan_interval_is_clamped() {
        let stash = ShaderStashBuilder::new("/nonexistent/shaders")
            .scan_interval(Duration::ZERO)
            .build(HeadlessDevice, NagaCompiler::new())
            .expect("stash");
        assert_eq!(stash.scan_interval(), MIN_SCAN_INTERVAL);

        stash.set_scan_interval(Duration::from_millis(5));
        assert_eq!(stash.scan_interval(), Duration::from_millis(5));
        stash.set_scan_interval(Duration::ZERO);
        assert_eq!(stash.scan_interval(), MIN_SCAN_INTERVAL);
    }

    #[test]
    fn test_event_identifier() {
        let event = StashEvent::Failed {
            identifier: "c.vert".to_string(),
            message: "boom".to_string(),
        };
        assert_eq!(event.identifier(), "c.vert");
    }
}
