// Library exports for the shader-stash binary and for embedding in renderers.
//
// # Locking
//
// All locks are `parking_lot` (sync-only state, no async contexts):
//
//   - `ShaderStore` entries: `RwLock`, held only for one lookup or one
//     whole-entry replace.
//   - scan baseline: `Mutex` held for an entire scan, which serializes the
//     watcher and `scan_now`.
//   - watcher state: `Mutex` around Idle/Active transitions, held while
//     joining the worker on stop.
//
// The worker never takes the watcher state lock, so stopping cannot deadlock.

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod compiler;
pub mod debug;
pub mod device;
pub mod error;
pub mod kind;
pub mod scanner;
pub mod stash;
pub mod store;
pub mod watcher;

pub use compiler::{NagaCompiler, ShaderCompiler, ShaderIr};
pub use device::{HeadlessDevice, HeadlessModule, ShaderDevice};
pub use error::{CompileError, DeviceError, StashError};
pub use kind::ExtensionTable;
pub use scanner::{ScanReport, Scanner};
pub use shader_stash_config::{ShaderKind, StashConfig};
pub use stash::{
    DEFAULT_EVENT_CAPACITY, MIN_SCAN_INTERVAL, ShaderStash, ShaderStashBuilder, StashEvent,
};
pub use store::{Fingerprint, ShaderEntry, ShaderStore, Upsert};
pub use watcher::{StopSignal, Watcher};
