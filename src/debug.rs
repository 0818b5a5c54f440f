//! Log bridge for the shader-stash binary.
//!
//! Routes every `log::info!()` / `log::error!()` etc. to a debug log file so
//! a long-running `watch` keeps a record even when stderr is not captured.
//!
//! Level precedence: explicit CLI level, then `RUST_LOG`, then the
//! `DEBUG_LEVEL` environment variable:
//! - 0 or unset: errors only
//! - 1: Errors only
//! - 2: Info level (added / updated shaders)
//! - 3: Debug level (skipped files, watcher thread lifecycle)
//! - 4: Trace level (every fingerprint comparison)
//!
//! Output goes to `<temp dir>/shader_stash_debug.log`. When `RUST_LOG` is set
//! or stderr mirroring is requested, lines are also written to stderr.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Map the numeric `DEBUG_LEVEL` convention onto a `log` filter.
pub fn level_from_debug_env(value: Option<&str>) -> log::LevelFilter {
    match value.and_then(|v| v.trim().parse::<u8>().ok()) {
        Some(2) => log::LevelFilter::Info,
        Some(3) => log::LevelFilter::Debug,
        Some(4) => log::LevelFilter::Trace,
        _ => log::LevelFilter::Error,
    }
}

/// Location of the debug log file.
pub fn log_path() -> PathBuf {
    std::env::temp_dir().join("shader_stash_debug.log")
}

struct LogBridge {
    level: log::LevelFilter,
    file: Mutex<Option<File>>,
    mirror_stderr: bool,
}

impl LogBridge {
    fn write_line(&self, line: &str) {
        if let Some(ref mut file) = *self.file.lock() {
            let _ = file.write_all(line.as_bytes());
            let _ = file.flush();
        }
        if self.mirror_stderr {
            eprint!("{line}");
        }
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.write_line(&format_line(
            &get_timestamp(),
            record.level(),
            record.target(),
            &record.args().to_string(),
        ));
    }

    fn flush(&self) {
        if let Some(ref mut file) = *self.file.lock() {
            let _ = file.flush();
        }
    }
}

fn format_line(timestamp: &str, level: log::Level, target: &str, msg: &str) -> String {
    format!("[{}] [{:<5}] [{}] {}\n", timestamp, level, target, msg)
}

fn get_timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:06}", now.as_secs(), now.subsec_micros())
}

static BRIDGE: OnceLock<LogBridge> = OnceLock::new();

/// Install the log bridge. Later calls are no-ops.
///
/// `cli_level` wins over `RUST_LOG`, which wins over `DEBUG_LEVEL`.
/// `mirror_stderr` forces stderr output even without `RUST_LOG`.
pub fn init_log_bridge(cli_level: Option<log::LevelFilter>, mirror_stderr: bool) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let level = cli_level
        .or_else(|| rust_log.as_deref().and_then(|v| v.trim().parse().ok()))
        .unwrap_or_else(|| level_from_debug_env(std::env::var("DEBUG_LEVEL").ok().as_deref()));

    let bridge = BRIDGE.get_or_init(|| {
        // Silently run without a file if it can't be opened
        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(log_path())
            .ok();
        let bridge = LogBridge {
            level,
            file: Mutex::new(file),
            mirror_stderr: mirror_stderr || rust_log.is_some(),
        };
        if let Some(ref mut file) = *bridge.file.lock() {
            let _ = write!(
                file,
                "\n{}\nshader-stash debug session started at {} (level={})\n{}\n",
                "=".repeat(80),
                get_timestamp(),
                level,
                "=".repeat(80)
            );
        }
        bridge
    });

    if log::set_logger(bridge).is_ok() {
        log::set_max_level(bridge.level);
    }
}
