//! Command-line interface for shader-stash.
//!
//! `check` compiles every shader under a directory once and reports failures;
//! `watch` keeps a stash hot-reloading and prints what it recompiles.

use crate::compiler::NagaCompiler;
use crate::device::{HeadlessDevice, ShaderDevice};
use crate::scanner::ScanReport;
use crate::stash::{ShaderStash, ShaderStashBuilder, StashEvent};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shader_stash_config::StashConfig;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{TryRecvError, channel};
use std::time::{Duration, Instant};

/// shader-stash - A live cache of compiled GPU shaders
#[derive(Parser, Debug)]
#[command(name = "shader-stash")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: <config dir>/shader-stash/config.yaml)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log level: off, error, warn, info, debug, trace
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Mirror log output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Create modules on a real GPU device instead of the headless validator
    #[arg(long, global = true)]
    pub gpu: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile every shader once and report failures
    Check {
        /// Shader directory (overrides the config file)
        dir: Option<PathBuf>,
    },
    /// Hot-reload shaders until Enter is pressed
    Watch {
        /// Shader directory (overrides the config file)
        dir: Option<PathBuf>,

        /// Pause between scans in milliseconds
        #[arg(long, value_name = "MS")]
        interval_ms: Option<u64>,

        /// Stop after this many seconds instead of waiting for Enter
        #[arg(long, value_name = "SECONDS")]
        duration_secs: Option<f64>,
    },
}

impl Cli {
    /// Parsed `--log-level`, if given.
    pub fn log_level(&self) -> Result<Option<log::LevelFilter>> {
        self.log_level
            .as_deref()
            .map(|level| {
                level
                    .parse::<log::LevelFilter>()
                    .map_err(|_| anyhow::anyhow!("Invalid log level: {level}"))
            })
            .transpose()
    }
}

/// Run the parsed command. Returns the process exit code.
pub fn run(cli: Cli) -> Result<i32> {
    let config = load_config(cli.config.as_deref())?;
    let builder = ShaderStashBuilder::from_config(&config).hot_reload(false);

    if cli.gpu {
        let device = request_gpu_device()?;
        run_command(cli.command, builder, device)
    } else {
        run_command(cli.command, builder, HeadlessDevice)
    }
}

fn load_config(path: Option<&Path>) -> Result<StashConfig> {
    match path {
        Some(path) => StashConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => {
            let default_path = StashConfig::config_path();
            StashConfig::load_or_default(&default_path)
                .with_context(|| format!("Failed to load config {}", default_path.display()))
        }
    }
}

fn run_command<D: ShaderDevice + 'static>(
    command: Commands,
    mut builder: ShaderStashBuilder,
    device: D,
) -> Result<i32> {
    match command {
        Commands::Check { dir } => {
            if let Some(dir) = dir {
                builder = builder.shader_dir(dir);
            }
            let stash = builder.build(device, NagaCompiler::new())?;
            let report = stash.scan_now();
            print_report(stash.shader_dir(), &report);
            Ok(if report.is_clean() { 0 } else { 1 })
        }
        Commands::Watch {
            dir,
            interval_ms,
            duration_secs,
        } => {
            if let Some(dir) = dir {
                builder = builder.shader_dir(dir);
            }
            if let Some(ms) = interval_ms {
                builder = builder.scan_interval(Duration::from_millis(ms.max(1)));
            }
            let stash = builder.build(device, NagaCompiler::new())?;
            watch(&stash, duration_secs.map(Duration::from_secs_f64))?;
            Ok(0)
        }
    }
}

fn watch<D: ShaderDevice + 'static>(
    stash: &ShaderStash<D, NagaCompiler>,
    duration: Option<Duration>,
) -> Result<()> {
    stash.set_hot_reload(true)?;

    let deadline = duration.map(|d| Instant::now() + d);
    let (stop_tx, stop_rx) = channel::<()>();
    if deadline.is_none() {
        println!(
            "Watching {} every {:?} (press Enter to stop)",
            stash.shader_dir().display(),
            stash.scan_interval()
        );
        std::thread::Builder::new()
            .name("shader-stash-stdin".to_string())
            .spawn(move || {
                let mut line = String::new();
                let _ = io::stdin().lock().read_line(&mut line);
                let _ = stop_tx.send(());
            })
            .context("Failed to spawn stdin reader")?;
    } else {
        drop(stop_tx);
        println!(
            "Watching {} every {:?}",
            stash.shader_dir().display(),
            stash.scan_interval()
        );
    }

    loop {
        if let Some(event) = stash.recv_event_timeout(Duration::from_millis(100)) {
            print_event(&event);
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                break;
            }
        } else if !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty)) {
            break;
        }
    }

    stash.set_hot_reload(false)?;
    while let Some(event) = stash.try_recv_event() {
        print_event(&event);
    }
    println!("Stopped watching ({} shaders cached)", stash.store().len());
    Ok(())
}

fn print_event(event: &StashEvent) {
    match event {
        StashEvent::Added { identifier } => println!("  + {identifier}"),
        StashEvent::Updated { identifier } => println!("  ~ {identifier}"),
        StashEvent::Failed { message, .. } => println!("  ! {message}"),
    }
}

fn print_report(dir: &Path, report: &ScanReport) {
    println!("Checked {}", dir.display());
    for identifier in &report.added {
        println!("  ok   {identifier}");
    }
    for failure in &report.failures {
        println!("  FAIL {failure}");
    }
    println!(
        "{} compiled, {} failed, {} unreadable",
        report.compiled(),
        report.failures.len(),
        report.skipped
    );
}

/// Create a wgpu device without a surface.
fn request_gpu_device() -> Result<wgpu::Device> {
    let instance = wgpu::Instance::default();
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .context("Failed to find wgpu adapter")?;

    log::info!("Using GPU adapter: {}", adapter.get_info().name);

    let (device, _queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("shader-stash device"),
        ..Default::default()
    }))
    .context("Failed to create wgpu device")?;

    Ok(device)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check() {
        let cli = Cli::try_parse_from(["shader-stash", "check", "assets/shaders"]).expect("parse");
        assert!(!cli.gpu);
        match cli.command {
            Commands::Check { dir } => assert_eq!(dir, Some(PathBuf::from("assets/shaders"))),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_watch_with_global_flags() {
        let cli = Cli::try_parse_from([
            "shader-stash",
            "watch",
            "--interval-ms",
            "250",
            "--duration-secs",
            "1.5",
            "--log-level",
            "debug",
        ])
        .expect("parse");
        assert_eq!(cli.log_level().expect("level"), Some(log::LevelFilter::Debug));
        match cli.command {
            Commands::Watch {
                dir,
                interval_ms,
                duration_secs,
            } => {
                assert_eq!(dir, None);
                assert_eq!(interval_ms, Some(250));
                assert_eq!(duration_secs, Some(1.5));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_log_level() {
        let cli = Cli::try_parse_from(["shader-stash", "check", "--log-level", "loud"])
            .expect("parse");
        assert!(cli.log_level().is_err());
    }
}
