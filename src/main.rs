use anyhow::Result;
use clap::Parser;
use shader_stash::cli::{self, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging before any stash work so watcher notices are captured.
    // --log-level takes precedence, then RUST_LOG, then DEBUG_LEVEL.
    shader_stash::debug::init_log_bridge(cli.log_level()?, cli.verbose);
    log::info!("Starting shader-stash {}", shader_stash::VERSION);

    let code = cli::run(cli)?;
    if code != 0 {
        // Non-zero exit so scripts can detect failed shaders.
        // The stash has been dropped by now, so no watcher thread is left running.
        std::process::exit(code);
    }
    Ok(())
}
