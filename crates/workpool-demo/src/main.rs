#![doc = include_str!("../README.md")]

mod demo;

use clap::Parser;
use demo::config::{CliArgs, DemoConfig};
use demo::scenario::{run_scripted, run_stdin};
use demo::telemetry::init_telemetry;

// mimalloc holds up better than the system allocator when many worker tasks
// allocate records concurrently, especially in musl environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = DemoConfig::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    if config.stdin {
        run_stdin(&config).await
    } else {
        run_scripted(&config).await
    }
}

fn log_startup_info(config: &DemoConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting worker pool demo with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting worker pool demo with {} workers ({})",
            config.num_workers,
            if config.stdin { "stdin" } else { "scripted" }
        );
    }
}
