use anyhow::bail;
use clap::Parser;
use core::time::Duration;

/// Runtime configuration for the `workpool-demo` binary.
///
/// Every value can come from a CLI flag or an environment variable (a `.env`
/// file is loaded first), with defaults that reproduce the classic
/// three-worker walkthrough.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "workpool-demo",
    version,
    about = "Drives a resizable worker pool and streams its records to stdout"
)]
pub struct CliArgs {
    /// Number of workers started before the first batch of messages.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(long, env = "NUM_WORKERS", default_value_t = 3)]
    pub num_workers: usize,

    /// Capacity of the input channel and of the pool's output channel.
    ///
    /// A capacity of 1 keeps the channels as close to unbuffered as tokio
    /// allows; larger values let producers and workers run further ahead.
    ///
    /// Environment variable: `CHANNEL_CAPACITY`
    #[arg(long, env = "CHANNEL_CAPACITY", default_value_t = 1)]
    pub channel_capacity: usize,

    /// Messages sent per batch in the scripted scenario.
    ///
    /// Environment variable: `MESSAGES`
    #[arg(long, env = "MESSAGES", default_value_t = 10)]
    pub messages: usize,

    /// Seconds to wait for workers and the output listener to finish before
    /// giving up.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT_SECS`
    #[arg(long, env = "SHUTDOWN_TIMEOUT_SECS", default_value_t = 3)]
    pub shutdown_timeout_secs: u64,

    /// Read items from stdin, one per line, instead of running the script.
    #[arg(short, long, default_value_t = false)]
    pub stdin: bool,
}

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub num_workers: usize,
    pub channel_capacity: usize,
    pub messages: usize,
    pub shutdown_timeout: Duration,
    pub stdin: bool,
}

impl TryFrom<CliArgs> for DemoConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.num_workers == 0 {
            bail!("NUM_WORKERS must be greater than 0");
        }

        if args.channel_capacity == 0 {
            bail!("CHANNEL_CAPACITY must be greater than 0");
        }

        Ok(Self {
            num_workers: args.num_workers,
            channel_capacity: args.channel_capacity,
            messages: args.messages,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout_secs),
            stdin: args.stdin,
        })
    }
}
