//! drowse — watch eased OS counters.
//!
//! # Usage
//!
//! ```text
//! drowse watch --category Processor --counter "% Processor Time" --instance _Total
//! drowse --config drowse.toml watch --duration-secs 30 --format json
//! drowse counters
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use drowse_core::{DrowseConfig, LogConfig};

mod commands;

#[derive(Parser)]
#[command(
    name = "drowse",
    about = "drowse — self-suspending, eased metric sampling",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to a drowse.toml config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read counters periodically and print their values.
    ///
    /// Counters come from [[watch]] entries in the config file and/or the
    /// --category/--counter/--instance flags. With neither, total processor
    /// time is watched.
    Watch(commands::watch::WatchArgs),
    /// List the OS counters this machine supports.
    Counters {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => DrowseConfig::from_file(path)?,
        None => DrowseConfig::default(),
    };
    init_tracing(&config.log)?;

    match cli.command {
        Commands::Watch(args) => commands::watch::run(args, config).await,
        Commands::Counters { format } => commands::counters::run(format),
    }
}

/// `RUST_LOG` wins over the config file's filter. Logs go to stderr so
/// stdout carries only readings.
fn init_tracing(log: &LogConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&log.filter)?,
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
