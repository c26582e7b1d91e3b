//! Kino Telemetry CLI - Replay and audit playback telemetry traces
//!
//! Features:
//! - Replay recorded player signal traces through a telemetry session
//! - Audit normalized event streams for lifecycle violations
//! - Print the default session configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use output::OutputFormat;

/// Kino Telemetry CLI - Playback analytics toolkit
#[derive(Parser)]
#[command(name = "kino-telemetry")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Replay and audit Kino playback telemetry", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text", global = true)]
    format: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a signal trace and print the normalized events
    Replay {
        /// Path to a JSON lines trace
        trace: PathBuf,

        /// Session configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the post-seek quiet window
        #[arg(long)]
        quiet_window_ms: Option<u64>,

        /// Disable ad-break coordination
        #[arg(long)]
        no_ads: bool,

        /// Disable rendition change events
        #[arg(long)]
        no_renditions: bool,

        /// The player was already playing when the trace starts
        #[arg(long)]
        already_playing: bool,
    },

    /// Replay a trace and check the result for lifecycle violations
    Audit {
        /// Path to a JSON lines trace
        trace: PathBuf,

        /// Session configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the default configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine readable
    let level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
    kino_telemetry::init();

    let format = OutputFormat::from(cli.format.as_str());

    match cli.command {
        Commands::Replay {
            trace,
            config,
            quiet_window_ms,
            no_ads,
            no_renditions,
            already_playing,
        } => {
            let mut config = commands::load_config(config.as_deref())?;
            if let Some(ms) = quiet_window_ms {
                config.seek_quiet_window_ms = ms;
            }
            if no_ads {
                config.ad_tracking = false;
            }
            if no_renditions {
                config.rendition_tracking = false;
            }
            if already_playing {
                config.already_playing = true;
            }
            commands::replay(&trace, config, format).await?;
        }
        Commands::Audit { trace, config } => {
            let config = commands::load_config(config.as_deref())?;
            let clean = commands::audit(&trace, config, format).await?;
            if !clean {
                std::process::exit(1);
            }
        }
        Commands::Config => {
            commands::print_default_config();
        }
    }

    Ok(())
}
