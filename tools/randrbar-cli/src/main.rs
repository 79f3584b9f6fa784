//! randrbar CLI — inspect monitors the way a bar sees them.
//!
//! Usage:
//!   randrbar monitors [--json] [--no-backlight]   List monitors in bar order
//!   randrbar check                                Check display server and RandR

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use randrbar_common::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "randrbar",
    about = "List RandR monitors in bar order with backlight state",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// X display to connect to (defaults to $DISPLAY)
    #[arg(short, long, global = true)]
    display: Option<String>,

    /// Config file (defaults to $XDG_CONFIG_HOME/randrbar/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List connected monitors in bar order
    Monitors {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Skip reading backlight properties
        #[arg(long)]
        no_backlight: bool,
    },

    /// Check display server and RandR availability
    Check,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load(),
    };
    if cli.display.is_some() {
        config.display = cli.display;
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    randrbar_common::logging::init_logging(&config.logging);
    tracing::debug!(
        display = ?config.display,
        backlight = config.backlight,
        config_file = ?cli.config,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Monitors { json, no_backlight } => {
            if no_backlight {
                config.backlight = false;
            }
            tracing::debug!(json, backlight = config.backlight, "Listing monitors");
            commands::monitors::run(&config, json)
        }
        Commands::Check => {
            tracing::debug!("Running system check");
            commands::check::run(&config)
        }
    }
}
