//! Command-line interface.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "cam")]
#[command(about = "Loan document intake and OCR orchestration service")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Start the intake web server
    Serve {
        /// Bind address: port, host, or host:port
        #[arg(short, long, env = "CAMINTAKE_BIND")]
        bind: Option<String>,
    },
    /// Process one uploaded archive and print the results
    Process {
        /// Blob store key of the archive (e.g. uploads/<id>.zip)
        archive_key: String,
    },
    /// Sweep aged upload artifacts from local storage
    Cleanup {
        /// Delete artifacts older than this many hours
        #[arg(long, default_value_t = 24.0)]
        age_threshold: f64,

        /// What to sweep: all, archives, or staging
        #[arg(long, default_value = "all")]
        mode: String,
    },
}

/// Parse arguments and dispatch to the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| settings.server.bind.clone());
            commands::cmd_serve(&settings, &bind).await
        }
        Commands::Process { archive_key } => commands::cmd_process(&settings, &archive_key).await,
        Commands::Cleanup {
            age_threshold,
            mode,
        } => commands::cmd_cleanup(&settings, age_threshold, &mode),
    }
}
