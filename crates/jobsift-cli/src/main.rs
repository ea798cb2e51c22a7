//! `jobsift` -- classify job-posting CSVs through an OpenAI-compatible API.
//!
//! - `jobsift run` -- Process the input queue into the output CSV.
//! - `jobsift status` -- Show how many rows remain and how many were written.
//! - `jobsift config show` -- Print the resolved configuration.

use clap::{Parser, Subcommand};

mod commands;

/// Resumable job-posting classifier.
#[derive(Parser)]
#[command(name = "jobsift", about = "Resumable job-posting classifier", version)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every remaining row of the input CSV.
    Run(Box<commands::run::RunArgs>),

    /// Show queue and output progress.
    Status(commands::status::StatusArgs),

    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCmd,
    },
}

/// Subcommands for `jobsift config`.
#[derive(Subcommand)]
enum ConfigCmd {
    /// Print the resolved configuration as JSON (secrets redacted).
    Show {
        /// Config file path (overrides auto-discovery).
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => commands::run::run(*args).await?,
        Commands::Status(args) => commands::status::run(args)?,
        Commands::Config { action } => match action {
            ConfigCmd::Show { config } => {
                let config = commands::load_config(config.as_deref())?;
                commands::config_cmd::config_show(&config)?;
            }
        },
    }

    Ok(())
}
