use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::utils::CliContext;

#[derive(Parser)]
#[command(name = "stackcanvas")]
#[command(about = "StackCanvas CLI - inspect and manage persisted canvas saves", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.config/stackcanvas/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding local saves (defaults to ~/.config/stackcanvas/saves)
    #[arg(long, global = true)]
    saves_dir: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the local save of a session
    Inspect {
        #[arg(long)]
        session: String,
    },
    /// Write the saved canvas snapshot as JSON
    Export {
        #[arg(long)]
        session: String,
        /// Output file; prints to stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace a session's canvas with a snapshot JSON file
    Import {
        #[arg(long)]
        session: String,
        #[arg(long)]
        file: PathBuf,
        /// Owner ID for the remote store
        #[arg(long)]
        owner: Option<String>,
    },
    /// Delete the local (and, with --owner, remote) save of a session
    Clear {
        #[arg(long)]
        session: String,
        #[arg(long)]
        owner: Option<String>,
    },
    /// Print the effective configuration
    Config,
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let ctx = CliContext::load(cli.config, cli.saves_dir)?;

    match cli.command {
        Commands::Inspect { session } => commands::inspect::run(&ctx, &session)?,
        Commands::Export { session, out } => commands::export::run(&ctx, &session, out.as_deref())?,
        Commands::Import {
            session,
            file,
            owner,
        } => commands::import::run(&ctx, &session, &file, owner).await?,
        Commands::Clear { session, owner } => commands::clear::run(&ctx, &session, owner).await?,
        Commands::Config => commands::config::show(&ctx)?,
    }

    Ok(())
}
