//! Codewright CLI — the main entry point.
//!
//! Commands:
//! - `init`   — Write the default config
//! - `chat`   — Ask questions about a repository, interactively or once
//! - `index`  — Build or query the retrieval index
//! - `tools`  — List the enabled tools

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod runtime;

#[derive(Parser)]
#[command(
    name = "codewright",
    about = "Codewright — ask questions about a codebase",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Repository to work on
    #[arg(short, long, global = true, default_value = ".")]
    repo: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Init,

    /// Chat with the codebase assistant
    Chat {
        /// Ask a single question instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Run the questions in a file, one per line, then exit
        #[arg(long, conflicts_with = "message")]
        script: Option<PathBuf>,
    },

    /// Manage the retrieval index
    Index {
        #[command(subcommand)]
        command: IndexCommand,
    },

    /// List the enabled tools
    Tools,
}

#[derive(Subcommand)]
enum IndexCommand {
    /// Describe and embed new or changed files
    Build {
        /// Discard the cache and describe every file again
        #[arg(long)]
        rebuild: bool,
    },

    /// Show the files nearest to a question
    Query {
        question: String,

        /// Number of files to show
        #[arg(short, default_value_t = 5)]
        k: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Chat { message, script } => commands::chat::run(&cli.repo, message, script).await?,
        Commands::Index { command } => match command {
            IndexCommand::Build { rebuild } => commands::index::build(&cli.repo, rebuild).await?,
            IndexCommand::Query { question, k } => commands::index::query(&cli.repo, &question, k).await?,
        },
        Commands::Tools => commands::tools::run(&cli.repo).await?,
    }

    Ok(())
}
