//! Helpdesk CLI
//!
//! Main entry point for the helpdesk command-line tool.
//! Answers student questions from the campus FAQ knowledge base.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, CheckCommand};
use helpdesk_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Helpdesk CLI - answer student questions from the FAQ knowledge base
#[derive(Parser, Debug)]
#[command(name = "helpdesk")]
#[command(about = "Answer student questions from the FAQ knowledge base", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "HELPDESK_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "HELPDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Knowledge base file (YAML or JSON)
    #[arg(short, long, global = true, env = "HELPDESK_KNOWLEDGE_BASE")]
    knowledge_base: Option<PathBuf>,

    /// Embedding provider (trigram, ollama)
    #[arg(long, global = true, env = "HELPDESK_EMBEDDING_PROVIDER")]
    embedding_provider: Option<String>,

    /// Embedding model identifier
    #[arg(long, global = true, env = "HELPDESK_EMBEDDING_MODEL")]
    embedding_model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer one or more messages
    Ask(AskCommand),

    /// Answer messages read from stdin, one per line
    Chat(ChatCommand),

    /// Build the knowledge index and report its stats
    Check(CheckCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration from the workspace and environment
    let config = AppConfig::load_from(cli.workspace.clone(), cli.config)?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.knowledge_base,
        cli.embedding_provider,
        cli.embedding_model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Helpdesk CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Knowledge base: {:?}", config.knowledge_base_path());
    tracing::debug!(
        "Embedding: {} ({})",
        config.embedding.provider,
        config.embedding.model
    );

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Chat(_) => "chat",
        Commands::Check(_) => "check",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Check(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
