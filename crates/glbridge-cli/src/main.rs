//! glbridge CLI - GitLab tools for AI assistants over the Model Context Protocol.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use glbridge_core::Config;
use glbridge_gitlab::GitLabClient;
use glbridge_mcp::{catalogue, McpServer, ToolContext};

#[derive(Parser)]
#[command(name = "glbridge")]
#[command(author, version, about = "GitLab tools for AI assistants over MCP", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Load settings from this file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server on stdin/stdout (default)
    Serve,

    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing .env is fine
    let dotenv = dotenvy::dotenv();

    // stdout carries the protocol, so logs go to stderr
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!(path = ?path, "Loaded .env file");
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(cli.config).await,
        Commands::Version => {
            println!("glbridge {}", env!("CARGO_PKG_VERSION"));
            println!("MCP protocol {}", glbridge_mcp::protocol::MCP_VERSION);
            Ok(())
        }
    }
}

async fn serve(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = match config_path {
        Some(path) => Config::load_from(&path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;
    let credentials = config.credentials()?;

    tracing::info!(url = %credentials.url, "Connecting to GitLab");
    let client = GitLabClient::with_base_url(&credentials.url, &credentials.token).into_client();

    let current_user = client
        .users
        .current_user()
        .await
        .context("Failed to resolve the user owning the access token")?;
    tracing::info!(username = %current_user.username, "Authenticated");

    let context = ToolContext::new(client, current_user);
    let mut server = McpServer::new(catalogue(), context)?;
    server.run().await?;

    tracing::info!("Client disconnected, shutting down");
    Ok(())
}
