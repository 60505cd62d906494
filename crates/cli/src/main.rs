//! agentchat CLI, the main entry point.
//!
//! Commands:
//! - `serve`: Start the HTTP gateway
//! - `chat`: Talk to a running gateway (single message or interactive)
//! - `tools`: List the registered tools

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "agentchat",
    about = "agentchat: a tool-using chat agent over HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with a running gateway
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Request a collected JSON reply instead of an event stream
        #[arg(long)]
        no_stream: bool,

        /// Gateway chat endpoint
        #[arg(long, env = "AGENTCHAT_URL", default_value = agentchat_client::DEFAULT_URL)]
        url: String,
    },

    /// List registered tools
    Tools,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat {
            message,
            no_stream,
            url,
        } => commands::chat::run(message, !no_stream, url, cli.verbose).await?,
        Commands::Tools => commands::tools::run()?,
    }

    Ok(())
}
