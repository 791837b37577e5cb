//! Chatbridge CLI - line-based front-end for the conversation bridge
//!
//! Each line read from stdin is handled as one inbound message for a single
//! user id; the reply is printed to stdout. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chatbridge_core::tools::mcp::McpToolExecutor;
use chatbridge_core::{
    build_tool_declarations, create_provider_from_config, spawn_sweeper, Config, ConfigManager, ConversationStore,
    Error, Orchestrator, OrchestratorSettings, ToolExecutor,
};

#[derive(Parser)]
#[command(name = "chatbridge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Chat with an LLM that can call MCP tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (defaults to <config dir>/chatbridge/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// LLM Provider (gemini, openai, anthropic, etc.) - defaults to config setting
    #[arg(short, long)]
    provider: Option<String>,

    /// Model to use (defaults to provider's default)
    #[arg(short, long)]
    model: Option<String>,

    /// User id the conversation is stored under
    #[arg(short, long, default_value = "local")]
    user: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat mode
    Chat,

    /// Show the tool declarations sent to the model
    Tools,

    /// Show configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    }
    .context("Failed to load configuration")?;
    let config_path = manager.path().to_path_buf();
    let mut config = manager.into_config();

    // RUST_LOG wins, then --verbose, then the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("info,chatbridge_core=debug,chatbridge_mcp=debug")
        } else {
            EnvFilter::new(&config.general.log_level)
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(provider) = &cli.provider {
        config.provider.provider_type = provider.clone();
        if cli.model.is_none() {
            // The configured model belongs to the configured provider
            config.provider.model.clear();
        }
    }
    if let Some(model) = &cli.model {
        config.provider.model = model.clone();
    }

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_chat(config, &cli.user).await,
        Commands::Tools => show_tools(&config).await,
        Commands::Config => {
            if config.provider.api_key.is_some() {
                config.provider.api_key = Some("********".to_string());
            }
            println!("# {}", config_path.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn connect_tools(config: &Config) -> Result<Arc<dyn ToolExecutor>> {
    if !config.tool_server.is_configured() {
        bail!("No tool server configured; set [tool_server] command or url in the config file");
    }
    let executor = McpToolExecutor::connect(&config.tool_server)
        .await
        .context("Failed to connect to tool server")?;
    Ok(Arc::new(executor))
}

async fn show_tools(config: &Config) -> Result<()> {
    let executor = connect_tools(config).await?;
    let declarations = build_tool_declarations(executor.as_ref())
        .await
        .map_err(Error::ToolCatalogUnavailable)?;

    println!("{}", serde_json::to_string_pretty(&declarations)?);
    Ok(())
}

async fn run_chat(config: Config, user_id: &str) -> Result<()> {
    let provider = create_provider_from_config(&config.provider).context("Failed to create LLM provider")?;
    info!(provider = %provider.provider_type(), model = %provider.model(), "Provider ready");

    let executor = connect_tools(&config).await?;
    let store = Arc::new(ConversationStore::from_config(&config.conversation));
    let _sweeper = spawn_sweeper(store.clone(), config.conversation.sweep_interval());

    let orchestrator = Orchestrator::new(
        executor,
        Arc::new(provider),
        store,
        OrchestratorSettings::from(&config.orchestration),
    );

    eprintln!("chatbridge ready. /reset clears history, /stats shows counts, /quit exits.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        match text {
            "/quit" | "/exit" => break,
            "/reset" => {
                orchestrator.clear(user_id);
                eprintln!("History cleared.");
                continue;
            }
            "/stats" => {
                let stats = orchestrator.stats();
                eprintln!("users: {}, messages: {}", stats.total_users, stats.total_messages);
                continue;
            }
            _ => {}
        }

        let correlation_id = uuid::Uuid::new_v4().to_string();
        match orchestrator.handle_message(user_id, text, &correlation_id).await {
            Ok(reply) => {
                if reply.round_cap_exceeded {
                    warn!(correlation_id = %correlation_id, "Reply cut short by the function call cap");
                }
                stdout.write_all(reply.text.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
            Err(e) => {
                eprintln!("Error: {}", e);
            }
        }
    }

    Ok(())
}
