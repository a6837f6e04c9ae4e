//! Toolbridge - conversational front-end for MCP tool providers
//!
//! Main entry point for the CLI application.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use toolbridge::core::logging;
use toolbridge::tools::ToolConnector;
use toolbridge::{
    ChatCompletionsClient, Config, Orchestrator, ProviderSet, RecapStore, Repl, StdioConnector,
    ToolSession,
};

/// Toolbridge - chat with a model that can call your local MCP tools
#[derive(Parser, Debug)]
#[command(name = "toolbridge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Provider config file (JSON with an "mcpServers" object)
    #[arg(long)]
    providers: Option<PathBuf>,

    /// Model name sent to the chat-completions endpoint
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,

    /// Do not offer or store recaps
    #[arg(long)]
    no_recap: bool,

    /// Single prompt mode (non-interactive)
    #[arg(long, short = 'p')]
    prompt: Option<String>,

    /// Write the effective configuration to the config file and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Build configuration
    let mut config = Config::load().context("loading configuration")?;

    // Apply CLI overrides
    if let Some(ref providers) = args.providers {
        config.tools.config_file = providers.clone();
    }

    if let Some(ref model) = args.model {
        config.llm.model = model.clone();
    }

    if args.debug {
        config.logging.debug = true;
    }

    if args.init_config {
        let path = config.save()?;
        println!("Configuration written to {}", path.display());
        return Ok(());
    }

    logging::init(&config.logging)?;

    let providers = ProviderSet::load(&config.tools.config_file).with_context(|| {
        format!(
            "loading providers from {}",
            config.tools.config_file.display()
        )
    })?;

    let api_key = config.llm.api_key()?;
    let llm = ChatCompletionsClient::from_config(&config.llm, &api_key)
        .context("building chat-completions client")?;

    let connector: Arc<dyn ToolConnector> = Arc::new(StdioConnector::default());
    let sessions = providers
        .into_iter()
        .map(|provider| ToolSession::new(provider, connector.clone(), config.tools.retry_policy()))
        .collect();

    let mut agent = Orchestrator::new(Box::new(llm), sessions);
    if !args.no_recap {
        agent = agent.with_recaps(RecapStore::new(config.recap.directory()));
    } else {
        config.recap.offer_on_start = false;
    }

    // Single prompt mode
    if let Some(prompt) = args.prompt {
        agent.initialize().await?;
        let turn = agent.process_turn(&prompt).await;
        agent.shutdown().await;

        println!("{}", turn?.answer);
        return Ok(());
    }

    // Interactive REPL mode
    let mut repl = Repl::new(agent, config);
    repl.run().await?;

    Ok(())
}
