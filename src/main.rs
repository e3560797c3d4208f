// Folio - Context-grounded portfolio assistant
// Main entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use folio::chat::{ChatController, ChatSettings};
use folio::config::{load_config, Config};
use folio::portfolio::create_store;
use folio::providers::{create_provider, LlmProvider};
use folio::server::ChatServer;

#[derive(Parser)]
#[command(name = "folio", version)]
#[command(about = "Chat with a portfolio assistant grounded on the owner's curated data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP chat server
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        bind: Option<String>,
        /// Path to config.toml
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the assembled instruction for a portfolio
    Prompt {
        /// Portfolio id or slug
        key: String,
        /// Path to config.toml
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    folio::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind, config } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(bind) = bind {
                config.server.bind_address = bind;
                config.validate()?;
            }
            let controller = build_controller(&config)?;
            ChatServer::new(controller, config.server).serve().await?;
        }
        Command::Prompt { key, config } => {
            let config = load_config(config.as_deref())?;
            let controller = build_controller(&config)?;
            let resolved = controller.resolve(&key).await?;
            let instruction = controller.instruction_for(&resolved)?;
            if instruction.is_guarded() {
                eprintln!("Note: not enough content, visitors will get the canned reply");
            }
            println!("{}", instruction);
        }
    }

    Ok(())
}

fn build_controller(config: &Config) -> Result<ChatController> {
    let store = create_store(&config.store)?;
    let provider: Arc<dyn LlmProvider> = Arc::from(create_provider(&config.provider)?);
    Ok(ChatController::new(
        store,
        provider,
        ChatSettings::from_config(config),
    ))
}
