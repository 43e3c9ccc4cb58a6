//! Porter daemon - local command front-end.
//!
//! Reads free-text commands line by line, routes each one to a system
//! handler or an AI backend, and prints the response.

use anyhow::Result;
use clap::Parser;
use porter_common::Config;
use porterd::providers::{ChatGptProvider, DeepSeekProvider, GeminiProvider, ProviderRegistry};
use porterd::router::{CommandRouter, DEBUG_MODE_ACTIVATED};
use porterd::security::{CredentialStore, SecretCipher};
use porterd::sudo::{SudoCache, SudoValidator};
use porterd::system::{FileManager, ProcessManager, SystemPackageManager};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "porterd", version, about = "Local command front-end daemon")]
struct Args {
    /// Config file path (default: /etc/porter/config.toml)
    #[arg(long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    info!("porterd v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load(),
    });

    // Explicit dependency graph - components are built once here and
    // handed to whoever needs them.
    let cipher = Arc::new(SecretCipher::load_or_create(&config.security.key_file));
    let store = Arc::new(CredentialStore::open(
        config.security.store_file.clone(),
        Arc::clone(&cipher),
    ));

    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(GeminiProvider::new(
        store.get("gemini_api_key"),
        config.ai.timeout_secs,
    )));
    registry.register(Arc::new(ChatGptProvider::new(
        store.get("openai_api_key"),
        config.ai.timeout_secs,
    )));
    registry.register(Arc::new(DeepSeekProvider::new(
        store.get("deepseek_api_key"),
        config.ai.timeout_secs,
    )));

    let validator = Arc::new(SudoValidator::new(Duration::from_secs(
        config.sudo.validate_timeout_secs,
    )));
    let sudo = Arc::new(SudoCache::new(config.sudo.clone(), validator));
    let sweeper = Arc::clone(&sudo).spawn_sweeper();

    let packages = Arc::new(SystemPackageManager::new(Arc::clone(&sudo)));
    let files = Arc::new(FileManager::new());
    let processes = Arc::new(ProcessManager::new(Arc::clone(&sudo)));

    let router = CommandRouter::new(
        Arc::clone(&config),
        registry,
        Arc::clone(&sudo),
        packages,
        files,
        processes,
    )?;

    info!("porterd ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(command) => {
                        let response = router.route_command(&command).await;
                        if response == DEBUG_MODE_ACTIVATED {
                            println!("✓ Debug mode activated. Open the configuration UI to manage API keys.");
                        } else {
                            println!("{response}");
                        }
                    }
                    None => break, // stdin closed
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received");
                break;
            }
        }
    }

    info!("Shutting down gracefully");
    sweeper.abort();
    sudo.clear();

    Ok(())
}
