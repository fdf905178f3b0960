//! Archi - Home Assistant over MQTT - Main Entry Point
//!
//! Wires the configuration, sensor log, MQTT bridge, tool registry, and
//! chat session together, then runs a terminal chat loop until the user
//! types `exit` or the process receives a shutdown signal.

use archi::bridge::{DeviceBridge, MqttBridge};
use archi::config::AssistantConfig;
use archi::llm::providers::OllamaProvider;
use archi::llm::LlmProvider;
use archi::observability::init_default_logging;
use archi::sensor_log::SensorCsvLog;
use archi::session::ChatSession;
use archi::tools::ToolRegistry;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};

/// Home assistant chat over an MQTT device bridge
#[derive(Parser)]
#[command(name = "archi")]
#[command(about = "Home assistant chat over an MQTT device bridge")]
#[command(version)]
struct Cli {
    /// Environment file to load instead of ./.env
    #[arg(short, long, value_name = "FILE")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive chat session
    Chat,
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Env file first so RUST_LOG set there reaches the logger
    if let Err(e) = load_environment(&cli.env_file) {
        eprintln!("{e}");
        process::exit(1);
    }

    init_default_logging();

    info!("Starting Archi v{}", env!("CARGO_PKG_VERSION"));

    let config = match AssistantConfig::load_from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Chat => run_chat(config).await,
        Commands::Config { show } => handle_config_command(config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Application shutdown complete");
}

fn load_environment(env_file: &Option<PathBuf>) -> Result<(), String> {
    match env_file {
        Some(path) => dotenvy::from_path(path)
            .map_err(|e| format!("Failed to load env file {}: {e}", path.display())),
        None => {
            // A missing .env is fine; the process environment may already
            // carry everything
            let _ = dotenvy::dotenv();
            Ok(())
        }
    }
}

/// Bootstrap factory - builds the bridge and session with injected
/// dependencies, separated from the chat loop itself.
async fn build_assistant(
    config: &AssistantConfig,
) -> Result<(Arc<MqttBridge>, ChatSession), Box<dyn std::error::Error>> {
    let log = SensorCsvLog::new(&config.sensor_log_path);
    log.ensure_initialized()?;
    info!("Sensor log ready at {}", log.path().display());

    let mut bridge = MqttBridge::new(config, log);
    bridge.connect().await?;
    info!("Connected to MQTT broker at {}", config.broker);
    let bridge = Arc::new(bridge);

    let provider = OllamaProvider::from_settings(&config.llm)?;
    if let Err(e) = provider.health_check().await {
        warn!(
            "Ollama is not reachable at {}: {}. Chat turns will fail until it is up",
            config.llm.base_url, e
        );
    }

    let tools = ToolRegistry::with_builtins(
        Arc::clone(&bridge) as Arc<dyn DeviceBridge>,
        &config.search_api_key,
    )?;
    info!("Registered {} tools", tools.len());

    let session = ChatSession::new(Arc::new(provider), Arc::new(tools), &config.llm);
    Ok((bridge, session))
}

async fn run_chat(config: AssistantConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (bridge, mut session) = build_assistant(&config).await?;

    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    info!(session_id = %session.id(), "Chat session started");
    println!("Archi is ready. Type 'exit' to quit.");

    loop {
        print!("You: ");
        io::stdout().flush()?;

        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(input) => {
                        let input = input.trim();
                        if input.is_empty() {
                            continue;
                        }
                        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
                            println!("Goodbye!");
                            break;
                        }
                        match session.run_turn(input).await {
                            Ok(answer) => println!("{answer}"),
                            Err(e) => {
                                error!("Chat turn failed: {}", e);
                                println!("Error: {}", e.user_message());
                            }
                        }
                    }
                    None => {
                        // stdin closed
                        println!();
                        println!("Goodbye!");
                        break;
                    }
                }
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully...");
                println!();
                println!("Goodbye!");
                break;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully...");
                break;
            }
        }
    }

    if let Err(e) = bridge.disconnect().await {
        error!("Error during shutdown: {}", e);
        return Err(e.into());
    }

    Ok(())
}

fn handle_config_command(
    config: AssistantConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("Current configuration:");
        print!("{}", config.summary());
    }

    info!("Configuration validation complete");
    Ok(())
}
