use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tool_hub::{HubConfig, Server, ToolCallRequest, ToolRegistry};

#[derive(Parser)]
#[command(name = "tool-hub", version)]
#[command(about = "Agricultural, trade, culture and finance tools behind one dispatcher", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ./tool-hub.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every registered tool
    List {
        /// Print full descriptors as JSON
        #[arg(long)]
        json: bool,
    },
    /// Call one tool and print its result
    Call {
        /// Tool name, e.g. agricultural_weather_forecast
        name: String,

        /// Arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },
    /// Serve JSON-RPC on stdin/stdout
    Serve,
}

/// Logs go to stderr; stdout carries results and protocol frames.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = HubConfig::load(cli.config.as_deref())?;
    let registry =
        ToolRegistry::with_default_modules(&config).context("failed to register modules")?;

    match cli.command {
        Commands::List { json } => {
            let tools = registry.list_all_tools();
            if json {
                println!("{}", serde_json::to_string_pretty(&tools)?);
            } else {
                for tool in &tools {
                    println!("{:<32} {}", tool.name, tool.description);
                }
            }
        }
        Commands::Call { name, args } => {
            let arguments: Value =
                serde_json::from_str(&args).context("--args is not valid JSON")?;
            let result = registry
                .dispatch(&ToolCallRequest::new(name, arguments))
                .await;
            let text = result.text().unwrap_or_default();

            if result.is_error {
                error!("tool call failed");
                eprintln!("{}", text);
                std::process::exit(1);
            }
            println!("{}", text);
        }
        Commands::Serve => {
            info!(config = ?cli.config, "starting server");
            Server::new(Arc::new(registry)).serve_stdio().await?;
        }
    }

    Ok(())
}
