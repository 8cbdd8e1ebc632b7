use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use geomcp::{chat, constants, web_server, GeminiClient, ModelGateway, Settings};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Gemini API key.
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini model name.
    #[arg(long, global = true, default_value_t = constants::GEMINI_MODEL.clone())]
    model: String,

    /// Base URL of the Gemini REST API.
    #[arg(long, global = true, default_value_t = constants::GEMINI_API_BASE.clone())]
    api_base: String,

    /// Give up on a model reply after this many seconds (0 waits forever).
    #[arg(long, global = true, env = "GEOMCP_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

// Define the available subcommands
#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Serve the chat page and its WebSocket.
    Serve {
        #[arg(long, default_value_t = 9900, help = "Port for the web server.")]
        port: u16,
        #[arg(long, default_value = "templates", help = "Directory holding index.html.")]
        templates: PathBuf,
        #[arg(long, default_value = "static", help = "Directory served under /static.")]
        static_dir: PathBuf,
    },
    /// Chat with the assistant in the terminal.
    Chat,
}

// The main entry point of the application, using tokio's async runtime
#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for GEMINI_API_KEY)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG environment variable (e.g., RUST_LOG=info,geomcp=debug)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("GeoMCP starting with command: {:?}", cli.command);

    let settings = Settings::resolve(cli.api_key, &cli.model, &cli.api_base, cli.timeout_secs)
        .context("Invalid configuration")?;
    info!(?settings, "Resolved settings");

    let client = GeminiClient::new(settings).context("Failed to build Gemini client")?;
    let gateway = Arc::new(ModelGateway::new(client));
    gateway
        .initialize(constants::SYSTEM_PROMPT)
        .context("Failed to initialize model gateway")?;

    match cli.command {
        Commands::Serve {
            port,
            templates,
            static_dir,
        } => {
            let options = web_server::WebServerOptions {
                port,
                templates_dir: templates,
                static_dir,
            };
            let mut web_server_handle =
                tokio::spawn(async move { web_server::start_web_server(options, gateway).await });

            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Ctrl-C received, shutting down...");
                    web_server_handle.abort();
                }
                res = &mut web_server_handle => {
                    match res {
                        Ok(Ok(())) => info!("Web server task completed unexpectedly."),
                        Ok(Err(e)) => {
                            error!("Web server failed: {:?}", e);
                            return Err(e);
                        }
                        Err(e) if e.is_panic() => error!("Web server task panicked: {:?}", e),
                        Err(e) => error!("Web server task failed: {:?}", e),
                    }
                }
            }
            info!("Shutdown complete.");
        }
        Commands::Chat => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            chat::run_chat(gateway, stdin, tokio::io::stdout())
                .await
                .context("Chat session failed")?;
        }
    }

    Ok(())
}
