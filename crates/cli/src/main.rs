use clap::{Parser, Subcommand};
use lib::upstream::HttpUpstream;
use lib::{InboundEvent, RequestForwarder};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

#[derive(Parser)]
#[command(name = "askrelay")]
#[command(about = "Voice skill webhook adapter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the webhook host (POST / with a skill event, GET / for health).
    Serve {
        /// Config file path (default: ASKRELAY_CONFIG_PATH or ~/.askrelay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default from config or 15152)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Handle a single event and print `{"error", "result"}` to stdout. Exits 1 if the invocation fails.
    Invoke {
        /// Config file path (default: ASKRELAY_CONFIG_PATH or ~/.askrelay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Event JSON file (default: read from stdin)
        #[arg(long, short, value_name = "PATH")]
        event: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("askrelay {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("serve failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Invoke { config, event }) => {
            if let Err(e) = run_invoke(config, event).await {
                log::error!("invoke failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_serve(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.server.port = p;
    }
    log::info!(
        "starting host on {}:{} (config {})",
        config.server.bind,
        config.server.port,
        path.display()
    );
    lib::host::run_server(config).await
}

async fn run_invoke(config_path: Option<PathBuf>, event_path: Option<PathBuf>) -> anyhow::Result<()> {
    use anyhow::Context;

    let (config, _) = lib::config::load_config(config_path)?;
    let raw = match event_path {
        Some(p) => tokio::fs::read(&p)
            .await
            .with_context(|| format!("reading event from {}", p.display()))?,
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .context("reading event from stdin")?;
            buf
        }
    };
    let event = InboundEvent::from_slice(&raw).context("parsing event")?;

    let forwarder = RequestForwarder::new(config.forwarder, Arc::new(HttpUpstream::new()));
    let completion = forwarder.handle(&event).await?;
    let out = match completion {
        Ok(result) => serde_json::json!({ "error": null, "result": result }),
        Err(e) => serde_json::json!({ "error": e.to_string(), "result": null }),
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
