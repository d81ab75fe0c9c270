//! transport-router CLI
//!
//! Inspect how requests are routed and send them through the router.
//!
//! ```text
//! transport-router [--config router.toml] [--no-env] mounts
//! transport-router [--config router.toml] resolve https://example.com
//! transport-router [--config router.toml] get https://example.com --watch
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use url::Url;

use transport_router::config::loader::load_config;
use transport_router::config::watcher::ConfigWatcher;
use transport_router::observability::logging::init_logging;
use transport_router::{ProxyEnv, Request, Router, RouterConfig, SharedRouter};

#[derive(Parser)]
#[command(name = "transport-router")]
#[command(about = "Route HTTP requests to transports by scheme, host and port", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ignore HTTP_PROXY, HTTPS_PROXY, ALL_PROXY and NO_PROXY.
    #[arg(long)]
    no_env: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List mounts in resolution order
    Mounts,
    /// Show which mount and transport a URL resolves to
    Resolve { url: Url },
    /// Send a GET request through the router and print the response
    Get {
        url: Url,
        /// Keep the router in sync with the config file and repeat the request on Enter
        #[arg(long)]
        watch: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RouterConfig::default(),
    };
    if cli.no_env {
        config.trust_env = false;
    }

    init_logging(&config.observability)?;

    // Snapshot even when `trust_env` is off: a reloaded config may turn it on.
    let env = if cli.no_env { ProxyEnv::default() } else { ProxyEnv::from_env() };
    tracing::debug!(
        trust_env = config.trust_env,
        env_proxies = !env.is_empty(),
        mounts = config.mounts.len(),
        "Configuration loaded"
    );

    let router = Router::from_config(&config, &env)?;

    match cli.command {
        Commands::Mounts => {
            let mounts: Vec<_> = router
                .mounts()
                .entries()
                .iter()
                .map(|entry| {
                    json!({
                        "pattern": entry.pattern().as_str(),
                        "transport": entry.transport().map(|t| t.name()).unwrap_or("bypass"),
                    })
                })
                .collect();
            let default = router.default_transport().map(|t| t.name());
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "mounts": mounts, "default": default }))?
            );
        }
        Commands::Resolve { url } => {
            println!("{}", serde_json::to_string_pretty(&router.explain(&url))?);
        }
        Commands::Get { url, watch: false } => {
            fetch(&router, &url).await?;
            router.close().await;
        }
        Commands::Get { url, watch: true } => {
            let Some(path) = cli.config.as_deref() else {
                return Err("--watch requires --config".into());
            };
            let shared = Arc::new(SharedRouter::new(router));
            let (watcher, updates) = ConfigWatcher::new(path);
            let _handle = watcher.run()?;

            let reloader = shared.clone();
            tokio::spawn(async move { reloader.apply_updates(updates, env).await });

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                if let Err(e) = fetch(&shared.load(), &url).await {
                    eprintln!("Error: {e}");
                }
                eprintln!("-- press Enter to repeat, Ctrl-D to quit");
                if lines.next_line().await?.is_none() {
                    break;
                }
            }
            shared.load().close().await;
        }
    }

    Ok(())
}

async fn fetch(router: &Router, url: &Url) -> Result<(), Box<dyn std::error::Error>> {
    let response = router.dispatch(Request::get(url.as_str())?).await?;
    let status = response.status();
    eprintln!("{status}");
    for (name, value) in &response.headers {
        eprintln!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
    }
    println!("{}", response.text().await?);
    Ok(())
}
