mod config;
mod donor;
mod server;

use clap::Parser;
use color_eyre::Result;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "donor-bridge")]
#[command(about = "Donor Management DB task bridge for the GTD API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/donor-bridge/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Listen address override, e.g. 127.0.0.1:8080
  #[arg(short, long)]
  listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;
  let listen = args.listen.unwrap_or_else(|| config.server.listen.clone());

  let client = donor::DonorClient::new(&config)?;
  let cache = donor::DonorCache::new(client).with_ttl(config.donor.cache_ttl());

  let state = server::AppState::new(cache, config::Config::get_local_api_key());
  let app = server::router(state);

  let addr: SocketAddr = listen.parse()?;
  info!("listening on http://{}", addr);

  axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  Ok(())
}

async fn shutdown_signal() {
  let _ = signal::ctrl_c().await;
  info!("shutdown requested");
}
