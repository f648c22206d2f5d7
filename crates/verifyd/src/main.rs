mod app_state;
mod handlers;

use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;
use verify_core::Config;

/// Email deliverability verification daemon.
#[derive(Debug, Parser)]
#[command(about, version)]
struct Opt {
    /// Override the listen address (otherwise taken from LISTEN_ADDR).
    #[arg(long)]
    listen: Option<String>,
}

fn init_logging(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();
    let mut config = Config::from_env();
    if let Some(listen) = opt.listen {
        config.listen_addr = listen;
    }

    init_logging(&config.log_filter);
    tracing::info!(listen_addr = %config.listen_addr, "starting verifyd");

    let state = app_state::build(&config).await?;

    let app = Router::new()
        .route("/verify", post(handlers::verify))
        .route("/quota/{customer_id}/{domain}", get(handlers::quota_usage))
        .route("/reputation/{domain}", get(handlers::reputation_snapshot))
        .route("/health", get(handlers::health))
        .with_state(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "verifyd listening");
    axum::serve(listener, app).await?;

    Ok(())
}
