use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use viewer::{transport, Args};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Args::parse().into_config()?;
    info!(
        server = %config.server_url,
        keep_alive_secs = config.keep_alive.as_secs(),
        max_zoom = config.max_zoom,
        "starting viewer"
    );
    transport::run(config).await
}
