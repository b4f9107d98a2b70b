use anyhow::Context;
use chunkferry::server::{CoordinatorConfig, CoordinatorServer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut config = CoordinatorConfig::default();
    if let Some(port) = std::env::args().nth(1) {
        let port: u16 = port.parse().context("port must be a number")?;
        config.bind_addr.set_port(port);
    }

    let server = CoordinatorServer::bind(config)
        .await
        .context("failed to bind coordinator listener")?;
    tracing::info!(addr = %server.local_addr()?, "starting coordinator");

    server.run().await?;
    Ok(())
}
