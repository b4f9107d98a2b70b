use anyhow::Context;
use chunkferry::server::{NodeConfig, NodeServer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut config = NodeConfig::default();
    let mut args = std::env::args().skip(1);
    if let Some(port) = args.next() {
        let port: u16 = port.parse().context("port must be a number")?;
        config.bind_addr.set_port(port);
    }
    if let Some(data_dir) = args.next() {
        config.data_dir = data_dir.into();
    }

    let server = NodeServer::bind(config)
        .await
        .context("failed to bind node listener")?;
    tracing::info!(
        node_id = %server.node_id(),
        addr = %server.local_addr()?,
        "starting storage node"
    );

    server.run().await?;
    Ok(())
}
