//! Netsim Visualization Server
//!
//! Serve the interactive simulator, optionally preloaded from a snapshot file.

use netsim_topology::Snapshot;
use netsim_vis::{Simulator, VisConfig, VisServer};
use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "netsim_vis=info,netsim_topology=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = VisConfig::from_env()?;
    tracing::info!("Starting netsim-vis with {:?}", config);

    let mut simulator = Simulator::new(&config);

    // Optional snapshot to start from
    if let Some(path) = env::args().nth(1) {
        let json = tokio::fs::read_to_string(&path).await?;
        let report = simulator.import_snapshot(Snapshot::from_json(&json)?);
        tracing::info!(
            "Loaded {}: {} devices, {} connections",
            path,
            report.devices,
            report.connections
        );
    }

    let server = VisServer::new(simulator, &config);
    server.start_animation().await;
    server.serve(config.port).await?;

    Ok(())
}
