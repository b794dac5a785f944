use edge_bus::tracing::setup_tracing;
use metamanager::store::RedbStore;
use metamanager::{Config, MetaSystem};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), String> {
    dotenv::dotenv().ok();
    setup_tracing();

    let config = Config::from_env();
    info!(db_path = %config.db_path.display(), "Starting metadata manager");

    let store = RedbStore::open(&config.db_path).map_err(|e| e.to_string())?;
    let system = MetaSystem::new(config, Arc::new(store));

    info!("Serving; press Ctrl-C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Cannot listen for Ctrl-C");
    }

    system.shutdown().await?;
    info!("Metadata manager stopped");
    Ok(())
}
