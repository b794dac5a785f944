//! # System Lifecycle
//!
//! [`MetaSystem`] wires a node's bus to the metadata engine: it creates the bus, registers
//! the engine, injects the store and hands out the client the workload manager uses.
//!
//! ## Graceful Shutdown
//!
//! 1. **Remove the engine from the bus** - the registry drops the queue's sender
//! 2. **The engine detects closure** - `recv()` returns `None` once queued messages drain
//! 3. **Await completion** - the actor task ends after stopping its sync ticker
//!
//! Handlers already in flight finish on their own tasks.

use crate::clients::MetaClient;
use crate::config::Config;
use crate::connectivity::Connectivity;
use crate::manager::MetaManager;
use crate::modules::{EDGED, META_MANAGER};
use crate::store::MetaStore;
use edge_bus::MessageBus;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// Time the client waits beyond the engine's upstream deadline.
const CLIENT_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

/// A running metadata engine and the bus it is registered on.
pub struct MetaSystem {
    pub bus: MessageBus,
    /// Client acting as the on-node workload manager.
    pub edged: MetaClient,
    connectivity: Connectivity,
    handle: JoinHandle<()>,
}

impl MetaSystem {
    pub fn new(config: Config, store: Arc<dyn MetaStore>) -> Self {
        let bus = MessageBus::new(config.buffer_size);
        let client_timeout = config.remote_query_timeout + CLIENT_TIMEOUT_MARGIN;
        let edged = MetaClient::new(bus.clone(), EDGED, client_timeout);

        let manager = MetaManager::new(&bus, config);
        let connectivity = manager.connectivity();
        let handle = tokio::spawn(manager.run(store));
        info!("Metadata system started");

        Self {
            bus,
            edged,
            connectivity,
            handle,
        }
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity.clone()
    }

    pub async fn shutdown(self) -> Result<(), String> {
        self.bus.remove_module(META_MANAGER);
        self.handle.await.map_err(|e| e.to_string())?;
        info!("Metadata system stopped");
        Ok(())
    }
}
