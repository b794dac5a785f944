//! # Metadata Engine Actor
//!
//! This module defines the [`MetaManager`], the bus module that owns the node's metadata
//! cache. It is the "Server" side: other modules never touch the store, they send messages
//! to `metamanager` and receive replies.
//!
//! ## Concurrency Model
//!
//! Unlike a sequential actor, the engine does not handle one message at a time. Every
//! message is processed in its own Tokio task, so a Query or Sync waiting on the cloud
//! never stalls Insert/Update/Delete traffic behind it. The state those tasks share is
//! concurrency-safe on its own:
//!
//! - the store (`Arc<dyn MetaStore>`), atomic per call and always called through
//!   [`MetaContext::with_store`], which moves backend I/O onto the blocking pool
//! - the [`Connectivity`] flag, an atomic
//! - the [`CorrelationTable`] of upstream round trips, a concurrent map
//!
//! ## Context Injection
//!
//! The store is passed to [`MetaManager::run`] rather than to the constructor, so the
//! engine can be registered on the bus before the backend is opened.
//!
//! ## Submodules
//!
//! - `process` - operation dispatcher and the Insert/Update/Delete handlers
//! - `query` - cache-or-upstream routing of Query
//! - `sync` - reconciliation of a resource class against the cloud
//! - `relay` - durable store-and-forward of function messages

mod process;
mod query;
mod relay;
mod sync;

use crate::config::Config;
use crate::connectivity::Connectivity;
use crate::error::{MetaError, StoreOp};
use crate::modules::{META_GROUP, META_MANAGER};
use crate::store::{MetaStore, StoreError};
use edge_bus::{CorrelationTable, Message, MessageBus, Operation};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Shared state of every in-flight message.
pub(crate) struct MetaContext {
    pub(crate) bus: MessageBus,
    pub(crate) store: Arc<dyn MetaStore>,
    pub(crate) connectivity: Connectivity,
    pub(crate) pending: CorrelationTable,
    pub(crate) config: Config,
}

impl MetaContext {
    /// Runs one store call on the blocking pool.
    ///
    /// Backend calls do synchronous disk I/O; running them inline would occupy a runtime
    /// worker for the length of a commit.
    pub(crate) async fn with_store<T, F>(&self, op: StoreOp, f: F) -> Result<T, MetaError>
    where
        F: FnOnce(&dyn MetaStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .unwrap_or_else(|e| Err(StoreError::Backend(format!("store task failed: {e}"))))
            .map_err(|e| MetaError::store(op, e))
    }
}

/// The metadata engine module.
pub struct MetaManager {
    receiver: mpsc::Receiver<Message>,
    bus: MessageBus,
    connectivity: Connectivity,
    config: Config,
}

impl MetaManager {
    /// Registers `metamanager` on `bus`. Messages queue up until [`MetaManager::run`] starts.
    pub fn new(bus: &MessageBus, config: Config) -> Self {
        let receiver = bus.add_module(META_MANAGER, META_GROUP);
        Self {
            receiver,
            bus: bus.clone(),
            connectivity: Connectivity::new(),
            config,
        }
    }

    /// Handle on the engine's connectivity flag.
    pub fn connectivity(&self) -> Connectivity {
        self.connectivity.clone()
    }

    /// Runs the engine until its queue closes.
    ///
    /// Before the first message, unacknowledged function messages left in the relay journal
    /// are forwarded again.
    pub async fn run(mut self, store: Arc<dyn MetaStore>) {
        info!(module = META_MANAGER, "Metadata engine started");
        let ctx = Arc::new(MetaContext {
            bus: self.bus.clone(),
            store,
            connectivity: self.connectivity.clone(),
            pending: CorrelationTable::new(),
            config: self.config.clone(),
        });

        ctx.replay_pending().await;
        let ticker = spawn_sync_ticker(&ctx);

        while let Some(msg) = self.receiver.recv().await {
            debug!(
                id = msg.id(),
                operation = %msg.operation(),
                resource = msg.resource(),
                source = msg.source(),
                "Received"
            );
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.process(msg).await });
        }

        if let Some(ticker) = ticker {
            ticker.abort();
        }
        info!(module = META_MANAGER, "Metadata engine stopped");
    }
}

/// Sends the engine a `Sync` for the configured resource every interval while connected.
fn spawn_sync_ticker(ctx: &Arc<MetaContext>) -> Option<JoinHandle<()>> {
    if !ctx.config.sync_enabled() {
        info!("Periodic sync disabled");
        return None;
    }
    let period = ctx.config.sync_interval;
    let ctx = ctx.clone();
    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            interval.tick().await;
            if !ctx.connectivity.is_connected() {
                debug!("Skipping periodic sync while disconnected");
                continue;
            }
            let msg = Message::new(
                META_MANAGER,
                META_GROUP,
                ctx.config.sync_resource.clone(),
                Operation::Sync,
            );
            if let Err(e) = ctx.bus.send(META_MANAGER, msg).await {
                warn!(error = %e, "Periodic sync not scheduled; stopping ticker");
                break;
            }
        }
    }))
}
