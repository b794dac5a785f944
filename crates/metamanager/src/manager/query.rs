use super::MetaContext;
use crate::error::{MetaError, StoreOp};
use crate::modules::{META_MANAGER, RESOURCE_GROUP};
use crate::resource::ResourceKey;
use crate::store::Meta;
use edge_bus::{BusError, Message, Operation};
use serde_json::Value;
use tracing::debug;

impl MetaContext {
    /// Answers a Query from the cache, or from the cloud for object paths while connected.
    pub(super) async fn process_query(&self, msg: &Message) -> Result<(), MetaError> {
        let key = ResourceKey::parse(msg.resource())?;

        if key.is_collection() {
            let filter = key.filter();
            let rows = self
                .with_store(StoreOp::Query, move |store| store.scan(&filter))
                .await?;
            debug!(resource = key.as_str(), rows = rows.len(), "Collection query");
            self.reply(msg, Operation::Response, rows_to_array(rows)).await;
            return Ok(());
        }

        if self.connectivity.is_connected() {
            let upstream = self.remote_query(key.as_str()).await?;
            debug!(resource = key.as_str(), operation = %upstream.operation(), "Upstream answered");
            self.reply(msg, upstream.operation(), upstream.content).await;
            return Ok(());
        }

        let row = key.as_str().to_string();
        let rows: Vec<Meta> = self
            .with_store(StoreOp::Query, move |store| store.get(&row))
            .await?
            .map(|value| Meta {
                key: key.as_str().to_string(),
                value,
            })
            .into_iter()
            .collect();
        debug!(resource = key.as_str(), found = !rows.is_empty(), "Cache query");
        self.reply(msg, Operation::Response, rows_to_array(rows)).await;
        Ok(())
    }

    /// Synchronous point query to the hub module.
    ///
    /// Fails with a routing error naming the hub when it is not registered, and with a
    /// timeout when no correlated response arrives before the configured deadline.
    pub(super) async fn remote_query(&self, resource: &str) -> Result<Message, MetaError> {
        let hub = &self.config.hub_module;
        if !self.bus.is_registered(hub) {
            return Err(MetaError::Routing(BusError::ModuleNotFound(hub.clone())));
        }
        let query =
            Message::new(META_MANAGER, RESOURCE_GROUP, resource, Operation::Query).with_sync(true);
        let call = self
            .pending
            .register(query.id(), self.config.remote_query_timeout);
        self.bus.send(hub, query).await?;
        Ok(call.wait().await?)
    }
}

/// Stored values as a JSON array, in key order.
fn rows_to_array(rows: Vec<Meta>) -> Value {
    Value::Array(rows.into_iter().map(|meta| decode_value(&meta.value)).collect())
}

fn decode_value(stored: &str) -> Value {
    serde_json::from_str(stored).unwrap_or_else(|_| Value::String(stored.to_string()))
}
