//! # Local Runtime Clients
//!
//! Typed access to the metadata engine for modules running on the node. A client sends
//! messages to `metamanager` on the caller's behalf and decodes the replies, so the
//! workload manager reads and writes pods without building messages itself.
//!
//! ```rust,no_run
//! use edge_bus::MessageBus;
//! use metamanager::clients::MetaClient;
//! use serde_json::json;
//! use std::time::Duration;
//!
//! # async fn usage(bus: MessageBus) -> Result<(), metamanager::clients::ClientError> {
//! let client = MetaClient::new(bus, "edged", Duration::from_secs(10));
//! client.pods("default").create("web", json!({"spec": {}})).await?;
//! let pod = client.pods("default").get("web").await?;
//! # Ok(())
//! # }
//! ```

mod pod;
mod pod_status;

pub use pod::{DeleteOptions, PodsClient, POD};
pub use pod_status::{PodStatusClient, POD_STATUS};

use crate::modules::{META_GROUP, META_MANAGER};
use async_trait::async_trait;
use edge_bus::{Content, Message, MessageBus, Operation};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Communication error: {0}")]
    Communication(String),

    /// The engine answered with an error reply.
    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

/// Message-level access to the engine, shared by the resource clients.
#[async_trait]
pub trait MetaAccess: Send + Sync {
    fn bus(&self) -> &MessageBus;

    /// Module name stamped on outgoing messages.
    fn source(&self) -> &str;

    /// Deadline of a synchronous request.
    fn timeout(&self) -> Duration;

    /// Fire-and-forget request.
    #[tracing::instrument(skip(self, content), fields(source = self.source()))]
    async fn send(
        &self,
        resource: String,
        operation: Operation,
        content: Content,
    ) -> Result<(), ClientError> {
        tracing::debug!("Sending request");
        let msg = Message::new(self.source(), META_GROUP, resource, operation).fill_body(content);
        self.bus()
            .send(META_MANAGER, msg)
            .await
            .map_err(|e| ClientError::Communication(e.to_string()))
    }

    /// Request that waits for the engine's reply. Error replies become [`ClientError::Rejected`].
    #[tracing::instrument(skip(self, content), fields(source = self.source()))]
    async fn send_sync(
        &self,
        resource: String,
        operation: Operation,
        content: Content,
    ) -> Result<Message, ClientError> {
        tracing::debug!("Sending request");
        let msg = Message::new(self.source(), META_GROUP, resource, operation).fill_body(content);
        let reply = self
            .bus()
            .send_sync(META_MANAGER, msg, self.timeout())
            .await
            .map_err(|e| ClientError::Communication(e.to_string()))?;
        if reply.operation() == Operation::ResponseError {
            let reason = reply
                .content
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| format!("{:?}", reply.content));
            return Err(ClientError::Rejected(reason));
        }
        Ok(reply)
    }
}

/// Entry point for a local runtime module.
#[derive(Clone)]
pub struct MetaClient {
    bus: MessageBus,
    source: String,
    timeout: Duration,
}

impl MetaClient {
    pub fn new(bus: MessageBus, source: impl Into<String>, timeout: Duration) -> Self {
        Self {
            bus,
            source: source.into(),
            timeout,
        }
    }

    pub fn pods(&self, namespace: impl Into<String>) -> PodsClient {
        PodsClient::new(self.clone(), namespace.into())
    }

    pub fn pod_status(&self, namespace: impl Into<String>) -> PodStatusClient {
        PodStatusClient::new(self.clone(), namespace.into())
    }
}

impl MetaAccess for MetaClient {
    fn bus(&self) -> &MessageBus {
        &self.bus
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Extracts a single object from a query reply.
///
/// Cache answers are arrays of stored values; an upstream answer is the object itself.
pub(crate) fn single_object(reply: &Message) -> Result<Option<Value>, ClientError> {
    let value = reply
        .content
        .to_value()
        .map_err(|e| ClientError::Decode(e.to_string()))?;
    match value {
        Value::Null => Ok(None),
        Value::Array(mut items) => match items.len() {
            0 => Ok(None),
            1 => Ok(items.pop()),
            n => Err(ClientError::Decode(format!(
                "expected one object for {}, got {n}",
                reply.resource()
            ))),
        },
        object => Ok(Some(object)),
    }
}
