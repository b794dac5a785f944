use super::{single_object, ClientError, MetaAccess, MetaClient};
use edge_bus::{Content, Operation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

/// Resource type of pod records.
pub const POD: &str = "Pod";

/// Options carried by a pod deletion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grace_period_seconds: Option<i64>,
}

/// Pods of one namespace.
#[derive(Clone)]
pub struct PodsClient {
    meta: MetaClient,
    namespace: String,
}

impl PodsClient {
    pub(super) fn new(meta: MetaClient, namespace: String) -> Self {
        Self { meta, namespace }
    }

    fn resource(&self, name: &str) -> String {
        format!("{}/{POD}/{name}", self.namespace)
    }

    #[instrument(skip(self, pod), fields(namespace = %self.namespace))]
    pub async fn create(&self, name: &str, pod: Value) -> Result<(), ClientError> {
        self.meta
            .send_sync(self.resource(name), Operation::Insert, pod.into())
            .await?;
        Ok(())
    }

    #[instrument(skip(self, pod), fields(namespace = %self.namespace))]
    pub async fn update(&self, name: &str, pod: Value) -> Result<(), ClientError> {
        self.meta
            .send_sync(self.resource(name), Operation::Update, pod.into())
            .await?;
        Ok(())
    }

    /// Requests the deletion without waiting for the engine.
    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn delete(&self, name: &str, options: DeleteOptions) -> Result<(), ClientError> {
        let content = serde_json::to_value(&options)
            .map(Content::Json)
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        self.meta
            .send(self.resource(name), Operation::Delete, content)
            .await
    }

    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn get(&self, name: &str) -> Result<Option<Value>, ClientError> {
        let reply = self
            .meta
            .send_sync(self.resource(name), Operation::Query, Content::Empty)
            .await?;
        let pod = single_object(&reply)?;
        debug!(found = pod.is_some(), "Pod fetched");
        Ok(pod)
    }
}
