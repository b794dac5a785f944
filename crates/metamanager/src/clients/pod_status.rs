use super::{single_object, ClientError, MetaAccess, MetaClient};
use edge_bus::{Content, Operation};
use serde_json::Value;
use tracing::instrument;

/// Resource type of pod status records.
pub const POD_STATUS: &str = "PodStatus";

/// Pod statuses of one namespace.
#[derive(Clone)]
pub struct PodStatusClient {
    meta: MetaClient,
    namespace: String,
}

impl PodStatusClient {
    pub(super) fn new(meta: MetaClient, namespace: String) -> Self {
        Self { meta, namespace }
    }

    fn resource(&self, name: &str) -> String {
        format!("{}/{POD_STATUS}/{name}", self.namespace)
    }

    /// Stores the status and waits for the engine to acknowledge it.
    ///
    /// Returns [`ClientError::Rejected`] when the engine could not store it.
    #[instrument(skip(self, status), fields(namespace = %self.namespace))]
    pub async fn update(&self, name: &str, status: Value) -> Result<(), ClientError> {
        let reply = self
            .meta
            .send_sync(self.resource(name), Operation::Update, status.into())
            .await?;
        match reply.content.as_str() {
            Some("OK") => Ok(()),
            _ => Err(ClientError::Decode(format!(
                "unexpected acknowledgement {:?}",
                reply.content
            ))),
        }
    }

    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn get(&self, name: &str) -> Result<Option<Value>, ClientError> {
        let reply = self
            .meta
            .send_sync(self.resource(name), Operation::Query, Content::Empty)
            .await?;
        single_object(&reply)
    }
}
