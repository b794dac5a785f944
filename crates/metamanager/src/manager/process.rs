use super::MetaContext;
use crate::connectivity::ConnectivityState;
use crate::error::{MetaError, StoreOp};
use crate::modules::{
    is_local_runtime, CLOUD_CONTROLLER, CLOUD_FUNCTION, EDGED, EDGE_FUNCTION, HUB_GROUP,
    META_MANAGER,
};
use crate::resource::ResourceKey;
use edge_bus::{Content, Message, Operation};
use tracing::{debug, info, warn};

/// Content of an acknowledgement.
pub(crate) const OK: &str = "OK";

impl MetaContext {
    /// Handles one inbound message to completion.
    pub(crate) async fn process(&self, msg: Message) {
        let result = match msg.operation() {
            Operation::Insert => self.process_insert(&msg).await,
            Operation::Update => self.process_update(&msg).await,
            Operation::Delete => self.process_delete(&msg).await,
            Operation::Query => self.process_query(&msg).await,
            Operation::Sync => self.process_sync(&msg).await,
            Operation::FunctionAction | Operation::FunctionActionResult => {
                self.process_relay(&msg).await
            }
            Operation::Response | Operation::ResponseError => {
                self.process_response(msg);
                return;
            }
            Operation::NodeConnection => {
                self.process_node_connection(&msg);
                return;
            }
        };

        if let Err(e) = result {
            warn!(
                id = msg.id(),
                operation = %msg.operation(),
                resource = msg.resource(),
                source = msg.source(),
                error = %e,
                "Message failed"
            );
            self.reply(&msg, Operation::ResponseError, e.to_string()).await;
        }
    }

    async fn process_insert(&self, msg: &Message) -> Result<(), MetaError> {
        let key = ResourceKey::parse(msg.resource())?;
        let value = msg.content.to_canonical().map_err(MetaError::marshal)?;
        let row = key.as_str().to_string();
        self.with_store(StoreOp::Insert, move |store| store.upsert(&row, &value))
            .await?;
        debug!(resource = key.as_str(), source = msg.source(), "Inserted");

        // The node side sees the write as an Insert, the cloud side as an acknowledgement.
        if is_local_runtime(msg.source()) {
            self.reply(msg, Operation::Insert, msg.content.clone()).await;
            let ack = msg.reply(META_MANAGER, Operation::Response, OK);
            self.send_to_hub(ack).await;
        } else {
            self.forward(EDGED, msg).await;
            self.reply(msg, Operation::Response, OK).await;
        }
        Ok(())
    }

    async fn process_update(&self, msg: &Message) -> Result<(), MetaError> {
        let key = ResourceKey::parse(msg.resource())?;
        let value = msg.content.to_canonical().map_err(MetaError::marshal)?;
        let row = key.as_str().to_string();
        let current = self
            .with_store(StoreOp::Update, move |store| store.get(&row))
            .await?;
        if current.as_deref() == Some(value.as_str()) {
            debug!(resource = key.as_str(), "Update unchanged; skipped");
            self.reply(msg, Operation::Response, OK).await;
            return Ok(());
        }

        let row = key.as_str().to_string();
        self.with_store(StoreOp::Update, move |store| store.upsert(&row, &value))
            .await?;
        debug!(resource = key.as_str(), source = msg.source(), "Updated");
        self.reply(msg, Operation::Response, OK).await;

        match msg.source() {
            EDGED | EDGE_FUNCTION => self.send_to_hub(forwarded(msg)).await,
            CLOUD_CONTROLLER => self.forward(EDGED, msg).await,
            CLOUD_FUNCTION => self.forward(EDGE_FUNCTION, msg).await,
            _ => {}
        }
        Ok(())
    }

    async fn process_delete(&self, msg: &Message) -> Result<(), MetaError> {
        let key = ResourceKey::parse(msg.resource())?;
        let filter = key.filter();
        let removed = self
            .with_store(StoreOp::Delete, move |store| store.delete_by_filter(&filter))
            .await?;
        debug!(resource = key.as_str(), removed, "Deleted");
        self.reply(msg, Operation::Response, OK).await;

        if is_local_runtime(msg.source()) {
            self.send_to_hub(forwarded(msg)).await;
        } else {
            self.forward(EDGED, msg).await;
        }
        Ok(())
    }

    fn process_response(&self, msg: Message) {
        if let Err(late) = self.pending.resolve(msg) {
            debug!(
                id = late.id(),
                parent_id = late.parent_id(),
                "Response has no pending call; dropped"
            );
        }
    }

    fn process_node_connection(&self, msg: &Message) {
        match ConnectivityState::from_content(&msg.content) {
            Some(state) => {
                if self.connectivity.state() != state {
                    info!(%state, "Cloud connectivity changed");
                }
                self.connectivity.set(state);
            }
            None => warn!(content = ?msg.content, "Unknown node connection state; ignored"),
        }
    }

    /// Replies to `request`.
    ///
    /// A synchronous request is answered through its waiter. Otherwise, and when nobody
    /// waits any more, the reply goes to a local runtime source directly and to the hub
    /// group for everyone else.
    pub(crate) async fn reply(
        &self,
        request: &Message,
        operation: Operation,
        content: impl Into<Content>,
    ) {
        let mut response = request.reply(META_MANAGER, operation, content);
        if request.is_sync() {
            match self.bus.send_resp(response) {
                Ok(()) => return,
                Err(unclaimed) => response = unclaimed,
            }
        }
        if is_local_runtime(request.source()) {
            self.forward_owned(request.source(), response).await;
        } else {
            self.send_to_hub(response).await;
        }
    }

    pub(crate) async fn send_to_hub(&self, msg: Message) {
        if let Err(e) = self.bus.send_to_group(HUB_GROUP, msg).await {
            warn!(error = %e, "Message to hub not delivered");
        }
    }

    async fn forward(&self, module: &str, msg: &Message) {
        self.forward_owned(module, forwarded(msg)).await;
    }

    async fn forward_owned(&self, module: &str, msg: Message) {
        if let Err(e) = self.bus.send(module, msg).await {
            warn!(module, error = %e, "Message not delivered");
        }
    }
}

/// Copy of `msg` for another module. Only the original sender waits for a response.
pub(crate) fn forwarded(msg: &Message) -> Message {
    msg.clone().with_sync(false)
}
