//! Durable store-and-forward of function messages.
//!
//! A `FunctionAction` travels from the cloud to the node's function runtime and a
//! `FunctionActionResult` travels back to the hub. Before forwarding, the engine persists
//! the resource row and a journal entry holding the whole message under
//! `_relay/<message id>`. The journal entry is removed once the message has been handed to
//! its destination, so whatever is left in the journal at startup was never delivered and
//! is forwarded again.

use super::process::forwarded;
use super::MetaContext;
use crate::error::{MetaError, StoreOp};
use crate::modules::{EDGE_FUNCTION, HUB_GROUP};
use crate::resource::{KeyFilter, ResourceKey, JOURNAL_PREFIX};
use edge_bus::{BusError, Content, Message, Operation};
use tracing::{debug, info, warn};

fn journal_key(id: &str) -> String {
    format!("{JOURNAL_PREFIX}{id}")
}

impl MetaContext {
    pub(super) async fn process_relay(&self, msg: &Message) -> Result<(), MetaError> {
        let key = ResourceKey::parse(msg.resource())?;
        let value = msg.content.to_canonical().map_err(MetaError::marshal)?;

        let mut journalled = msg.clone();
        let document = serde_json::from_str(&value).map_err(MetaError::marshal)?;
        journalled.content = Content::Json(document);
        let entry = serde_json::to_string(&journalled).map_err(MetaError::marshal)?;
        let journal = journal_key(msg.id());

        let (row, journal_row) = (key.as_str().to_string(), journal.clone());
        self.with_store(StoreOp::Insert, move |store| {
            store.upsert(&row, &value)?;
            store.upsert(&journal_row, &entry)
        })
        .await?;

        self.relay(&journalled).await?;
        debug!(id = msg.id(), operation = %msg.operation(), "Relayed");
        self.discard_journal(&journal).await;
        Ok(())
    }

    /// Forwards every journalled message left over from a previous run.
    pub(super) async fn replay_pending(&self) {
        let scan = self.with_store(StoreOp::Query, |store| store.scan_by_prefix(JOURNAL_PREFIX));
        let entries = match scan.await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Relay journal not readable");
                return;
            }
        };
        if entries.is_empty() {
            return;
        }
        info!(count = entries.len(), "Replaying relay journal");

        for entry in entries {
            let msg: Message = match serde_json::from_str(&entry.value) {
                Ok(msg) => msg,
                Err(e) => {
                    warn!(key = %entry.key, error = %e, "Unreadable journal entry discarded");
                    self.discard_journal(&entry.key).await;
                    continue;
                }
            };
            match self.relay(&msg).await {
                Ok(()) => self.discard_journal(&entry.key).await,
                Err(e) => warn!(key = %entry.key, error = %e, "Replay not delivered; kept"),
            }
        }
    }

    async fn relay(&self, msg: &Message) -> Result<(), BusError> {
        match msg.operation() {
            Operation::FunctionActionResult => {
                self.bus.send_to_group(HUB_GROUP, forwarded(msg)).await
            }
            _ => self.bus.send(EDGE_FUNCTION, forwarded(msg)).await,
        }
    }

    async fn discard_journal(&self, key: &str) {
        let exact = KeyFilter::Exact(key.to_string());
        let discard = self.with_store(StoreOp::Delete, move |store| store.delete_by_filter(&exact));
        if let Err(e) = discard.await {
            warn!(key, error = %e, "Journal entry not removed");
        }
    }
}
