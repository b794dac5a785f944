//! Reconciliation of a cached resource class against the cloud.
//!
//! Every cached key of the class is re-queried upstream. Confirmed keys take the upstream
//! content, keys the cloud does not confirm are evicted, and the reply is the confirmed
//! snapshot. A key whose confirmation cannot be obtained at all, because the hub is gone or
//! the round trip timed out, counts as unconfirmed.

use super::MetaContext;
use crate::error::{MetaError, StoreOp};
use crate::modules::META_MANAGER;
use crate::resource::{KeyFilter, ResourceKey};
use crate::store::Meta;
use edge_bus::{Message, Operation};
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

enum Confirmation {
    Confirmed(Value),
    Stale,
    Corrupt,
}

impl MetaContext {
    pub(super) async fn process_sync(&self, msg: &Message) -> Result<(), MetaError> {
        let key = ResourceKey::parse(msg.resource())?;
        let filter = key.collection_filter();
        let cached = self
            .with_store(StoreOp::Query, move |store| store.scan(&filter))
            .await?;

        if cached.is_empty() {
            debug!(resource = key.as_str(), "Nothing to reconcile");
            self.reply_snapshot(msg, Vec::new()).await;
            return Ok(());
        }

        let confirmations = join_all(cached.iter().map(|meta| self.confirm(meta))).await;

        let mut snapshot = Vec::new();
        let (mut evicted, mut corrupt) = (0usize, 0usize);
        for (meta, confirmation) in cached.iter().zip(confirmations) {
            match confirmation {
                Confirmation::Confirmed(value) => snapshot.push(value),
                Confirmation::Stale => {
                    evicted += 1;
                    let exact = KeyFilter::Exact(meta.key.clone());
                    let evict = self
                        .with_store(StoreOp::Delete, move |store| store.delete_by_filter(&exact));
                    if let Err(e) = evict.await {
                        warn!(key = %meta.key, error = %e, "Stale entry not evicted");
                    }
                }
                Confirmation::Corrupt => corrupt += 1,
            }
        }

        info!(
            resource = key.as_str(),
            confirmed = snapshot.len(),
            evicted,
            corrupt,
            "Reconciled"
        );
        self.reply_snapshot(msg, snapshot).await;
        Ok(())
    }

    async fn confirm(&self, meta: &Meta) -> Confirmation {
        let upstream = match self.remote_query(&meta.key).await {
            Ok(upstream) => upstream,
            Err(e) => {
                debug!(key = %meta.key, error = %e, "Upstream confirmation failed");
                return Confirmation::Stale;
            }
        };
        if upstream.operation() != Operation::Response {
            debug!(key = %meta.key, operation = %upstream.operation(), "No upstream record");
            return Confirmation::Stale;
        }

        let decoded = upstream.content.to_canonical().and_then(|canonical| {
            serde_json::from_str::<Value>(&canonical).map(|value| (canonical, value))
        });
        let (canonical, value) = match decoded {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(key = %meta.key, error = %e, "Upstream content is corrupt; excluded");
                return Confirmation::Corrupt;
            }
        };
        // An empty body and a JSON `null` both mean the cloud holds no such object.
        if value.is_null() {
            debug!(key = %meta.key, "Upstream record is empty");
            return Confirmation::Stale;
        }

        if canonical != meta.value {
            let row = meta.key.clone();
            let refresh = self
                .with_store(StoreOp::Update, move |store| store.upsert(&row, &canonical));
            if let Err(e) = refresh.await {
                warn!(key = %meta.key, error = %e, "Confirmed entry not refreshed");
            }
        }
        Confirmation::Confirmed(value)
    }

    /// The snapshot always goes to the hub group, whoever asked.
    async fn reply_snapshot(&self, msg: &Message, snapshot: Vec<Value>) {
        let response = msg.reply(META_MANAGER, Operation::Response, Value::Array(snapshot));
        self.send_to_hub(response).await;
    }
}
