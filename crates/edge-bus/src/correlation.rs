//! # Correlation Table
//!
//! Synchronous request/response over an asynchronous bus. A caller registers a
//! [`PendingCall`] under the id of the request it is about to send, sends the request, and
//! awaits the call. Whoever receives the matching response calls
//! [`CorrelationTable::resolve`], which hands the message to the waiting caller.
//!
//! Only the logical caller is suspended. The task that receives responses never blocks:
//! resolving is a map removal plus a oneshot send.
//!
//! Entries are discarded when the deadline passes or when the `PendingCall` is dropped, so a
//! late response finds nothing and is handed back to the resolver to drop.

use crate::error::BusError;
use crate::message::Message;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::debug;

/// Map from outstanding request id to the caller awaiting its response.
#[derive(Clone, Default)]
pub struct CorrelationTable {
    pending: Arc<DashMap<String, oneshot::Sender<Message>>>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a waiter for `request_id` with a deadline `timeout` from now.
    pub fn register(&self, request_id: impl Into<String>, timeout: Duration) -> PendingCall {
        let request_id = request_id.into();
        let (sender, receiver) = oneshot::channel();
        self.pending.insert(request_id.clone(), sender);
        PendingCall {
            request_id,
            receiver: Some(receiver),
            deadline: Instant::now() + timeout,
            timeout,
            table: self.clone(),
        }
    }

    /// Delivers `response` to the caller waiting on its `parent_id`.
    ///
    /// Returns the message back when nobody is waiting (late or duplicate response).
    pub fn resolve(&self, response: Message) -> Result<(), Message> {
        match self.pending.remove(response.parent_id()) {
            Some((_, waiter)) => waiter.send(response),
            None => Err(response),
        }
    }

    /// Drops the entry for `request_id`, if any.
    pub fn discard(&self, request_id: &str) {
        if self.pending.remove(request_id).is_some() {
            debug!(request_id, "Discarded pending call");
        }
    }

    pub fn contains(&self, request_id: &str) -> bool {
        self.pending.contains_key(request_id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// An outstanding synchronous round trip.
pub struct PendingCall {
    request_id: String,
    receiver: Option<oneshot::Receiver<Message>>,
    deadline: Instant,
    timeout: Duration,
    table: CorrelationTable,
}

impl PendingCall {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Waits for the correlated response until the deadline.
    pub async fn wait(mut self) -> Result<Message, BusError> {
        let Some(receiver) = self.receiver.take() else {
            return Err(BusError::Timeout(self.timeout));
        };
        match tokio::time::timeout_at(self.deadline, receiver).await {
            Ok(Ok(response)) => Ok(response),
            // The table entry was dropped without an answer; treat it like an expiry.
            Ok(Err(_)) => Err(BusError::Timeout(self.timeout)),
            Err(_) => {
                debug!(request_id = %self.request_id, "Pending call expired");
                Err(BusError::Timeout(self.timeout))
            }
        }
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        self.table.discard(&self.request_id);
    }
}
