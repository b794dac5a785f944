//! # Mock Modules & Testing Guide
//!
//! [`MockModule`] registers a scripted module on a real [`MessageBus`]. It is meant to stand
//! in for the hub/transport module when testing a module that issues synchronous upstream
//! queries, without any network.
//!
//! ## When to use a MockModule vs a plain receiver
//!
//! | Feature | MockModule | `bus.add_module` receiver |
//! |---------|------------|---------------------------|
//! | **Answers sync queries** | Yes, per-resource scripted replies | No |
//! | **Observes other traffic** | Yes, via `next_message` | Yes, via `recv` |
//! | **Error injection** | `return_err`, `no_reply` | Manual |
//! | **Use Case** | The upstream side of a round trip | Local modules that only receive |
//!
//! ## Scripting replies
//!
//! ```rust
//! use edge_bus::mock::MockModule;
//! use edge_bus::{Message, MessageBus, Operation};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let bus = MessageBus::new(16);
//!     let mut inbox = bus.add_module("metamanager", "meta");
//!
//!     let mut hub = MockModule::spawn(&bus, "websocket", "hub", "metamanager");
//!     hub.expect_query("ns/Pod/a").return_ok(json!({"phase": "Running"}));
//!
//!     let query = Message::new("metamanager", "resource", "ns/Pod/a", Operation::Query)
//!         .with_sync(true);
//!     bus.send("websocket", query.clone()).await.unwrap();
//!
//!     let reply = inbox.recv().await.unwrap();
//!     assert_eq!(reply.parent_id(), query.id());
//!     assert_eq!(reply.operation(), Operation::Response);
//!     hub.verify();
//! }
//! ```
//!
//! Expectations are matched by resource, in the order they were added for that resource, so
//! concurrent callers can query several resources in any order.
//!
//! ## Testing Failure Scenarios
//!
//! - `return_err("...")` answers with a [`Operation::ResponseError`].
//! - `no_reply()` swallows the query so the caller runs into its deadline.
//! - Not registering a mock at all makes routing fail with [`BusError::ModuleNotFound`](crate::BusError).

use crate::bus::MessageBus;
use crate::message::{Content, Message, Operation};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

enum Reply {
    Ok(Content),
    Err(String),
    Silent,
}

struct Expectation {
    resource: String,
    reply: Reply,
}

/// A scripted module with expectation tracking.
pub struct MockModule {
    name: String,
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    observed: mpsc::UnboundedReceiver<Message>,
    _handle: tokio::task::JoinHandle<()>,
}

impl MockModule {
    /// Registers `name` in `group` on `bus`. Scripted replies are sent to `reply_to`.
    pub fn spawn(bus: &MessageBus, name: &str, group: &str, reply_to: &str) -> Self {
        let mut receiver = bus.add_module(name, group);
        let expectations: Arc<Mutex<VecDeque<Expectation>>> = Arc::new(Mutex::new(VecDeque::new()));
        let (observed_tx, observed) = mpsc::unbounded_channel();

        let bus = bus.clone();
        let scripted = expectations.clone();
        let module = name.to_string();
        let reply_to = reply_to.to_string();
        let handle = tokio::spawn(async move {
            while let Some(msg) = receiver.recv().await {
                let expectation = if msg.operation() == Operation::Query && msg.is_sync() {
                    let mut exps = scripted.lock().unwrap();
                    let index = exps.iter().position(|exp| exp.resource == msg.resource());
                    index.and_then(|index| exps.remove(index))
                } else {
                    None
                };

                let Some(expectation) = expectation else {
                    let _ = observed_tx.send(msg);
                    continue;
                };
                let reply = match expectation.reply {
                    Reply::Ok(content) => msg.reply(&module, Operation::Response, content),
                    Reply::Err(text) => msg.reply(&module, Operation::ResponseError, text),
                    Reply::Silent => continue,
                };
                if let Err(e) = bus.send(&reply_to, reply).await {
                    warn!(module = %module, error = %e, "Mock reply not delivered");
                }
            }
        });

        Self {
            name: name.to_string(),
            expectations,
            observed,
            _handle: handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Expects a synchronous `Query` for `resource`.
    pub fn expect_query(&mut self, resource: impl Into<String>) -> QueryExpectationBuilder {
        QueryExpectationBuilder {
            resource: resource.into(),
            expectations: self.expectations.clone(),
        }
    }

    /// Next message that did not match an expectation, if one arrives within `timeout`.
    pub async fn next_message(&mut self, timeout: Duration) -> Option<Message> {
        tokio::time::timeout(timeout, self.observed.recv())
            .await
            .ok()
            .flatten()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            let resources: Vec<&str> = exps.iter().map(|exp| exp.resource.as_str()).collect();
            panic!("Not all expectations were met. Remaining: {resources:?}");
        }
    }
}

/// Builder for `query` expectations.
pub struct QueryExpectationBuilder {
    resource: String,
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
}

impl QueryExpectationBuilder {
    /// Answers with a `Response` carrying `content`.
    pub fn return_ok(self, content: impl Into<Content>) {
        self.push(Reply::Ok(content.into()));
    }

    /// Answers with a `ResponseError` carrying `text`.
    pub fn return_err(self, text: impl Into<String>) {
        self.push(Reply::Err(text.into()));
    }

    /// Consumes the query without answering.
    pub fn no_reply(self) {
        self.push(Reply::Silent);
    }

    fn push(self, reply: Reply) {
        let mut exps = self.expectations.lock().unwrap();
        exps.push_back(Expectation {
            resource: self.resource,
            reply,
        });
    }
}

// =============================================================================
// RECEIVER HELPERS
// =============================================================================

/// Waits up to `timeout` for the next message on a module queue.
pub async fn expect_message(
    receiver: &mut mpsc::Receiver<Message>,
    timeout: Duration,
) -> Option<Message> {
    tokio::time::timeout(timeout, receiver.recv())
        .await
        .ok()
        .flatten()
}

/// Waits for the next message and returns it only if it carries `operation`.
pub async fn expect_operation(
    receiver: &mut mpsc::Receiver<Message>,
    operation: Operation,
    timeout: Duration,
) -> Option<Message> {
    expect_message(receiver, timeout)
        .await
        .filter(|msg| msg.operation() == operation)
}

/// `true` when no message arrives within `timeout`.
pub async fn expect_silence(receiver: &mut mpsc::Receiver<Message>, timeout: Duration) -> bool {
    expect_message(receiver, timeout).await.is_none()
}
