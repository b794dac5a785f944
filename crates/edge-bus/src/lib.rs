//! # Edge Bus
//!
//! This crate provides the in-process message bus that the modules of an edge node plug
//! into. Each module (the workload manager, the cloud hub connection, the metadata engine,
//! the function runtime) is an actor: it owns a bounded queue, receives [`Message`]s on it
//! and talks to other modules only by sending messages.
//!
//! ## Architecture Overview
//!
//! 1. **Envelope** ([`Message`]) - header, route and opaque [`Content`]; the route names an
//!    [`Operation`] from a closed enum.
//! 2. **Router** ([`MessageBus`]) - module registry with groups, point-to-point and group
//!    delivery, plus a synchronous request/response primitive.
//! 3. **Correlation** ([`CorrelationTable`]) - request id to waiting caller, with deadlines.
//!
//! ## Example
//!
//! ```rust
//! use edge_bus::{Message, MessageBus, Operation};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let bus = MessageBus::new(16);
//!     let mut inbox = bus.add_module("metamanager", "meta");
//!
//!     // Answer every request with OK
//!     let responder = bus.clone();
//!     tokio::spawn(async move {
//!         while let Some(request) = inbox.recv().await {
//!             let _ = responder.send_resp(request.reply("metamanager", Operation::Response, "OK"));
//!         }
//!     });
//!
//!     let update = Message::new("edged", "meta", "default/PodStatus/web", Operation::Update);
//!     let reply = bus
//!         .send_sync("metamanager", update, Duration::from_secs(1))
//!         .await
//!         .unwrap();
//!     assert_eq!(reply.content.as_str(), Some("OK"));
//! }
//! ```
//!
//! ## Concurrency Model
//!
//! - Each module runs in its own Tokio task and drains its own queue
//! - The registry and the correlation table are concurrent maps; senders never hold a map
//!   lock across an await
//! - A synchronous send suspends only its caller
//!
//! ## Testing
//!
//! The [`mock`] module provides [`MockModule`](mock::MockModule), a scripted module that
//! answers synchronous queries, for testing a module without its real peers.

pub mod bus;
pub mod correlation;
pub mod error;
pub mod message;
pub mod mock;
pub mod tracing;

// Re-export core types for convenience
pub use bus::MessageBus;
pub use correlation::{CorrelationTable, PendingCall};
pub use error::BusError;
pub use message::{Content, Message, MessageHeader, MessageRoute, Operation};
