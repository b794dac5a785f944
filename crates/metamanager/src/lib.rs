//! # Metadata Manager
//!
//! The edge node's metadata engine. Workloads on a node that may lose its cloud link keep
//! running against a local, durable copy of cluster state, and the engine reconciles that
//! copy with the cloud whenever the link is up.
//!
//! ## Core Components
//!
//! - **[resource]**: resource paths and the store filters they select.
//! - **[store]**: the [`MetaStore`](store::MetaStore) trait with redb and in-memory backends.
//! - **[connectivity]**: the cloud connectivity flag.
//! - **[manager]**: the [`MetaManager`] bus module: dispatcher, query routing, sync and the
//!   function relay.
//! - **[clients]**: typed clients for modules on the node.
//! - **[lifecycle]**: [`MetaSystem`], which wires the engine to a bus and shuts it down.
//!
//! ## Message Flow
//!
//! | Operation | Store | Reply | Forwarded to |
//! |-----------|-------|-------|--------------|
//! | Insert | upsert | echoed `Insert` to the node side, `OK` to the hub | - |
//! | Update | upsert unless unchanged | `OK` | the other side, by source |
//! | Delete | delete by filter | `OK` | the other side |
//! | Query | scan or get, or none when fetched upstream | result array | hub, for connected object queries |
//! | Sync | scan, refresh, evict | snapshot to the hub | hub, one query per key |
//! | FunctionAction(Result) | upsert + journal | error only | function runtime (hub) |
//!
//! ## Testing
//!
//! [`MemoryStore`](store::MemoryStore) counts store calls and
//! [`edge_bus::mock::MockModule`] plays the hub, so every path runs without a network.

pub mod clients;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod lifecycle;
pub mod manager;
pub mod modules;
pub mod resource;
pub mod store;

pub use config::Config;
pub use error::{MetaError, StoreOp};
pub use lifecycle::MetaSystem;
pub use manager::MetaManager;
