//! Error types for the metadata engine.

use crate::store::StoreError;
use edge_bus::BusError;
use std::fmt::Display;
use std::time::Duration;
use thiserror::Error;

/// The store call a [`MetaError::Store`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Insert,
    Update,
    Delete,
    Query,
}

impl Display for StoreOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StoreOp::Insert => "insert",
            StoreOp::Update => "update",
            StoreOp::Delete => "delete",
            StoreOp::Query => "query",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while handling a message.
///
/// None of them is fatal to the engine: each one ends the current message only.
#[derive(Debug, Error)]
pub enum MetaError {
    /// The resource path is malformed. Nothing was written or forwarded.
    #[error("invalid resource: {0}")]
    Validation(String),

    /// The content cannot be serialized or deserialized. The store was not touched.
    #[error("Error to marshal message content: {0}")]
    Marshal(String),

    /// The underlying persistence call failed.
    #[error("Error to {op} meta to DB: {source}")]
    Store {
        op: StoreOp,
        #[source]
        source: StoreError,
    },

    /// The destination module or group is not registered.
    #[error("routing error: {0}")]
    Routing(BusError),

    /// A synchronous round trip exceeded its deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl MetaError {
    pub fn store(op: StoreOp, source: StoreError) -> Self {
        MetaError::Store { op, source }
    }

    pub fn marshal(e: serde_json::Error) -> Self {
        MetaError::Marshal(e.to_string())
    }
}

impl From<BusError> for MetaError {
    fn from(e: BusError) -> Self {
        match e {
            BusError::Timeout(after) => MetaError::Timeout(after),
            other => MetaError::Routing(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_format() {
        let err = MetaError::store(
            StoreOp::Delete,
            StoreError::Backend("failed to operate DB".into()),
        );
        assert_eq!(err.to_string(), "Error to delete meta to DB: failed to operate DB");
    }

    #[test]
    fn test_bus_errors_split_into_routing_and_timeout() {
        let routing: MetaError = BusError::ModuleNotFound("websocket".into()).into();
        assert!(matches!(routing, MetaError::Routing(_)));
        assert!(routing.to_string().contains("websocket"));

        let timeout: MetaError = BusError::Timeout(Duration::from_secs(30)).into();
        assert!(matches!(timeout, MetaError::Timeout(_)));
    }
}
