//! # Bus Messages
//!
//! This module defines the envelope exchanged between modules on the [`MessageBus`](crate::MessageBus).
//!
//! A [`Message`] has three parts:
//!
//! - **Header**: identity (`id`), correlation (`parent_id`), creation time and the `sync` flag.
//! - **Route**: who sent it (`source`), which group it travels through, the resource path it
//!   addresses and the [`Operation`] to perform.
//! - **Content**: an opaque payload. Modules that persist payloads turn it into its canonical
//!   text form with [`Content::to_canonical`].
//!
//! Operations are a closed enum so every consumer gets exhaustive matching at compile time.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Display;

/// The kind of work a message asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Insert,
    Update,
    Delete,
    Query,
    Response,
    /// A response whose content is an error description.
    ResponseError,
    NodeConnection,
    Sync,
    FunctionAction,
    FunctionActionResult,
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Query => "query",
            Operation::Response => "response",
            Operation::ResponseError => "response_error",
            Operation::NodeConnection => "node_connection",
            Operation::Sync => "sync",
            Operation::FunctionAction => "function_action",
            Operation::FunctionActionResult => "function_action_result",
        };
        f.write_str(name)
    }
}

/// Opaque message payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Content {
    #[default]
    Empty,
    /// A structured document.
    Json(Value),
    /// Bytes as they arrived from a transport. Only valid JSON documents can be canonicalized.
    Raw(Vec<u8>),
}

impl Content {
    /// Serializes the payload to its canonical text encoding.
    ///
    /// Two payloads with the same canonical text are considered identical, no matter how
    /// they were built.
    pub fn to_canonical(&self) -> Result<String, serde_json::Error> {
        match self {
            Content::Empty => serde_json::to_string(&Value::Null),
            Content::Json(value) => serde_json::to_string(value),
            Content::Raw(bytes) => {
                let value: Value = serde_json::from_slice(bytes)?;
                serde_json::to_string(&value)
            }
        }
    }

    /// Returns the payload as a JSON value, decoding raw bytes if needed.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            Content::Empty => Ok(Value::Null),
            Content::Json(value) => Ok(value.clone()),
            Content::Raw(bytes) => serde_json::from_slice(bytes),
        }
    }

    /// Returns the text of a string payload.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Content::Json(Value::String(text)) => Some(text),
            _ => None,
        }
    }

    /// `true` for an empty payload or a JSON `null`.
    pub fn is_empty(&self) -> bool {
        matches!(self, Content::Empty | Content::Json(Value::Null))
    }
}

impl From<Value> for Content {
    fn from(value: Value) -> Self {
        Content::Json(value)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Json(Value::String(text.to_string()))
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Json(Value::String(text))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageHeader {
    pub id: String,
    /// Id of the message this one answers; empty for fresh requests.
    pub parent_id: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// The sender is blocked waiting for a correlated response.
    pub sync: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRoute {
    pub source: String,
    pub group: String,
    pub resource: String,
    pub operation: Operation,
}

/// The unit of communication between modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub header: MessageHeader,
    pub router: MessageRoute,
    pub content: Content,
}

impl Message {
    /// Creates a fresh message with a new id and no parent.
    pub fn new(
        source: impl Into<String>,
        group: impl Into<String>,
        resource: impl Into<String>,
        operation: Operation,
    ) -> Self {
        Self {
            header: MessageHeader {
                id: uuid::Uuid::new_v4().to_string(),
                parent_id: String::new(),
                timestamp: chrono::Utc::now().timestamp_millis(),
                sync: false,
            },
            router: MessageRoute {
                source: source.into(),
                group: group.into(),
                resource: resource.into(),
                operation,
            },
            content: Content::Empty,
        }
    }

    pub fn fill_body(mut self, content: impl Into<Content>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_sync(mut self, sync: bool) -> Self {
        self.header.sync = sync;
        self
    }

    /// Builds a reply to this message.
    ///
    /// The reply keeps the resource and group, carries `source` as its sender and points
    /// back at this message through `parent_id`.
    pub fn reply(&self, source: &str, operation: Operation, content: impl Into<Content>) -> Self {
        let mut reply = Message::new(
            source,
            self.router.group.clone(),
            self.router.resource.clone(),
            operation,
        )
        .fill_body(content);
        reply.header.parent_id = self.header.id.clone();
        reply
    }

    pub fn id(&self) -> &str {
        &self.header.id
    }

    pub fn parent_id(&self) -> &str {
        &self.header.parent_id
    }

    pub fn source(&self) -> &str {
        &self.router.source
    }

    pub fn resource(&self) -> &str {
        &self.router.resource
    }

    pub fn operation(&self) -> Operation {
        self.router.operation
    }

    pub fn is_sync(&self) -> bool {
        self.header.sync
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_form_ignores_whitespace_of_raw_payloads() {
        let raw = Content::Raw(br#"{ "phase" :  "Running" }"#.to_vec());
        let json = Content::Json(json!({"phase": "Running"}));
        assert_eq!(raw.to_canonical().unwrap(), json.to_canonical().unwrap());
    }

    #[test]
    fn test_invalid_raw_payload_cannot_be_canonicalized() {
        let raw = Content::Raw(vec![0xff, 0xfe, 0x00]);
        assert!(raw.to_canonical().is_err());
    }

    #[test]
    fn test_reply_points_at_request() {
        let request = Message::new("edged", "meta", "ns/Pod/a", Operation::Query).with_sync(true);
        let reply = request.reply("metamanager", Operation::Response, "OK");

        assert_eq!(reply.parent_id(), request.id());
        assert_ne!(reply.id(), request.id());
        assert_eq!(reply.resource(), "ns/Pod/a");
        assert_eq!(reply.source(), "metamanager");
        assert_eq!(reply.content.as_str(), Some("OK"));
        assert!(!reply.is_sync());
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::FunctionActionResult.to_string(), "function_action_result");
        let encoded = serde_json::to_string(&Operation::NodeConnection).unwrap();
        assert_eq!(encoded, "\"node_connection\"");
    }
}
