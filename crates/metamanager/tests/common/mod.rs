#![allow(dead_code)]

use edge_bus::mock::MockModule;
use edge_bus::{Content, Message, MessageBus, Operation};
use metamanager::connectivity::Connectivity;
use metamanager::modules::{
    EDGED, EDGED_GROUP, EDGE_FUNCTION, EDGE_HUB, FUNC_GROUP, HUB_GROUP, META_GROUP, META_MANAGER,
};
use metamanager::resource::KeyFilter;
use metamanager::store::{Meta, MetaStore, StoreError};
use metamanager::{Config, MetaManager};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const WAIT: Duration = Duration::from_secs(2);
pub const QUIET: Duration = Duration::from_millis(200);

pub fn test_config() -> Config {
    Config::default()
        .with_buffer_size(64)
        .with_remote_query_timeout(Duration::from_millis(500))
        .with_sync_interval(Duration::ZERO)
        .with_sync_resource("PodStatus")
        .with_hub_module(EDGE_HUB)
}

/// A running engine plus the node-side modules it talks to.
pub struct Node {
    pub bus: MessageBus,
    pub edged: mpsc::Receiver<Message>,
    pub edge_function: mpsc::Receiver<Message>,
    pub connectivity: Connectivity,
    pub handle: JoinHandle<()>,
}

pub fn start(store: Arc<dyn MetaStore>) -> Node {
    start_with(store, test_config())
}

pub fn start_with(store: Arc<dyn MetaStore>, config: Config) -> Node {
    let bus = MessageBus::new(64);
    let edged = bus.add_module(EDGED, EDGED_GROUP);
    let edge_function = bus.add_module(EDGE_FUNCTION, FUNC_GROUP);
    let manager = MetaManager::new(&bus, config);
    let connectivity = manager.connectivity();
    let handle = tokio::spawn(manager.run(store));
    Node {
        bus,
        edged,
        edge_function,
        connectivity,
        handle,
    }
}

impl Node {
    /// Registers a scripted hub answering upstream queries.
    pub fn hub(&self) -> MockModule {
        MockModule::spawn(&self.bus, EDGE_HUB, HUB_GROUP, META_MANAGER)
    }

    /// Announces the cloud link and waits until the engine has applied it.
    pub async fn set_connection(&self, state: &str) {
        let announcement =
            Message::new(EDGE_HUB, HUB_GROUP, "node/connection", Operation::NodeConnection)
                .fill_body(state);
        self.bus.send(META_MANAGER, announcement).await.unwrap();
        let want = state == "cloud_connected";
        tokio::time::timeout(WAIT, async {
            while self.connectivity.is_connected() != want {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("connectivity not applied");
    }

    pub async fn connect(&self) {
        self.set_connection("cloud_connected").await;
    }

    /// Synchronous request from `source`, as a local runtime module would send it.
    pub async fn request(
        &self,
        source: &str,
        resource: &str,
        operation: Operation,
        content: impl Into<Content>,
    ) -> Message {
        let msg = Message::new(source, META_GROUP, resource, operation).fill_body(content);
        self.bus
            .send_sync(META_MANAGER, msg, WAIT)
            .await
            .expect("no reply from the engine")
    }

    /// Fire-and-forget message, as the hub delivers cloud traffic.
    pub async fn deliver(&self, msg: Message) {
        self.bus.send(META_MANAGER, msg).await.unwrap();
    }
}

/// A store whose every call fails.
pub struct FailingStore;

fn failure() -> StoreError {
    StoreError::Backend("failed to operate DB".into())
}

impl MetaStore for FailingStore {
    fn upsert(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(failure())
    }

    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(failure())
    }

    fn delete_by_filter(&self, _filter: &KeyFilter) -> Result<usize, StoreError> {
        Err(failure())
    }

    fn scan_by_prefix(&self, _prefix: &str) -> Result<Vec<Meta>, StoreError> {
        Err(failure())
    }
}

/// Waits until `condition` holds, or panics after [`WAIT`].
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Text of an error reply.
pub fn error_text(reply: &Message) -> String {
    assert_eq!(reply.operation(), Operation::ResponseError, "not an error reply: {reply:?}");
    reply.content.as_str().unwrap_or_default().to_string()
}
