mod common;

use common::{error_text, start, FailingStore, QUIET, WAIT};
use edge_bus::mock::{expect_message, expect_silence};
use edge_bus::{Content, Message, Operation};
use metamanager::modules::{
    CLOUD_CONTROLLER, CLOUD_FUNCTION, EDGED, EDGE_FUNCTION, EDGE_HUB, HUB_GROUP, META_GROUP,
    META_MANAGER,
};
use metamanager::store::{MemoryStore, MetaStore};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_insert_then_disconnected_query_returns_value() {
    let store = Arc::new(MemoryStore::new());
    let node = start(store.clone());
    let mut hub = node.hub();

    let insert = node
        .request(EDGED, "ns/Pod/a", Operation::Insert, json!({"phase": "Running"}))
        .await;
    assert_eq!(insert.operation(), Operation::Insert);
    assert_eq!(insert.content, Content::Json(json!({"phase": "Running"})));

    // The cloud side observes the edge-originated write.
    let ack = hub.next_message(WAIT).await.unwrap();
    assert_eq!(ack.operation(), Operation::Response);
    assert_eq!(ack.content.as_str(), Some("OK"));

    let query = node
        .request(EDGED, "ns/Pod/a", Operation::Query, Content::Empty)
        .await;
    assert_eq!(query.operation(), Operation::Response);
    assert_eq!(query.content, Content::Json(json!([{"phase": "Running"}])));
    assert_eq!(store.get("ns/Pod/a").unwrap().as_deref(), Some(r#"{"phase":"Running"}"#));
}

#[tokio::test]
async fn test_identical_update_skips_write_and_forward() {
    let store = Arc::new(MemoryStore::new());
    let node = start(store.clone());
    let mut hub = node.hub();

    let first = node
        .request(EDGED, "ns/PodStatus/a", Operation::Update, json!({"phase": "Running"}))
        .await;
    assert_eq!(first.content.as_str(), Some("OK"));
    let forwarded = hub.next_message(WAIT).await.unwrap();
    assert_eq!(forwarded.operation(), Operation::Update);
    assert_eq!(forwarded.source(), EDGED);
    let writes = store.write_count();

    // Same document, built differently.
    let again = node
        .request(
            EDGED,
            "ns/PodStatus/a",
            Operation::Update,
            Content::Raw(br#"{ "phase" : "Running" }"#.to_vec()),
        )
        .await;
    assert_eq!(again.operation(), Operation::Response);
    assert_eq!(again.content.as_str(), Some("OK"));
    assert_eq!(store.write_count(), writes);
    assert!(hub.next_message(QUIET).await.is_none());
}

#[tokio::test]
async fn test_connected_query_without_hub_fails_with_routing_error() {
    let node = start(Arc::new(FailingStore));
    node.connect().await;

    let reply = node
        .request(EDGED, "ns/Pod/missing", Operation::Query, Content::Empty)
        .await;
    let text = error_text(&reply);
    assert!(text.contains(EDGE_HUB), "{text}");
    assert!(!text.contains("meta to DB"), "store was touched: {text}");
}

#[tokio::test]
async fn test_connected_query_is_answered_upstream_without_caching() {
    let store = Arc::new(MemoryStore::new());
    store.upsert("ns/Pod/a", r#"{"phase":"Pending"}"#).unwrap();
    let node = start(store.clone());
    let mut hub = node.hub();
    hub.expect_query("ns/Pod/a").return_ok(json!({"phase": "Running"}));
    hub.expect_query("ns/Pod/gone").return_err("pods \"gone\" not found");
    node.connect().await;

    let reply = node
        .request(EDGED, "ns/Pod/a", Operation::Query, Content::Empty)
        .await;
    assert_eq!(reply.operation(), Operation::Response);
    assert_eq!(reply.content, Content::Json(json!({"phase": "Running"})));
    assert_eq!(store.get("ns/Pod/a").unwrap().as_deref(), Some(r#"{"phase":"Pending"}"#));

    let missing = node
        .request(EDGED, "ns/Pod/gone", Operation::Query, Content::Empty)
        .await;
    assert!(error_text(&missing).contains("not found"));
    hub.verify();
}

#[tokio::test]
async fn test_connected_query_times_out() {
    let node = start(Arc::new(MemoryStore::new()));
    let mut hub = node.hub();
    hub.expect_query("ns/Pod/slow").no_reply();
    node.connect().await;

    let reply = node
        .request(EDGED, "ns/Pod/slow", Operation::Query, Content::Empty)
        .await;
    assert!(error_text(&reply).contains("timed out"));
    hub.verify();
}

#[tokio::test]
async fn test_blocked_upstream_query_does_not_stall_writes() {
    let store = Arc::new(MemoryStore::new());
    let node = start(store.clone());
    let mut hub = node.hub();
    hub.expect_query("ns/Pod/slow").no_reply();
    node.connect().await;

    let bus = node.bus.clone();
    let query = Message::new(EDGED, META_GROUP, "ns/Pod/slow", Operation::Query);
    let pending = tokio::spawn(async move { bus.send_sync(META_MANAGER, query, WAIT).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let insert = tokio::time::timeout(
        QUIET,
        node.request(EDGED, "ns/Pod/a", Operation::Insert, json!({"n": 1})),
    )
    .await
    .expect("insert queued behind the upstream query");
    assert_eq!(insert.operation(), Operation::Insert);
    assert!(store.get("ns/Pod/a").unwrap().is_some());
    assert!(!pending.is_finished());

    let reply = pending.await.unwrap().unwrap();
    assert!(error_text(&reply).contains("timed out"));
    hub.verify();
}

#[tokio::test]
async fn test_collection_query_never_goes_upstream() {
    let store = Arc::new(MemoryStore::new());
    store.upsert("ns/Pod/a", r#"{"n":1}"#).unwrap();
    store.upsert("ns/Pod/b", r#"{"n":2}"#).unwrap();
    store.upsert("ns/PodStatus/a", r#"{"n":3}"#).unwrap();
    let node = start(store);
    let mut hub = node.hub();
    node.connect().await;

    let reply = node
        .request(EDGED, "ns/Pod", Operation::Query, Content::Empty)
        .await;
    assert_eq!(reply.content, Content::Json(json!([{"n": 1}, {"n": 2}])));

    let bare = node
        .request(EDGED, "PodStatus", Operation::Query, Content::Empty)
        .await;
    assert_eq!(bare.content, Content::Json(json!([{"n": 3}])));

    assert!(hub.next_message(QUIET).await.is_none());
}

#[tokio::test]
async fn test_delete_of_missing_key_is_ok_and_key_stays_absent() {
    let store = Arc::new(MemoryStore::new());
    let node = start(store.clone());
    let mut hub = node.hub();

    let reply = node
        .request(EDGED, "ns/Pod/ghost", Operation::Delete, Content::Empty)
        .await;
    assert_eq!(reply.content.as_str(), Some("OK"));

    let forwarded = hub.next_message(WAIT).await.unwrap();
    assert_eq!(forwarded.operation(), Operation::Delete);

    let query = node
        .request(EDGED, "ns/Pod/ghost", Operation::Query, Content::Empty)
        .await;
    assert_eq!(query.content, Content::Json(json!([])));
}

#[tokio::test]
async fn test_cloud_delete_is_forwarded_to_edged() {
    let store = Arc::new(MemoryStore::new());
    store.upsert("ns/Pod/a", "{}").unwrap();
    store.upsert("ns/Pod/b", "{}").unwrap();
    let mut node = start(store.clone());
    let mut hub = node.hub();

    let delete = Message::new(CLOUD_CONTROLLER, "resource", "ns/Pod", Operation::Delete);
    node.deliver(delete.clone()).await;

    let forwarded = expect_message(&mut node.edged, WAIT).await.unwrap();
    assert_eq!(forwarded.id(), delete.id());
    let ack = hub.next_message(WAIT).await.unwrap();
    assert_eq!(ack.parent_id(), delete.id());
    assert_eq!(ack.content.as_str(), Some("OK"));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_cloud_writes_reach_edged() {
    let store = Arc::new(MemoryStore::new());
    let mut node = start(store.clone());
    let mut hub = node.hub();

    let insert = Message::new(CLOUD_CONTROLLER, "resource", "ns/Pod/a", Operation::Insert)
        .fill_body(json!({"spec": {}}));
    node.deliver(insert.clone()).await;
    let echoed = expect_message(&mut node.edged, WAIT).await.unwrap();
    assert_eq!(echoed.operation(), Operation::Insert);
    assert_eq!(echoed.id(), insert.id());
    assert_eq!(hub.next_message(WAIT).await.unwrap().content.as_str(), Some("OK"));

    let update = Message::new(CLOUD_CONTROLLER, "resource", "ns/Pod/a", Operation::Update)
        .fill_body(json!({"spec": {"replicas": 2}}));
    node.deliver(update.clone()).await;
    let forwarded = expect_message(&mut node.edged, WAIT).await.unwrap();
    assert_eq!(forwarded.id(), update.id());
    let ack = hub.next_message(WAIT).await.unwrap();
    assert_eq!(ack.parent_id(), update.id());
    assert_eq!(store.get("ns/Pod/a").unwrap().as_deref(), Some(r#"{"spec":{"replicas":2}}"#));
}

#[tokio::test]
async fn test_function_updates_cross_between_cloud_and_edge() {
    let store = Arc::new(MemoryStore::new());
    let mut node = start(store.clone());
    let mut hub = node.hub();

    let from_cloud = Message::new(CLOUD_FUNCTION, "func", "ns/Function/f", Operation::Update)
        .fill_body(json!({"image": "v1"}));
    node.deliver(from_cloud.clone()).await;
    let forwarded = expect_message(&mut node.edge_function, WAIT).await.unwrap();
    assert_eq!(forwarded.id(), from_cloud.id());
    assert_eq!(forwarded.operation(), Operation::Update);
    let ack = hub.next_message(WAIT).await.unwrap();
    assert_eq!(ack.parent_id(), from_cloud.id());
    assert_eq!(ack.content.as_str(), Some("OK"));
    assert!(expect_silence(&mut node.edged, QUIET).await);

    let reply = node
        .request(EDGE_FUNCTION, "ns/Function/f", Operation::Update, json!({"image": "v2"}))
        .await;
    assert_eq!(reply.operation(), Operation::Response);
    assert_eq!(reply.content.as_str(), Some("OK"));
    let upstream = hub.next_message(WAIT).await.unwrap();
    assert_eq!(upstream.operation(), Operation::Update);
    assert_eq!(upstream.source(), EDGE_FUNCTION);
    assert_eq!(upstream.content, Content::Json(json!({"image": "v2"})));
    assert!(expect_silence(&mut node.edge_function, QUIET).await);
    assert_eq!(store.get("ns/Function/f").unwrap().as_deref(), Some(r#"{"image":"v2"}"#));
}

#[tokio::test]
async fn test_store_failure_is_reported_with_cause() {
    let node = start(Arc::new(FailingStore));

    let reply = node
        .request(EDGED, "ns/Pod/a", Operation::Insert, json!({}))
        .await;
    assert_eq!(error_text(&reply), "Error to insert meta to DB: failed to operate DB");

    let reply = node
        .request(EDGED, "ns/Pod/a", Operation::Delete, Content::Empty)
        .await;
    assert_eq!(error_text(&reply), "Error to delete meta to DB: failed to operate DB");

    // The engine keeps serving after failures.
    let reply = node
        .request(EDGED, "ns/Pod", Operation::Query, Content::Empty)
        .await;
    assert_eq!(error_text(&reply), "Error to query meta to DB: failed to operate DB");
}

#[tokio::test]
async fn test_unserializable_or_malformed_requests_never_reach_store() {
    let store = Arc::new(MemoryStore::new());
    let node = start(store.clone());

    let reply = node
        .request(EDGED, "ns/Pod/a", Operation::Insert, Content::Raw(vec![0xff, 0xfe]))
        .await;
    assert!(error_text(&reply).contains("marshal"));

    let reply = node
        .request(EDGED, "ns//a", Operation::Update, json!({}))
        .await;
    assert!(error_text(&reply).starts_with("invalid resource"));

    assert_eq!(store.write_count(), 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_node_connection_ignores_unknown_states() {
    let node = start(Arc::new(MemoryStore::new()));
    node.connect().await;

    let bogus = Message::new(EDGE_HUB, HUB_GROUP, "node/connection", Operation::NodeConnection)
        .fill_body("cloud_flapping");
    node.deliver(bogus).await;
    tokio::time::sleep(QUIET).await;
    assert!(node.connectivity.is_connected());

    node.set_connection("cloud_disconnected").await;
    assert!(!node.connectivity.is_connected());
}

#[tokio::test]
async fn test_late_response_is_dropped() {
    let store = Arc::new(MemoryStore::new());
    let mut node = start(store.clone());

    let orphan = Message::new(EDGE_HUB, HUB_GROUP, "ns/Pod/a", Operation::Response)
        .fill_body(json!({"phase": "Running"}));
    node.deliver(orphan).await;

    assert!(expect_silence(&mut node.edged, QUIET).await);
    assert!(store.is_empty());
    assert!(node.bus.is_registered(META_MANAGER));

    let reply = node
        .request(EDGED, "ns/Pod/a", Operation::Query, Content::Empty)
        .await;
    assert_eq!(reply.content, Content::Json(json!([])));
}
