//! Exhaustive enumeration: preconditions, sequential cursor paging, and
//! cursor interaction with caller constraints.

mod common;

use common::{param, test_client, MockTransport, Player};
use meridian_client::{eq, gt, Error, Order, Query};
use serde_json::{json, Value};

fn page(ids: &[&str]) -> Value {
    let rows: Vec<Value> = ids
        .iter()
        .map(|id| json!({"objectId": id, "name": format!("player-{}", id), "score": 1}))
        .collect();
    json!({ "results": rows })
}

#[tokio::test]
async fn find_all_rejects_non_default_order_skip_or_limit() {
    let transport = MockTransport::new();
    let client = test_client(transport.clone());

    for query in [
        Query::<Player>::new().order(vec![Order::ascending("name")]),
        Query::<Player>::new().skip(10),
        Query::<Player>::new().limit(50),
    ] {
        let result = query.find_all(&client).await;
        match result {
            Err(Error::OtherCause(msg)) => {
                assert!(msg.contains("default order, skip and limit"))
            }
            other => panic!("expected precondition failure, got {:?}", other),
        }
    }
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn find_all_rejects_a_non_positive_batch_size() {
    let transport = MockTransport::new();
    let client = test_client(transport.clone());

    for batch in [0, -5] {
        let result = Query::<Player>::new().find_all_batch(&client, Some(batch)).await;
        match result {
            Err(Error::OtherCause(msg)) => assert!(msg.contains("batch size must be positive")),
            other => panic!("expected precondition failure, got {:?}", other),
        }
    }
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn find_all_pages_sequentially_on_ascending_object_id() {
    let transport = MockTransport::new();
    // Three pages with batch 2: two full, one short final page.
    transport.push_ok(page(&["a1", "a2"]));
    transport.push_ok(page(&["a3", "a4"]));
    transport.push_ok(page(&["a5"]));
    let client = test_client(transport.clone());

    let all = Query::<Player>::new()
        .find_all_batch(&client, Some(2))
        .await
        .unwrap();

    let ids: Vec<&str> = all.iter().filter_map(|p| p.object_id.as_deref()).collect();
    assert_eq!(ids, vec!["a1", "a2", "a3", "a4", "a5"]);

    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    for request in &requests {
        assert_eq!(param(request, "order"), Some("objectId"));
        assert_eq!(param(request, "limit"), Some("2"));
    }

    // First page has no cursor; later pages carry the previous last id.
    let trees: Vec<Value> = requests
        .iter()
        .map(|r| serde_json::from_str(param(r, "where").unwrap()).unwrap())
        .collect();
    assert_eq!(trees[0], json!({}));
    assert_eq!(trees[1], json!({"objectId": {"$gt": "a2"}}));
    assert_eq!(trees[2], json!({"objectId": {"$gt": "a4"}}));
}

#[tokio::test]
async fn find_all_stops_after_one_short_page() {
    let transport = MockTransport::new();
    transport.push_ok(page(&["a1"]));
    let client = test_client(transport.clone());

    let all = Query::<Player>::new()
        .find_all_batch(&client, Some(10))
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn find_all_keeps_caller_constraints_on_every_page() {
    let transport = MockTransport::new();
    transport.push_ok(page(&["a1", "a2"]));
    transport.push_ok(page(&[]));
    let client = test_client(transport.clone());

    Query::<Player>::new()
        .filter(gt("score", 5))
        .find_all_batch(&client, Some(2))
        .await
        .unwrap();

    let requests = transport.requests();
    let first: Value = serde_json::from_str(param(&requests[0], "where").unwrap()).unwrap();
    let second: Value = serde_json::from_str(param(&requests[1], "where").unwrap()).unwrap();
    assert_eq!(first, json!({"score": {"$gt": 5}}));
    assert_eq!(
        second,
        json!({"score": {"$gt": 5}, "objectId": {"$gt": "a2"}})
    );
}

#[tokio::test]
async fn cursor_wraps_in_and_when_caller_already_constrains_object_id() {
    let transport = MockTransport::new();
    transport.push_ok(page(&["a1", "a2"]));
    transport.push_ok(page(&[]));
    let client = test_client(transport.clone());

    Query::<Player>::new()
        .filter(eq("objectId", "a2"))
        .find_all_batch(&client, Some(2))
        .await
        .unwrap();

    let second: Value =
        serde_json::from_str(param(&transport.requests()[1], "where").unwrap()).unwrap();
    // The caller's objectId constraint survives alongside the cursor.
    assert_eq!(
        second,
        json!({"$and": [{"objectId": "a2"}, {"objectId": {"$gt": "a2"}}]})
    );
}

#[tokio::test]
async fn find_all_fails_when_a_full_page_row_lacks_object_id() {
    let transport = MockTransport::new();
    transport.push_ok(json!({"results": [{"name": "ghost"}, {"name": "ghost2"}]}));
    let client = test_client(transport.clone());

    let result = Query::<Player>::new().find_all_batch(&client, Some(2)).await;
    match result {
        Err(Error::OtherCause(msg)) => assert!(msg.contains("cannot advance cursor")),
        other => panic!("expected cursor failure, got {:?}", other),
    }
}
