//! Query builder: limit edge policies, facet compilation, GET/POST duality,
//! aggregation and explain decoding.

mod common;

use common::{param, test_client, test_client_post_queries, MockTransport, Player};
use meridian_client::{eq, gt, gte, Error, Method, Order, Query};
use serde_json::{json, Value};

#[tokio::test]
async fn find_with_non_positive_limit_skips_network() {
    let transport = MockTransport::new();
    let client = test_client(transport.clone());

    let results = Query::<Player>::new().limit(0).find(&client).await.unwrap();
    assert!(results.is_empty());
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn first_with_non_positive_limit_fails_object_not_found() {
    let transport = MockTransport::new();
    let client = test_client(transport.clone());

    let result = Query::<Player>::new().limit(-1).first(&client).await;
    assert!(matches!(result, Err(Error::ObjectNotFound)));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn count_with_non_positive_limit_is_zero() {
    let transport = MockTransport::new();
    let client = test_client(transport.clone());

    let count = Query::<Player>::new().limit(0).count(&client).await.unwrap();
    assert_eq!(count, 0);
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn with_count_with_non_positive_limit_is_empty_zero() {
    let transport = MockTransport::new();
    let client = test_client(transport.clone());

    let (results, count) = Query::<Player>::new()
        .limit(0)
        .with_count(&client)
        .await
        .unwrap();
    assert!(results.is_empty());
    assert_eq!(count, 0);
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn find_compiles_all_facets_into_get_params() {
    let transport = MockTransport::new();
    transport.push_ok(json!({"results": []}));
    let client = test_client(transport.clone());

    Query::<Player>::new()
        .filter(gte("score", 10))
        .filter(eq("team", "red"))
        .select(&["name"])
        .select(&["score"])
        .exclude_keys(&["secret"])
        .include(&["owner"])
        .order(vec![Order::descending("score"), Order::ascending("name")])
        .skip(5)
        .limit(25)
        .read_preference("SECONDARY")
        .hint(json!({"_id_": 1}))
        .find(&client)
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, Method::Get);
    assert_eq!(request.url, "http://localhost:1337/api/classes/Player");

    let where_tree: Value = serde_json::from_str(param(request, "where").unwrap()).unwrap();
    assert_eq!(
        where_tree,
        json!({"score": {"$gte": 10}, "team": "red"})
    );
    // Repeated select calls unioned.
    assert_eq!(param(request, "keys"), Some("name,score"));
    assert_eq!(param(request, "excludeKeys"), Some("secret"));
    assert_eq!(param(request, "include"), Some("owner"));
    assert_eq!(param(request, "order"), Some("-score,name"));
    assert_eq!(param(request, "limit"), Some("25"));
    assert_eq!(param(request, "skip"), Some("5"));
    assert_eq!(param(request, "readPreference"), Some("SECONDARY"));
    assert_eq!(param(request, "hint"), Some(r#"{"_id_":1}"#));
    assert_eq!(param(request, "count"), None);
}

#[tokio::test]
async fn first_forces_limit_one_and_maps_empty_to_not_found() {
    let transport = MockTransport::new();
    transport.push_ok(json!({"results": []}));
    let client = test_client(transport.clone());

    let result = Query::<Player>::new().limit(50).first(&client).await;
    assert!(matches!(result, Err(Error::ObjectNotFound)));
    assert_eq!(param(&transport.requests()[0], "limit"), Some("1"));
}

#[tokio::test]
async fn count_compiles_limit_zero_with_count_flag() {
    let transport = MockTransport::new();
    transport.push_ok(json!({"results": [], "count": 42}));
    let client = test_client(transport.clone());

    let count = Query::<Player>::new().count(&client).await.unwrap();
    assert_eq!(count, 42);

    let request = &transport.requests()[0];
    assert_eq!(param(request, "limit"), Some("0"));
    assert_eq!(param(request, "count"), Some("1"));
}

#[tokio::test]
async fn count_defaults_to_zero_when_envelope_omits_it() {
    let transport = MockTransport::new();
    transport.push_ok(json!({"results": []}));
    let client = test_client(transport.clone());

    let count = Query::<Player>::new().count(&client).await.unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn with_count_returns_rows_and_count_in_one_round_trip() {
    let transport = MockTransport::new();
    transport.push_ok(json!({
        "results": [{"objectId": "p1", "name": "alice", "score": 10}],
        "count": 7
    }));
    let client = test_client(transport.clone());

    let (results, count) = Query::<Player>::new().with_count(&client).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].object_id.as_deref(), Some("p1"));
    assert_eq!(count, 7);
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn post_mode_carries_the_same_facets_in_the_body() {
    let get_transport = MockTransport::new();
    get_transport.push_ok(json!({"results": [{"objectId": "p1", "score": 10}]}));
    let get_client = test_client(get_transport.clone());

    let post_transport = MockTransport::new();
    post_transport.push_ok(json!({"results": [{"objectId": "p1", "score": 10}]}));
    let post_client = test_client_post_queries(post_transport.clone());

    let query = Query::<Player>::new().filter(gt("score", 5)).limit(10);
    let via_get = query.find(&get_client).await.unwrap();
    let via_post = query.find(&post_client).await.unwrap();

    // Identical server responses decode to identical results.
    assert_eq!(via_get, via_post);

    let get_request = &get_transport.requests()[0];
    let post_request = &post_transport.requests()[0];
    assert_eq!(post_request.method, Method::Post);
    assert!(post_request.params.is_empty());

    let body = post_request.body.as_ref().unwrap();
    assert_eq!(body.get("_method"), Some(&json!("GET")));
    assert_eq!(
        body.get("where"),
        Some(&serde_json::from_str::<Value>(param(get_request, "where").unwrap()).unwrap())
    );
    assert_eq!(body.get("limit").and_then(Value::as_i64), Some(10));
    assert_eq!(
        body.get("limit").unwrap().to_string(),
        param(get_request, "limit").unwrap()
    );
}

#[tokio::test]
async fn aggregate_prepends_match_stage_for_non_empty_where() {
    let transport = MockTransport::new();
    transport.push_ok(json!({"results": [{"total": 3}]}));
    let client = test_client(transport.clone());

    let caller_stages = vec![json!({"group": {"objectId": "$team", "total": {"$sum": 1}}})];
    let rows: Vec<Value> = Query::<Player>::new()
        .filter(gt("score", 5))
        .aggregate(&client, caller_stages)
        .await
        .unwrap();
    assert_eq!(rows, vec![json!({"total": 3})]);

    let request = &transport.requests()[0];
    assert_eq!(request.url, "http://localhost:1337/api/aggregate/Player");
    // Aggregation is an elevated call.
    assert!(request
        .headers
        .iter()
        .any(|(name, value)| name == "X-Meridian-Primary-Key" && value == "test-primary-key"));

    // The match stage value is the serialized constraint tree, not a nested
    // object.
    let pipeline: Value = serde_json::from_str(param(request, "pipeline").unwrap()).unwrap();
    assert_eq!(
        pipeline,
        json!([
            {"match": r#"{"score":{"$gt":5}}"#},
            {"group": {"objectId": "$team", "total": {"$sum": 1}}}
        ])
    );
}

#[tokio::test]
async fn aggregate_omits_match_stage_for_empty_where() {
    let transport = MockTransport::new();
    transport.push_ok(json!({"results": []}));
    let client = test_client(transport.clone());

    let caller_stages = vec![json!({"count": "rows"})];
    let _: Vec<Value> = Query::<Player>::new()
        .aggregate(&client, caller_stages)
        .await
        .unwrap();

    let pipeline: Value =
        serde_json::from_str(param(&transport.requests()[0], "pipeline").unwrap()).unwrap();
    assert_eq!(pipeline, json!([{"count": "rows"}]));
}

#[tokio::test]
async fn distinct_compiles_field_and_where() {
    let transport = MockTransport::new();
    transport.push_ok(json!({"results": ["red", "blue"]}));
    let client = test_client(transport.clone());

    let teams: Vec<String> = Query::<Player>::new()
        .filter(gt("score", 0))
        .distinct(&client, "team")
        .await
        .unwrap();
    assert_eq!(teams, vec!["red".to_string(), "blue".to_string()]);

    let request = &transport.requests()[0];
    assert_eq!(param(request, "distinct"), Some("team"));
    let where_tree: Value = serde_json::from_str(param(request, "where").unwrap()).unwrap();
    assert_eq!(where_tree, json!({"score": {"$gt": 0}}));
}

#[tokio::test]
async fn explain_decode_path_is_chosen_by_the_mongodb_flag() {
    // Standard servers wrap explain output in the results envelope.
    let transport = MockTransport::new();
    transport.push_ok(json!({"results": [{"plan": "scan"}]}));
    let client = test_client(transport.clone());

    let plans: Vec<Value> = Query::<Player>::new()
        .find_explain(&client, false)
        .await
        .unwrap();
    assert_eq!(plans, vec![json!({"plan": "scan"})]);
    assert_eq!(param(&transport.requests()[0], "explain"), Some("true"));

    // MongoDB returns the bare explain document.
    let mongo_transport = MockTransport::new();
    mongo_transport.push_ok(json!({"queryPlanner": {"winningPlan": "IXSCAN"}}));
    let mongo_client = test_client(mongo_transport.clone());

    let plans: Vec<Value> = Query::<Player>::new()
        .find_explain(&mongo_client, true)
        .await
        .unwrap();
    assert_eq!(plans, vec![json!({"queryPlanner": {"winningPlan": "IXSCAN"}})]);

}
