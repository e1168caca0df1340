/// Retryable write tests
///
/// End-to-end scenarios for the retry engine: a write hits an injected
/// server/network fault and the driver either absorbs it with one retry or
/// surfaces it, with the expected post-operation collection state.
/// Run with: cargo test --test retryable_writes_tests
use std::sync::Arc;

use rustdocdb::{
    Client, Collection, DriverError, FailAction, FailPoint, MemoryServer, WriteConcernError,
};
use serde_json::json;

/// Client over a fresh in-memory server whose `people` collection holds the
/// two seed documents every scenario starts from.
async fn seeded_client() -> (Client, Arc<MemoryServer>, Collection) {
    let (client, server) = Client::memory();
    server
        .seed(
            "people",
            vec![json!({ "_id": 1, "x": 11 }), json!({ "_id": 2, "x": 22 })],
        )
        .await;
    let coll = client.collection("people");
    (client, server, coll)
}

fn write_concern_error(code: i32, code_name: &str) -> FailAction {
    FailAction::WriteConcernError(WriteConcernError {
        code,
        code_name: code_name.to_string(),
        message: "injected write concern error".to_string(),
        err_info: None,
    })
}

#[tokio::test]
async fn insert_succeeds_after_one_retryable_error_code() {
    for code in [6, 7, 89, 91, 189, 9001, 10107, 11600, 11602, 13435, 13436] {
        let (_client, server, coll) = seeded_client().await;
        server
            .configure_fail_point(FailPoint::new("insert", 1, FailAction::ErrorCode(code)))
            .await;

        let result = coll.insert_one(json!({ "_id": 3, "x": 33 })).await;
        assert!(result.is_ok(), "code {code} should be absorbed by the retry");
        assert_eq!(result.unwrap().inserted_id, json!(3));
        assert_eq!(coll.count().await.unwrap(), 3, "code {code}");
    }
}

#[tokio::test]
async fn insert_succeeds_after_connection_close() {
    let (_client, server, coll) = seeded_client().await;
    server
        .configure_fail_point(FailPoint::new("insert", 1, FailAction::CloseConnection))
        .await;

    let result = coll.insert_one(json!({ "_id": 3, "x": 33 })).await.unwrap();
    assert_eq!(result.inserted_id, json!(3));

    let docs = coll.find_all().await.unwrap();
    assert_eq!(
        docs,
        vec![
            json!({ "_id": 1, "x": 11 }),
            json!({ "_id": 2, "x": 22 }),
            json!({ "_id": 3, "x": 33 }),
        ]
    );
}

#[tokio::test]
async fn insert_fails_after_interrupted_and_writes_nothing() {
    let (_client, server, coll) = seeded_client().await;
    server
        .configure_fail_point(FailPoint::new("insert", 1, FailAction::ErrorCode(11601)))
        .await;

    let err = coll.insert_one(json!({ "_id": 3, "x": 33 })).await.unwrap_err();
    assert!(matches!(err, DriverError::Command(ref e) if e.code == 11601));

    // Nothing beyond the pre-existing documents.
    let docs = coll.find_all().await.unwrap();
    assert_eq!(
        docs,
        vec![json!({ "_id": 1, "x": 11 }), json!({ "_id": 2, "x": 22 })]
    );
}

#[tokio::test]
async fn insert_fails_after_write_concern_failed_but_write_applies() {
    let (_client, server, coll) = seeded_client().await;
    server
        .configure_fail_point(FailPoint::new(
            "insert",
            1,
            write_concern_error(64, "WriteConcernFailed"),
        ))
        .await;

    let err = coll.insert_one(json!({ "_id": 3, "x": 33 })).await.unwrap_err();
    assert!(matches!(err, DriverError::WriteConcern(ref e) if e.code == 64));

    // The command itself succeeded; only the acknowledgment guarantee failed.
    assert_eq!(coll.count().await.unwrap(), 3);
}

#[tokio::test]
async fn insert_succeeds_after_one_retryable_write_concern_error() {
    let (_client, server, coll) = seeded_client().await;
    server
        .configure_fail_point(FailPoint::new(
            "insert",
            1,
            write_concern_error(91, "ShutdownInProgress"),
        ))
        .await;

    let result = coll.insert_one(json!({ "_id": 3, "x": 33 })).await.unwrap();
    assert_eq!(result.inserted_id, json!(3));

    // The retry replayed the recorded reply; the document exists exactly once.
    assert_eq!(coll.count().await.unwrap(), 3);
}

#[tokio::test]
async fn insert_fails_after_two_retryable_write_concern_errors() {
    let (_client, server, coll) = seeded_client().await;
    server
        .configure_fail_point(FailPoint::new(
            "insert",
            2,
            write_concern_error(91, "ShutdownInProgress"),
        ))
        .await;

    // Both attempts report a retryable write concern error; the retry budget
    // is one, so the second occurrence surfaces as a hard error.
    let err = coll.insert_one(json!({ "_id": 3, "x": 33 })).await.unwrap_err();
    assert!(matches!(err, DriverError::WriteConcern(ref e) if e.code == 91));

    // The write itself persisted exactly once despite the reported failure.
    let docs = coll.find_all().await.unwrap();
    assert_eq!(docs.len(), 3);
    assert_eq!(docs[2], json!({ "_id": 3, "x": 33 }));
}

#[tokio::test]
async fn retried_insert_is_not_duplicated() {
    let (_client, server, coll) = seeded_client().await;
    server
        .configure_fail_point(FailPoint::new(
            "insert",
            1,
            write_concern_error(189, "PrimarySteppedDown"),
        ))
        .await;

    coll.insert_one(json!({ "_id": 3, "x": 33 })).await.unwrap();

    let ids: Vec<_> = coll
        .find_all()
        .await
        .unwrap()
        .iter()
        .map(|d| d["_id"].clone())
        .collect();
    assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);
}

#[tokio::test]
async fn second_retryable_error_code_is_final() {
    let (_client, server, coll) = seeded_client().await;
    server
        .configure_fail_point(FailPoint::new("insert", 2, FailAction::ErrorCode(91)))
        .await;

    let err = coll.insert_one(json!({ "_id": 3, "x": 33 })).await.unwrap_err();
    assert!(matches!(err, DriverError::Command(ref e) if e.code == 91));
    assert_eq!(coll.count().await.unwrap(), 2);
}

#[tokio::test]
async fn update_succeeds_after_primary_stepped_down() {
    let (_client, server, coll) = seeded_client().await;
    server
        .configure_fail_point(FailPoint::new("update", 1, FailAction::ErrorCode(189)))
        .await;

    let result = coll
        .update_one(json!({ "_id": 2 }), json!({ "$set": { "x": 23 } }))
        .await
        .unwrap();
    assert_eq!(result.matched_count, 1);
    assert_eq!(result.modified_count, 1);

    let docs = coll.find_all().await.unwrap();
    assert_eq!(docs[1], json!({ "_id": 2, "x": 23 }));
}

#[tokio::test]
async fn delete_succeeds_after_connection_close() {
    let (_client, server, coll) = seeded_client().await;
    server
        .configure_fail_point(FailPoint::new("delete", 1, FailAction::CloseConnection))
        .await;

    let result = coll.delete_one(json!({ "_id": 1 })).await.unwrap();
    assert_eq!(result.deleted_count, 1);

    let docs = coll.find_all().await.unwrap();
    assert_eq!(docs, vec![json!({ "_id": 2, "x": 22 })]);
}

#[tokio::test]
async fn disabled_retries_surface_the_first_retryable_error() {
    let (client, server) = Client::memory();
    let no_retry = Client::with_transport(
        server.clone(),
        rustdocdb::ConnectionConfig::default().retry_writes(false),
    )
    .unwrap();
    drop(client);

    server
        .configure_fail_point(FailPoint::new("insert", 1, FailAction::ErrorCode(91)))
        .await;

    let coll = no_retry.collection("people");
    let err = coll.insert_one(json!({ "_id": 3 })).await.unwrap_err();
    assert!(matches!(err, DriverError::Command(ref e) if e.code == 91));
    assert_eq!(coll.count().await.unwrap(), 0);
}

#[tokio::test]
async fn concurrent_operations_share_no_retry_state() {
    let (client, server) = Client::memory();
    // One fault only: exactly one of the concurrent writes retries, the
    // others are untouched by its retry bookkeeping.
    server
        .configure_fail_point(FailPoint::new("insert", 1, FailAction::CloseConnection))
        .await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let coll = client.collection("people");
        handles.push(tokio::spawn(async move {
            coll.insert_one(json!({ "_id": i })).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    assert_eq!(client.collection("people").count().await.unwrap(), 8);
}

#[tokio::test]
async fn duplicate_key_error_is_not_retried() {
    let (_client, _server, coll) = seeded_client().await;

    let err = coll.insert_one(json!({ "_id": 1, "x": 99 })).await.unwrap_err();
    assert!(matches!(err, DriverError::Command(ref e) if e.code == 11000));
    assert_eq!(coll.count().await.unwrap(), 2);
}
