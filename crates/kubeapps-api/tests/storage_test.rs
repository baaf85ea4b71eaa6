//! S3 route tests against a fake object store.
//!
//! Run with: `cargo test -p kubeapps-api --test storage_test`

mod helpers;

use chrono::{TimeZone, Utc};
use helpers::{test_app, FakeObjectStore};
use kubeapps_core::RetryPolicy;
use kubeapps_storage::{BucketSummary, ObjectListing, ObjectSummary};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn store() -> Arc<FakeObjectStore> {
    Arc::new(FakeObjectStore {
        buckets: vec![BucketSummary {
            name: "assets".to_string(),
            creation_date: Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
        }],
        objects: HashMap::from([(
            "assets".to_string(),
            ObjectListing {
                objects: vec![ObjectSummary {
                    key: "logo.png".to_string(),
                    size: 2048,
                    last_modified: None,
                    storage_class: Some("STANDARD".to_string()),
                }],
                is_truncated: true,
            },
        )]),
        ..Default::default()
    })
}

#[tokio::test]
async fn test_list_buckets() {
    let server = test_app().storage(store()).build();

    let response = server.get("/s3/api/list-buckets").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["buckets"][0]["name"], "assets");
    assert_eq!(body["buckets"][0]["creationDate"], "2024-01-02T03:04:05Z");
}

#[tokio::test]
async fn test_list_objects_formats_sizes() {
    let server = test_app().storage(store()).build();

    let response = server
        .post("/s3/api/list-objects")
        .json(&json!({ "bucketName": "assets" }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["bucketName"], "assets");
    assert_eq!(body["isTruncated"], true);
    assert_eq!(body["objects"][0]["key"], "logo.png");
    assert_eq!(body["objects"][0]["size"], "2 KB");
    assert_eq!(body["objects"][0]["storageClass"], "STANDARD");
}

#[tokio::test]
async fn test_list_objects_requires_bucket_name() {
    let fake = store();
    let server = test_app().storage(fake.clone()).build();

    let response = server.post("/s3/api/list-objects").json(&json!({})).await;

    assert_eq!(response.status_code(), 400);
    assert_eq!(
        response.json::<Value>()["error"]["message"],
        "Bucket name is required"
    );
    assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_missing_bucket_is_not_retried() {
    let fake = store();
    let server = test_app()
        .storage(fake.clone())
        .policy(RetryPolicy::default().base_delay(Duration::from_millis(1000)))
        .build();

    let response = server
        .post("/s3/api/list-objects")
        .json(&json!({ "bucketName": "missing" }))
        .await;

    assert_eq!(response.status_code(), 404);
    assert_eq!(
        response.json::<Value>()["error"]["message"],
        "Bucket missing not found"
    );
    assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_retried() {
    let fake = store();
    fake.failures.store(1, Ordering::SeqCst);
    let server = test_app()
        .storage(fake.clone())
        .policy(RetryPolicy::default().base_delay(Duration::from_millis(1000)))
        .build();

    let response = server.get("/s3/api/list-buckets").await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(fake.calls.load(Ordering::SeqCst), 2);
}
