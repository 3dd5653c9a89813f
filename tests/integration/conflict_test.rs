//! Conflict-aware updates through the runner

use super::runner;
use api_tester::conflict::{UpdateOutcome, UpdateRequestInput};
use api_tester::models::{HttpMethod, RequestUpdate, SavedRequest};
use serde_json::json;

fn url_update(id: &str, url: &str) -> UpdateRequestInput {
    UpdateRequestInput {
        id: id.to_string(),
        updates: RequestUpdate {
            url: Some(url.to_string()),
            ..RequestUpdate::default()
        },
        expected_updated_at: None,
        force_overwrite: false,
    }
}

#[tokio::test]
async fn test_two_editors_second_sees_conflict() {
    let (runner, storage) = runner();
    let request = SavedRequest::new("Orders", HttpMethod::GET, "/orders", "col-1");
    let t0 = request.updated_at;
    let id = request.id.clone();
    storage.insert_request(request);

    let mut first = url_update(&id, "/orders?page=1");
    first.expected_updated_at = Some(t0);
    let applied = runner.update_request(first).await;
    let t1 = match &applied {
        UpdateOutcome::Updated { request } => request.updated_at,
        other => panic!("expected update, got {:?}", other),
    };
    assert!(t1 > t0);

    let mut second = url_update(&id, "/orders?page=2");
    second.expected_updated_at = Some(t0);
    let rejected = runner.update_request(second.clone()).await;
    match &rejected {
        UpdateOutcome::Conflict { server_version } => {
            assert_eq!(server_version.url, "/orders?page=1");
            assert_eq!(server_version.updated_at, t1);
        }
        other => panic!("expected conflict, got {:?}", other),
    }

    let value = serde_json::to_value(&rejected).unwrap();
    assert_eq!(value["conflict"], json!(true));
    assert_eq!(value["serverVersion"]["url"], json!("/orders?page=1"));

    second.force_overwrite = true;
    let forced = runner.update_request(second).await;
    match forced {
        UpdateOutcome::Updated { request } => {
            assert_eq!(request.url, "/orders?page=2");
            assert!(request.updated_at > t1);
        }
        other => panic!("expected update, got {:?}", other),
    }
}

#[tokio::test]
async fn test_concurrent_updates_single_winner() {
    let (runner, storage) = runner();
    let request = SavedRequest::new("Orders", HttpMethod::GET, "/orders", "col-1");
    let t0 = request.updated_at;
    let id = request.id.clone();
    storage.insert_request(request);

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let runner = runner.clone();
            let mut input = url_update(&id, &format!("/orders/{}", i));
            input.expected_updated_at = Some(t0);
            tokio::spawn(async move { runner.update_request(input).await })
        })
        .collect();

    let mut winners = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            UpdateOutcome::Updated { .. } => winners += 1,
            UpdateOutcome::Conflict { .. } => conflicts += 1,
            UpdateOutcome::Failed { error } => panic!("unexpected failure: {}", error),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(conflicts, 9);
}

#[tokio::test]
async fn test_update_without_timestamp_applies() {
    let (runner, storage) = runner();
    let request = SavedRequest::new("Orders", HttpMethod::GET, "/orders", "col-1");
    let id = request.id.clone();
    storage.insert_request(request);

    let outcome = runner.update_request(url_update(&id, "/v2/orders")).await;
    assert!(outcome.is_success());
}
