//! Scenarios driven through the per-entity bindings.

mod support;

use std::time::Duration;

use careboard::resources::{documents, hope_snippets, journal_logs, plan_items};
use careboard::session::SessionPolicy;
use careboard::{FetchStatus, TransportError};
use careboard_api_types::{JournalLogUpdateRequest, PlanItem};
use httpmock::prelude::*;
use serde_json::json;

use support::{harness, harness_with_timeout};

fn plan_item(id: i64, completed: bool) -> serde_json::Value {
    json!({"id": id, "title": format!("Step {id}"), "completed": completed})
}

#[tokio::test]
async fn plan_item_toggle_flips_optimistically_then_refetches_server_truth() {
    let server = MockServer::start_async().await;
    let mut first_list = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/plan-items");
            then.status(200).json_body(json!([
                plan_item(1, false),
                plan_item(2, false),
                plan_item(3, false),
            ]));
        })
        .await;
    let toggle = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/plan-items/2/toggle");
            then.status(200)
                .json_body(plan_item(2, true))
                .delay(Duration::from_millis(200));
        })
        .await;

    let h = harness(&server, SessionPolicy::ThrowError);
    let hooks = plan_items(&h.ctx);

    let items = hooks.list().await.expect("list").expect("items");
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|item| !item.completed));

    let pending = tokio::spawn({
        let hooks = hooks.clone();
        async move { hooks.toggle_completion(2).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let during = hooks.read_list();
    let optimistic: Vec<PlanItem> = during.data.expect("optimistic data");
    assert!(optimistic.iter().find(|item| item.id == 2).expect("item 2").completed);
    assert!(!optimistic.iter().find(|item| item.id == 1).expect("item 1").completed);

    let confirmed = pending.await.expect("join").expect("toggle");
    assert_eq!(confirmed.map(|item| item.completed), Some(true));
    toggle.assert_async().await;
    assert!(h.ctx.cache().peek(&hooks.list_key()).expect("list").is_stale());

    // Server truth disagrees with the optimistic guess.
    first_list.delete_async().await;
    let truth = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/plan-items");
            then.status(200).json_body(json!([
                plan_item(1, false),
                plan_item(2, false),
                plan_item(3, true),
            ]));
        })
        .await;

    let items = hooks.list().await.expect("refetch").expect("items");
    assert!(truth.hits_async().await >= 1);
    let completed: Vec<i64> = items
        .iter()
        .filter(|item| item.completed)
        .map(|item| item.id)
        .collect();
    assert_eq!(completed, vec![3]);
}

#[tokio::test]
async fn documents_keep_previous_list_after_network_failure() {
    let server = MockServer::start_async().await;
    let mut ok = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/documents");
            then.status(200).json_body(json!([
                {"id": 1, "title": "Scan", "file_name": "scan.pdf"}
            ]));
        })
        .await;

    let h = harness_with_timeout(
        &server,
        SessionPolicy::ThrowError,
        Some(Duration::from_millis(100)),
    );
    let hooks = documents(&h.ctx);
    let first = hooks.list().await.expect("list").expect("documents");
    assert_eq!(first.len(), 1);

    ok.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/documents");
            then.status(200).json_body(json!([])).delay(Duration::from_secs(2));
        })
        .await;

    h.ctx.cache().invalidate(&hooks.list_key());
    let err = hooks.list().await.expect_err("timeout");
    assert!(matches!(err, TransportError::Network(_)));

    let entry = h.ctx.cache().peek(&hooks.list_key()).expect("entry");
    assert_eq!(entry.status(), FetchStatus::Error);

    let state = hooks.read_list();
    let documents = state.data.expect("previous list is kept");
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].title, "Scan");
    assert!(matches!(state.error, Some(TransportError::Network(_))));
}

#[tokio::test]
async fn update_invalidates_collection_and_item() {
    let server = MockServer::start_async().await;
    let list = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/journal");
            then.status(200).json_body(json!([
                {"id": 7, "entry_date": "2026-03-01", "mood": 3}
            ]));
        })
        .await;
    let item = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/journal/7");
            then.status(200)
                .json_body(json!({"id": 7, "entry_date": "2026-03-01", "mood": 3}));
        })
        .await;
    let update = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/api/journal/7")
                .json_body(json!({"mood": 5}));
            then.status(200)
                .json_body(json!({"id": 7, "entry_date": "2026-03-01", "mood": 5}));
        })
        .await;

    let h = harness(&server, SessionPolicy::ThrowError);
    let hooks = journal_logs(&h.ctx);
    hooks.list().await.expect("list");
    hooks.get(7).await.expect("get");

    let request = JournalLogUpdateRequest {
        mood: Some(5),
        ..Default::default()
    };
    let updated = hooks.update(7, &request).await.expect("update").expect("record");
    assert_eq!(updated.mood, Some(5));
    update.assert_async().await;

    assert!(h.ctx.cache().peek(&hooks.list_key()).expect("list").is_stale());
    assert!(h.ctx.cache().peek(&hooks.item_key(7)).expect("item").is_stale());

    hooks.list().await.expect("list again");
    hooks.get(7).await.expect("get again");
    assert_eq!(list.hits_async().await, 2);
    assert_eq!(item.hits_async().await, 2);
}

#[tokio::test]
async fn delete_removes_record_before_the_server_answers() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/hope-snippets");
            then.status(200).json_body(json!([
                {"id": 1, "text": "One day at a time"},
                {"id": 2, "text": "Breathe"}
            ]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/hope-snippets/1");
            then.status(204).delay(Duration::from_millis(200));
        })
        .await;

    let h = harness(&server, SessionPolicy::ThrowError);
    let hooks = hope_snippets(&h.ctx);
    hooks.list().await.expect("list");

    let pending = tokio::spawn({
        let hooks = hooks.clone();
        async move { hooks.delete(1).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let visible = hooks.read_list().data.expect("data");
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, 2);

    assert_eq!(pending.await.expect("join"), Ok(true));
    assert!(h.ctx.cache().peek(&hooks.list_key()).expect("list").is_stale());
}

#[tokio::test]
async fn toggle_without_toggle_endpoint_is_rejected_locally() {
    let server = MockServer::start_async().await;
    let h = harness(&server, SessionPolicy::ThrowError);

    let err = journal_logs(&h.ctx).toggle(1).await.expect_err("no toggle");
    assert!(matches!(err, TransportError::InvalidRequest(_)));
}

#[tokio::test]
async fn read_of_untracked_record_starts_loading() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/plan-items/5");
            then.status(200).json_body(plan_item(5, false));
        })
        .await;

    let h = harness(&server, SessionPolicy::ThrowError);
    let hooks = plan_items(&h.ctx);

    let state = hooks.read(5);
    assert!(state.is_loading());
    assert!(state.data.is_none());

    let item = hooks.get(5).await.expect("get").expect("item");
    assert_eq!(item.title, "Step 5");
    assert_eq!(mock.hits_async().await, 1);

    let state = hooks.read(5);
    assert_eq!(state.status, FetchStatus::Success);
    assert!(!state.is_stale);
    assert_eq!(state.data.map(|item| item.id), Some(5));
}

#[tokio::test]
async fn expired_session_reads_as_empty_under_return_empty() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/plan-items");
            then.status(401);
        })
        .await;

    let h = harness(&server, SessionPolicy::ReturnEmpty);
    let hooks = plan_items(&h.ctx);
    assert_eq!(hooks.list().await, Ok(None));
    assert_eq!(hooks.delete(3).await, Ok(false));
    assert_eq!(h.navigator.redirects(), 0);
}
