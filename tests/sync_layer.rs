//! End-to-end behavior of the cache, coordinator and session policy against a
//! mock API.

mod support;

use std::time::Duration;

use careboard::mutation::{MutationDescriptor, Optimistic};
use careboard::resources::remove_by_id;
use careboard::session::SessionPolicy;
use careboard::{ApiRequest, EventKind, FetchOptions, FetchStatus, TransportError, query_key};
use futures::future::join_all;
use httpmock::prelude::*;
use reqwest::Method;
use serde_json::json;

use support::harness;

#[tokio::test]
async fn concurrent_reads_share_one_request() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/journal")
                .header("authorization", "Bearer test-token");
            then.status(200)
                .json_body(json!([{"id": 1}]))
                .delay(Duration::from_millis(150));
        })
        .await;

    let h = harness(&server, SessionPolicy::ThrowError);
    let key = query_key!["journalLogs"];

    let reads = (0..8).map(|_| {
        h.ctx
            .query(&key, ApiRequest::get("api/journal"), FetchOptions::default())
    });
    let results = join_all(reads).await;

    assert_eq!(mock.hits_async().await, 1);
    for result in results {
        assert_eq!(result, Ok(Some(json!([{"id": 1}]))));
    }
}

#[tokio::test]
async fn invalidate_defers_the_refetch_to_the_next_read() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/diet-logs");
            then.status(200).json_body(json!([]));
        })
        .await;

    let h = harness(&server, SessionPolicy::ThrowError);
    let key = query_key!["dietLogs"];
    let read = || h.ctx.query(&key, ApiRequest::get("api/diet-logs"), FetchOptions::default());

    read().await.expect("first read");
    assert_eq!(mock.hits_async().await, 1);

    h.ctx.cache().invalidate(&key);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(mock.hits_async().await, 1);

    read().await.expect("second read");
    assert_eq!(mock.hits_async().await, 2);
}

#[tokio::test]
async fn failed_mutation_restores_every_declared_key() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/documents");
            then.status(200).json_body(json!([{"id": 1}, {"id": 2}]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/documents/2");
            then.status(200).json_body(json!({"id": 2}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/documents/2");
            then.status(409).body("document is shared");
        })
        .await;

    let h = harness(&server, SessionPolicy::ThrowError);
    let list = query_key!["documents"];
    let item = query_key!["documents", 2];
    h.ctx
        .query(&list, ApiRequest::get("api/documents"), FetchOptions::default())
        .await
        .expect("list");
    h.ctx
        .query(&item, ApiRequest::get("api/documents/2"), FetchOptions::default())
        .await
        .expect("item");

    let descriptor =
        MutationDescriptor::new(ApiRequest::new(Method::DELETE, "api/documents/2"))
            .invalidates(list.clone())
            .invalidates(item.clone())
            .optimistic(Optimistic::new(|_, current| remove_by_id(current, 2)));

    let err = h.ctx.mutate(descriptor).await.expect_err("conflict");
    assert_eq!(err, TransportError::http(409, "document is shared"));

    let list_entry = h.ctx.cache().peek(&list).expect("list entry");
    assert_eq!(list_entry.value(), Some(&json!([{"id": 1}, {"id": 2}])));
    assert_eq!(list_entry.status(), FetchStatus::Success);
    assert!(!list_entry.is_stale());
    assert_eq!(
        h.ctx.cache().peek(&item).expect("item entry").value(),
        Some(&json!({"id": 2}))
    );
}

#[tokio::test]
async fn confirmed_mutation_marks_keys_stale_and_next_read_fetches() {
    let server = MockServer::start_async().await;
    let list_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/caregivers");
            then.status(200).json_body(json!([]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/caregivers")
                .json_body(json!({"email": "sam@example.com"}));
            then.status(201).json_body(json!({"id": 4}));
        })
        .await;

    let h = harness(&server, SessionPolicy::ThrowError);
    let key = query_key!["caregivers"];
    let read = || {
        h.ctx
            .query(&key, ApiRequest::get("api/caregivers"), FetchOptions::default())
    };
    read().await.expect("initial read");

    let request = ApiRequest::new(Method::POST, "api/caregivers")
        .with_body(Some(json!({"email": "sam@example.com"})));
    h.ctx
        .mutate(MutationDescriptor::new(request).invalidates(key.clone()))
        .await
        .expect("invite");

    assert!(h.ctx.cache().peek(&key).expect("entry").is_stale());
    read().await.expect("read after invite");
    assert_eq!(list_mock.hits_async().await, 2);
}

#[tokio::test]
async fn concurrent_unauthorized_responses_redirect_once() {
    let server = MockServer::start_async().await;
    let h = harness(&server, SessionPolicy::RedirectToLogin);
    let keys = [
        (query_key!["planItems"], "api/plan-items"),
        (query_key!["journalLogs"], "api/journal"),
        (query_key!["dietLogs"], "api/diet-logs"),
        (query_key!["documents"], "api/documents"),
    ];

    let mut rejected = Vec::new();
    for (_, path) in &keys {
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path(format!("/{path}"));
                then.status(401).delay(Duration::from_millis(50));
            })
            .await;
        rejected.push(mock);
    }
    let hope = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/hope-snippets");
            then.status(401);
        })
        .await;

    let reads = keys
        .iter()
        .map(|(key, path)| h.ctx.query(key, ApiRequest::get(*path), FetchOptions::default()));
    for result in join_all(reads).await {
        assert_eq!(result, Ok(None));
    }

    assert_eq!(h.navigator.redirects(), 1);
    let mut sent = 0;
    for mock in &rejected {
        sent += mock.hits_async().await;
    }
    assert!((1..=keys.len()).contains(&sent));

    // Latched: further reads do not reach the server.
    let again = h
        .ctx
        .query(
            &query_key!["hopeSnippets"],
            ApiRequest::get("api/hope-snippets"),
            FetchOptions::default(),
        )
        .await;
    assert_eq!(again, Ok(None));
    assert_eq!(hope.hits_async().await, 0);
    assert_eq!(h.navigator.redirects(), 1);
}

#[tokio::test]
async fn throw_error_policy_surfaces_unauthorized_without_retry() {
    let server = MockServer::start_async().await;
    let rejected = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/plan-items");
            then.status(401);
        })
        .await;

    let h = harness(&server, SessionPolicy::ThrowError);
    let result = h
        .ctx
        .query(
            &query_key!["planItems"],
            ApiRequest::get("api/plan-items"),
            FetchOptions::default(),
        )
        .await;

    assert_eq!(result, Err(TransportError::Unauthorized));
    assert_eq!(rejected.hits_async().await, 1);
    assert_eq!(h.navigator.redirects(), 0);
}

#[tokio::test]
async fn login_after_expiry_resumes_requests() {
    let server = MockServer::start_async().await;
    let mut rejected = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/hope-snippets");
            then.status(401);
        })
        .await;

    let h = harness(&server, SessionPolicy::ReturnEmpty);
    let key = query_key!["hopeSnippets"];
    let read = || {
        h.ctx
            .query(&key, ApiRequest::get("api/hope-snippets"), FetchOptions::default())
    };
    assert_eq!(read().await, Ok(None));
    assert!(h.ctx.session().is_expired());

    rejected.delete_async().await;
    let accepted = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/hope-snippets")
                .header("authorization", "Bearer renewed");
            then.status(200).json_body(json!([{"id": 1}]));
        })
        .await;

    h.ctx.login("renewed").expect("login");
    assert_eq!(read().await, Ok(Some(json!([{"id": 1}]))));
    accepted.assert_async().await;
}

#[tokio::test]
async fn subscribers_see_fetch_and_invalidation_events() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/research/saved");
            then.status(200).json_body(json!([]));
        })
        .await;

    let h = harness(&server, SessionPolicy::ThrowError);
    let mut events = h.ctx.cache().subscribe().for_prefix(query_key!["research"]);
    let key = query_key!["research", "saved"];

    h.ctx
        .query(&key, ApiRequest::get("api/research/saved"), FetchOptions::default())
        .await
        .expect("read");
    h.ctx.cache().invalidate(&query_key!["research"]);

    let kinds: Vec<EventKind> = std::iter::from_fn(|| events.try_next())
        .map(|event| {
            assert_eq!(event.key, key);
            event.kind
        })
        .collect();
    assert_eq!(
        kinds,
        vec![EventKind::FetchStarted, EventKind::Fetched, EventKind::Invalidated]
    );
}

#[tokio::test]
async fn read_in_flight_across_relogin_is_not_served_to_new_identity() {
    let server = MockServer::start_async().await;
    let previous = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/plan-items")
                .header("authorization", "Bearer test-token");
            then.status(200)
                .json_body(json!(["previous-user-item"]))
                .delay(Duration::from_millis(300));
        })
        .await;
    let current = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/plan-items")
                .header("authorization", "Bearer second-token");
            then.status(200).json_body(json!(["current-user-item"]));
        })
        .await;

    let h = harness(&server, SessionPolicy::ThrowError);
    let key = query_key!["planItems"];

    let early = tokio::spawn({
        let ctx = h.ctx.clone();
        let key = key.clone();
        async move {
            ctx.query(&key, ApiRequest::get("api/plan-items"), FetchOptions::default())
                .await
        }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    h.ctx.logout().expect("logout");
    h.ctx.login("second-token").expect("login");

    let read = h
        .ctx
        .query(&key, ApiRequest::get("api/plan-items"), FetchOptions::default())
        .await;
    assert_eq!(read, Ok(Some(json!(["current-user-item"]))));

    let early = early.await.expect("join");
    assert_eq!(early, Ok(Some(json!(["previous-user-item"]))));

    let entry = h.ctx.cache().peek(&key).expect("entry");
    assert_eq!(entry.value(), Some(&json!(["current-user-item"])));
    assert!(!entry.is_stale());
    assert_eq!(previous.hits_async().await, 1);
    assert_eq!(current.hits_async().await, 1);
}

#[tokio::test]
async fn failed_mutation_overlapping_refetch_keeps_fetched_list() {
    let server = MockServer::start_async().await;
    let initial = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/documents");
            then.status(200).json_body(json!([{"id": 1}, {"id": 2}]));
        })
        .await;

    let h = harness(&server, SessionPolicy::ThrowError);
    let list = query_key!["documents"];
    let read = || h.ctx.query(&list, ApiRequest::get("api/documents"), FetchOptions::default());
    read().await.expect("initial list");
    initial.delete_async().await;

    let refreshed = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/documents");
            then.status(200)
                .json_body(json!([{"id": 1}, {"id": 2}, {"id": 3}]))
                .delay(Duration::from_millis(100));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/documents/1");
            then.status(500)
                .body("storage unavailable")
                .delay(Duration::from_millis(300));
        })
        .await;

    h.ctx.cache().invalidate(&list);
    let descriptor =
        MutationDescriptor::new(ApiRequest::new(Method::DELETE, "api/documents/1"))
            .invalidates(list.clone())
            .optimistic(Optimistic::new(|_, current| remove_by_id(current, 1)));

    let (fetched, written) = tokio::join!(read(), h.ctx.mutate(descriptor));
    assert_eq!(fetched, Ok(Some(json!([{"id": 1}, {"id": 2}, {"id": 3}]))));
    assert_eq!(written, Err(TransportError::http(500, "storage unavailable")));

    let entry = h.ctx.cache().peek(&list).expect("list entry");
    assert_eq!(entry.value(), Some(&json!([{"id": 1}, {"id": 2}, {"id": 3}])));
    assert!(entry.is_stale());

    let next = read().await.expect("next read");
    assert_eq!(next, Some(json!([{"id": 1}, {"id": 2}, {"id": 3}])));
    assert_eq!(refreshed.hits_async().await, 2);
}
