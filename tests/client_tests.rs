//! Integration tests for the HTTP client core: retries, decoding and the
//! last-exchange trace, all against wiremock servers.

use emailbison_mcp::{Client, Error, RetryPolicy};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Full retry budget, compressed to microsecond-scale sleeps.
fn fast_policy() -> RetryPolicy {
    RetryPolicy::default().backoff_unit(Duration::from_millis(1))
}

fn client_for(server: &MockServer) -> Client {
    Client::builder()
        .base_url(server.uri())
        .unwrap()
        .api_key("test-key")
        .retry_policy(fast_policy())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_get_decodes_json_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/campaigns/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": 1, "name": "Launch"}
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let body = client.get("/api/campaigns/1", None).await.unwrap();

    assert_eq!(body["data"]["name"], "Launch");
}

#[tokio::test]
async fn test_sends_bearer_and_json_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/campaigns"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    client.get("/api/campaigns", None).await.unwrap();
}

#[tokio::test]
async fn test_retries_transient_status_until_success() {
    let mock_server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    // First two attempts fail with 503, the third succeeds.
    Mock::given(method("GET"))
        .and(path("/api/campaigns"))
        .respond_with(move |_req: &wiremock::Request| {
            let count = attempt_count_clone.fetch_add(1, Ordering::SeqCst);
            if count < 2 {
                ResponseTemplate::new(503).set_body_string("try later")
            } else {
                ResponseTemplate::new(200).set_body_json(json!({"data": []}))
            }
        })
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let body = client.get("/api/campaigns", None).await.unwrap();

    assert_eq!(body, json!({"data": []}));
    assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_each_transient_status_is_retried() {
    for status in [429u16, 500, 502, 503, 504] {
        let mock_server = MockServer::start().await;
        let attempt_count = Arc::new(AtomicUsize::new(0));
        let attempt_count_clone = attempt_count.clone();

        Mock::given(method("GET"))
            .and(path("/api/ping"))
            .respond_with(move |_req: &wiremock::Request| {
                if attempt_count_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                    ResponseTemplate::new(status)
                } else {
                    ResponseTemplate::new(200).set_body_json(json!({"ok": true}))
                }
            })
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let body = client.get("/api/ping", None).await.unwrap();

        assert_eq!(body["ok"], true, "status {status} should have been retried");
        assert_eq!(attempt_count.load(Ordering::SeqCst), 2);
    }
}

#[tokio::test]
async fn test_exhausted_retries_return_last_status() {
    let mock_server = MockServer::start().await;

    // 1 initial attempt + 3 retries, then the 503 stands.
    Mock::given(method("GET"))
        .and(path("/api/campaigns"))
        .respond_with(ResponseTemplate::new(503).set_body_string("still down"))
        .expect(4)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client.get("/api/campaigns", None).await;

    match result {
        Err(Error::HttpStatus { status }) => assert_eq!(status.as_u16(), 503),
        other => panic!("Expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_4xx_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/campaigns/99"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such campaign"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client.get("/api/campaigns/99", None).await;

    match result {
        Err(Error::HttpStatus { status }) => assert_eq!(status.as_u16(), 404),
        other => panic!("Expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_501_is_not_retried() {
    let mock_server = MockServer::start().await;

    // 501 is a permanent "not implemented", not a transient failure.
    Mock::given(method("GET"))
        .and(path("/api/campaigns"))
        .respond_with(ResponseTemplate::new(501))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client.get("/api/campaigns", None).await;

    match result {
        Err(Error::HttpStatus { status }) => assert_eq!(status.as_u16(), 501),
        other => panic!("Expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_failure_surfaces_as_network_error() {
    // Bind a listener, take its address, then shut it down. A dropped
    // `MockServer` goes back to wiremock's pool and keeps listening, so a
    // bare TcpListener is needed to get a genuinely dead port.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let uri = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = Client::builder()
        .base_url(uri)
        .unwrap()
        .api_key("test-key")
        .retry_policy(fast_policy())
        .build()
        .unwrap();

    let result = client.get("/api/campaigns", None).await;
    match result {
        Err(Error::Network(_)) => {}
        other => panic!("Expected Network error, got {other:?}"),
    }

    // The trace kept the request side but never saw a response.
    let trace = client.last_trace();
    assert_eq!(trace.method.as_deref(), Some("GET"));
    assert!(trace.url.unwrap().ends_with("/api/campaigns"));
    assert_eq!(trace.status, None);
    assert_eq!(trace.response_preview, None);
}

#[tokio::test]
async fn test_non_json_body_is_wrapped_raw() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("all good\n", "text/plain"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let body = client.get("/api/status", None).await.unwrap();

    assert_eq!(body, json!({"raw": "all good"}));
}

#[tokio::test]
async fn test_json_sniffed_from_body_without_content_type() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/ids"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("[1, 2, 3]", "text/plain"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let body = client.get("/api/ids", None).await.unwrap();

    assert_eq!(body, json!([1, 2, 3]));
}

#[tokio::test]
async fn test_broken_json_with_json_content_type_is_wrapped_raw() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/weird"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("oops not json", "application/json"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let body = client.get("/api/weird", None).await.unwrap();

    assert_eq!(body, json!({"raw": "oops not json"}));
}

#[tokio::test]
async fn test_empty_body_decodes_to_empty_object() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/campaigns/1/leads/attach-leads"))
        .respond_with(ResponseTemplate::new(200).set_body_string("  \n"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let body = client
        .post("/api/campaigns/1/leads/attach-leads", &json!({"lead_ids": [1]}))
        .await
        .unwrap();

    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn test_trace_records_final_failed_exchange() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/campaigns/3"))
        .respond_with(
            ResponseTemplate::new(404).set_body_raw("{\"message\":\"gone\"}", "application/json"),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client
        .get("/api/campaigns/3", Some(&json!({"page": 2})))
        .await;
    assert!(result.is_err());

    let trace = client.last_trace();
    let url = trace.url.unwrap();
    assert!(url.contains("/api/campaigns/3"));
    assert!(url.contains("page=2"));
    assert_eq!(trace.method.as_deref(), Some("GET"));
    assert_eq!(trace.status, Some(404));
    assert_eq!(trace.content_type.as_deref(), Some("application/json"));
    assert_eq!(trace.request_params, Some(json!({"page": 2})));
    assert_eq!(trace.request_json, None);
    assert_eq!(trace.response_preview.as_deref(), Some("{\"message\":\"gone\"}"));
}

#[tokio::test]
async fn test_trace_records_request_body_and_caps_preview() {
    let mock_server = MockServer::start().await;

    let long_body = "x".repeat(5000);
    Mock::given(method("POST"))
        .and(path("/api/campaigns"))
        .respond_with(ResponseTemplate::new(422).set_body_string(long_body))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let request_body = json!({"name": "Launch", "type": "outbound"});
    let result = client.post("/api/campaigns", &request_body).await;
    assert!(result.is_err());

    let trace = client.last_trace();
    assert_eq!(trace.method.as_deref(), Some("POST"));
    assert_eq!(trace.status, Some(422));
    assert_eq!(trace.request_json, Some(request_body));
    assert_eq!(trace.response_preview.unwrap().chars().count(), 2000);
}
