mod fake_http;

use deployctl_core::cdn::{CdnCredentials, CloudflareClient};
use deployctl_core::contract::CachePurger;
use deployctl_core::error::CdnError;
use fake_http::{json, FakeServer};
use serde_json::json as json_value;

fn client(base_url: &str) -> CloudflareClient {
    CloudflareClient::with_base_url(
        CdnCredentials {
            email: "ops@example.com".to_string(),
            api_key: "cf-key".to_string(),
        },
        base_url,
    )
}

#[tokio::test]
async fn zone_lookup_queries_by_name_with_auth_headers() {
    let server = FakeServer::bind().await;
    let base = server.base_url.clone();
    let requests = server.serve(vec![json(
        "200 OK",
        r#"{"success": true, "errors": [], "messages": [],
            "result": [{"id": "zone-123", "name": "example.com", "status": "active"}]}"#,
    )]);

    let zone_id = client(&base).find_zone_id("example.com").await.unwrap();

    assert_eq!(zone_id.as_deref(), Some("zone-123"));
    let requests = requests.await.unwrap();
    assert_eq!(requests[0].request_line, "GET /zones?name=example.com HTTP/1.1");
    assert_eq!(requests[0].header("x-auth-email"), Some("ops@example.com"));
    assert_eq!(requests[0].header("x-auth-key"), Some("cf-key"));
}

#[tokio::test]
async fn empty_zone_list_means_not_found() {
    let server = FakeServer::bind().await;
    let base = server.base_url.clone();
    let requests = server.serve(vec![json(
        "200 OK",
        r#"{"success": true, "errors": [], "messages": [], "result": []}"#,
    )]);

    assert_eq!(client(&base).find_zone_id("example.org").await.unwrap(), None);
    requests.await.unwrap();
}

#[tokio::test]
async fn purge_posts_the_hostname_list() {
    let server = FakeServer::bind().await;
    let base = server.base_url.clone();
    let requests = server.serve(vec![json(
        "200 OK",
        r#"{"success": true, "errors": [], "messages": [], "result": {"id": "zone-123"}}"#,
    )]);

    client(&base)
        .purge_hosts("zone-123", &["www.example.com".to_string()])
        .await
        .expect("purge should succeed");

    let requests = requests.await.unwrap();
    let purge = &requests[0];
    assert_eq!(purge.request_line, "POST /zones/zone-123/purge_cache HTTP/1.1");
    assert_eq!(purge.header("content-type"), Some("application/json"));
    assert_eq!(purge.header("x-auth-key"), Some("cf-key"));
    let body: serde_json::Value = serde_json::from_str(&purge.body).unwrap();
    assert_eq!(body, json_value!({ "hosts": ["www.example.com"] }));
}

#[tokio::test]
async fn unsuccessful_purge_reports_api_errors() {
    let server = FakeServer::bind().await;
    let base = server.base_url.clone();
    let requests = server.serve(vec![json(
        "400 Bad Request",
        r#"{"success": false, "result": null, "messages": [],
            "errors": [{"code": 1012,
                        "message": "Request must contain one of \"hosts\" or \"files\""}]}"#,
    )]);

    let err = client(&base)
        .purge_hosts("zone-123", &["www.example.com".to_string()])
        .await
        .unwrap_err();

    match err {
        CdnError::Api { status, message } => {
            assert_eq!(status, 400);
            assert!(message.starts_with("[1012] Request must contain"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    requests.await.unwrap();
}

#[tokio::test]
async fn success_false_with_ok_status_is_still_an_error() {
    let server = FakeServer::bind().await;
    let base = server.base_url.clone();
    let requests = server.serve(vec![json(
        "200 OK",
        r#"{"success": false, "errors": [], "messages": [], "result": null}"#,
    )]);

    let err = client(&base).find_zone_id("example.com").await.unwrap_err();

    assert!(matches!(err, CdnError::Api { status: 200, .. }));
    requests.await.unwrap();
}
