//! Integration tests for non-success responses and transport failures

use crate::mock_server::MockDaemon;
use kubo_rpc::{Client, Error, ErrorHook, ErrorResponse, RequestOptions};
use std::sync::Arc;

#[tokio::test]
async fn test_plain_text_error_body_becomes_the_message() {
    let mut daemon = MockDaemon::new().await;
    let _mock = daemon
        .error("shutdown", 403, "text/plain", "403 - Forbidden\n")
        .await;

    let err = daemon
        .client()
        .post("shutdown", RequestOptions::new())
        .await
        .unwrap_err();

    match err {
        Error::Http {
            status,
            message,
            code,
            ..
        } => {
            assert_eq!(status, 403);
            assert_eq!(message, "403 - Forbidden");
            assert_eq!(code, None);
        }
        other => panic!("expected HTTP error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_json_error_body_is_decoded() {
    let mut daemon = MockDaemon::new().await;
    let _mock = daemon
        .error(
            "cat",
            500,
            "application/json; charset=utf-8",
            r#"{"Message":"invalid path \"nope\": path does not have enough components","Code":0,"Type":"error"}"#,
        )
        .await;

    let err = daemon
        .client()
        .post("cat", RequestOptions::new().arg("nope"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    match &err {
        Error::Http { message, code, headers, .. } => {
            assert!(message.starts_with("invalid path"));
            assert_eq!(*code, Some(0));
            assert!(headers.contains_key("content-type"));
        }
        other => panic!("expected HTTP error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_daemon_deadline_is_a_timeout() {
    let mut daemon = MockDaemon::new().await;
    let _mock = daemon
        .error(
            "routing/findprovs",
            500,
            "application/json",
            r#"{"Message":"context deadline exceeded","Code":0,"Type":"error"}"#,
        )
        .await;

    let err = daemon
        .client()
        .post("routing/findprovs", RequestOptions::new().timeout("1s"))
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "got {:?}", err);
}

#[tokio::test]
async fn test_empty_error_body_uses_the_status_reason() {
    let mut daemon = MockDaemon::new().await;
    let _mock = daemon.error("nope", 404, "text/plain", "").await;

    let err = daemon
        .client()
        .post("nope", RequestOptions::new())
        .await
        .unwrap_err();
    match err {
        Error::Http { status, message, .. } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Not Found");
        }
        other => panic!("expected HTTP error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_errors_can_be_returned_as_responses() {
    let mut daemon = MockDaemon::new().await;
    let _mock = daemon
        .error("pin/add", 500, "text/plain", "pin: not pinned")
        .await;

    let response = daemon
        .client()
        .post("pin/add", RequestOptions::new().throw_http_errors(false))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 500);
    assert!(!response.is_success());
    assert_eq!(response.text().await.unwrap(), "pin: not pinned");
}

#[tokio::test]
async fn test_error_hook_replaces_classification() {
    let mut daemon = MockDaemon::new().await;
    let _mock = daemon.error("key/gen", 500, "text/plain", "key exists").await;

    let hook: ErrorHook = Arc::new(|resp: &ErrorResponse| {
        if resp.status == 500 && resp.body.as_ref() == b"key exists" {
            Some(Error::invalid_resource("duplicate key"))
        } else {
            None
        }
    });
    let err = daemon
        .client()
        .post("key/gen", RequestOptions::new().handle_error(hook))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidResource { .. }));

    // a hook that declines falls through to the default
    let decline: ErrorHook = Arc::new(|_: &ErrorResponse| None);
    let err = daemon
        .client()
        .post("key/gen", RequestOptions::new().handle_error(decline))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_connection_refused_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = Client::builder()
        .base_url(format!("http://{}", addr))
        .build()
        .unwrap();
    let err = client.post("version", RequestOptions::new()).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_bad_resources_fail_before_sending() {
    let client = Client::builder().base_url("http://127.0.0.1:1").build().unwrap();

    let err = client.post("", RequestOptions::new()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidResource { .. }));

    let err = client
        .post("ftp://example.com/file", RequestOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidResource { .. }));
}
