//! Integration tests for errors reported after a successful response head

use crate::mock_server::{chunk, stalled_daemon, ScriptedTransport};
use futures::StreamExt;
use http::{Method, StatusCode};
use kubo_rpc::api;
use kubo_rpc::{Client, Error, RequestOptions, StreamTermination};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_trailer_error_after_records() {
    let transport = Arc::new(
        ScriptedTransport::new(StatusCode::OK)
            .header("trailer", "X-Stream-Error")
            .data("{\"Key\":{\"/\":\"bafkreia\"}}\n{\"Key\":")
            .data("{\"/\":\"bafkreib\"}}\n")
            .trailer("x-stream-error", "repo: could not acquire lock"),
    );
    let client = transport.client();

    let results: Vec<_> = api::repo_gc(&client, false, RequestOptions::new())
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().cid.as_deref(), Some("bafkreia"));
    assert_eq!(results[1].as_ref().unwrap().cid.as_deref(), Some("bafkreib"));
    match &results[2] {
        Err(Error::StreamTrailer { message, code }) => {
            assert_eq!(message, "repo: could not acquire lock");
            assert_eq!(*code, None);
        }
        other => panic!("expected trailer error, got {:?}", other),
    }

    let seen = transport.requests();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, Method::POST);
    assert_eq!(seen[0].url.path(), "/api/v0/repo/gc");
    assert!(seen[0]
        .url
        .query_pairs()
        .any(|(k, v)| k == "stream-errors" && v == "true"));
}

#[tokio::test]
async fn test_json_trailer_payload() {
    let transport = Arc::new(
        ScriptedTransport::new(StatusCode::OK)
            .data("{\"Extra\":\"x\"}\n")
            .trailer("x-stream-error", r#"{"Message":"dht: query failed","Code":1}"#),
    );

    let mut stream = transport
        .client()
        .post_ndjson("routing/findprovs", RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(stream.next().await.unwrap().unwrap(), json!({"Extra": "x"}));
    let err = stream.next().await.unwrap().unwrap_err();
    assert!(err.is_stream_trailer());
    assert!(stream.next().await.is_none());
    assert_eq!(
        stream.termination(),
        Some(StreamTermination::EndedWithTrailerError {
            message: "dht: query failed".to_string(),
            code: Some(1),
        })
    );
}

#[tokio::test]
async fn test_stream_error_on_response_head() {
    let transport = Arc::new(
        ScriptedTransport::new(StatusCode::OK)
            .header("x-stream-error", "blockstore: block not found")
            .data("partial"),
    );

    let mut bytes = transport
        .client()
        .post_bytes("cat", RequestOptions::new().arg("bafkreia"))
        .await
        .unwrap();

    assert_eq!(bytes.next().await.unwrap().unwrap(), "partial");
    match bytes.next().await {
        Some(Err(Error::StreamTrailer { message, .. })) => {
            assert_eq!(message, "blockstore: block not found")
        }
        other => panic!("expected stream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unrelated_trailers_end_cleanly() {
    let transport = Arc::new(
        ScriptedTransport::new(StatusCode::OK)
            .data("{\"a\":1}\n")
            .trailer("x-checksum", "abc"),
    );

    let records = transport
        .client()
        .post_ndjson("refs/local", RequestOptions::new())
        .await
        .unwrap()
        .try_collect_vec()
        .await
        .unwrap();
    assert_eq!(records, vec![json!({"a": 1})]);
}

#[tokio::test]
async fn test_non_success_status_from_transport_is_classified() {
    let transport = Arc::new(
        ScriptedTransport::new(StatusCode::BAD_REQUEST)
            .data(r#"{"Message":"argument \"key\" is required","Code":1,"Type":"error"}"#),
    );

    let err = transport
        .client()
        .post("name/resolve", RequestOptions::new())
        .await
        .unwrap_err();
    match err {
        Error::Http {
            status,
            message,
            code,
            ..
        } => {
            assert_eq!(status, 400);
            assert_eq!(message, "argument \"key\" is required");
            assert_eq!(code, Some(1));
        }
        other => panic!("expected HTTP error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_chunked_trailer_over_http() {
    let response = format!(
        "{}{}{}{}",
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
         transfer-encoding: chunked\r\ntrailer: X-Stream-Error\r\n\r\n",
        chunk("{\"n\":1}\n{\"n\""),
        chunk(":2}\n"),
        "0\r\nX-Stream-Error: {\"Message\":\"repo: lock held\",\"Code\":0}\r\n\r\n",
    );
    let client = Client::builder()
        .base_url(stalled_daemon(response).await)
        .build()
        .unwrap();

    let mut stream = client
        .post_ndjson("repo/gc", RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(stream.next().await.unwrap().unwrap(), json!({"n": 1}));
    assert_eq!(stream.next().await.unwrap().unwrap(), json!({"n": 2}));
    match stream.next().await {
        Some(Err(Error::StreamTrailer { message, code })) => {
            assert_eq!(message, "repo: lock held");
            assert_eq!(code, Some(0));
        }
        other => panic!("expected trailer error, got {:?}", other),
    }
    assert!(stream.next().await.is_none());
    assert_eq!(
        stream.termination(),
        Some(StreamTermination::EndedWithTrailerError {
            message: "repo: lock held".to_string(),
            code: Some(0),
        })
    );
}
