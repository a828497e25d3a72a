//! Integration tests for single-value, NDJSON and byte responses

use crate::mock_server::MockDaemon;
use futures::StreamExt;
use kubo_rpc::api::{self, CatOptions};
use bytes::Bytes;
use kubo_rpc::{Client, RequestBody, RequestOptions, StreamTermination};
use mockito::Matcher;
use serde_json::json;
use tokio_stream::wrappers::ReceiverStream;

#[tokio::test]
async fn test_version_single_json_value() {
    let mut daemon = MockDaemon::new().await;
    let mock = daemon
        .json(
            "version",
            r#"{"Version":"0.30.0","Commit":"","Repo":"16","System":"amd64/linux","Golang":"go1.22.4"}"#,
        )
        .await;

    let client = daemon.client();
    let version = api::version(&client, RequestOptions::new()).await.unwrap();

    assert_eq!(version.version, "0.30.0");
    assert_eq!(version.repo, "16");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_args_and_params_reach_the_query() {
    let mut daemon = MockDaemon::new().await;
    let mock = daemon
        .server
        .mock("POST", "/api/v0/ping")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("arg".into(), "12D3KooWPeer".into()),
            Matcher::UrlEncoded("count".into(), "2".into()),
            Matcher::UrlEncoded("stream-channels".into(), "true".into()),
        ]))
        .with_status(200)
        .with_body(concat!(
            "{\"Success\":true,\"Time\":0,\"Text\":\"PING 12D3KooWPeer.\"}\n",
            "{\"Success\":true,\"Time\":1500000,\"Text\":\"\"}\n",
            "{\"Success\":true,\"Time\":1700000,\"Text\":\"\"}\n",
        ))
        .create_async()
        .await;

    let client = daemon.client();
    // camelCase keys are sent kebab-cased by default
    let options = RequestOptions::new().param("streamChannels", true);
    let replies: Vec<_> = api::ping(&client, "12D3KooWPeer", Some(2), options)
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(replies.len(), 3);
    let replies: Vec<_> = replies.into_iter().map(|r| r.unwrap()).collect();
    assert!(replies.iter().all(|r| r.success));
    assert_eq!(replies[1].time, 1_500_000);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_timeout_is_forwarded_to_the_daemon() {
    let mut daemon = MockDaemon::new().await;
    let mock = daemon
        .server
        .mock("POST", "/api/v0/id")
        .match_query(Matcher::UrlEncoded("timeout".into(), "5000ms".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ID":"12D3KooWSelf","PublicKey":"CAE","Addresses":[],"AgentVersion":"kubo/0.30.0","Protocols":[]}"#)
        .create_async()
        .await;

    let client = daemon.client();
    let id = api::id(&client, None, RequestOptions::new().timeout(5000u64))
        .await
        .unwrap();

    assert_eq!(id.id, "12D3KooWSelf");
    assert_eq!(id.agent_version, "kubo/0.30.0");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_ndjson_records_in_order() {
    let mut daemon = MockDaemon::new().await;
    let _mock = daemon
        .ndjson(
            "refs/local",
            &[
                r#"{"Ref":"bafkreia","Err":""}"#,
                r#"{"Ref":"bafkreib","Err":""}"#,
                r#"{"Ref":"bafkreic","Err":""}"#,
            ],
        )
        .await;

    let client = daemon.client();
    let refs: Vec<String> = api::refs_local(&client, RequestOptions::new())
        .await
        .unwrap()
        .map(|r| r.unwrap().reference)
        .collect()
        .await;

    assert_eq!(refs, vec!["bafkreia", "bafkreib", "bafkreic"]);
}

#[tokio::test]
async fn test_ndjson_transform_and_termination() {
    let mut daemon = MockDaemon::new().await;
    let _mock = daemon
        .ndjson(
            "repo/gc",
            &[r#"{"Key":{"/":"bafkreia"}}"#, r#"{"Error":"block in use"}"#],
        )
        .await;

    let client = daemon.client();
    let mut stream = client
        .post_ndjson(
            "repo/gc",
            RequestOptions::new().transform(|v| Ok(json!({ "wrapped": v }))),
        )
        .await
        .unwrap();

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first, json!({"wrapped": {"Key": {"/": "bafkreia"}}}));
    let second = stream.next().await.unwrap().unwrap();
    assert_eq!(second["wrapped"]["Error"], "block in use");
    assert!(stream.next().await.is_none());
    assert_eq!(stream.termination(), Some(StreamTermination::EndedCleanly));
}

#[tokio::test]
async fn test_repo_gc_flattens_records() {
    let mut daemon = MockDaemon::new().await;
    let mock = daemon
        .server
        .mock("POST", "/api/v0/repo/gc")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("stream-errors".into(), "true".into()),
            Matcher::UrlEncoded("quiet".into(), "false".into()),
        ]))
        .with_status(200)
        .with_body("{\"Key\":{\"/\":\"bafkreia\"}}\n{\"Error\":\"block in use\"}\n")
        .create_async()
        .await;

    let client = daemon.client();
    let results: Vec<_> = api::repo_gc(&client, false, RequestOptions::new())
        .await
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
        .await;

    assert_eq!(results[0].cid.as_deref(), Some("bafkreia"));
    assert_eq!(results[1].error.as_deref(), Some("block in use"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_cat_bytes_with_range() {
    let mut daemon = MockDaemon::new().await;
    let content = "hello from the merkle dag\n".repeat(1000);
    let mock = daemon
        .server
        .mock("POST", "/api/v0/cat")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("arg".into(), "/ipfs/bafybeigdyr".into()),
            Matcher::UrlEncoded("offset".into(), "10".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "text/plain")
        .with_body(content.clone())
        .create_async()
        .await;

    let client = daemon.client();
    let bytes = api::cat(
        &client,
        "/ipfs/bafybeigdyr",
        CatOptions {
            offset: Some(10),
            length: None,
        },
        RequestOptions::new(),
    )
    .await
    .unwrap()
    .collect_bytes()
    .await
    .unwrap();

    assert_eq!(bytes.len(), content.len());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_response_accessors() {
    let mut daemon = MockDaemon::new().await;
    let _mock = daemon.json("version", r#"{"Version":"0.30.0"}"#).await;

    let client = daemon.client();
    let response = client.post("version", RequestOptions::new()).await.unwrap();
    assert!(response.is_success());
    assert_eq!(response.url().path(), "/api/v0/version");
    assert!(!response.request_id().is_empty());
    assert_eq!(response.text().await.unwrap(), r#"{"Version":"0.30.0"}"#);
}

#[tokio::test]
async fn test_request_id_header_is_sent() {
    let mut daemon = MockDaemon::new().await;
    let mock = daemon
        .command("version")
        .match_header("x-request-id", Matcher::Regex("^[0-9a-f-]{36}$".into()))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let client = daemon.client();
    client.post("version", RequestOptions::new()).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_streaming_upload_body() {
    for buffered in [false, true] {
        let mut daemon = MockDaemon::new().await;
        let mock = daemon
            .command("block/put")
            .match_body("hello streaming world")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"Key":"bafkreih","Size":21}"#)
            .create_async()
            .await;

        let (tx, rx) = tokio::sync::mpsc::channel::<Bytes>(4);
        tokio::spawn(async move {
            for part in ["hello ", "streaming ", "world"] {
                if tx.send(Bytes::from(part)).await.is_err() {
                    return;
                }
            }
        });
        let body = RequestBody::Stream(Box::pin(ReceiverStream::new(rx).map(Ok::<Bytes, kubo_rpc::Error>)));

        let client = Client::builder()
            .base_url(daemon.url())
            .buffer_stream_uploads(buffered)
            .build()
            .unwrap();
        let stat: serde_json::Value = client
            .post("block/put", RequestOptions::new().body(body))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(stat["Size"], 21, "buffered = {}", buffered);
        mock.assert_async().await;
    }
}
