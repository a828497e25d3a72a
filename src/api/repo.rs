use crate::{BoxStream, Client, RequestOptions, Result};
use serde::Deserialize;
use serde_json::{json, Value};

/// One `repo/gc` event: a removed block, or a per-block error.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GcResult {
    pub cid: Option<String>,
    pub error: Option<String>,
}

/// Wire form is `{"Key":{"/":"<cid>"}}` or `{"Error":"..."}`.
fn flatten(record: Value) -> Result<Value> {
    let cid = record
        .get("Key")
        .and_then(|k| k.get("/"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let error = record
        .get("Error")
        .and_then(Value::as_str)
        .filter(|e| !e.is_empty())
        .map(str::to_string);
    Ok(json!({ "cid": cid, "error": error }))
}

/// `repo/gc`: removed blocks streamed as the collector finds them.
pub async fn repo_gc(
    client: &Client,
    quiet: bool,
    options: RequestOptions,
) -> Result<BoxStream<'static, GcResult>> {
    let options = options
        .param("stream-errors", true)
        .param("quiet", quiet)
        .transform(flatten);
    Ok(client.post_ndjson("repo/gc", options).await?.typed())
}
