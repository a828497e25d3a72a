use crate::{BoxStream, Client, RequestOptions, Result};
use serde::Deserialize;

/// One line of `ping` output. `time` is in nanoseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PingReply {
    pub success: bool,
    #[serde(default)]
    pub time: u64,
    #[serde(default)]
    pub text: String,
}

/// `ping`: round trips to `peer`, streamed as they complete.
pub async fn ping(
    client: &Client,
    peer: &str,
    count: Option<u32>,
    options: RequestOptions,
) -> Result<BoxStream<'static, PingReply>> {
    let options = options.arg(peer).param_opt("count", count);
    Ok(client.post_ndjson("ping", options).await?.typed())
}
