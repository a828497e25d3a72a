use crate::{BoxStream, Client, RequestOptions, Result};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefEntry {
    #[serde(rename = "Ref")]
    pub reference: String,
    #[serde(rename = "Err", default)]
    pub err: String,
}

/// `refs/local`: every block in the local repo.
pub async fn refs_local(
    client: &Client,
    options: RequestOptions,
) -> Result<BoxStream<'static, RefEntry>> {
    Ok(client.post_ndjson("refs/local", options).await?.typed())
}
