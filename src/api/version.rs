use crate::{Client, RequestOptions, Result};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionInfo {
    pub version: String,
    #[serde(default)]
    pub commit: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub system: String,
    #[serde(default)]
    pub golang: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PeerIdentity {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub agent_version: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub protocols: Vec<String>,
}

/// An offline node reports `"Addresses": null`.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// `version`: daemon and repo versions.
pub async fn version(client: &Client, options: RequestOptions) -> Result<VersionInfo> {
    client.post_json("version", options).await
}

/// `id`: identity of the local node, or of `peer` when given.
pub async fn id(client: &Client, peer: Option<&str>, options: RequestOptions) -> Result<PeerIdentity> {
    let options = match peer {
        Some(p) => options.arg(p),
        None => options,
    };
    client.post_json("id", options).await
}
