use crate::{ByteStream, Client, RequestOptions, Result};

/// `block/get`: raw bytes of one block.
pub async fn block_get(client: &Client, cid: &str, options: RequestOptions) -> Result<ByteStream> {
    client.post_bytes("block/get", options.arg(cid)).await
}
