use crate::{ByteStream, Client, RequestOptions, Result};

/// Byte range of a `cat`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatOptions {
    pub offset: Option<u64>,
    pub length: Option<u64>,
}

/// `cat`: file contents at `path` as a raw byte stream.
pub async fn cat(
    client: &Client,
    path: &str,
    range: CatOptions,
    options: RequestOptions,
) -> Result<ByteStream> {
    let options = options
        .arg(path)
        .param_opt("offset", range.offset)
        .param_opt("length", range.length);
    client.post_bytes("cat", options).await
}
