use std::io;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use futures::{stream, Stream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt};

use chunkvault_protocol::{
    endpoints, Code, FrameCodec, ListMetadataResponse, Status, UploadInfo, UploadMessage,
    UploadResponse, FRAME_CONTENT_TYPE, TIMEOUT_HEADER,
};

/// HTTP client for a chunkvault server.
pub struct ChunkvaultClient {
    base_url: String,
    http: reqwest::Client,
}

impl ChunkvaultClient {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch the server's listing.
    pub async fn list(&self, timeout: Duration) -> anyhow::Result<ListMetadataResponse> {
        let response = self
            .http
            .get(self.url(endpoints::METADATA))
            .header(TIMEOUT_HEADER, timeout.as_millis().to_string())
            .timeout(timeout)
            .send()
            .await
            .context("list request failed")?;
        decode(response).await
    }

    /// Stream `reader` to the server as one upload of `chunk_size`-byte chunks.
    pub async fn upload<R>(
        &self,
        info: UploadInfo,
        reader: R,
        chunk_size: usize,
        timeout: Duration,
    ) -> anyhow::Result<UploadResponse>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let body = upload_frames(info, reader, chunk_size)?;
        let response = self
            .http
            .post(self.url(endpoints::UPLOAD))
            .header(reqwest::header::CONTENT_TYPE, FRAME_CONTENT_TYPE)
            .header(TIMEOUT_HEADER, timeout.as_millis().to_string())
            .timeout(timeout)
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await
            .context("upload request failed")?;
        decode(response).await
    }

    /// Upload a file from disk. The name defaults to the file name and the
    /// content type to its extension.
    pub async fn upload_file(
        &self,
        path: &Path,
        name: Option<String>,
        content_type: Option<String>,
        chunk_size: usize,
        timeout: Duration,
    ) -> anyhow::Result<UploadResponse> {
        let info = upload_info_for(path, name, content_type)?;
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("cannot open {}", path.display()))?;
        tracing::info!(file = %path.display(), name = %info.name, "uploading");
        self.upload(info, file, chunk_size, timeout).await
    }
}

pub fn upload_info_for(
    path: &Path,
    name: Option<String>,
    content_type: Option<String>,
) -> anyhow::Result<UploadInfo> {
    let name = match name {
        Some(name) => name,
        None => path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_owned)
            .with_context(|| format!("{} has no usable file name", path.display()))?,
    };
    let content_type = content_type.unwrap_or_else(|| {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default()
    });
    Ok(UploadInfo { content_type, name })
}

/// The framed request body: one `Info` frame, then a `Chunk` frame per read.
pub fn upload_frames<R>(
    info: UploadInfo,
    reader: R,
    chunk_size: usize,
) -> anyhow::Result<impl Stream<Item = io::Result<Bytes>> + Send + 'static>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let head = Bytes::from(FrameCodec::encode(&UploadMessage::Info(info))?);
    let chunks = stream::try_unfold((reader, vec![0u8; chunk_size]), |(mut reader, mut buf)| async move {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        tracing::debug!(size = n, "sending chunk");
        let frame = FrameCodec::encode(&UploadMessage::Chunk(buf[..n].to_vec())).map_err(io::Error::other)?;
        Ok::<_, io::Error>(Some((Bytes::from(frame), (reader, buf))))
    });
    Ok(stream::once(async move { Ok::<_, io::Error>(head) }).chain(chunks.into_stream()))
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> anyhow::Result<T> {
    let http_status = response.status();
    let body = response.bytes().await.context("failed to read response body")?;
    if http_status.is_success() {
        return serde_json::from_slice(&body).context("malformed response body");
    }
    let status = serde_json::from_slice::<Status>(&body).unwrap_or_else(|_| {
        Status::new(
            Code::Unknown,
            format!("HTTP {http_status}: {}", String::from_utf8_lossy(&body)),
        )
    });
    Err(status.into())
}
