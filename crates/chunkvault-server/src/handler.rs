use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, BodyDataStream};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Json;
use futures::StreamExt;
use tokio::sync::oneshot;

use chunkvault_protocol::{
    FrameDecoder, HealthResponse, ListMetadataResponse, ProtocolError, UploadMessage, UploadResponse,
    CHUNK_HEADER_SIZE, TIMEOUT_HEADER,
};

use crate::error::{ServerError, ServerResult};
use crate::service::IngestionService;
use crate::stream::{StreamError, UploadStream};

/// Health check handler.
pub async fn health_handler(State(service): State<Arc<IngestionService>>) -> Json<HealthResponse> {
    Json(service.health())
}

/// `ListMetadata` over HTTP.
pub async fn list_metadata_handler(
    State(service): State<Arc<IngestionService>>,
    headers: HeaderMap,
) -> ServerResult<Json<ListMetadataResponse>> {
    let ctx = service.call_context(requested_timeout(&headers)?);
    service.list_metadata(&ctx).await.map(Json)
}

/// `Upload` over HTTP: the request body is a sequence of frames.
pub async fn upload_handler(
    State(service): State<Arc<IngestionService>>,
    headers: HeaderMap,
    body: Body,
) -> ServerResult<Json<UploadResponse>> {
    let ctx = service.call_context(requested_timeout(&headers)?);
    let (tx, rx) = oneshot::channel();
    let stream = HttpUploadStream::new(body, tx, service.max_payload_size());
    service.upload(&ctx, stream).await?;
    rx.await
        .map(Json)
        .map_err(|_| ServerError::Internal("upload finished without a response".into()))
}

fn requested_timeout(headers: &HeaderMap) -> ServerResult<Option<Duration>> {
    let Some(value) = headers.get(TIMEOUT_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|ms| Some(Duration::from_millis(ms)))
        .ok_or_else(|| ServerError::Protocol(format!("invalid {TIMEOUT_HEADER} header")))
}

/// Frame payload allowance that always fits an info message.
const MIN_FRAME_LIMIT: usize = 64 * 1024;

/// Upload stream reading frames out of an HTTP request body.
///
/// A frame whose length prefix announces more than the payload ceiling is
/// refused before its body is buffered. The response is handed back to the
/// handler through a oneshot channel and written once the handler returns.
pub struct HttpUploadStream {
    body: BodyDataStream,
    decoder: FrameDecoder,
    max_payload_size: usize,
    response: oneshot::Sender<UploadResponse>,
}

impl HttpUploadStream {
    pub fn new(body: Body, response: oneshot::Sender<UploadResponse>, max_payload_size: usize) -> Self {
        let frame_limit = max_payload_size
            .saturating_add(CHUNK_HEADER_SIZE)
            .max(MIN_FRAME_LIMIT);
        Self {
            body: body.into_data_stream(),
            decoder: FrameDecoder::with_max_frame(frame_limit),
            max_payload_size,
            response,
        }
    }

    fn decode_error(&self, err: ProtocolError) -> StreamError {
        match err {
            ProtocolError::MessageTooLarge { size, .. } => StreamError::TooLarge {
                size: size.saturating_sub(CHUNK_HEADER_SIZE),
                max: self.max_payload_size,
            },
            other => StreamError::Malformed(other.to_string()),
        }
    }
}

#[async_trait]
impl UploadStream for HttpUploadStream {
    async fn recv(&mut self) -> Result<Option<UploadMessage>, StreamError> {
        loop {
            match self.decoder.next_message() {
                Ok(Some(msg)) => return Ok(Some(msg)),
                Ok(None) => {}
                Err(e) => return Err(self.decode_error(e)),
            }
            match self.body.next().await {
                Some(Ok(bytes)) => self.decoder.extend(&bytes),
                Some(Err(e)) => return Err(StreamError::Transport(e.to_string())),
                None => {
                    self.decoder
                        .finish()
                        .map_err(|e| StreamError::Malformed(e.to_string()))?;
                    return Ok(None);
                }
            }
        }
    }

    async fn send_and_close(self, response: UploadResponse) -> Result<(), StreamError> {
        self.response.send(response).map_err(|_| StreamError::Closed)
    }
}
