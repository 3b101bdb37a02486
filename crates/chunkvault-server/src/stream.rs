//! The client-streaming call abstraction the ingestion service drives.
//!
//! A stream yields the peer's messages in send order and accepts exactly one
//! terminal response. [`UploadStream::send_and_close`] takes the stream by
//! value, so a second response cannot be expressed.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use chunkvault_protocol::{UploadInfo, UploadMessage, UploadResponse};

/// Failures reported by the transport underneath a stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// The peer went away or cancelled the call.
    #[error("call cancelled by peer")]
    Cancelled,
    /// The transport failed while reading.
    #[error("transport error: {0}")]
    Transport(String),
    /// Bytes arrived that do not form a valid message.
    #[error("malformed message: {0}")]
    Malformed(String),
    /// A single message would exceed the payload ceiling on its own.
    #[error("message of {size} bytes exceeds the {max} byte payload limit")]
    TooLarge { size: usize, max: usize },
    /// The other half is no longer listening.
    #[error("stream closed")]
    Closed,
}

/// Server half of an upload call.
#[async_trait]
pub trait UploadStream: Send {
    /// Next message, or `Ok(None)` once the peer has cleanly finished sending.
    async fn recv(&mut self) -> Result<Option<UploadMessage>, StreamError>;

    /// Deliver the single terminal response and close the call.
    async fn send_and_close(self, response: UploadResponse) -> Result<(), StreamError>;
}

enum Event {
    Message(UploadMessage),
    End,
    Fail(StreamError),
}

/// Create an in-process upload call.
///
/// Useful for embedding the service without a network binding and for
/// tests. Dropping the [`UploadSender`] without calling
/// [`UploadSender::close_and_recv`] is seen by the server as cancellation.
pub fn channel(buffer: usize) -> (UploadSender, ChannelUploadStream) {
    let (tx, rx) = mpsc::channel(buffer);
    let (response_tx, response_rx) = oneshot::channel();
    (
        UploadSender {
            tx,
            response: response_rx,
        },
        ChannelUploadStream {
            rx,
            response: response_tx,
        },
    )
}

/// Server half of an in-process upload call.
pub struct ChannelUploadStream {
    rx: mpsc::Receiver<Event>,
    response: oneshot::Sender<UploadResponse>,
}

#[async_trait]
impl UploadStream for ChannelUploadStream {
    async fn recv(&mut self) -> Result<Option<UploadMessage>, StreamError> {
        match self.rx.recv().await {
            Some(Event::Message(msg)) => Ok(Some(msg)),
            Some(Event::End) => Ok(None),
            Some(Event::Fail(err)) => Err(err),
            None => Err(StreamError::Cancelled),
        }
    }

    async fn send_and_close(self, response: UploadResponse) -> Result<(), StreamError> {
        self.response.send(response).map_err(|_| StreamError::Closed)
    }
}

/// Client half of an in-process upload call.
pub struct UploadSender {
    tx: mpsc::Sender<Event>,
    response: oneshot::Receiver<UploadResponse>,
}

impl UploadSender {
    /// Send one message. Fails with [`StreamError::Closed`] once the server
    /// has stopped reading.
    pub async fn send(&self, msg: UploadMessage) -> Result<(), StreamError> {
        self.push(Event::Message(msg)).await
    }

    pub async fn info(
        &self,
        content_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<(), StreamError> {
        self.send(UploadMessage::Info(UploadInfo {
            content_type: content_type.into(),
            name: name.into(),
        }))
        .await
    }

    pub async fn chunk(&self, data: impl Into<Vec<u8>>) -> Result<(), StreamError> {
        self.send(UploadMessage::Chunk(data.into())).await
    }

    /// Make the server's next receive fail with `err`.
    pub async fn fail(&self, err: StreamError) -> Result<(), StreamError> {
        self.push(Event::Fail(err)).await
    }

    /// Signal end of stream and wait for the terminal response.
    ///
    /// Fails with [`StreamError::Closed`] if the server ended the call with
    /// an error instead.
    pub async fn close_and_recv(self) -> Result<UploadResponse, StreamError> {
        // The server may already be gone; the response channel reports it.
        let _ = self.tx.send(Event::End).await;
        self.response.await.map_err(|_| StreamError::Closed)
    }

    async fn push(&self, event: Event) -> Result<(), StreamError> {
        self.tx.send(event).await.map_err(|_| StreamError::Closed)
    }
}
