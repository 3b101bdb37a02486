use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use chunkvault_gate::{AdmissionController, GateClass};
use chunkvault_protocol::{
    Code, HealthResponse, ListMetadataResponse, UploadInfo, UploadMessage, UploadResponse, PROTOCOL_VERSION,
};
use chunkvault_store::{validate_name, ContentStore};

use crate::error::{ServerError, ServerResult};
use crate::stream::UploadStream;

// ---------------------------------------------------------------------------
// CallContext
// ---------------------------------------------------------------------------

/// Per-call context propagated from the transport.
///
/// Cancellation needs no field here: when the transport abandons a call it
/// drops the call's future, which releases everything it holds.
#[derive(Clone, Copy, Debug, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context with no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context expiring `timeout` from now. A timeout too far out to be
    /// represented means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self { deadline: Some(deadline) }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Run `fut` bounded by this call's deadline.
    async fn bound<F: std::future::Future>(&self, fut: F) -> ServerResult<F::Output> {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, fut)
                .await
                .map_err(|_| ServerError::DeadlineExceeded),
            None => Ok(fut.await),
        }
    }
}

// ---------------------------------------------------------------------------
// Upload state machine
// ---------------------------------------------------------------------------

/// Progress of one upload call.
///
/// `Completed` and `Aborted` are not represented: the call returns `Ok` or
/// `Err` from whichever state it was in.
#[derive(Debug)]
enum UploadState {
    AwaitingInfo,
    ReceivingChunks { info: UploadInfo, data: Vec<u8> },
    Finalizing { info: UploadInfo, data: Vec<u8> },
}

// ---------------------------------------------------------------------------
// IngestionService
// ---------------------------------------------------------------------------

/// Request handler for the two operations chunkvault exposes.
pub struct IngestionService {
    store: Arc<dyn ContentStore>,
    gates: AdmissionController,
    max_payload_size: usize,
    default_timeout: Option<Duration>,
}

impl IngestionService {
    pub fn new(store: Arc<dyn ContentStore>, gates: AdmissionController, max_payload_size: usize) -> Self {
        Self {
            store,
            gates,
            max_payload_size,
            default_timeout: None,
        }
    }

    /// Deadline applied when the caller does not supply one.
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn gates(&self) -> &AdmissionController {
        &self.gates
    }

    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }

    /// Build a context from the caller's requested timeout, falling back to
    /// the service default.
    pub fn call_context(&self, requested: Option<Duration>) -> CallContext {
        match requested.or(self.default_timeout) {
            Some(timeout) => CallContext::with_timeout(timeout),
            None => CallContext::new(),
        }
    }

    /// Liveness report with the configured limits and current upload load.
    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            protocol_version: PROTOCOL_VERSION,
            max_payload_size: self.max_payload_size,
            read_limit: self.gates.gate(GateClass::Read).limit(),
            upload_limit: self.gates.gate(GateClass::Upload).limit(),
            uploads_in_flight: self.gates.in_use(GateClass::Upload),
        }
    }

    /// List what is stored on disk.
    pub async fn list_metadata(&self, ctx: &CallContext) -> ServerResult<ListMetadataResponse> {
        let result = self.run_list(ctx).await;
        if let Err(err) = &result {
            log_failure("list", err);
        }
        result
    }

    async fn run_list(&self, ctx: &CallContext) -> ServerResult<ListMetadataResponse> {
        let permit = self.gates.try_acquire(GateClass::Read)?;
        let store = Arc::clone(&self.store);
        // The permit lives as long as the scan, even if this call gives up on it.
        let scan = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            store.list_all()
        });
        let items = ctx
            .bound(scan)
            .await?
            .map_err(|e| ServerError::Internal(format!("list task failed: {e}")))?
            .map_err(|e| ServerError::Internal(format!("cannot list stored items: {e}")))?;
        Ok(ListMetadataResponse { items })
    }

    /// Drive one upload call to completion.
    ///
    /// On success the terminal response has been sent on `stream`. On error
    /// nothing was sent and nothing was persisted; the transport reports the
    /// returned error to the peer.
    pub async fn upload<S: UploadStream>(&self, ctx: &CallContext, stream: S) -> ServerResult<()> {
        let result = self.run_upload(ctx, stream).await;
        if let Err(err) = &result {
            log_failure("upload", err);
        }
        result
    }

    async fn run_upload<S: UploadStream>(&self, ctx: &CallContext, mut stream: S) -> ServerResult<()> {
        // Held until return, or until the save finishes once one has started.
        let permit = self.gates.try_acquire(GateClass::Upload)?;

        let mut state = UploadState::AwaitingInfo;
        loop {
            state = match state {
                UploadState::AwaitingInfo => match receive(ctx, &mut stream).await? {
                    Some(UploadMessage::Info(info)) => {
                        validate_name(&info.name).map_err(|e| ServerError::Protocol(e.to_string()))?;
                        info!(name = %info.name, content_type = %info.content_type, "receiving upload");
                        UploadState::ReceivingChunks { info, data: Vec::new() }
                    }
                    Some(UploadMessage::Chunk(_)) => {
                        return Err(ServerError::Protocol("first message must carry upload info".into()))
                    }
                    None => return Err(ServerError::MissingInfo),
                },
                UploadState::ReceivingChunks { info, mut data } => match receive(ctx, &mut stream).await? {
                    Some(UploadMessage::Chunk(chunk)) => {
                        let size = data.len() + chunk.len();
                        debug!(chunk = chunk.len(), total = size, "received chunk");
                        if size > self.max_payload_size {
                            return Err(ServerError::PayloadTooLarge {
                                size,
                                max: self.max_payload_size,
                            });
                        }
                        data.extend_from_slice(&chunk);
                        UploadState::ReceivingChunks { info, data }
                    }
                    Some(UploadMessage::Info(_)) => {
                        return Err(ServerError::Protocol("upload info sent more than once".into()))
                    }
                    None => UploadState::Finalizing { info, data },
                },
                UploadState::Finalizing { info, data } => {
                    let size = u32::try_from(data.len())
                        .map_err(|_| ServerError::Internal(format!("payload size {} overflows u32", data.len())))?;
                    let store = Arc::clone(&self.store);
                    let name = info.name.clone();
                    let id = tokio::task::spawn_blocking(move || {
                        let _permit = permit;
                        store.save(&info.name, &info.content_type, &data)
                    })
                    .await
                    .map_err(|e| ServerError::Internal(format!("save task failed: {e}")))??;

                    stream
                        .send_and_close(UploadResponse { id: id.to_string(), size })
                        .await
                        .map_err(|e| ServerError::Send(e.to_string()))?;
                    info!(%id, %name, size, "saved upload");
                    return Ok(());
                }
            };
        }
    }
}

impl std::fmt::Debug for IngestionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionService")
            .field("max_payload_size", &self.max_payload_size)
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

async fn receive<S: UploadStream>(ctx: &CallContext, stream: &mut S) -> ServerResult<Option<UploadMessage>> {
    Ok(ctx.bound(stream.recv()).await??)
}

fn log_failure(op: &str, err: &ServerError) {
    match err.code() {
        Code::Internal => error!(op, code = %err.code(), "{err}"),
        code => warn!(op, %code, "{err}"),
    }
}
