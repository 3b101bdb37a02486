use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

use chunkvault_gate::GateError;
use chunkvault_protocol::{Code, Status};
use chunkvault_store::StoreError;

use crate::stream::StreamError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("admission refused: {0}")]
    Gate(#[from] GateError),

    #[error("cannot receive upload info: stream ended before the info message")]
    MissingInfo,

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("payload too large: {size} > {max}")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("cannot receive message: {0}")]
    Receive(String),

    #[error("request is cancelled")]
    Cancelled,

    #[error("deadline is exceeded")]
    DeadlineExceeded,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("cannot send response: {0}")]
    Send(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Status code reported to the caller.
    pub fn code(&self) -> Code {
        match self {
            Self::Gate(GateError::Exhausted { .. }) => Code::ResourceExhausted,
            Self::MissingInfo | Self::Receive(_) | Self::Send(_) => Code::Unknown,
            Self::Protocol(_) | Self::PayloadTooLarge { .. } => Code::InvalidArgument,
            Self::Cancelled => Code::Cancelled,
            Self::DeadlineExceeded => Code::DeadlineExceeded,
            Self::Store(StoreError::AlreadyExists(_)) => Code::AlreadyExists,
            Self::Store(StoreError::InvalidName { .. }) => Code::InvalidArgument,
            Self::Gate(GateError::Config(_))
            | Self::Store(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Internal(_) => Code::Internal,
        }
    }

    pub fn to_status(&self) -> Status {
        Status::new(self.code(), self.to_string())
    }
}

impl From<StreamError> for ServerError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Cancelled => Self::Cancelled,
            StreamError::Malformed(msg) => Self::Protocol(msg),
            StreamError::Transport(msg) => Self::Receive(msg),
            StreamError::TooLarge { size, max } => Self::PayloadTooLarge { size, max },
            StreamError::Closed => Self::Receive("stream closed".into()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.to_status();
        let http = StatusCode::from_u16(status.code.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (http, Json(status)).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chunkvault_gate::GateClass;

    #[test]
    fn codes_separate_retryable_invalid_and_server_failures() {
        let exhausted = ServerError::Gate(GateError::Exhausted { class: GateClass::Upload, limit: 1 });
        assert_eq!(exhausted.code(), Code::ResourceExhausted);
        assert_eq!(ServerError::MissingInfo.code(), Code::Unknown);
        assert_eq!(ServerError::Protocol("x".into()).code(), Code::InvalidArgument);
        assert_eq!(ServerError::PayloadTooLarge { size: 2, max: 1 }.code(), Code::InvalidArgument);
        assert_eq!(ServerError::Store(StoreError::AlreadyExists("a".into())).code(), Code::AlreadyExists);
        assert_eq!(ServerError::Store(StoreError::IndexPoisoned).code(), Code::Internal);
        assert_eq!(ServerError::Cancelled.code(), Code::Cancelled);
        assert_eq!(ServerError::DeadlineExceeded.code(), Code::DeadlineExceeded);
    }

    #[test]
    fn stream_errors_map_to_server_errors() {
        assert!(matches!(ServerError::from(StreamError::Cancelled), ServerError::Cancelled));
        assert!(matches!(ServerError::from(StreamError::Malformed("m".into())), ServerError::Protocol(_)));
        assert!(matches!(ServerError::from(StreamError::Transport("t".into())), ServerError::Receive(_)));
        assert!(matches!(
            ServerError::from(StreamError::TooLarge { size: 9, max: 4 }),
            ServerError::PayloadTooLarge { size: 9, max: 4 }
        ));
    }

    #[test]
    fn too_large_message_names_sizes() {
        let err = ServerError::PayloadTooLarge { size: 2_097_152, max: 1_048_576 };
        assert_eq!(err.to_status().message, "payload too large: 2097152 > 1048576");
    }

    #[test]
    fn into_response_uses_http_mapping() {
        let resp = ServerError::PayloadTooLarge { size: 2, max: 1 }.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let resp = ServerError::Cancelled.into_response();
        assert_eq!(resp.status().as_u16(), 499);
    }
}
