use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome classes a call can terminate with.
///
/// Callers use the code to decide what to do next: `ResourceExhausted` is
/// worth retrying later, `InvalidArgument` and `AlreadyExists` mean the
/// request itself must change, `Internal` is a server-side failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Code {
    Unknown,
    InvalidArgument,
    AlreadyExists,
    ResourceExhausted,
    Cancelled,
    DeadlineExceeded,
    Internal,
}

impl Code {
    /// HTTP status used when the code travels over the HTTP binding.
    pub fn http_status(self) -> u16 {
        match self {
            Self::Unknown | Self::InvalidArgument => 400,
            Self::AlreadyExists => 409,
            Self::ResourceExhausted => 429,
            // Client closed request.
            Self::Cancelled => 499,
            Self::Internal => 500,
            Self::DeadlineExceeded => 504,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::InvalidArgument => "invalid_argument",
            Self::AlreadyExists => "already_exists",
            Self::ResourceExhausted => "resource_exhausted",
            Self::Cancelled => "cancelled",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error body returned when a call fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: Code,
    pub message: String,
}

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for Status {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_mapping_distinguishes_retryable_from_invalid() {
        assert_eq!(Code::ResourceExhausted.http_status(), 429);
        assert_eq!(Code::InvalidArgument.http_status(), 400);
        assert_eq!(Code::AlreadyExists.http_status(), 409);
        assert_eq!(Code::Internal.http_status(), 500);
        assert_eq!(Code::DeadlineExceeded.http_status(), 504);
        assert_eq!(Code::Cancelled.http_status(), 499);
    }

    #[test]
    fn serde_uses_snake_case_names() {
        let status = Status::new(Code::ResourceExhausted, "busy");
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, r#"{"code":"resource_exhausted","message":"busy"}"#);
        let back: Status = serde_json::from_str(&json).unwrap();
        assert_eq!(back, status);
    }

    #[test]
    fn display_matches_serde_name() {
        for code in [
            Code::Unknown,
            Code::InvalidArgument,
            Code::AlreadyExists,
            Code::ResourceExhausted,
            Code::Cancelled,
            Code::DeadlineExceeded,
            Code::Internal,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{code}\""));
        }
    }
}
