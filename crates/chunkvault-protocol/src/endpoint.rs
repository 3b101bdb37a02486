/// HTTP endpoint paths for the chunkvault protocol.
pub mod endpoints {
    pub const METADATA: &str = "/v1/metadata";
    pub const UPLOAD: &str = "/v1/upload";
    pub const HEALTH: &str = "/v1/health";
}

/// Request header carrying the caller's deadline, in milliseconds.
pub const TIMEOUT_HEADER: &str = "x-timeout-ms";

/// Content type of an upload body (a sequence of frames).
pub const FRAME_CONTENT_TYPE: &str = "application/x-chunkvault-frames";

/// Liveness answer, with the limits a client should size its calls by.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub protocol_version: u32,
    /// Largest accepted upload, in bytes.
    pub max_payload_size: usize,
    /// Concurrent metadata listings admitted.
    pub read_limit: usize,
    /// Concurrent upload streams admitted.
    pub upload_limit: usize,
    pub uploads_in_flight: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_wire_names() {
        let h = HealthResponse {
            status: "ok".into(),
            version: "0.1.0".into(),
            protocol_version: 1,
            max_payload_size: 1 << 20,
            read_limit: 16,
            upload_limit: 8,
            uploads_in_flight: 2,
        };
        let json = serde_json::to_value(&h).unwrap();
        assert_eq!(json["max_payload_size"], 1_048_576);
        assert_eq!(json["upload_limit"], 8);
        assert_eq!(json["uploads_in_flight"], 2);
        let back: HealthResponse = serde_json::from_value(json).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn endpoint_paths() {
        assert_eq!(endpoints::HEALTH, "/v1/health");
        assert_eq!(endpoints::METADATA, "/v1/metadata");
        assert_eq!(endpoints::UPLOAD, "/v1/upload");
    }
}
