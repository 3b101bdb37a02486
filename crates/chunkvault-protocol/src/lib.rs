//! Wire protocol for chunkvault.
//!
//! Defines the upload stream messages, their framing, the response
//! envelopes, and the status codes shared by the server and its clients.

pub mod codec;
pub mod endpoint;
pub mod error;
pub mod message;
pub mod status;

pub use codec::{FrameCodec, FrameDecoder, CHUNK_HEADER_SIZE};
pub use endpoint::{endpoints, HealthResponse, FRAME_CONTENT_TYPE, TIMEOUT_HEADER};
pub use error::{ProtocolError, ProtocolResult};
pub use message::{
    tags, ListMetadataResponse, UploadInfo, UploadMessage, UploadResponse, MAX_FRAME_SIZE,
    PROTOCOL_VERSION,
};
pub use status::{Code, Status};
