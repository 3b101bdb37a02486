use chunkvault_store::DirectoryListingRecord;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u32 = 1;

/// Largest payload a single frame may carry.
pub const MAX_FRAME_SIZE: usize = 4 * 1024 * 1024;

/// Descriptive info sent as the first message of an upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadInfo {
    /// Format hint, typically the file extension.
    pub content_type: String,
    /// File name the upload is stored under.
    pub name: String,
}

/// Messages a client sends on an upload stream: one `Info`, then any
/// number of `Chunk`s.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadMessage {
    Info(UploadInfo),
    Chunk(Vec<u8>),
}

impl UploadMessage {
    pub fn type_tag(&self) -> u8 {
        match self {
            Self::Info(_) => tags::INFO,
            Self::Chunk(_) => tags::CHUNK,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Info(_) => "Info",
            Self::Chunk(_) => "Chunk",
        }
    }
}

pub mod tags {
    pub const INFO: u8 = 1;
    pub const CHUNK: u8 = 2;
}

/// Terminal response of a successful upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub id: String,
    pub size: u32,
}

/// Response of the metadata listing call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMetadataResponse {
    pub items: Vec<DirectoryListingRecord>,
}
