use bytes::{Buf, BytesMut};

use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{tags, UploadInfo, UploadMessage, MAX_FRAME_SIZE};

/// Length prefix size.
const LEN_SIZE: usize = 4;

/// bincode length prefix in front of a chunk's bytes inside its payload.
pub const CHUNK_HEADER_SIZE: usize = 8;

/// Codec for upload stream frames.
///
/// Frame layout: `[4 bytes len, big-endian][1 byte tag][len - 1 bytes payload]`.
/// The payload is the bincode encoding of the variant's body, selected by
/// the tag.
pub struct FrameCodec;

impl FrameCodec {
    /// Encode one message as a complete frame.
    pub fn encode(msg: &UploadMessage) -> ProtocolResult<Vec<u8>> {
        let payload = match msg {
            UploadMessage::Info(info) => bincode::serialize(info),
            UploadMessage::Chunk(data) => bincode::serialize(data),
        }
        .map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        if payload.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: payload.len(),
                max: MAX_FRAME_SIZE,
            });
        }
        let len = (payload.len() + 1) as u32;
        let mut buf = Vec::with_capacity(LEN_SIZE + 1 + payload.len());
        buf.extend_from_slice(&len.to_be_bytes());
        buf.push(msg.type_tag());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Decode a single complete frame. Returns (message, bytes_consumed).
    pub fn decode(data: &[u8]) -> ProtocolResult<(UploadMessage, usize)> {
        let Some(len) = frame_len(data, MAX_FRAME_SIZE)? else {
            return Err(ProtocolError::FramingError("too short".into()));
        };
        let total = LEN_SIZE + len;
        if data.len() < total {
            return Err(ProtocolError::FramingError(format!(
                "incomplete: have {}, need {}",
                data.len(),
                total
            )));
        }
        let msg = Self::decode_body(data[LEN_SIZE], &data[LEN_SIZE + 1..total])?;
        Ok((msg, total))
    }

    fn decode_body(tag: u8, payload: &[u8]) -> ProtocolResult<UploadMessage> {
        let de = |e: bincode::Error| ProtocolError::Deserialization(e.to_string());
        match tag {
            tags::INFO => bincode::deserialize::<UploadInfo>(payload)
                .map(UploadMessage::Info)
                .map_err(de),
            tags::CHUNK => bincode::deserialize::<Vec<u8>>(payload)
                .map(UploadMessage::Chunk)
                .map_err(de),
            other => Err(ProtocolError::InvalidMessageType(other)),
        }
    }
}

/// Read and check the length prefix against `max` payload bytes. `None` if
/// fewer than 4 bytes are available.
fn frame_len(data: &[u8], max: usize) -> ProtocolResult<Option<usize>> {
    let Some(prefix) = data.get(..LEN_SIZE) else {
        return Ok(None);
    };
    let len = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    if len < 1 {
        return Err(ProtocolError::FramingError("zero-length frame".into()));
    }
    if len - 1 > max {
        return Err(ProtocolError::MessageTooLarge { size: len - 1, max });
    }
    Ok(Some(len))
}

/// Incremental decoder for a byte stream carrying back-to-back frames.
///
/// Feed it transport chunks with [`FrameDecoder::extend`] and pull complete
/// messages with [`FrameDecoder::next_message`]. Frame boundaries need not
/// line up with transport chunks. Oversized lengths are rejected as soon as
/// the prefix arrives, before the body is buffered.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    max_frame: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_max_frame(MAX_FRAME_SIZE)
    }

    /// A decoder refusing frame payloads over `max_frame` bytes, capped at
    /// [`MAX_FRAME_SIZE`].
    pub fn with_max_frame(max_frame: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_frame: max_frame.min(MAX_FRAME_SIZE),
        }
    }

    pub fn max_frame(&self) -> usize {
        self.max_frame
    }

    /// Append received bytes.
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Bytes received but not yet consumed as a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Next complete message, or `Ok(None)` if more bytes are needed.
    pub fn next_message(&mut self) -> ProtocolResult<Option<UploadMessage>> {
        let Some(len) = frame_len(&self.buf, self.max_frame)? else {
            return Ok(None);
        };
        if self.buf.len() < LEN_SIZE + len {
            return Ok(None);
        }
        self.buf.advance(LEN_SIZE);
        let frame = self.buf.split_to(len);
        FrameCodec::decode_body(frame[0], &frame[1..]).map(Some)
    }

    /// Check that the stream ended on a frame boundary.
    pub fn finish(&self) -> ProtocolResult<()> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::FramingError(format!(
                "stream ended inside a frame: {} trailing bytes",
                self.buf.len()
            )))
        }
    }
}
