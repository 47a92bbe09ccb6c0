//! Document codec
//!
//! Converts a (key, payload) pair into the record representation stored in a
//! node engine, and back.
//!
//! ## Wire Format
//! ```text
//! ┌───────────┬──────────────┬─────────┬─────┬─────────────┐
//! │ IdLen (4) │ PayloadLen(4)│ CRC (4) │ Id  │   Payload   │
//! └───────────┴──────────────┴─────────┴─────┴─────────────┘
//! ```
//!
//! Lengths are explicit and big-endian; payloads are arbitrary binary with no
//! NUL-termination anywhere. The CRC32 covers id + payload. Decoding verifies
//! that the buffer holds exactly the recorded lengths and that the checksum
//! matches — any mismatch is a [`CorruptDocument`](ShardError::CorruptDocument).

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, ShardError};

/// Header size: id length (4) + payload length (4) + CRC (4)
pub const DOC_HEADER_SIZE: usize = 12;

/// A keyed byte payload.
///
/// Both buffers are owned, length-tagged, and released when the document
/// leaves scope — there is no manual free call to pair with a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Routing/retrieval key
    pub id: Bytes,

    /// Opaque payload bytes
    pub payload: Bytes,
}

impl Document {
    /// Create a document from a string-like key and payload bytes
    pub fn new(id: impl Into<Bytes>, payload: impl Into<Bytes>) -> Self {
        Self {
            id: id.into(),
            payload: payload.into(),
        }
    }
}

/// Encode a document into its stored representation
pub fn encode_document(doc: &Document) -> Bytes {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&doc.id);
    hasher.update(&doc.payload);
    let crc = hasher.finalize();

    let mut buf = BytesMut::with_capacity(DOC_HEADER_SIZE + doc.id.len() + doc.payload.len());
    buf.put_u32(doc.id.len() as u32);
    buf.put_u32(doc.payload.len() as u32);
    buf.put_u32(crc);
    buf.put_slice(&doc.id);
    buf.put_slice(&doc.payload);

    buf.freeze()
}

/// Decode a document from its stored representation.
///
/// Reconstructs the exact byte lengths recorded at write time. Fails with
/// `CorruptDocument` if the buffer is truncated, longer than the recorded
/// lengths, or fails the checksum.
pub fn decode_document(mut bytes: Bytes) -> Result<Document> {
    if bytes.len() < DOC_HEADER_SIZE {
        return Err(ShardError::CorruptDocument(format!(
            "incomplete header: expected {} bytes, got {}",
            DOC_HEADER_SIZE,
            bytes.len()
        )));
    }

    let id_len = bytes.get_u32() as usize;
    let payload_len = bytes.get_u32() as usize;
    let crc = bytes.get_u32();

    // The remaining buffer must hold exactly what was recorded.
    if bytes.len() != id_len + payload_len {
        return Err(ShardError::CorruptDocument(format!(
            "length mismatch: recorded {} + {} bytes, read back {}",
            id_len,
            payload_len,
            bytes.len()
        )));
    }

    let id = bytes.split_to(id_len);
    let payload = bytes;

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&id);
    hasher.update(&payload);
    if hasher.finalize() != crc {
        return Err(ShardError::CorruptDocument(
            "checksum mismatch".to_string(),
        ));
    }

    Ok(Document { id, payload })
}
