//! Frame struct - one complete H4 unit as extracted from a byte stream.
//!
//! Holds the full on-wire bytes (tag, header, payload) so forwarding can
//! write the frame verbatim without re-framing. Uses `bytes::Bytes` for
//! zero-copy sharing with the reassembler's accumulation buffer.

use bytes::Bytes;

use super::h4::PacketType;

/// A complete H4 frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Packet type selected by the leading tag byte.
    pub packet_type: PacketType,
    /// Full on-wire bytes, tag included (zero-copy via `bytes::Bytes`).
    pub bytes: Bytes,
}

impl Frame {
    /// Create a frame from its type and full on-wire bytes.
    pub fn new(packet_type: PacketType, bytes: Bytes) -> Self {
        Self { packet_type, bytes }
    }

    /// Full on-wire bytes including the tag.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Total on-wire length.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True for a zero-length frame (never produced by the reassembler).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
