//! Stream reassembler - accumulates partial reads and extracts frames.
//!
//! One instance per bridge direction. Each [`feed`] appends newly read
//! bytes, pops every complete frame off the front of the buffer, and keeps
//! any tail fragment for the next call. The emitted frame sequence is
//! independent of how the byte stream was chunked across reads; that
//! property is what makes reassembly safe over arbitrarily fragmented
//! non-blocking reads.
//!
//! [`feed`]: Reassembler::feed
//!
//! # Example
//!
//! ```
//! use h4_bridge::protocol::Reassembler;
//!
//! let mut reassembler = Reassembler::new();
//!
//! // An event frame split across two reads
//! assert!(reassembler.feed(&[0x04, 0x0e, 0x02]).unwrap().is_empty());
//! let frames = reassembler.feed(&[0x01, 0x00]).unwrap();
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0].len(), 5);
//! ```

use bytes::BytesMut;

use super::frame::Frame;
use super::h4::{self, Boundary};
use crate::error::{BridgeError, Result};

/// Default accumulator capacity.
///
/// Large enough that every legal H4 frame (ACL tops out at 65540 bytes on
/// the wire) fits with room for a trailing read of the next frame.
pub const DEFAULT_CAPACITY: usize = 128 * 1024;

/// Accumulates a directed byte stream and extracts complete H4 frames.
///
/// The capacity bounds how much unparsed data may sit in the buffer while
/// waiting for a frame boundary, guarding against unbounded growth from a
/// malformed or never-terminating frame.
pub struct Reassembler {
    /// Pending bytes; `[0, len)` is valid unconsumed data.
    buffer: BytesMut,
    /// Fixed upper capacity for pending data.
    capacity: usize,
    /// Set once an invalid tag is seen; the stream is dead from then on.
    poisoned: Option<u8>,
}

impl Reassembler {
    /// Create a reassembler with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a reassembler with a custom capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            capacity,
            poisoned: None,
        }
    }

    /// Append newly read bytes and extract every complete frame.
    ///
    /// A single read may carry multiple frames, one frame plus a fragment
    /// of the next, or no complete frame at all; all cases are handled and
    /// leftover bytes are retained for the next call. An empty feed is a
    /// no-op (a would-block read maps to this).
    ///
    /// # Errors
    ///
    /// - [`BridgeError::BufferOverflow`] if appending would fill the
    ///   accumulator to capacity without a parseable frame. Reported, not
    ///   truncated.
    /// - [`BridgeError::InvalidPacketType`] for an unknown tag byte.
    ///   Frames completed ahead of the bad tag are still returned by that
    ///   call; the reassembler is then poisoned — every later call returns
    ///   the error and no further frames are ever emitted. Callers that
    ///   must react without waiting for more bytes check [`poison`] after
    ///   each feed.
    ///
    /// [`poison`]: Reassembler::poison
    pub fn feed(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        if let Some(tag) = self.poisoned {
            return Err(BridgeError::InvalidPacketType { tag });
        }

        if self.buffer.len() + data.len() >= self.capacity {
            return Err(BridgeError::BufferOverflow {
                buffered: self.buffer.len(),
                incoming: data.len(),
                capacity: self.capacity,
            });
        }

        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();

        loop {
            match h4::resolve(&self.buffer) {
                Ok(Boundary::NeedMoreBytes) => break,

                Ok(Boundary::Frame { packet_type, len }) => {
                    if len > self.buffer.len() {
                        // Boundary known, frame not fully arrived yet
                        break;
                    }
                    // Compaction: split_to shifts the remainder to index 0
                    let bytes = self.buffer.split_to(len).freeze();
                    frames.push(Frame::new(packet_type, bytes));
                }

                Err(BridgeError::InvalidPacketType { tag }) => {
                    self.poisoned = Some(tag);
                    if frames.is_empty() {
                        return Err(BridgeError::InvalidPacketType { tag });
                    }
                    // Frames completed ahead of the bad tag still flow;
                    // the poison error surfaces on the next call.
                    break;
                }

                Err(e) => return Err(e),
            }
        }

        Ok(frames)
    }

    /// Number of buffered bytes still awaiting a frame boundary.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// True if no partial frame is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The tag byte that permanently ended this stream, if one was seen.
    pub fn poison(&self) -> Option<u8> {
        self.poisoned
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}
