//! Error types for h4-bridge.

use thiserror::Error;

use crate::policy::Direction;

/// Main error type for all bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// I/O error on an endpoint (open, read, write, poll registration).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A leading tag byte outside the known H4 packet-type set.
    ///
    /// The stream is no longer parseable; the bridge refuses to guess a
    /// resynchronization point.
    #[error("unknown packet type 0x{tag:02x}")]
    InvalidPacketType {
        /// The offending tag byte.
        tag: u8,
    },

    /// Unparsed bytes reached the accumulator capacity without a frame
    /// boundary. Indicates a non-conforming peer or header-parsing drift.
    #[error("accumulator overflow: {buffered} buffered + {incoming} incoming bytes reaches capacity {capacity}")]
    BufferOverflow {
        /// Bytes already pending in the accumulator.
        buffered: usize,
        /// Bytes of the feed that triggered the overflow.
        incoming: usize,
        /// Fixed upper capacity of the accumulator.
        capacity: usize,
    },

    /// A forward-write accepted fewer bytes than the frame length.
    ///
    /// Partial writes are not retried; a torn frame on the wire is worse
    /// than tearing down the bridge.
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite {
        /// Bytes the endpoint accepted.
        written: usize,
        /// Full frame length.
        expected: usize,
    },

    /// A stream-level failure tagged with the direction it occurred in.
    #[error("{direction}: {source}")]
    Stream {
        /// The direction whose reassembler or forward-write failed.
        direction: Direction,
        /// The underlying failure.
        #[source]
        source: Box<BridgeError>,
    },
}

impl BridgeError {
    /// Attach the owning direction to a stream-level failure.
    pub fn in_direction(self, direction: Direction) -> Self {
        match self {
            BridgeError::Stream { .. } => self,
            other => BridgeError::Stream {
                direction,
                source: Box::new(other),
            },
        }
    }
}

/// Result type alias using BridgeError.
pub type Result<T> = std::result::Result<T, BridgeError>;
