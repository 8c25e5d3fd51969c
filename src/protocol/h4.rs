//! H4 wire format - packet types and frame boundary resolution.
//!
//! H4 framing is a one-byte packet-type tag followed by a type-specific
//! header carrying the payload length:
//!
//! ```text
//! ┌──────┬─────────────────────┬─────────┐
//! │ Tag  │ Type-specific header│ Payload │
//! │ 1 B  │ 2-4 B               │ 0-64K B │
//! └──────┴─────────────────────┴─────────┘
//! ```
//!
//! | Type     | Header            | Total length       |
//! |----------|-------------------|--------------------|
//! | Command  | opcode(2) len(1)  | 4 + len            |
//! | ACL data | handle(2) len(2)  | 5 + len (LE)       |
//! | SCO data | handle(2) len(1)  | 4 + len            |
//! | Event    | code(1) len(1)    | 3 + len            |
//! | Vendor   | opcode(1) data    | all buffered bytes |
//!
//! Vendor packets carry no declared length on this channel; the whole
//! buffered region is treated as one frame. See [`resolve`].

use crate::error::{BridgeError, Result};

/// Tag byte for HCI command packets.
pub const COMMAND_TAG: u8 = 0x01;
/// Tag byte for ACL data packets.
pub const ACL_DATA_TAG: u8 = 0x02;
/// Tag byte for SCO data packets.
pub const SCO_DATA_TAG: u8 = 0x03;
/// Tag byte for HCI event packets.
pub const EVENT_TAG: u8 = 0x04;
/// Tag byte for vendor packets, including vhci-driver control packets.
pub const VENDOR_TAG: u8 = 0xff;

/// The five H4 packet types carried on the wire.
///
/// Any other tag byte is a terminal parse error for the stream, surfaced
/// as [`BridgeError::InvalidPacketType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// HCI command (host to controller).
    Command,
    /// ACL data.
    AclData,
    /// SCO data.
    ScoData,
    /// HCI event (controller to host).
    Event,
    /// Vendor packet; on the virtual-HCI side these are driver-internal.
    Vendor,
}

impl PacketType {
    /// The on-wire tag byte for this packet type.
    #[inline]
    pub fn tag(self) -> u8 {
        match self {
            PacketType::Command => COMMAND_TAG,
            PacketType::AclData => ACL_DATA_TAG,
            PacketType::ScoData => SCO_DATA_TAG,
            PacketType::Event => EVENT_TAG,
            PacketType::Vendor => VENDOR_TAG,
        }
    }
}

impl TryFrom<u8> for PacketType {
    type Error = BridgeError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            COMMAND_TAG => Ok(PacketType::Command),
            ACL_DATA_TAG => Ok(PacketType::AclData),
            SCO_DATA_TAG => Ok(PacketType::ScoData),
            EVENT_TAG => Ok(PacketType::Event),
            VENDOR_TAG => Ok(PacketType::Vendor),
            tag => Err(BridgeError::InvalidPacketType { tag }),
        }
    }
}

/// Outcome of probing an accumulated buffer for a frame boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Not enough bytes buffered to read the length field yet.
    NeedMoreBytes,
    /// The frame type and total on-wire length are known. The frame itself
    /// is complete only once `len` bytes are buffered.
    Frame {
        /// Packet type selected by the tag byte.
        packet_type: PacketType,
        /// Total frame length including the tag byte.
        len: usize,
    },
}

/// Determine the type and total length of the frame at the front of `buf`.
///
/// Purely computational: never mutates or consumes the buffer, so it can be
/// unit tested on literal byte arrays.
///
/// Vendor packets have no declared length field on this channel; the rule
/// (inherited from the observed protocol) is to treat everything currently
/// buffered as one frame. A vendor packet split across two reads therefore
/// parses as two frames. Since vendor packets are either dropped or
/// forwarded as opaque bytes, this is an accepted limitation.
///
/// # Errors
///
/// [`BridgeError::InvalidPacketType`] for a tag outside the known set.
pub fn resolve(buf: &[u8]) -> Result<Boundary> {
    let Some(&tag) = buf.first() else {
        return Ok(Boundary::NeedMoreBytes);
    };

    let packet_type = PacketType::try_from(tag)?;

    let len = match packet_type {
        // tag(1) + opcode(2) + param_len(1) + params
        PacketType::Command => {
            if buf.len() < 4 {
                return Ok(Boundary::NeedMoreBytes);
            }
            4 + buf[3] as usize
        }

        // tag(1) + handle(2) + data_len(2, little-endian) + data
        PacketType::AclData => {
            if buf.len() < 5 {
                return Ok(Boundary::NeedMoreBytes);
            }
            5 + u16::from_le_bytes([buf[3], buf[4]]) as usize
        }

        // tag(1) + handle(2) + data_len(1) + data
        PacketType::ScoData => {
            if buf.len() < 4 {
                return Ok(Boundary::NeedMoreBytes);
            }
            4 + buf[3] as usize
        }

        // tag(1) + event_code(1) + param_len(1) + params
        PacketType::Event => {
            if buf.len() < 3 {
                return Ok(Boundary::NeedMoreBytes);
            }
            3 + buf[2] as usize
        }

        // tag(1) + opcode(1) + opaque data, no length field
        PacketType::Vendor => {
            if buf.len() < 2 {
                return Ok(Boundary::NeedMoreBytes);
            }
            buf.len()
        }
    };

    Ok(Boundary::Frame { packet_type, len })
}
